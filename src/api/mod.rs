mod consultation;
mod customer;
mod error;
mod income;
mod purchase;

use crate::config::Config;
use crate::purchase::PurchaseDesk;
use crate::records::RecordStore;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use error::{error_response, ApiError};

const BODY_LIMIT: u64 = 4 * 1024 * 1024;

/// Records service database ids; a missing id fails only the routes that need it.
#[derive(Debug, Clone, Default)]
pub struct Databases {
    pub customer: Option<String>,
    pub consultation: Option<String>,
    pub income: Option<String>,
}

pub struct State {
    pub databases: Databases,
    pub match_threshold: f64,
    pub records: Arc<dyn RecordStore>,
    pub desk: PurchaseDesk,
}

impl State {
    pub fn new(config: &Config, records: Arc<dyn RecordStore>, desk: PurchaseDesk) -> Self {
        Self {
            databases: Databases {
                customer: config.customer_db_id.clone(),
                consultation: config.consultation_db_id.clone(),
                income: config.income_db_id.clone(),
            },
            match_threshold: config.match_threshold,
            records,
            desk,
        }
    }

    fn customer_db(&self) -> Result<&str, ApiError> {
        self.databases
            .customer
            .as_deref()
            .ok_or(ApiError::Misconfigured("노션 고객 DB ID가 설정되지 않았습니다."))
    }

    fn consultation_db(&self) -> Result<&str, ApiError> {
        self.databases
            .consultation
            .as_deref()
            .ok_or(ApiError::Misconfigured("노션 상담일지 DB ID가 설정되지 않았습니다."))
    }

    fn income_db(&self) -> Result<&str, ApiError> {
        self.databases
            .income
            .as_deref()
            .ok_or(ApiError::Misconfigured("노션 수입 DB ID가 설정되지 않았습니다."))
    }
}

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    customer::routes(Arc::clone(&state))
        .or(consultation::routes(Arc::clone(&state)))
        .unify()
        .or(income::routes(Arc::clone(&state)))
        .unify()
        .or(purchase::routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .boxed()
}

fn with_state(state: Arc<State>) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

fn ok<T: Serialize>(body: &T) -> Response {
    warp::reply::json(body).into_response()
}

/// Handlers report their own failures as JSON; only routing problems reach the rejection handler.
fn respond(result: Result<Response, ApiError>) -> Result<Response, Rejection> {
    Ok(result.unwrap_or_else(Reply::into_response))
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "요청한 경로를 찾을 수 없습니다.")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        debug!("bad request body: {}", e);
        (StatusCode::BAD_REQUEST, "요청 본문 형식이 올바르지 않습니다.")
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "요청 파라미터 형식이 올바르지 않습니다.")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "JSON 요청만 지원합니다.")
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "요청 본문이 너무 큽니다.")
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "지원하지 않는 메서드입니다.")
    } else {
        error!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "요청 처리 중 오류가 발생했습니다.")
    };
    Ok(error_response(status, message))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::purchase::DeskConfig;
    use crate::records::memory::MemoryStore;
    use std::time::Duration;

    pub const CUSTOMERS: &str = "customers";
    pub const CONSULTATIONS: &str = "consultations";
    pub const INCOME: &str = "income";

    pub async fn state_with(store: Arc<MemoryStore>, databases: Databases) -> Arc<State> {
        let desk = PurchaseDesk::open(&DeskConfig {
            storage_dir: crate::purchase::temp_datadir(),
            owner_name: "master".to_string(),
            owner_pin: "0000".to_string(),
            idle_timeout: Duration::from_secs(300),
        })
        .await
        .unwrap();
        Arc::new(State {
            databases,
            match_threshold: crate::face::MATCH_THRESHOLD,
            records: store,
            desk,
        })
    }

    pub async fn state(store: Arc<MemoryStore>) -> Arc<State> {
        state_with(
            store,
            Databases {
                customer: Some(CUSTOMERS.to_string()),
                consultation: Some(CONSULTATIONS.to_string()),
                income: Some(INCOME.to_string()),
            },
        )
        .await
    }

    pub fn body<B: AsRef<[u8]>>(response: &warp::http::Response<B>) -> serde_json::Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }
}
