use crate::purchase::PurchaseError;
use crate::records::RecordsError;
use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Misconfigured(&'static str),

    #[error("{context}")]
    Records {
        context: &'static str,
        #[source]
        source: RecordsError,
    },

    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

impl ApiError {
    pub fn validation(message: &str) -> Self {
        ApiError::Validation(message.to_string())
    }

    /// Wraps a records service failure; `context` is what the caller gets to see.
    pub fn records(context: &'static str) -> impl FnOnce(RecordsError) -> ApiError {
        move |source| ApiError::Records { context, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Records {
                source: RecordsError::NotFound(_),
                ..
            } => StatusCode::NOT_FOUND,
            ApiError::Records { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Purchase(e) => match e {
                PurchaseError::InvalidCredentials | PurchaseError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                PurchaseError::Forbidden(_) => StatusCode::FORBIDDEN,
                PurchaseError::NotFound(..) => StatusCode::NOT_FOUND,
                PurchaseError::Invalid(_) => StatusCode::BAD_REQUEST,
                PurchaseError::Conflict(_) => StatusCode::CONFLICT,
                PurchaseError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Purchase(PurchaseError::Storage(_)) => {
                "요청 처리 중 오류가 발생했습니다.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status).into_response()
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Records { context, source } => error!("{}: {}", context, source),
            ApiError::Purchase(PurchaseError::Storage(e)) => error!("purchase storage: {:#}", e),
            ApiError::Misconfigured(message) => error!("{}", message),
            other => debug!("request rejected ({}): {}", status, other),
        }
        error_response(status, &self.message())
    }
}
