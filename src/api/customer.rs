use super::{json_body, ok, respond, with_state, ApiError, State};
use crate::face::summary::{lenient_number, lenient_text};
use crate::face::{normalize, rank, RawFeatureSummary};
use crate::records::customer::{self, CustomerSearch, CustomerUpdate, NewCustomer};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaceSearch {
    face_embedding: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    age: Option<f64>,
}

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "customer")
        .and(warp::get())
        .and(warp::query::<CustomerSearch>())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_list);

    let create = warp::path!("api" / "customer")
        .and(warp::post())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_create);

    let face_search = warp::path!("api" / "customer")
        .and(warp::put())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_face_search);

    let update = warp::path!("api" / "customer" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_update);

    let delete = warp::path!("api" / "customer" / String)
        .and(warp::delete())
        .and(with_state(state))
        .and_then(handle_delete);

    list.or(create)
        .unify()
        .or(face_search)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

async fn handle_list(search: CustomerSearch, state: Arc<State>) -> Result<Response, Rejection> {
    respond(list(search, &state).await)
}

async fn list(search: CustomerSearch, state: &State) -> Result<Response, ApiError> {
    let db = state.customer_db()?;
    let customers = customer::search(state.records.as_ref(), db, &search)
        .await
        .map_err(ApiError::records("고객 정보 조회 중 오류가 발생했습니다."))?;
    info!("customer search {:?}: {} found", search, customers.len());
    Ok(ok(&json!({ "success": true, "customers": customers })))
}

async fn handle_create(new: NewCustomer, state: Arc<State>) -> Result<Response, Rejection> {
    respond(create(new, &state).await)
}

async fn create(new: NewCustomer, state: &State) -> Result<Response, ApiError> {
    let db = state.customer_db()?;
    if new.name.trim().is_empty() {
        return Err(ApiError::validation("이름은 필수 입력 항목입니다."));
    }
    let page = state
        .records
        .create(db, new.properties())
        .await
        .map_err(ApiError::records("고객 등록 중 오류가 발생했습니다."))?;
    info!("customer created: {}", page.id);
    Ok(ok(&json!({ "success": true, "customer": page })))
}

async fn handle_face_search(search: FaceSearch, state: Arc<State>) -> Result<Response, Rejection> {
    respond(face_search(search, &state).await)
}

async fn face_search(search: FaceSearch, state: &State) -> Result<Response, ApiError> {
    let db = state.customer_db()?;
    let value = match search.face_embedding {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(serde_json::from_str::<Value>(&s).map_err(|e| {
            debug!("face embedding is not JSON: {}", e);
            ApiError::validation("얼굴 임베딩 데이터 형식이 올바르지 않습니다.")
        })?),
        Some(other) => Some(other),
    };
    let value = value.ok_or_else(|| ApiError::validation("얼굴 임베딩 데이터가 필요합니다."))?;

    let mut raw = RawFeatureSummary::from_value(&value);
    raw.fill_demographics(search.gender, search.age);
    let query = normalize(&raw);
    info!("face search: {:?}", query);

    let start = Instant::now();
    let candidates = customer::fetch_candidates_with_embedding(state.records.as_ref(), db)
        .await
        .map_err(ApiError::records("얼굴 인식 검색 중 오류가 발생했습니다."))?;
    if candidates.is_empty() {
        info!("face search: no customers with a stored face embedding");
        return Ok(ok(&json!({ "success": true, "customers": [], "similarities": [] })));
    }

    let result = rank(&query, &candidates, state.match_threshold);
    info!(
        "face search: {} of {} candidates matched, cost: {:?}",
        result.len(),
        candidates.len(),
        start.elapsed()
    );

    if result.is_empty() {
        return Ok(ok(&json!({
            "success": false,
            "customers": [],
            "similarities": [],
            "message": "매칭된 고객이 없습니다."
        })));
    }
    let customers = result.candidates().collect::<Vec<_>>();
    Ok(ok(&json!({
        "success": true,
        "customers": customers,
        "similarities": result.similarities(),
        "message": format!("{}명의 고객이 매칭되었습니다.", result.len())
    })))
}

async fn handle_update(
    id: String,
    update: CustomerUpdate,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(apply_update(&id, update, &state).await)
}

async fn apply_update(id: &str, update: CustomerUpdate, state: &State) -> Result<Response, ApiError> {
    if update.name.trim().is_empty() {
        return Err(ApiError::validation("이름은 필수 입력 항목입니다."));
    }
    state
        .records
        .update(id, update.properties())
        .await
        .map_err(ApiError::records("고객 정보 업데이트 중 오류가 발생했습니다."))?;
    info!("customer updated: {}", id);
    Ok(ok(&json!({ "success": true, "message": "고객 정보가 업데이트되었습니다." })))
}

async fn handle_delete(id: String, state: Arc<State>) -> Result<Response, Rejection> {
    respond(delete(&id, &state).await)
}

async fn delete(id: &str, state: &State) -> Result<Response, ApiError> {
    state
        .records
        .archive(id)
        .await
        .map_err(ApiError::records("고객 정보 삭제 중 오류가 발생했습니다."))?;
    info!("customer archived: {}", id);
    Ok(ok(&json!({ "success": true, "message": "고객 정보가 삭제되었습니다." })))
}
