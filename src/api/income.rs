use super::{json_body, ok, respond, with_state, ApiError, State};
use crate::records::income;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection};

#[derive(Debug, Deserialize)]
struct IncomeBody {
    #[serde(default)]
    properties: Map<String, Value>,
}

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let get = warp::path!("api" / "income" / String)
        .and(warp::get())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_get);

    let save = warp::path!("api" / "income" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_state(state))
        .and_then(handle_save);

    get.or(save).unify().boxed()
}

fn check_date(date: &str) -> Result<(), ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ApiError::validation("날짜는 YYYY-MM-DD 형식이어야 합니다."))
}

async fn handle_get(date: String, state: Arc<State>) -> Result<Response, Rejection> {
    respond(get(&date, &state).await)
}

async fn get(date: &str, state: &State) -> Result<Response, ApiError> {
    check_date(date)?;
    let db = state.income_db()?;
    let page = income::get_daily_income(state.records.as_ref(), db, date)
        .await
        .map_err(ApiError::records("수입 정보 조회 중 오류가 발생했습니다."))?;
    Ok(ok(&json!({ "success": true, "income": page })))
}

async fn handle_save(date: String, body: IncomeBody, state: Arc<State>) -> Result<Response, Rejection> {
    respond(save(&date, body, &state).await)
}

async fn save(date: &str, body: IncomeBody, state: &State) -> Result<Response, ApiError> {
    check_date(date)?;
    let db = state.income_db()?;
    let page = income::save_daily_income(state.records.as_ref(), db, date, body.properties)
        .await
        .map_err(ApiError::records("수입 정보 저장 중 오류가 발생했습니다."))?;
    info!("daily income saved: {} ({})", date, page.id);
    Ok(ok(&json!({ "success": true, "income": page })))
}
