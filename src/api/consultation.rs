use super::{json_body, ok, respond, with_state, ApiError, State};
use crate::records::consultation::{self, ConsultationNote};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    customer_id: Option<String>,
}

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "consultation")
        .and(warp::get())
        .and(warp::query::<ListQuery>())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_list);

    let create = warp::path!("api" / "consultation")
        .and(warp::post())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_create);

    let update = warp::path!("api" / "consultation" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_update);

    let delete = warp::path!("api" / "consultation" / String)
        .and(warp::delete())
        .and(with_state(state))
        .and_then(handle_delete);

    list.or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

async fn handle_list(query: ListQuery, state: Arc<State>) -> Result<Response, Rejection> {
    respond(list(query, &state).await)
}

async fn list(query: ListQuery, state: &State) -> Result<Response, ApiError> {
    let customer_id = query
        .customer_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("고객 ID가 필요합니다."))?;
    let db = state.consultation_db()?;
    let consultations = consultation::list_for_customer(state.records.as_ref(), db, &customer_id)
        .await
        .map_err(ApiError::records("상담일지 조회 중 오류가 발생했습니다."))?;
    debug!("consultations of {}: {}", customer_id, consultations.len());
    Ok(ok(&json!({ "success": true, "consultations": consultations })))
}

async fn handle_create(note: ConsultationNote, state: Arc<State>) -> Result<Response, Rejection> {
    respond(create(note, &state).await)
}

async fn create(note: ConsultationNote, state: &State) -> Result<Response, ApiError> {
    let db = state.consultation_db()?;
    if note.customer_id.is_empty() || note.content.trim().is_empty() {
        return Err(ApiError::validation("고객 ID와 상담내용은 필수 입력 항목입니다."));
    }
    let page = consultation::create(state.records.as_ref(), db, &note)
        .await
        .map_err(ApiError::records("상담일지 등록 중 오류가 발생했습니다."))?;
    info!("consultation created: {} for customer {}", page.id, note.customer_id);
    Ok(ok(&json!({ "success": true, "consultation": page })))
}

async fn handle_update(
    id: String,
    note: ConsultationNote,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(update(&id, note, &state).await)
}

async fn update(id: &str, note: ConsultationNote, state: &State) -> Result<Response, ApiError> {
    if note.content.trim().is_empty() {
        return Err(ApiError::validation("상담내용은 필수 입력 항목입니다."));
    }
    let page = consultation::update(state.records.as_ref(), id, &note)
        .await
        .map_err(ApiError::records("상담일지 수정 중 오류가 발생했습니다."))?;
    info!("consultation updated: {}", id);
    Ok(ok(&json!({ "success": true, "consultation": page })))
}

async fn handle_delete(id: String, state: Arc<State>) -> Result<Response, Rejection> {
    respond(delete(&id, &state).await)
}

async fn delete(id: &str, state: &State) -> Result<Response, ApiError> {
    state
        .records
        .archive(id)
        .await
        .map_err(ApiError::records("상담일지 삭제 중 오류가 발생했습니다."))?;
    info!("consultation archived: {}", id);
    Ok(ok(&json!({ "success": true, "message": "상담일지가 삭제되었습니다." })))
}

#[cfg(test)]
mod tests {
    use super::super::routes as all_routes;
    use super::super::testing::*;
    use crate::records::consultation::IMAGES;
    use crate::records::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use warp::http::StatusCode;

    #[tokio::test]
    async fn test_consultation_lifecycle() {
        let store = Arc::new(MemoryStore::default());
        let routes = all_routes(state(Arc::clone(&store)).await);

        let response = warp::test::request()
            .method("POST")
            .path("/api/consultation")
            .json(&json!({
                "customerId": "cust-1",
                "content": "두통",
                "consultDate": "2024-03-01",
                "imageUrls": ["https://img/1.jpg"]
            }))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let id = body(&response)["consultation"]["id"].as_str().unwrap().to_string();

        let response = warp::test::request()
            .method("PUT")
            .path(&format!("/api/consultation/{}", id))
            .json(&json!({ "content": "두통 완화", "imageUrls": ["https://img/2.jpg"] }))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let images = store.page(&id).unwrap().properties[IMAGES]["files"].clone();
        assert_eq!(images.as_array().unwrap().len(), 2);

        let response = warp::test::request()
            .path("/api/consultation?customerId=cust-1")
            .reply(&routes)
            .await;
        assert_eq!(body(&response)["consultations"][0]["id"], id.as_str());

        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/consultation/{}", id))
            .reply(&routes)
            .await;
        assert_eq!(body(&response)["success"], true);

        let response = warp::test::request()
            .path("/api/consultation?customerId=cust-1")
            .reply(&routes)
            .await;
        assert_eq!(body(&response)["consultations"], json!([]));
    }

    #[tokio::test]
    async fn test_list_requires_customer_id() {
        let routes = all_routes(state(Arc::new(MemoryStore::default())).await);
        let response = warp::test::request().path("/api/consultation").reply(&routes).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&response)["error"], "고객 ID가 필요합니다.");
    }

    #[tokio::test]
    async fn test_create_requires_content() {
        let routes = all_routes(state(Arc::new(MemoryStore::default())).await);
        let response = warp::test::request()
            .method("POST")
            .path("/api/consultation")
            .json(&json!({ "customerId": "cust-1" }))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
