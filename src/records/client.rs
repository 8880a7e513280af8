use super::{Page, RecordFuture, RecordStore, RecordsError};
use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct RecordsClient {
    http: Client,
    base_url: String,
    api_key: String,
    version: String,
}

impl RecordsClient {
    pub fn new(base_url: &str, api_key: &str, version: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            version: version.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RecordsError> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.version)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(RecordsError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).to_string(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl RecordsClient {
    async fn query_pages(&self, database_id: &str, filter: Option<Value>) -> Result<Vec<Page>, RecordsError> {
        let start = Instant::now();
        let url = self.url(&format!("databases/{}/query", database_id));
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(filter) = &filter {
                body["filter"] = filter.clone();
            }
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }
            let response: QueryResponse = self.send(self.http.post(&url).json(&body)).await?;
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        debug!(
            "query database {} returned {} pages in {}s",
            database_id,
            pages.len(),
            elapsed
        );
        Ok(pages)
    }

    async fn create_page(&self, database_id: &str, properties: Value) -> Result<Page, RecordsError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
        });
        let page: Page = self.send(self.http.post(self.url("pages")).json(&body)).await?;
        debug!("created page {} in database {}", page.id, database_id);
        Ok(page)
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Page, RecordsError> {
        let url = self.url(&format!("pages/{}", page_id));
        self.send(self.http.get(url)).await.map_err(not_found(page_id))
    }

    async fn update_page(&self, page_id: &str, properties: Value) -> Result<Page, RecordsError> {
        let url = self.url(&format!("pages/{}", page_id));
        let body = json!({ "properties": properties });
        let page: Page = self
            .send(self.http.patch(url).json(&body))
            .await
            .map_err(not_found(page_id))?;
        debug!("updated page {}", page.id);
        Ok(page)
    }

    async fn archive_page(&self, page_id: &str) -> Result<Page, RecordsError> {
        let url = self.url(&format!("pages/{}", page_id));
        let body = json!({ "archived": true });
        let page: Page = self
            .send(self.http.patch(url).json(&body))
            .await
            .map_err(not_found(page_id))?;
        debug!("archived page {}", page.id);
        Ok(page)
    }
}

fn not_found(page_id: &str) -> impl FnOnce(RecordsError) -> RecordsError + '_ {
    move |e| match e {
        RecordsError::Status { status: 404, .. } => RecordsError::NotFound(page_id.to_string()),
        other => other,
    }
}

impl RecordStore for RecordsClient {
    fn query<'a>(&'a self, database_id: &'a str, filter: Option<Value>) -> RecordFuture<'a, Vec<Page>> {
        Box::pin(self.query_pages(database_id, filter))
    }

    fn create<'a>(&'a self, database_id: &'a str, properties: Value) -> RecordFuture<'a, Page> {
        Box::pin(self.create_page(database_id, properties))
    }

    fn retrieve<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page> {
        Box::pin(self.retrieve_page(page_id))
    }

    fn update<'a>(&'a self, page_id: &'a str, properties: Value) -> RecordFuture<'a, Page> {
        Box::pin(self.update_page(page_id, properties))
    }

    fn archive<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page> {
        Box::pin(self.archive_page(page_id))
    }
}
