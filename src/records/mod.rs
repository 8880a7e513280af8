pub mod client;
pub mod consultation;
pub mod customer;
pub mod income;
#[cfg(test)]
pub mod memory;
pub mod properties;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub use client::RecordsClient;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("records service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("records service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable records service response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("page {0} not found")]
    NotFound(String),
}

/// A page of a records service database. Fields this service does not read are kept verbatim
/// so pages can be handed back to callers unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Page {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

pub type RecordFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RecordsError>> + Send + 'a>>;

/// The narrow slice of the records service this application talks to.
pub trait RecordStore: Send + Sync {
    /// All pages of `database_id` matching `filter`, across every result page.
    fn query<'a>(&'a self, database_id: &'a str, filter: Option<Value>) -> RecordFuture<'a, Vec<Page>>;

    fn create<'a>(&'a self, database_id: &'a str, properties: Value) -> RecordFuture<'a, Page>;

    fn retrieve<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page>;

    fn update<'a>(&'a self, page_id: &'a str, properties: Value) -> RecordFuture<'a, Page>;

    /// The records service has no hard delete; archived pages drop out of queries.
    fn archive<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page>;
}
