// in-process stand-in for the records service, understanding the single-property
// filters this application sends.

use super::properties::plain_text;
use super::{Page, RecordFuture, RecordStore, RecordsError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::ready;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<BTreeMap<String, (String, Page)>>,
    order: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

impl MemoryStore {
    pub fn insert(&self, database_id: &str, page: Page) {
        self.order.lock().unwrap().push(page.id.clone());
        self.pages
            .lock()
            .unwrap()
            .insert(page.id.clone(), (database_id.to_string(), page));
    }

    pub fn page(&self, page_id: &str) -> Option<Page> {
        self.pages.lock().unwrap().get(page_id).map(|(_, p)| p.clone())
    }

    fn check(&self) -> Result<(), RecordsError> {
        if *self.fail.lock().unwrap() {
            return Err(RecordsError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn matches(page: &Page, filter: &Value) -> bool {
    let Some(property) = filter.get("property").and_then(Value::as_str) else {
        return true;
    };
    let value = page.property(property);

    if let Some(condition) = filter.get("rich_text") {
        let text = value.and_then(plain_text).unwrap_or_default();
        if condition.get("is_not_empty").is_some() {
            return !text.is_empty();
        }
        if let Some(needle) = condition.get("contains").and_then(Value::as_str) {
            return text.contains(needle);
        }
    }
    if let Some(needle) = filter.pointer("/phone_number/contains").and_then(Value::as_str) {
        return value
            .and_then(|v| v.get("phone_number"))
            .and_then(Value::as_str)
            .map_or(false, |phone| phone.contains(needle));
    }
    if let Some(expected) = filter.pointer("/select/equals") {
        return value.and_then(|v| v.pointer("/select/name")) == Some(expected);
    }
    if let Some(expected) = filter.pointer("/date/equals") {
        return value.and_then(|v| v.pointer("/date/start")) == Some(expected);
    }
    if let Some(expected) = filter.pointer("/relation/contains") {
        return value
            .and_then(|v| v.get("relation"))
            .and_then(Value::as_array)
            .map_or(false, |links| links.iter().any(|l| l.get("id") == Some(expected)));
    }
    false
}

impl MemoryStore {
    fn query_now(&self, database_id: &str, filter: Option<Value>) -> Result<Vec<Page>, RecordsError> {
        self.check()?;
        let pages = self.pages.lock().unwrap();
        let order = self.order.lock().unwrap();
        Ok(order
            .iter()
            .filter_map(|id| pages.get(id))
            .filter(|(db, page)| db == database_id && !page.archived)
            .filter(|(_, page)| filter.as_ref().map_or(true, |f| matches(page, f)))
            .map(|(_, page)| page.clone())
            .collect())
    }

    fn create_now(&self, database_id: &str, properties: Value) -> Result<Page, RecordsError> {
        self.check()?;
        let page = Page {
            id: uuid::Uuid::new_v4().to_string(),
            archived: false,
            properties: match properties {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            extra: Map::new(),
        };
        self.insert(database_id, page.clone());
        Ok(page)
    }

    fn retrieve_now(&self, page_id: &str) -> Result<Page, RecordsError> {
        self.check()?;
        self.page(page_id)
            .ok_or_else(|| RecordsError::NotFound(page_id.to_string()))
    }

    fn update_now(&self, page_id: &str, properties: Value) -> Result<Page, RecordsError> {
        self.check()?;
        let mut pages = self.pages.lock().unwrap();
        let (_, page) = pages
            .get_mut(page_id)
            .ok_or_else(|| RecordsError::NotFound(page_id.to_string()))?;
        if let Value::Object(map) = properties {
            page.properties.extend(map);
        }
        Ok(page.clone())
    }

    fn archive_now(&self, page_id: &str) -> Result<Page, RecordsError> {
        self.check()?;
        let mut pages = self.pages.lock().unwrap();
        let (_, page) = pages
            .get_mut(page_id)
            .ok_or_else(|| RecordsError::NotFound(page_id.to_string()))?;
        page.archived = true;
        Ok(page.clone())
    }
}

impl RecordStore for MemoryStore {
    fn query<'a>(&'a self, database_id: &'a str, filter: Option<Value>) -> RecordFuture<'a, Vec<Page>> {
        Box::pin(ready(self.query_now(database_id, filter)))
    }

    fn create<'a>(&'a self, database_id: &'a str, properties: Value) -> RecordFuture<'a, Page> {
        Box::pin(ready(self.create_now(database_id, properties)))
    }

    fn retrieve<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page> {
        Box::pin(ready(self.retrieve_now(page_id)))
    }

    fn update<'a>(&'a self, page_id: &'a str, properties: Value) -> RecordFuture<'a, Page> {
        Box::pin(ready(self.update_now(page_id, properties)))
    }

    fn archive<'a>(&'a self, page_id: &'a str) -> RecordFuture<'a, Page> {
        Box::pin(ready(self.archive_now(page_id)))
    }
}
