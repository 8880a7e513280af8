use super::properties::{self, file_list};
use super::{Page, RecordStore, RecordsError};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const CONTENT: &str = "상담내용";
pub const DATE: &str = "상담일자";
pub const MEDICINE: &str = "처방약";
pub const RESULT: &str = "결과";
pub const IMAGES: &str = "증상이미지";
pub const CUSTOMER: &str = "고객";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationNote {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub content: String,
    pub consult_date: Option<String>,
    pub medicine: Option<String>,
    pub result: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl ConsultationNote {
    /// Properties for the fields that were supplied. Images are handled separately.
    fn text_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(CONTENT.to_string(), properties::rich_text(&self.content));
        if let Some(date) = present(&self.consult_date) {
            props.insert(DATE.to_string(), properties::date(Some(date)));
        }
        if let Some(medicine) = present(&self.medicine) {
            props.insert(MEDICINE.to_string(), properties::rich_text(medicine));
        }
        if let Some(result) = present(&self.result) {
            props.insert(RESULT.to_string(), properties::rich_text(result));
        }
        props
    }

    fn images(&self, prefix: &str) -> Vec<Value> {
        self.image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| properties::external_file(&format!("{}_{}.jpg", prefix, i + 1), url))
            .collect()
    }

    pub fn create_properties(&self) -> Value {
        let mut props = self.text_properties();
        if !self.customer_id.is_empty() {
            props.insert(CUSTOMER.to_string(), properties::relation(&self.customer_id));
        }
        let images = self.images("이미지");
        if !images.is_empty() {
            props.insert(IMAGES.to_string(), properties::files(images));
        }
        Value::Object(props)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub async fn list_for_customer(
    store: &dyn RecordStore,
    database_id: &str,
    customer_id: &str,
) -> Result<Vec<Page>, RecordsError> {
    let filter = json!({
        "property": CUSTOMER,
        "relation": { "contains": customer_id }
    });
    store.query(database_id, Some(filter)).await
}

pub async fn create(
    store: &dyn RecordStore,
    database_id: &str,
    note: &ConsultationNote,
) -> Result<Page, RecordsError> {
    store.create(database_id, note.create_properties()).await
}

/// Updates the supplied fields. New image URLs are appended after the images already on the page.
pub async fn update(
    store: &dyn RecordStore,
    page_id: &str,
    note: &ConsultationNote,
) -> Result<Page, RecordsError> {
    let mut props = note.text_properties();

    let new_images = note.images("새로운_이미지");
    if !new_images.is_empty() {
        let current = store.retrieve(page_id).await?;
        let mut images = file_list(current.property(IMAGES));
        debug!(
            "consultation {}: appending {} images to {}",
            page_id,
            new_images.len(),
            images.len()
        );
        images.extend(new_images);
        props.insert(IMAGES.to_string(), properties::files(images));
    }

    store.update(page_id, Value::Object(props)).await
}
