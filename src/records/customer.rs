use super::properties::{self, plain_text};
use super::{Page, RecordStore, RecordsError};
use crate::face::{resolve, Candidate, FeatureSummary, RawFeatureSummary, SummaryError};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const NAME: &str = "고객명";
pub const CUSTOMER_ID: &str = "id";
pub const PHONE: &str = "전화번호";
pub const GENDER: &str = "성별";
pub const BIRTH: &str = "생년월일";
pub const ESTIMATED_AGE: &str = "추정나이";
pub const ADDRESS: &str = "주소";
pub const FOLDER_ID: &str = "customerFolderId";
pub const SPECIAL_NOTE: &str = "특이사항";
pub const PHOTO: &str = "사진";
pub const FACE_EMBEDDING: &str = "얼굴_임베딩";

/// External photo links longer than this are rejected by the records service.
pub const MAX_PHOTO_URL_LEN: usize = 2000;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerSearch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
}

impl CustomerSearch {
    /// Name wins over phone, phone over gender. `None` when nothing usable was given.
    pub fn filter(&self) -> Option<Value> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        if let Some(name) = non_empty(&self.name) {
            return Some(json!({ "property": NAME, "rich_text": { "contains": name } }));
        }
        if let Some(phone) = non_empty(&self.phone) {
            return Some(json!({ "property": PHONE, "phone_number": { "contains": phone } }));
        }
        non_empty(&self.gender)
            .map(|gender| json!({ "property": GENDER, "select": { "equals": gender } }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
    pub face_embedding: Option<Value>,
}

impl NewCustomer {
    pub fn properties(&self) -> Value {
        let mut props = Map::new();
        props.insert(NAME.to_string(), properties::rich_text(&self.name));

        if let Some(phone) = present(&self.phone) {
            props.insert(PHONE.to_string(), properties::phone_number(Some(phone)));
        }
        if let Some(gender) = present(&self.gender) {
            props.insert(GENDER.to_string(), properties::select(Some(gender)));
        }
        if let Some(birth) = present(&self.birth) {
            props.insert(BIRTH.to_string(), properties::date(Some(birth)));
        }
        if let Some(address) = present(&self.address) {
            props.insert(ADDRESS.to_string(), properties::rich_text(address));
        }
        if let Some(url) = present(&self.photo_url) {
            if url.len() <= MAX_PHOTO_URL_LEN {
                let file = properties::external_file(&format!("{}_photo.jpg", self.name), url);
                props.insert(PHOTO.to_string(), properties::files(vec![file]));
            } else {
                warn!("photo url too long ({} chars), not stored", url.len());
            }
        }
        if let Some(embedding) = self.face_embedding.as_ref().and_then(embedding_text) {
            props.insert(FACE_EMBEDDING.to_string(), properties::rich_text(&embedding));
        }

        Value::Object(props)
    }
}

/// Full replacement of the editable customer fields; absent fields are cleared.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    #[serde(default)]
    pub name: String,
    pub customer_id: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth: Option<String>,
    pub estimated_age: Option<Value>,
    pub address: Option<String>,
    pub customer_folder_id: Option<String>,
    pub special_note: Option<String>,
}

impl CustomerUpdate {
    pub fn properties(&self) -> Value {
        json!({
            CUSTOMER_ID: properties::title(self.customer_id.as_deref().unwrap_or_default()),
            NAME: properties::rich_text(&self.name),
            PHONE: properties::phone_number(present(&self.phone)),
            GENDER: properties::select(present(&self.gender)),
            BIRTH: properties::date(present(&self.birth)),
            ESTIMATED_AGE: properties::number(self.estimated_age.as_ref().and_then(leading_integer)),
            ADDRESS: properties::optional_rich_text(present(&self.address)),
            FOLDER_ID: properties::optional_rich_text(present(&self.customer_folder_id)),
            SPECIAL_NOTE: properties::optional_rich_text(present(&self.special_note)),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A face embedding arrives either already serialized or as a JSON value.
pub fn embedding_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Integer prefix of a number or numeric string, e.g. "34세" -> 34.
fn leading_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64),
        Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let digits = digits
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>();
            digits.parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

pub async fn search(
    store: &dyn RecordStore,
    database_id: &str,
    search: &CustomerSearch,
) -> Result<Vec<Page>, RecordsError> {
    match search.filter() {
        Some(filter) => store.query(database_id, Some(filter)).await,
        None => Ok(vec![]),
    }
}

/// Customers that have a stored face embedding.
pub async fn fetch_candidates_with_embedding(
    store: &dyn RecordStore,
    database_id: &str,
) -> Result<Vec<Page>, RecordsError> {
    let filter = json!({
        "property": FACE_EMBEDDING,
        "rich_text": { "is_not_empty": true }
    });
    store.query(database_id, Some(filter)).await
}

/// The customer's name, or the page id when the name is missing or malformed.
pub fn display_name(page: &Page) -> String {
    page.property(NAME)
        .and_then(plain_text)
        .unwrap_or_else(|| page.id.clone())
}

impl Candidate for Page {
    fn id(&self) -> &str {
        &self.id
    }

    fn stored_summary(&self) -> Result<FeatureSummary, SummaryError> {
        let text = self
            .property(FACE_EMBEDDING)
            .and_then(plain_text)
            .ok_or(SummaryError::Missing)?;
        let raw = RawFeatureSummary::parse(&text)?;
        Ok(resolve(&raw))
    }

    fn label(&self) -> String {
        display_name(self)
    }
}
