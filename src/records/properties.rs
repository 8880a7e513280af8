// builders and readers for records service property values.
//
// a text property is an array of segments, each holding at most TEXT_LIMIT characters:
// { "rich_text": [ { "type": "text", "text": { "content": "..." } }, ... ] }

use serde_json::{json, Value};

pub const TEXT_LIMIT: usize = 2000;

fn segments(content: &str) -> Vec<Value> {
    let chars = content.chars().collect::<Vec<_>>();
    chars
        .chunks(TEXT_LIMIT)
        .map(|chunk| {
            json!({
                "type": "text",
                "text": { "content": chunk.iter().collect::<String>() }
            })
        })
        .collect()
}

pub fn rich_text(content: &str) -> Value {
    json!({ "rich_text": segments(content) })
}

pub fn optional_rich_text(content: Option<&str>) -> Value {
    rich_text(content.unwrap_or_default())
}

pub fn title(content: &str) -> Value {
    json!({ "title": segments(content) })
}

pub fn phone_number(phone: Option<&str>) -> Value {
    json!({ "phone_number": phone })
}

pub fn select(name: Option<&str>) -> Value {
    json!({ "select": name.map(|name| json!({ "name": name })) })
}

pub fn date(start: Option<&str>) -> Value {
    json!({ "date": start.map(|start| json!({ "start": start })) })
}

pub fn number(value: Option<i64>) -> Value {
    json!({ "number": value })
}

pub fn relation(page_id: &str) -> Value {
    json!({ "relation": [{ "id": page_id }] })
}

pub fn external_file(name: &str, url: &str) -> Value {
    json!({
        "type": "external",
        "name": name,
        "external": { "url": url }
    })
}

pub fn files(files: Vec<Value>) -> Value {
    json!({ "files": files })
}

/// Joined text of a rich text or title property; `None` when empty or not a text property.
pub fn plain_text(property: &Value) -> Option<String> {
    let segments = property
        .get("rich_text")
        .or_else(|| property.get("title"))?
        .as_array()?;
    let text = segments
        .iter()
        .filter_map(|segment| {
            segment
                .pointer("/text/content")
                .or_else(|| segment.get("plain_text"))
                .and_then(Value::as_str)
        })
        .collect::<String>();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Entries of a files property, or nothing when the property is absent or malformed.
pub fn file_list(property: Option<&Value>) -> Vec<Value> {
    property
        .and_then(|p| p.get("files"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
