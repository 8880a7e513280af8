use super::properties;
use super::{Page, RecordStore, RecordsError};
use serde_json::{json, Map, Value};

pub const DATE: &str = "날짜";

pub async fn get_daily_income(
    store: &dyn RecordStore,
    database_id: &str,
    date: &str,
) -> Result<Option<Page>, RecordsError> {
    let filter = json!({
        "property": DATE,
        "date": { "equals": date }
    });
    let pages = store.query(database_id, Some(filter)).await?;
    Ok(pages.into_iter().next())
}

/// Updates the entry for `date`, creating it when the day has none yet.
pub async fn save_daily_income(
    store: &dyn RecordStore,
    database_id: &str,
    date: &str,
    fields: Map<String, Value>,
) -> Result<Page, RecordsError> {
    match get_daily_income(store, database_id, date).await? {
        Some(existing) => {
            debug!("daily income {}: updating page {}", date, existing.id);
            store.update(&existing.id, Value::Object(fields)).await
        }
        None => {
            debug!("daily income {}: creating page", date);
            let mut fields = fields;
            fields.insert(DATE.to_string(), properties::date(Some(date)));
            store.create(database_id, Value::Object(fields)).await
        }
    }
}
