// the purchase desk persists two tables, employees and requests, as JSON records
//
// storage protocol:
// [table]/count -> count of records in table
// [table]/[i] -> record i, serialized as JSON
//
// record ids are their indexes. records are rewritten in place and never removed;
// an employee leaving is a flag on the record.
//
// writes should be mutually exclusive, but one write and some reads are allowed to be concurrent

use anyhow::{Context, Result};
use opendal::services::Sled;
use opendal::{ErrorKind, Operator};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EMPLOYEES: &str = "employees";
pub const REQUESTS: &str = "requests";

#[derive(Clone)]
pub struct Storage {
    pub operator: Operator,
}

impl Storage {
    pub fn new(datadir: &str) -> Result<Self> {
        let mut builder = Sled::default();
        builder.datadir(datadir);

        Ok(Storage {
            operator: Operator::new(builder)?.finish(),
        })
    }

    pub async fn count(&self, table: &str) -> Result<usize> {
        match self.operator.read(&(table.to_string() + "/count")).await {
            Ok(bytes) => usize_decode(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e).with_context(|| format!("reading {}/count", table)),
        }
    }

    /// Writes record `id`, extending the table count when `id` is new.
    pub async fn put<T: Serialize>(&self, table: &str, id: usize, record: &T) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        self.operator
            .write(&(table.to_string() + "/" + &id.to_string()), data)
            .await?;

        let count = self.count(table).await?;
        if id >= count {
            self.operator
                .write(&(table.to_string() + "/count"), (id + 1).to_be_bytes().to_vec())
                .await?;
        }
        debug!("store {}/{}", table, id);
        Ok(())
    }

    pub async fn load_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let count = self.count(table).await?;
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let path = table.to_string() + "/" + &i.to_string();
            let bytes = self
                .operator
                .read(&path)
                .await
                .with_context(|| format!("reading {}", path))?;
            let record = serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path))?;
            records.push(record);
        }
        Ok(records)
    }
}

fn usize_decode(data: &[u8]) -> Result<usize> {
    Ok(usize::from_be_bytes(data.try_into()?))
}

#[cfg(test)]
pub(crate) fn temp_datadir() -> String {
    std::env::temp_dir()
        .join(format!("clinic-desk-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        label: String,
    }

    fn row(label: &str) -> Row {
        Row {
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_and_load_all() {
        let storage = Storage::new(&temp_datadir()).unwrap();
        assert_eq!(storage.count(REQUESTS).await.unwrap(), 0);

        storage.put(REQUESTS, 0, &row("a")).await.unwrap();
        storage.put(REQUESTS, 1, &row("b")).await.unwrap();
        storage.put(REQUESTS, 0, &row("a2")).await.unwrap();

        assert_eq!(storage.count(REQUESTS).await.unwrap(), 2);
        assert_eq!(storage.count(EMPLOYEES).await.unwrap(), 0);
        let rows: Vec<Row> = storage.load_all(REQUESTS).await.unwrap();
        assert_eq!(rows, vec![row("a2"), row("b")]);
    }

    #[tokio::test]
    async fn test_missing_count_is_empty_table() {
        let storage = Storage::new(&temp_datadir()).unwrap();

        assert_eq!(storage.count(EMPLOYEES).await.unwrap(), 0);
        let rows: Vec<Row> = storage.load_all(EMPLOYEES).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_count_is_an_error() {
        let storage = Storage::new(&temp_datadir()).unwrap();
        storage
            .operator
            .write("employees/count", vec![1u8, 2, 3])
            .await
            .unwrap();

        assert!(storage.count(EMPLOYEES).await.is_err());
        assert!(storage.load_all::<Row>(EMPLOYEES).await.is_err());
    }
}
