use std::rc::Rc;

use serde_json::Value;

use crate::error::DatasetError;
use crate::limits::MAX_RECORDS;
use crate::model::Record;

/// The loaded records. Cloning shares the same immutable slice.
#[derive(Clone, Debug, Default)]
pub struct DataStore {
    records: Rc<[Record]>,
}

impl DataStore {
    pub fn new(records: Vec<Record>) -> Self {
        DataStore {
            records: records.into(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, DatasetError> {
        let v: Value = serde_json::from_str(s)?;
        Self::from_json_value(v)
    }

    pub fn from_json_value(v: Value) -> Result<Self, DatasetError> {
        let items = match v {
            Value::Array(items) => items,
            _ => return Err(DatasetError::NotAnArray),
        };
        if items.len() > MAX_RECORDS {
            return Err(DatasetError::TooManyRecords {
                count: items.len(),
                max: MAX_RECORDS,
            });
        }
        let mut records = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            // Non-object rows carry no fields; keep positions stable with an empty record.
            if !item.is_object() {
                skipped += 1;
                records.push(Record::default());
                continue;
            }
            records.push(serde_json::from_value(item)?);
        }
        if skipped > 0 {
            log::warn!("dataset: {} non-object rows loaded as empty records", skipped);
        }
        log::info!("dataset: {} tramos loaded", records.len());
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn shared(&self) -> Rc<[Record]> {
        Rc::clone(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }
}
