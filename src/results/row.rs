use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::RowValues;

/// A single row of a [`ResultSet`](super::ResultSet).
///
/// Column names and the name-to-index lookup are shared by every row of the
/// same result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) column_names: Arc<Vec<String>>,
    pub(crate) column_index: Arc<HashMap<String, usize>>,
    pub(crate) values: Vec<RowValues>,
}

impl Row {
    /// Column names in select order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get a value by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.column_names.iter().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
