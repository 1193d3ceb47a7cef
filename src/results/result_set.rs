use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::row::Row;
use crate::types::RowValues;

/// Rows returned by a statement, plus the affected-row count for DML.
///
/// An empty result set is a valid outcome, not an error. Serializes as a JSON
/// array of `{column: value}` objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Row>,
    /// Rows touched by a DML statement, or the number of rows read
    pub rows_affected: u64,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column_names: Vec<String> = columns.into_iter().map(Into::into).collect();
        let column_index = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            results: Vec::new(),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index: Arc::new(column_index),
        }
    }

    /// Result of a statement that returns no rows.
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get_column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Append a row. Missing trailing values are padded with `Null` and
    /// extra values are dropped so every row matches the column list.
    pub fn add_row_values(&mut self, mut row_values: Vec<RowValues>) {
        row_values.resize(self.column_names.len(), RowValues::Null);
        self.results.push(Row {
            column_names: Arc::clone(&self.column_names),
            column_index: Arc::clone(&self.column_index),
            values: row_values,
        });
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.results.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.results.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.results.len()))?;
        for row in &self.results {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn branches() -> ResultSet {
        let mut rs = ResultSet::with_columns(["id", "name"]);
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("Airport".into())]);
        rs.add_row_values(vec![RowValues::Int(2)]);
        rs
    }

    #[test]
    fn rows_are_addressable_by_name() {
        let rs = branches();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.rows_affected, 2);
        let first = rs.first().unwrap();
        assert_eq!(first.get("name").and_then(RowValues::as_text), Some("Airport"));
        assert_eq!(first.get("missing"), None);
        assert_eq!(rs.results[1].get("name"), Some(&RowValues::Null));
    }

    #[test]
    fn serializes_as_array_of_objects() {
        assert_eq!(
            serde_json::to_value(branches()).unwrap(),
            json!([{"id": 1, "name": "Airport"}, {"id": 2, "name": null}])
        );
    }

    #[test]
    fn empty_and_dml_results_serialize_as_empty_arrays() {
        assert_eq!(serde_json::to_value(ResultSet::default()).unwrap(), json!([]));
        let dml = ResultSet::affected(3);
        assert!(dml.is_empty());
        assert_eq!(dml.rows_affected, 3);
    }
}
