use tiberius::Query;

use crate::types::RowValues;

/// Bind values in ordinal order, so the `n`-th value fills `@P{n}`.
///
/// Values travel as typed RPC parameters; nothing is spliced into the SQL text.
pub fn bind_params<'a>(query: &mut Query<'a>, params: &[&RowValues]) {
    for param in params {
        match param {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Timestamp(dt) => query.bind(*dt),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::JSON(value) => query.bind(value.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
        }
    }
}
