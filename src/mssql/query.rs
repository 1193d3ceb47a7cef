use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{ColumnData, FromSql, Query};

use super::manager::MssqlClient;
use super::params::bind_params;
use crate::error::DalError;
use crate::query::QueryDescriptor;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Run `descriptor` on `client` and collect its outcome.
///
/// Row-returning statements yield the first result set; DML statements yield
/// an empty set carrying the affected-row count.
///
/// # Errors
/// Returns the classified driver error, or `DalError::ParameterError` if the
/// descriptor's parameters cannot be resolved.
pub async fn run(
    client: &mut MssqlClient,
    descriptor: &QueryDescriptor,
) -> Result<ResultSet, DalError> {
    let statement = descriptor.prepare()?;
    let mut query = Query::new(statement.sql);
    bind_params(&mut query, &statement.params);

    if !descriptor.returns_rows() {
        let outcome = query.execute(client).await?;
        return Ok(ResultSet::affected(outcome.rows_affected().iter().sum()));
    }

    let mut stream = query.query(client).await?;
    let names: Vec<String> = match stream.columns().await? {
        Some(columns) => columns.iter().map(|c| c.name().to_string()).collect(),
        None => Vec::new(),
    };
    let rows = stream.into_first_result().await?;

    let mut result_set = ResultSet::with_columns(names);
    for row in rows {
        let values = row
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// Convert one column value into a [`RowValues`].
pub(crate) fn convert(data: ColumnData<'static>) -> Result<RowValues, DalError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.map(|s| RowValues::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| RowValues::Blob(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(f64::from(n))),
        ColumnData::Xml(v) => v.map(|x| RowValues::Text(x.into_owned().into_string())),
        ColumnData::Date(_) => NaiveDate::from_sql(&data)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(RowValues::Timestamp),
        ColumnData::Time(_) => {
            NaiveTime::from_sql(&data)?.map(|t| RowValues::Text(t.to_string()))
        }
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(&data)?
            .map(|dt| RowValues::Text(dt.to_rfc3339())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)?.map(RowValues::Timestamp)
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}
