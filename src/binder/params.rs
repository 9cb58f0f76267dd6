use rusqlite::types::Value;

use crate::error::SqlTemplateError;
use crate::types::RowValues;

/// Convert a single argument to the driver's native value.
///
/// Only the representations SQLite lacks are translated: booleans become integers,
/// timestamps become ISO-8601 text, JSON becomes its serialized text.
///
/// # Errors
/// Returns `SqlTemplateError::BindingError` for non-finite floats, which SQLite would
/// otherwise store as NULL.
pub fn to_sqlite_value(position: usize, value: &RowValues) -> Result<Value, SqlTemplateError> {
    let converted = match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) if !f.is_finite() => {
            return Err(SqlTemplateError::BindingError(format!(
                "argument {position} is a non-finite float ({f}) and cannot be bound"
            )));
        }
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    };
    Ok(converted)
}

/// Convert every argument, keeping argument order.
///
/// # Errors
/// Returns the first `BindingError` raised by [`to_sqlite_value`].
pub fn convert_args(args: &[RowValues]) -> Result<Vec<Value>, SqlTemplateError> {
    args.iter()
        .enumerate()
        .map(|(idx, value)| to_sqlite_value(idx + 1, value))
        .collect()
}
