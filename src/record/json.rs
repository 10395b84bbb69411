//! JSON object records
//!
//! Lets `serde_json::Value` objects flow through the engine, which is what
//! the CLI loads from disk.

use std::borrow::Cow;

use serde_json::Value;

use super::{CellValue, Columns, TableRecord};

impl TableRecord for Value {
    /// The `"id"` field, as a string or a stringified number
    fn record_id(&self) -> Cow<'_, str> {
        match self.get("id") {
            Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
            Some(Value::Number(n)) => Cow::Owned(n.to_string()),
            _ => Cow::Borrowed(""),
        }
    }
}

/// Build accessors reading top-level object fields by name
///
/// Missing fields read as `Null`.
pub fn json_columns<I, S>(fields: I) -> Columns<Value>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().fold(Columns::new(), |columns, field| {
        let field: String = field.into();
        let key = field.clone();
        columns.column(field, move |record: &Value| {
            record.get(&key).map(CellValue::from).unwrap_or(CellValue::Null)
        })
    })
}
