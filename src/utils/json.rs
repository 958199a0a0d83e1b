use chrono::NaiveDate;
use serde_json::Value;

pub enum NullableValue<T> {
    Omitted,
    Null,
    Value(T),
}

/// Reads an optional `YYYY-MM-DD` field where `null` and `""` both mean "clear".
pub fn classify_nullable_date(optional_value: Option<&Value>) -> Result<NullableValue<NaiveDate>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(NullableValue::Null),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(NullableValue::Value)
            .map_err(|_| format!("expected a YYYY-MM-DD date, got {s:?}")),
        Some(other) => Err(format!("expected date string or null, got {other}")),
    }
}
