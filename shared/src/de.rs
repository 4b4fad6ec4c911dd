use serde::{Deserialize, Deserializer};
use serde_json::Value;

// Form-backed fields (age, weight) arrive either as JSON numbers or as strings
pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("Invalid numeric string: {}", s))
            })
        }
        Some(_) => Err(serde::de::Error::custom("Expected number or string")),
    }
}

pub(crate) fn optional_whole<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_number(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u32))
}

// Progress percentages are taken as sent; fractional values are rounded
pub(crate) fn lenient_int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .or_else(|| n.as_f64().map(|f| f.round() as i32))
            .ok_or_else(|| serde::de::Error::custom("Invalid number")),
        Value::Null => Ok(0),
        _ => Err(serde::de::Error::custom("Expected number")),
    }
}

// Optional server fields may be sent as an explicit `null` instead of being omitted
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
