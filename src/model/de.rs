//! Lenient deserialization helpers for snapshot payloads
use serde::{Deserialize, Deserializer};

/// Deserialize an `Option<T>`, turning an explicit `null` into `T::default()`
pub fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let opt: Option<T> = Deserialize::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
