//! Shared identifier types and serde helpers.

/// Caller-assigned identifier of a work item, unique within a batch.
pub type UnitId = String;

/// Dispatch priority. Higher values dispatch earlier.
pub type Priority = i64;

/// Serialize a [`std::time::Duration`] as fractional milliseconds.
///
/// Use with `#[serde(rename = "..._ms", with = "crate::util::serde::duration_ms")]`.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `f64` milliseconds.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(crate::util::clock::as_millis_f64(*value))
    }

    /// Deserialize from `f64` milliseconds.
    ///
    /// # Errors
    ///
    /// Fails on negative or non-finite values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(serde::de::Error::custom)
    }
}
