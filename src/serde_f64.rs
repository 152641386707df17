//! Serde helper for `f64` fields that may hold inf or NaN
//!
//! JSON has no non-finite numbers and `serde_json` writes them as `null`,
//! which cannot be read back into an `f64`. Fields using
//! `#[serde(with = "crate::serde_f64")]` write finite values as numbers and
//! non-finite ones as the strings `"inf"`, `"-inf"` and `"NaN"`.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => text
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_finite())
            .ok_or_else(|| {
                D::Error::custom(format!("expected a number, inf or NaN, got {text:?}"))
            }),
    }
}
