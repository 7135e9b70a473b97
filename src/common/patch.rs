// src/common/patch.rs

use serde::{Deserialize, Deserializer};

/// Para PATCH: distingue "campo ausente" (`None`) de "campo null" (`Some(None)`).
/// Use junto com `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
