//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Deserializer};

/// Request body for POST /cache/invalidate
///
/// # Fields
/// - `entity`: entity name (`restaurant`, `menu-item`, ...) or namespace name
/// - `id`: id of the changed entity, if known
/// - `customer_id` / `restaurant_id`: owners of the changed entity, used by
///   menu item, order and review cascades
///
/// Ids may be sent as JSON strings or numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub entity: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub restaurant_id: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.entity.trim().is_empty() {
            return Some("Entity cannot be empty".to_string());
        }
        if self.id.as_deref().is_some_and(str::is_empty) {
            return Some("Id cannot be empty when given".to_string());
        }
        None
    }
}

// == Entity Ids ==
/// Entity id as it appears on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

/// Reads an optional id given either as a string or as a number.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(|id| match id {
        WireId::Text(text) => text,
        WireId::Number(number) => number.to_string(),
    }))
}
