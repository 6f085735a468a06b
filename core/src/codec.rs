//! Serde codec for [`JsonEntity`] types.
//!
//! Entities serialize as exactly their JSON object: no envelope and no type
//! tag. Deserialization decodes a generic object first and hands it to the
//! target type's [`JsonEntity::from_map`], so the concrete type is always the
//! one the caller asked for.
//!
//! The functions here back [`json_entity!`](crate::json_entity) and can also
//! be used directly on fields:
//!
//! ```
//! use jsondata_core::{JsonBean, JsonEntity};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Envelope {
//!     #[serde(with = "jsondata_core::codec")]
//!     payload: JsonBean,
//! }
//!
//! let envelope: Envelope = serde_json::from_str(r#"{"payload":{"n":1}}"#).unwrap();
//! assert_eq!(envelope.payload.get_i64("n"), Some(1));
//! ```
//!
//! Integers are decoded into `serde_json`'s 64-bit representation and are
//! never narrowed, so values up to `i64::MAX` (and `u64::MAX` for unsigned
//! input) survive a round trip.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entity::{JsonEntity, JsonMap};

/// Write an entity as its bare JSON object.
///
/// # Errors
///
/// Returns the serializer's error if writing fails.
pub fn serialize<E, S>(entity: &E, serializer: S) -> Result<S::Ok, S::Error>
where
    E: JsonEntity,
    S: Serializer,
{
    entity.as_map().serialize(serializer)
}

/// Read a JSON object and build the requested entity type from it.
///
/// # Errors
///
/// Returns the deserializer's error if the input is not a JSON object.
pub fn deserialize<'de, E, D>(deserializer: D) -> Result<E, D::Error>
where
    E: JsonEntity,
    D: Deserializer<'de>,
{
    JsonMap::deserialize(deserializer).map(E::from_map)
}
