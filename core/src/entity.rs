//! JSON entities.
//!
//! An entity is a thin wrapper around an ordered JSON object. Concrete entity
//! types carry no state of their own: two entities are equal when their maps
//! are equal, and any entity can be rebuilt from a decoded map through
//! [`JsonEntity::from_map`].

use serde_json::{Map, Value};

/// Ordered JSON object backing every entity.
pub type JsonMap = Map<String, Value>;

/// A value that is nothing more than a JSON object.
///
/// Implementors opt into the serde codec with [`json_entity!`](crate::json_entity),
/// which makes them serialize as their map and deserialize through
/// [`from_map`](JsonEntity::from_map).
///
/// # Examples
///
/// ```
/// use jsondata_core::{json_entity, JsonEntity, JsonMap};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Order(JsonMap);
///
/// impl JsonEntity for Order {
///     fn from_map(map: JsonMap) -> Self {
///         Self(map)
///     }
///
///     fn as_map(&self) -> &JsonMap {
///         &self.0
///     }
///
///     fn into_map(self) -> JsonMap {
///         self.0
///     }
/// }
///
/// json_entity!(Order);
///
/// let order: Order = serde_json::from_str(r#"{"id":42}"#).unwrap();
/// assert_eq!(order.get_i64("id"), Some(42));
/// ```
pub trait JsonEntity: Sized {
    /// Build the entity from a decoded JSON object.
    fn from_map(map: JsonMap) -> Self;

    /// Borrow the underlying JSON object.
    fn as_map(&self) -> &JsonMap;

    /// Consume the entity and return its JSON object.
    fn into_map(self) -> JsonMap;

    /// Look up a top-level field.
    fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().get(key)
    }

    /// Look up a top-level string field.
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Look up a top-level integer field.
    ///
    /// Integers are kept as 64-bit values by the decoder, so anything that
    /// fits in an `i64` comes back exactly.
    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Look up a top-level boolean field.
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Whether the object has the given top-level field.
    fn contains(&self, key: &str) -> bool {
        self.as_map().contains_key(key)
    }

    /// Copy the entity into a standalone JSON value.
    fn to_value(&self) -> Value {
        Value::Object(self.as_map().clone())
    }
}

/// General-purpose entity for payloads without a dedicated type.
///
/// # Examples
///
/// ```
/// use jsondata_core::{JsonBean, JsonEntity};
///
/// let bean = JsonBean::new().put_string("name", "Ada").put("age", 36);
/// assert_eq!(bean.get_str("name"), Some("Ada"));
/// assert_eq!(bean.get_i64("age"), Some(36));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonBean(JsonMap);

impl JsonBean {
    /// Create an empty bean.
    #[must_use]
    pub fn new() -> Self {
        Self(JsonMap::new())
    }

    /// Set a field, replacing any previous value under the same key.
    #[must_use]
    pub fn put(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a string field.
    #[must_use]
    pub fn put_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, Value::String(value.into()))
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bean has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl JsonEntity for JsonBean {
    fn from_map(map: JsonMap) -> Self {
        Self(map)
    }

    fn as_map(&self) -> &JsonMap {
        &self.0
    }

    fn into_map(self) -> JsonMap {
        self.0
    }
}

impl From<JsonMap> for JsonBean {
    fn from(map: JsonMap) -> Self {
        Self(map)
    }
}

impl From<JsonBean> for JsonMap {
    fn from(bean: JsonBean) -> Self {
        bean.0
    }
}

crate::json_entity!(JsonBean);

/// Implement `Serialize` and `Deserialize` for one or more [`JsonEntity`] types
/// through the [`codec`](crate::codec).
///
/// The generated impls write the entity as its bare JSON object and rebuild
/// the exact type via [`JsonEntity::from_map`] when reading.
#[macro_export]
macro_rules! json_entity {
    ($($entity:ty),+ $(,)?) => {
        $(
            impl $crate::__private::serde::Serialize for $entity {
                fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
                where
                    S: $crate::__private::serde::Serializer,
                {
                    $crate::codec::serialize(self, serializer)
                }
            }

            impl<'de> $crate::__private::serde::Deserialize<'de> for $entity {
                fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
                where
                    D: $crate::__private::serde::Deserializer<'de>,
                {
                    $crate::codec::deserialize(deserializer)
                }
            }
        )+
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_is_by_content() {
        let left = JsonBean::new().put_string("foo", "FOO");
        let right = JsonBean::from_map(json!({"foo": "FOO"}).as_object().unwrap().clone());

        assert_eq!(left, right);
        assert_ne!(left, JsonBean::new().put_string("foo", "BAR"));
    }

    #[test]
    fn test_put_replaces_existing_key() {
        let bean = JsonBean::new().put("count", 1).put("count", 2);

        assert_eq!(bean.len(), 1);
        assert_eq!(bean.get_i64("count"), Some(2));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let bean = JsonBean::new().put("b", 1).put("a", 2).put("c", 3);

        let keys: Vec<&str> = bean.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_typed_accessors() {
        let bean = JsonBean::new()
            .put_string("name", "widget")
            .put("active", true)
            .put("nested", json!({"x": 1}));

        assert_eq!(bean.get_str("name"), Some("widget"));
        assert_eq!(bean.get_bool("active"), Some(true));
        assert_eq!(bean.get_i64("name"), None);
        assert!(bean.contains("nested"));
        assert!(!bean.contains("missing"));
    }

    #[test]
    fn test_to_value_wraps_map() {
        let bean = JsonBean::new().put_string("foo", "FOO");

        assert_eq!(bean.to_value(), json!({"foo": "FOO"}));
        assert_eq!(JsonMap::from(bean.clone()), bean.into_map());
    }
}
