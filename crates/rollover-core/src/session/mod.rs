pub mod store;
pub mod cookie_store;
pub mod finalizer;

#[cfg(feature = "memory-backend")]
pub mod memory_store;

use indexmap::IndexMap;
use serde_json::Value;

pub use finalizer::ManagedSession;
pub use store::{SessionDataStore, SessionStorage};

/// Session data, in insertion order.
pub type SessionData = IndexMap<String, Value>;

fn flash_name(name: &str) -> String {
    format!("__flash_{name}__")
}

/// A session: an id (empty when all state lives in the cookie) and its data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: String,
    data: SessionData,
}

impl Session {
    pub fn new(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Build a session from a decoded cookie or stored payload. Anything that
    /// is not a JSON object yields an empty session.
    pub fn from_value(id: impl Into<String>, value: Option<Value>) -> Self {
        let data = match value {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => SessionData::new(),
        };
        Self::new(id, data)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// The data as a JSON object, keys in insertion order.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn has(&self, name: &str) -> bool {
        self.data.contains_key(name) || self.data.contains_key(&flash_name(name))
    }

    /// Read a value. Flash values are removed by the read.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.data.get(name) {
            return Some(value.clone());
        }
        self.data.shift_remove(&flash_name(name))
    }

    /// Set a value. Overwriting keeps the key's original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(name.into(), value.into());
    }

    /// Set a value that is removed the first time it is read.
    pub fn flash(&mut self, name: &str, value: impl Into<Value>) {
        self.data.insert(flash_name(name), value.into());
    }

    pub fn unset(&mut self, name: &str) {
        self.data.shift_remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_new() {
        let session = Session::default();
        assert_eq!(session.id(), "");
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_set_get_unset() {
        let mut session = Session::default();
        session.set("user", "alice");
        assert!(session.has("user"));
        assert_eq!(session.get("user"), Some(json!("alice")));
        // plain reads are not consuming
        assert_eq!(session.get("user"), Some(json!("alice")));

        session.unset("user");
        assert!(!session.has("user"));
        assert_eq!(session.get("user"), None);
    }

    #[test]
    fn test_flash_consumed_on_read() {
        let mut session = Session::default();
        session.flash("notice", "saved");
        assert!(session.has("notice"));
        assert!(session.data().contains_key("__flash_notice__"));

        assert_eq!(session.get("notice"), Some(json!("saved")));
        assert!(!session.has("notice"));
        assert_eq!(session.get("notice"), None);
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_plain_value_shadows_flash() {
        let mut session = Session::default();
        session.flash("msg", "flash");
        session.set("msg", "plain");
        assert_eq!(session.get("msg"), Some(json!("plain")));
        assert!(session.data().contains_key("__flash_msg__"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut session = Session::default();
        session.set("b", 1);
        session.set("a", 2);
        session.set("b", 3);
        session.unset("a");
        session.set("c", 4);
        let keys: Vec<&str> = session.data().keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "c"]);
        assert_eq!(session.to_value().to_string(), r#"{"b":3,"c":4}"#);
    }

    #[test]
    fn test_from_value() {
        let session = Session::from_value("", Some(json!({"key": "value"})));
        assert_eq!(session.data().get("key"), Some(&json!("value")));

        assert!(Session::from_value("", Some(json!("text"))).data().is_empty());
        assert!(Session::from_value("", None).data().is_empty());
    }
}
