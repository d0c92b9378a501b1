//! Update metadata carried with every store notification.
//!
//! [`UpdateOptions`] is an opaque key-value map supplied by the host with
//! each change. Three keys have meaning to the stores:
//!
//! - `action`: `"subscribe"`, `"delete"`, or `"update"`.
//! - `data`: host-defined payload (`null` for store-generated notices).
//! - `renderContext`: host render context such as `"createItem"`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

const ACTION_KEY: &str = "action";
const DATA_KEY: &str = "data";
const RENDER_CONTEXT_KEY: &str = "renderContext";

/// Kind of notification delivered to a document subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Immediate delivery of the current value on subscription.
    Subscribe,
    /// The held document was removed from its collection.
    Delete,
    /// Generic update broadcast.
    Update,
}

impl Action {
    /// Returns the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }

    /// Parse the stable string representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "subscribe" => Some(Self::Subscribe),
            "delete" => Some(Self::Delete),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// Key-value metadata supplied with a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateOptions(Map<String, Value>);

impl UpdateOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store-generated notice: `{ action, data: null }`.
    #[must_use]
    pub fn for_action(action: Action) -> Self {
        let mut map = Map::new();
        map.insert(ACTION_KEY.into(), Value::String(action.as_str().into()));
        map.insert(DATA_KEY.into(), Value::Null);
        Self(map)
    }

    /// Set the render context.
    #[must_use]
    pub fn with_render_context(self, context: impl Into<String>) -> Self {
        self.with(RENDER_CONTEXT_KEY, Value::String(context.into()))
    }

    /// Set the data payload.
    #[must_use]
    pub fn with_data(self, data: Value) -> Self {
        self.with(DATA_KEY, data)
    }

    /// Set an arbitrary key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// The `action` key, if it names a known action.
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        self.0.get(ACTION_KEY).and_then(Value::as_str).and_then(Action::parse)
    }

    /// The `renderContext` key, if it is a string.
    #[must_use]
    pub fn render_context(&self) -> Option<&str> {
        self.0.get(RENDER_CONTEXT_KEY).and_then(Value::as_str)
    }

    /// The `data` key.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.0.get(DATA_KEY)
    }

    /// Look up any key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for UpdateOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for UpdateOptions {
    type Error = StoreError;

    /// Only JSON objects are accepted; anything else is `InvalidArgument`.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::invalid_argument(
                "set",
                format!("'options' is not an object (got {})", json_kind(&other)),
            )),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
