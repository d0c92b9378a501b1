//! UUID extraction from drag-and-drop transfer payloads.
//!
//! A transfer payload is the JSON blob attached to a drop event. Newer hosts
//! put a full `uuid` on it; older ones only carry `type`, `id`, and optionally
//! `pack` (compendium) or `actorId` + `data._id` (an item owned by an actor).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Not an object | Payload is a string, array, ... | `None` |
//! | Type filtered | `types` set and `type` not listed | `None` |
//! | Non-string uuid | `uuid: 123` | `None` (no legacy fallback) |
//! | Source disabled | e.g. compendium uuid with `compendium: false` | `None` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging::trace;

/// Which payload sources are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseDataTransferOptions {
    /// Accept legacy actor-owned item payloads.
    pub actor: bool,
    /// Accept compendium documents.
    pub compendium: bool,
    /// Accept world documents.
    pub world: bool,
    /// When set, only payloads whose `type` is listed are accepted.
    pub types: Option<Vec<String>>,
}

impl Default for ParseDataTransferOptions {
    fn default() -> Self {
        Self {
            actor: true,
            compendium: true,
            world: true,
            types: None,
        }
    }
}

impl ParseDataTransferOptions {
    #[must_use]
    pub fn with_actor(mut self, actor: bool) -> Self {
        self.actor = actor;
        self
    }

    #[must_use]
    pub fn with_compendium(mut self, compendium: bool) -> Self {
        self.compendium = compendium;
        self
    }

    #[must_use]
    pub fn with_world(mut self, world: bool) -> Self {
        self.world = world;
        self
    }

    /// Restrict accepted payload types.
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// Extracts a UUID from an opaque transfer payload.
pub trait TransferParser {
    fn uuid_from(&self, data: &Value, options: &ParseDataTransferOptions) -> Option<String>;
}

/// The standard payload parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTransferParser;

const COMPENDIUM_PREFIX: &str = "Compendium.";

impl TransferParser for UuidTransferParser {
    fn uuid_from(&self, data: &Value, options: &ParseDataTransferOptions) -> Option<String> {
        let object = data.as_object()?;
        let kind = object.get("type").and_then(Value::as_str);

        if let Some(types) = &options.types {
            if !kind.is_some_and(|kind| types.iter().any(|t| t == kind)) {
                trace!(kind = ?kind, "transfer type filtered out");
                return None;
            }
        }

        if let Some(uuid) = object.get("uuid") {
            let Some(uuid) = uuid.as_str().filter(|uuid| !uuid.is_empty()) else {
                trace!(uuid = %uuid, "transfer uuid is not a non-empty string");
                return None;
            };
            let allowed = if uuid.starts_with(COMPENDIUM_PREFIX) {
                options.compendium
            } else {
                options.world
            };
            return allowed.then(|| uuid.to_owned());
        }

        // Legacy payloads.
        let actor_id = object.get("actorId").and_then(Value::as_str);
        if let (Some(actor_id), Some(kind)) = (actor_id, kind) {
            if !(options.actor && options.world) {
                return None;
            }
            let owned_id = object
                .get("data")
                .and_then(|data| data.get("_id"))
                .and_then(Value::as_str)?;
            return Some(format!("Actor.{actor_id}.{kind}.{owned_id}"));
        }

        let id = object.get("id").and_then(Value::as_str)?;
        if let Some(pack) = object.get("pack").and_then(Value::as_str) {
            return options
                .compendium
                .then(|| format!("{COMPENDIUM_PREFIX}{pack}.{id}"));
        }
        let kind = kind?;
        options.world.then(|| format!("{kind}.{id}"))
    }
}
