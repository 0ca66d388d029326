//! Script Model
//!
//! One concrete [`Script`] type covers every kind of deployable unit. Kinds
//! (plain migration, service, bootstrap, repeatable) differ only in flags, so
//! they are produced by constructor functions instead of separate types.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Named substitution values a target may interpolate into script text.
pub type ScriptParameters = BTreeMap<String, Option<String>>;

// ─── ScriptKey ────────────────────────────────────────────────

/// Script identifier. Equality, hashing and ordering ignore case.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptKey(String);

impl ScriptKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for ScriptKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for ScriptKey {}

impl Hash for ScriptKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl PartialOrd for ScriptKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScriptKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Debug for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ScriptKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&ScriptKey> for ScriptKey {
    fn from(value: &ScriptKey) -> Self {
        value.clone()
    }
}

// ─── Script ───────────────────────────────────────────────────

/// One deployable unit.
///
/// Identity and flags are fixed when the script is built. `content` and
/// `contents_hash` are filled in during a run; nothing else is mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub script_key: ScriptKey,
    /// Key of a prerequisite script.
    pub depends_on: Option<ScriptKey>,
    /// Coarse ordering bucket. Groups run in ascending order.
    pub order_group: i32,
    /// Infrastructure script, never part of the deployable set.
    pub is_service: bool,
    /// Once this key is deployed the script is obsolete.
    pub actual_before: Option<ScriptKey>,
    /// Re-run when the content hash changes.
    pub can_repeat: bool,
    /// Bootstrap script, registered by the target itself.
    pub is_initialize_target: bool,
    pub content: Option<String>,
    pub contents_hash: Option<String>,
    /// Opaque locator handed to the source provider.
    pub source: String,
    pub script_parameters: ScriptParameters,
    pub description: Option<String>,
}

impl Script {
    /// Plain run-once script.
    pub fn new(key: impl Into<ScriptKey>, source: impl Into<String>) -> Self {
        Self {
            script_key: key.into(),
            depends_on: None,
            order_group: 0,
            is_service: false,
            actual_before: None,
            can_repeat: false,
            is_initialize_target: false,
            content: None,
            contents_hash: None,
            source: source.into(),
            script_parameters: ScriptParameters::new(),
            description: None,
        }
    }

    pub fn migration(key: impl Into<ScriptKey>, source: impl Into<String>) -> Self {
        Self::new(key, source)
    }

    /// Infrastructure script (e.g. migration registration).
    pub fn service(key: impl Into<ScriptKey>, source: impl Into<String>) -> Self {
        Self {
            is_service: true,
            ..Self::new(key, source)
        }
    }

    /// Bootstrap script that prepares the target (e.g. creates the database).
    pub fn initialize_target(key: impl Into<ScriptKey>, source: impl Into<String>) -> Self {
        Self {
            is_initialize_target: true,
            ..Self::new(key, source)
        }
    }

    /// Script that re-runs whenever its content changes.
    pub fn repeatable(key: impl Into<ScriptKey>, source: impl Into<String>) -> Self {
        Self {
            can_repeat: true,
            ..Self::new(key, source)
        }
    }

    pub fn with_dependency(mut self, key: impl Into<ScriptKey>) -> Self {
        self.depends_on = Some(key.into());
        self
    }

    pub fn in_group(mut self, order_group: i32) -> Self {
        self.order_group = order_group;
        self
    }

    pub fn with_actual_before(mut self, key: impl Into<ScriptKey>) -> Self {
        self.actual_before = Some(key.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.script_parameters.insert(name.into(), value);
        self
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

// ─── DeployedInfo ─────────────────────────────────────────────

/// Evidence, held by the target, that a script key was deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedInfo {
    pub script_key: ScriptKey,
    pub contents_hash: Option<String>,
}

impl DeployedInfo {
    pub fn new(script_key: impl Into<ScriptKey>, contents_hash: Option<String>) -> Self {
        Self {
            script_key: script_key.into(),
            contents_hash,
        }
    }
}
