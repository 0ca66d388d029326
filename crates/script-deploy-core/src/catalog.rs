//! Script catalog: an ordered registry of script constructors.
//!
//! Applications register one constructor per script key; [`ScriptCatalog::build`]
//! produces a fresh set of scripts for each run, in registration order.

use crate::error::DeployError;
use crate::script::{Script, ScriptKey};
use std::collections::HashSet;

type ScriptFactory = Box<dyn Fn() -> Script + Send + Sync>;

#[derive(Default)]
pub struct ScriptCatalog {
    entries: Vec<(ScriptKey, ScriptFactory)>,
    keys: HashSet<ScriptKey>,
}

impl ScriptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `key`. Keys are unique, case-insensitively.
    pub fn register<F>(
        &mut self,
        key: impl Into<ScriptKey>,
        factory: F,
    ) -> Result<&mut Self, DeployError>
    where
        F: Fn() -> Script + Send + Sync + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(DeployError::InvalidScript("script key must not be empty".into()));
        }
        if !self.keys.insert(key.clone()) {
            return Err(DeployError::DuplicateScriptKey(key));
        }
        self.entries.push((key, Box::new(factory)));
        Ok(self)
    }

    /// Register a ready-made script; each build yields a clone.
    pub fn register_script(&mut self, script: Script) -> Result<&mut Self, DeployError> {
        let key = script.script_key.clone();
        self.register(key, move || script.clone())
    }

    pub fn contains(&self, key: impl Into<ScriptKey>) -> bool {
        self.keys.contains(&key.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScriptKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct every registered script.
    pub fn build(&self) -> Result<Vec<Script>, DeployError> {
        self.entries
            .iter()
            .map(|(key, factory)| {
                let script = factory();
                if script.script_key != *key {
                    return Err(DeployError::InvalidScript(format!(
                        "constructor registered as '{key}' built '{}'",
                        script.script_key
                    )));
                }
                Ok(script)
            })
            .collect()
    }
}
