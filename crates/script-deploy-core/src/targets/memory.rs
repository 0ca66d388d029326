//! In-memory deployment target
//!
//! Used for dry runs and tests. Keeps a deployment record per key and a log of
//! executed scripts. Registration service scripts are interpreted through
//! their `ScriptKey`/`ContentsHash` parameters instead of being run.

use crate::cancel::CancellationToken;
use crate::options::{CONTENTS_HASH_PARAMETER, SCRIPT_KEY_PARAMETER};
use crate::ports::DeployTarget;
use crate::script::{DeployedInfo, Script, ScriptKey};
use crate::INITIALIZE_VERSION;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    deployed: HashMap<ScriptKey, DeployedInfo>,
    executed: Vec<String>,
    failing: HashSet<ScriptKey>,
    prepared: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTarget {
    state: RwLock<MemoryState>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a deployment record before the target is shared.
    pub fn with_deployed(
        mut self,
        key: impl Into<ScriptKey>,
        contents_hash: Option<String>,
    ) -> Self {
        let info = DeployedInfo::new(key, contents_hash);
        self.state
            .get_mut()
            .deployed
            .insert(info.script_key.clone(), info);
        self
    }

    pub async fn seed(&self, key: impl Into<ScriptKey>, contents_hash: Option<String>) {
        let info = DeployedInfo::new(key, contents_hash);
        self.state
            .write()
            .await
            .deployed
            .insert(info.script_key.clone(), info);
    }

    /// Make every execution of `key` fail.
    pub async fn fail_on(&self, key: impl Into<ScriptKey>) {
        self.state.write().await.failing.insert(key.into());
    }

    /// Keys of successfully executed scripts, registration scripts included.
    pub async fn executed(&self) -> Vec<String> {
        self.state.read().await.executed.clone()
    }

    pub async fn deployed_info(&self, key: impl Into<ScriptKey>) -> Option<DeployedInfo> {
        self.state.read().await.deployed.get(&key.into()).cloned()
    }

    pub async fn deployed_keys(&self) -> Vec<ScriptKey> {
        let mut keys: Vec<_> = self.state.read().await.deployed.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn prepared_count(&self) -> usize {
        self.state.read().await.prepared
    }
}

/// A registration script names the deployed script through its parameters.
fn registration_record(script: &Script) -> Option<DeployedInfo> {
    if !script.is_service {
        return None;
    }
    let key = script.script_parameters.get(SCRIPT_KEY_PARAMETER)?.as_deref()?;
    let hash = script
        .script_parameters
        .get(CONTENTS_HASH_PARAMETER)
        .cloned()
        .flatten();
    Some(DeployedInfo::new(key, hash))
}

#[async_trait]
impl DeployTarget for MemoryTarget {
    /// Records the `INITIALIZE_VERSION` bootstrap entry, as a real target does
    /// when it creates its version table.
    async fn prepare_to_deploy(&self, _cancel: &CancellationToken) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        state.prepared += 1;
        state
            .deployed
            .entry(ScriptKey::from(INITIALIZE_VERSION))
            .or_insert_with(|| DeployedInfo::new(INITIALIZE_VERSION, None));
        Ok(())
    }

    async fn get_deployed_info(
        &self,
        key: &ScriptKey,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<DeployedInfo>> {
        Ok(self.state.read().await.deployed.get(key).cloned())
    }

    async fn deploy_script(
        &self,
        script: &Script,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;

        if state.failing.contains(&script.script_key) {
            anyhow::bail!("Execution of script '{}' failed", script.script_key);
        }

        if let Some(record) = registration_record(script) {
            state.deployed.insert(record.script_key.clone(), record);
        } else if script.is_initialize_target {
            let record = DeployedInfo::new(&script.script_key, script.contents_hash.clone());
            state.deployed.insert(record.script_key.clone(), record);
        }

        state.executed.push(script.script_key.to_string());
        Ok(())
    }
}
