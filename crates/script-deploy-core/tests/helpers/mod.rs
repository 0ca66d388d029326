//! Shared fixtures for deployment service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use script_deploy_core::hashing::content_hash;
use script_deploy_core::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MIGRATION_SCRIPT_KEY: &str = "MigrationScript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    Default,
    Empty,
    Fail,
}

/// Source whose answer per locator is scripted. Records every fetch.
#[derive(Default)]
pub struct ScriptedSource {
    contents: Mutex<HashMap<String, (ContentState, String)>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn set(&self, locator: &str, state: ContentState, content: &str) {
        self.contents
            .lock()
            .unwrap()
            .insert(locator.to_ascii_lowercase(), (state, content.to_string()));
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeploySource for ScriptedSource {
    async fn get_script_content(
        &self,
        locator: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        self.fetched.lock().unwrap().push(locator.to_string());
        let entry = self
            .contents
            .lock()
            .unwrap()
            .get(&locator.to_ascii_lowercase())
            .cloned();
        match entry {
            Some((ContentState::Default, content)) => Ok(Some(content)),
            Some((ContentState::Empty, _)) | None => Ok(None),
            Some((ContentState::Fail, _)) => anyhow::bail!("Test exception"),
        }
    }
}

/// Builds scripts together with the source and target state they need.
pub struct Fixture {
    pub scripts: Vec<Script>,
    pub source: Arc<ScriptedSource>,
    pub target: Arc<MemoryTarget>,
    pub options: DeploymentOptions,
}

impl Fixture {
    pub fn new() -> Self {
        let source = Arc::new(ScriptedSource::default());
        let migration =
            Script::service(MIGRATION_SCRIPT_KEY, format!("Source_{MIGRATION_SCRIPT_KEY}"));
        source.set(
            &migration.source,
            ContentState::Default,
            &format!("Content_{MIGRATION_SCRIPT_KEY}"),
        );
        Self {
            scripts: Vec::new(),
            source,
            target: Arc::new(MemoryTarget::new()),
            options: DeploymentOptions::new().with_insert_migration_script(migration),
        }
    }

    /// Add a script whose source answers `Content_<key>`.
    pub fn add(&mut self, script: Script) -> ScriptKey {
        let key = script.script_key.clone();
        self.add_with(script, ContentState::Default, &format!("Content_{key}"))
    }

    pub fn add_with(&mut self, script: Script, state: ContentState, content: &str) -> ScriptKey {
        self.source.set(&script.source, state, content);
        let key = script.script_key.clone();
        self.scripts.push(script);
        key
    }

    /// Record `key` as deployed with the hash of `deployed_content`.
    pub async fn mark_deployed(&self, key: &str, deployed_content: &str) {
        self.target
            .seed(key, Some(content_hash(deployed_content)))
            .await;
    }

    pub fn service(&self) -> DeploymentService {
        DeployBuilder::new()
            .shared_source(self.source.clone())
            .shared_target(self.target.clone())
            .options(self.options.clone())
            .build()
            .unwrap()
    }

    pub async fn deploy(&mut self) -> DeploymentResult {
        let service = self.service();
        service
            .deploy(&mut self.scripts, &CancellationToken::none())
            .await
    }

    /// Number of times `key` was executed against the target.
    pub async fn executions(&self, key: &str) -> usize {
        self.target
            .executed()
            .await
            .iter()
            .filter(|k| k.eq_ignore_ascii_case(key))
            .count()
    }
}

pub fn script(key: &str) -> Script {
    Script::new(key, format!("Source_{key}"))
}
