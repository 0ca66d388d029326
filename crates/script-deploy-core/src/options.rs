use crate::script::Script;

/// Parameter receiving the deployed script's key when registering a migration.
pub const SCRIPT_KEY_PARAMETER: &str = "ScriptKey";

/// Parameter receiving the deployed script's content hash when registering a migration.
pub const CONTENTS_HASH_PARAMETER: &str = "ContentsHash";

/// Per-service deployment options. Each run works on its own copy.
#[derive(Debug, Clone, Default)]
pub struct DeploymentOptions {
    /// Service script executed after every deployed script to record it.
    pub insert_migration_script: Option<Script>,
    pub disable_registration_of_migrations: bool,
}

impl DeploymentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_migration_script(mut self, script: Script) -> Self {
        self.insert_migration_script = Some(script);
        self
    }

    pub fn without_registration(mut self) -> Self {
        self.disable_registration_of_migrations = true;
        self
    }
}
