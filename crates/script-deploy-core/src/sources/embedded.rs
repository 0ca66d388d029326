use crate::cancel::CancellationToken;
use crate::ports::DeploySource;
use async_trait::async_trait;
use std::collections::HashMap;

/// Scripts compiled into the binary, typically with `include_str!`.
///
/// Locator lookup ignores ASCII case.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    scripts: HashMap<String, String>,
}

impl EmbeddedSource {
    pub fn new<I, L, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
        L: Into<String>,
        C: Into<String>,
    {
        let mut source = Self::default();
        for (locator, content) in entries {
            source.insert(locator, content);
        }
        source
    }

    pub fn insert(&mut self, locator: impl Into<String>, content: impl Into<String>) {
        self.scripts
            .insert(locator.into().to_ascii_lowercase(), content.into());
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[async_trait]
impl DeploySource for EmbeddedSource {
    async fn get_script_content(
        &self,
        locator: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        Ok(self.scripts.get(&locator.to_ascii_lowercase()).cloned())
    }
}
