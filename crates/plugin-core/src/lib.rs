pub mod command;
pub mod factory;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{Command, CommandKind, ParseError, Tier};

use core::fmt;
use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use coin_store::Store;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a plain-text reply bound to the event's reply token.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Looks up the user's display name.
    async fn display_name(&self, user_id: &str) -> Result<String>;
}

/// Everything a plugin sees while handling one command.
pub struct PluginContext<'a> {
    pub store: &'a mut Store,
    pub messenger: &'a dyn Messenger,
    pub sender: &'a str,
    pub reply_token: &'a str,
}

impl fmt::Debug for PluginContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("store", &self.store.dir())
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn help(&self) -> &'static str;
    /// Commands this plugin answers. Each kind is served by one plugin.
    fn commands(&self) -> &'static [CommandKind];
    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        spec: &PluginSpec,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginSpec {
    pub id: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

impl PluginSpec {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            enabled: true,
            config: serde_yaml::Value::default(),
        }
    }
}

const fn enabled_true() -> bool {
    true
}

#[derive(Clone)]
pub struct PluginEntry {
    pub spec: PluginSpec,
    pub plugin: Arc<dyn Plugin>,
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("spec", &self.spec)
            .field("plugin", &self.plugin.id())
            .finish()
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<String, PluginEntry>,
    by_command: HashMap<CommandKind, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under `spec.id`, taking over its commands from any
    /// previously registered plugin.
    pub async fn register(&self, spec: PluginSpec, plugin: Arc<dyn Plugin>) -> Option<PluginEntry> {
        let mut inner = self.inner.write().await;
        let id = spec.id.clone();
        inner.by_command.retain(|_, existing| *existing != id);
        for kind in plugin.commands() {
            inner.by_command.insert(*kind, id.clone());
        }
        inner.by_id.insert(id, PluginEntry { spec, plugin })
    }

    pub async fn entry(&self, id: &str) -> Option<PluginEntry> {
        let inner = self.inner.read().await;
        inner.by_id.get(id).cloned()
    }

    pub async fn entry_for(&self, kind: CommandKind) -> Option<PluginEntry> {
        let inner = self.inner.read().await;
        inner
            .by_command
            .get(&kind)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    pub async fn entries(&self) -> Vec<(String, PluginEntry)> {
        let inner = self.inner.read().await;
        inner
            .by_id
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    #[must_use]
    pub async fn is_enabled(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.by_id.get(id).is_some_and(|entry| entry.spec.enabled)
    }
}

/// Error for a command routed to a plugin that does not claim it.
#[must_use]
pub fn unsupported(plugin: &str, command: &Command) -> anyhow::Error {
    anyhow::anyhow!("plugin {plugin} does not handle {:?}", command.kind())
}

/// Replies to the event that carried the current command.
pub async fn reply(ctx: &PluginContext<'_>, text: impl Into<String>) -> Result<()> {
    ctx.messenger.reply(ctx.reply_token, &text.into()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy(&'static str, &'static [CommandKind]);

    #[async_trait]
    impl Plugin for Dummy {
        fn id(&self) -> &'static str {
            self.0
        }
        fn help(&self) -> &'static str {
            "dummy"
        }
        fn commands(&self) -> &'static [CommandKind] {
            self.1
        }
        async fn run(
            &self,
            _ctx: &mut PluginContext<'_>,
            _command: &Command,
            _spec: &PluginSpec,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn routes_commands_to_their_plugin() {
        let registry = PluginRegistry::new();
        registry
            .register(
                PluginSpec::new("a"),
                Arc::new(Dummy("a", &[CommandKind::Slot, CommandKind::Info])),
            )
            .await;

        let entry = registry.entry_for(CommandKind::Slot).await.unwrap();
        assert_eq!(entry.spec.id, "a");
        assert!(registry.entry_for(CommandKind::Demote).await.is_none());
    }

    #[tokio::test]
    async fn re_registering_replaces_commands() {
        let registry = PluginRegistry::new();
        registry
            .register(PluginSpec::new("a"), Arc::new(Dummy("a", &[CommandKind::Slot])))
            .await;
        let previous = registry
            .register(PluginSpec::new("a"), Arc::new(Dummy("a", &[CommandKind::Info])))
            .await;

        assert!(previous.is_some());
        assert!(registry.entry_for(CommandKind::Slot).await.is_none());
        assert!(registry.entry_for(CommandKind::Info).await.is_some());
        assert_eq!(registry.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn disabled_specs_are_reported() {
        let registry = PluginRegistry::new();
        let mut spec = PluginSpec::new("off");
        spec.enabled = false;
        registry
            .register(spec, Arc::new(Dummy("off", &[CommandKind::Fortune])))
            .await;

        assert!(!registry.is_enabled("off").await);
        assert!(!registry.is_enabled("missing").await);
        assert!(registry.entry("off").await.is_some());
    }

    #[test]
    fn spec_defaults_to_enabled() {
        let spec: PluginSpec = serde_yaml::from_str("id: slot").unwrap();
        assert!(spec.enabled);
        assert!(spec.config.is_null());
    }
}
