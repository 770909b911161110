use std::sync::Arc;

use anyhow::{Context as _, Result};
use coin_store::{Role, Store};
use plugin_core::{Command, Messenger, PluginContext, PluginRegistry};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Blocked users may still send messages starting with this prefix.
const KEYWORD_ADMIN_PREFIX: &str = "key:";

/// A text message as delivered by the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
    pub reply_token: String,
}

/// Routes one inbound message through the blocklist gate, the keyword table
/// and the tiered commands, in that order. The first stage that answers wins.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    messenger: Arc<dyn Messenger>,
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            registry,
            messenger,
        }
    }

    /// Processes messages one at a time until every sender is dropped. The
    /// store is owned here, so each message sees the writes of the previous one.
    pub async fn run(self, mut store: Store, mut rx: mpsc::UnboundedReceiver<InboundMessage>) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = self.handle(&mut store, &msg).await {
                warn!(error = %e, sender = %msg.sender, "Failed to handle message");
            }
        }
        info!("Event channel closed, dispatcher stopping");
    }

    pub async fn handle(&self, store: &mut Store, msg: &InboundMessage) -> Result<()> {
        let text = msg.text.trim();
        let sender = msg.sender.as_str();

        if store.ensure_user(sender)? {
            info!(sender = %sender, "New user");
        }
        self.resolve_name(store, sender).await?;

        let role = store.user(sender).map_or(Role::Member, |rec| rec.role);
        if role == Role::Blocked && !text.starts_with(KEYWORD_ADMIN_PREFIX) {
            debug!(sender = %sender, "Ignoring blocked user");
            return Ok(());
        }

        if let Some(answer) = store.match_keyword(text) {
            let answer = answer.to_owned();
            debug!(sender = %sender, "Keyword matched");
            return self.messenger.reply(&msg.reply_token, &answer).await;
        }

        let command = match Command::parse(text) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(err) => {
                let kind = err.kind();
                if !kind.tier().permits(role) {
                    return Ok(());
                }
                info!(sender = %sender, error = %err, "Malformed command");
                let usage = format!("使い方: {}", kind.usage());
                return self.messenger.reply(&msg.reply_token, &usage).await;
            }
        };

        let kind = command.kind();
        if !command.tier().permits(role) {
            debug!(sender = %sender, command = ?kind, role = %role, "Command not permitted");
            return Ok(());
        }

        let Some(entry) = self.registry.entry_for(kind).await else {
            warn!(command = ?kind, "No plugin registered for command");
            return Ok(());
        };
        let plugin_id = entry.spec.id.as_str();
        if !self.registry.is_enabled(plugin_id).await {
            info!(plugin = %plugin_id, "Plugin disabled");
            return Ok(());
        }

        info!(sender = %sender, command = ?kind, plugin = %plugin_id, "Running command");
        let mut ctx = PluginContext {
            store,
            messenger: self.messenger.as_ref(),
            sender,
            reply_token: &msg.reply_token,
        };
        entry
            .plugin
            .run(&mut ctx, &command, &entry.spec)
            .await
            .with_context(|| format!("plugin {plugin_id} failed"))
    }

    /// Fills in the display name while it is still unknown. A failed lookup
    /// is retried on the sender's next message.
    async fn resolve_name(&self, store: &mut Store, sender: &str) -> Result<()> {
        if store.user(sender).is_some_and(|rec| !rec.name.is_empty()) {
            return Ok(());
        }
        match self.messenger.display_name(sender).await {
            Ok(name) => store.set_name(sender, &name),
            Err(e) => {
                warn!(error = %e, sender = %sender, "Profile lookup failed");
                Ok(())
            }
        }
    }
}
