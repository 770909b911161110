use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};
use tracing::info;

#[derive(Debug)]
pub struct ModerationPlugin;

impl PluginFactory for ModerationPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        push_default(specs, PluginSpec::new("moderation"));
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Moderation)
    }
}

#[derive(Debug)]
pub struct Moderation;

#[async_trait]
impl Plugin for Moderation {
    fn id(&self) -> &'static str {
        "moderation"
    }

    fn help(&self) -> &'static str {
        "Block or unblock users, list blocked users and look users up by id."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[
            CommandKind::Block,
            CommandKind::Unblock,
            CommandKind::ListBlocked,
            CommandKind::Lookup,
        ]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        _spec: &PluginSpec,
    ) -> Result<()> {
        match command {
            Command::Block { target } => {
                ctx.store.block(target)?;
                info!(sender = %ctx.sender, target = %target, "User blocked");
                reply(ctx, "ブラック登録しました").await
            }
            Command::Unblock { target } => {
                if ctx.store.unblock(target)? {
                    info!(sender = %ctx.sender, target = %target, "User unblocked");
                }
                reply(ctx, "ブラック解除しました").await
            }
            Command::ListBlocked => {
                let ids = ctx.store.blocked_ids();
                let text = if ids.is_empty() {
                    "ブラックはいません".to_owned()
                } else {
                    ids.join("\n")
                };
                reply(ctx, text).await
            }
            Command::Lookup { target } => {
                let text = match ctx.store.user(target) {
                    Some(rec) => format!(
                        "ID: {target}\n名前: {}\n権限: {}\nコイン: {}",
                        rec.name, rec.role, rec.coin
                    ),
                    None => "見つかりません".to_owned(),
                };
                reply(ctx, text).await
            }
            other => Err(unsupported(self.id(), other)),
        }
    }
}
