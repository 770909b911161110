use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};

#[derive(Debug)]
pub struct ProfilePlugin;

impl PluginFactory for ProfilePlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        push_default(specs, PluginSpec::new("profile"));
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Profile)
    }
}

#[derive(Debug)]
pub struct Profile;

#[async_trait]
impl Plugin for Profile {
    fn id(&self) -> &'static str {
        "profile"
    }

    fn help(&self) -> &'static str {
        "Echo your user id (check) or show your coins and role (情報)."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[CommandKind::Check, CommandKind::Info]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        _spec: &PluginSpec,
    ) -> Result<()> {
        match command {
            Command::Check => reply(ctx, ctx.sender).await,
            Command::Info => {
                let Some(rec) = ctx.store.user(ctx.sender) else {
                    return Ok(());
                };
                let text = format!(
                    "ID: {}\nコイン: {}\n権限: {}",
                    ctx.sender, rec.coin, rec.role
                );
                reply(ctx, text).await
            }
            other => Err(unsupported(self.id(), other)),
        }
    }
}
