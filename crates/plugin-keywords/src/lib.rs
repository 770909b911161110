use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};
use tracing::info;

#[derive(Debug)]
pub struct KeywordsPlugin;

impl PluginFactory for KeywordsPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        push_default(specs, PluginSpec::new("keywords"));
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Keywords)
    }
}

#[derive(Debug)]
pub struct Keywords;

#[async_trait]
impl Plugin for Keywords {
    fn id(&self) -> &'static str {
        "keywords"
    }

    fn help(&self) -> &'static str {
        "Register canned replies (key:<trigger>:<reply>) or clear them all (notkey)."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[CommandKind::SetKeyword, CommandKind::ResetKeywords]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        _spec: &PluginSpec,
    ) -> Result<()> {
        match command {
            Command::SetKeyword { trigger, reply: text } => {
                ctx.store.set_keyword(trigger, text)?;
                info!(sender = %ctx.sender, trigger = %trigger, "Keyword set");
                reply(ctx, "キーワード設定完了").await
            }
            Command::ResetKeywords => {
                ctx.store.clear_keywords()?;
                info!(sender = %ctx.sender, "Keywords cleared");
                reply(ctx, "キーワードリセットしました").await
            }
            other => Err(unsupported(self.id(), other)),
        }
    }
}
