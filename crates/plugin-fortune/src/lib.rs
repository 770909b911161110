use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};
use rand::seq::SliceRandom as _;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug)]
pub struct FortunePlugin;

impl PluginFactory for FortunePlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        let mut spec = PluginSpec::new("fortune");
        spec.config = serde_yaml::to_value(FortuneConfig::default()).unwrap_or_default();
        push_default(specs, spec);
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Fortune)
    }
}

#[derive(Debug)]
pub struct Fortune;

/// Config shape: the grades to draw from, best first.
///
/// Example YAML:
/// ```yaml
/// grades: ["大吉", "吉", "凶"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct FortuneConfig {
    grades: Vec<String>,
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            grades: ["大吉", "中吉", "小吉", "吉", "末吉", "凶", "大凶"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
        }
    }
}

fn parse_config(spec: &PluginSpec) -> FortuneConfig {
    if spec.config.is_null() {
        return FortuneConfig::default();
    }
    match serde_yaml::from_value::<FortuneConfig>(spec.config.clone()) {
        Ok(cfg) if !cfg.grades.is_empty() => cfg,
        Ok(_) => {
            warn!(plugin = "fortune", "No fortune grades configured, using defaults");
            FortuneConfig::default()
        }
        Err(err) => {
            warn!(plugin = "fortune", error = %err, "Failed to parse fortune config, using defaults");
            FortuneConfig::default()
        }
    }
}

#[async_trait]
impl Plugin for Fortune {
    fn id(&self) -> &'static str {
        "fortune"
    }

    fn help(&self) -> &'static str {
        "Draw a fortune (おみくじ)."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[CommandKind::Fortune]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        spec: &PluginSpec,
    ) -> Result<()> {
        if !matches!(command, Command::Fortune) {
            return Err(unsupported(self.id(), command));
        }
        let cfg = parse_config(spec);
        // ThreadRng is not Send; drop it before the await.
        let choice = {
            let mut rng = thread_rng();
            cfg.grades.choose(&mut rng).cloned()
        };
        match choice {
            Some(grade) => reply(ctx, grade).await,
            None => Ok(()),
        }
    }
}
