use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const NOT_ENOUGH_COINS: &str = "コインが足りません";

#[derive(Debug)]
pub struct SlotPlugin;

impl PluginFactory for SlotPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        let mut spec = PluginSpec::new("slot");
        spec.config = serde_yaml::to_value(SlotConfig::default()).unwrap_or_default();
        push_default(specs, spec);
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Slot)
    }
}

#[derive(Debug)]
pub struct Slot;

/// Stake and payouts. Any triple pays `default_reward` except 777, which
/// pays `jackpot_reward`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub stake: i64,
    pub default_reward: i64,
    pub jackpot_reward: i64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            stake: 1,
            default_reward: 75,
            jackpot_reward: 500,
        }
    }
}

fn parse_config(spec: &PluginSpec) -> SlotConfig {
    if spec.config.is_null() {
        return SlotConfig::default();
    }
    match serde_yaml::from_value::<SlotConfig>(spec.config.clone()) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(plugin = "slot", error = %err, "Failed to parse slot config, using defaults");
            SlotConfig::default()
        }
    }
}

/// Reward for a drawn triple.
#[must_use]
pub const fn payout(digits: [u8; 3], config: &SlotConfig) -> i64 {
    match digits {
        [7, 7, 7] => config.jackpot_reward,
        [a, b, c] if a == b && b == c => config.default_reward,
        _ => 0,
    }
}

fn draw() -> [u8; 3] {
    let mut rng = rand::thread_rng();
    [
        rng.gen_range(1..=9),
        rng.gen_range(1..=9),
        rng.gen_range(1..=9),
    ]
}

fn render(digits: [u8; 3], reward: i64, balance: i64) -> String {
    let shown: String = digits.iter().map(u8::to_string).collect();
    if reward > 0 {
        format!("{shown} 当たり！{reward}コイン獲得！ 残り{balance}コイン")
    } else {
        format!("{shown} はずれ！！ 残り{balance}コイン")
    }
}

#[async_trait]
impl Plugin for Slot {
    fn id(&self) -> &'static str {
        "slot"
    }

    fn help(&self) -> &'static str {
        "Spin three digits for one coin; triples pay out, 777 pays the jackpot."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[CommandKind::Slot]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        spec: &PluginSpec,
    ) -> Result<()> {
        if !matches!(command, Command::Slot) {
            return Err(unsupported(self.id(), command));
        }
        let config = parse_config(spec);

        let balance = ctx.store.user(ctx.sender).map_or(0, |rec| rec.coin);
        if balance <= 0 || balance < config.stake {
            return reply(ctx, NOT_ENOUGH_COINS).await;
        }

        let digits = draw();
        let reward = payout(digits, &config);
        let Some(balance) = ctx.store.settle_wager(ctx.sender, config.stake, reward)? else {
            return reply(ctx, NOT_ENOUGH_COINS).await;
        };
        debug!(sender = %ctx.sender, ?digits, reward, balance, "Slot settled");

        reply(ctx, render(digits, reward, balance)).await
    }
}
