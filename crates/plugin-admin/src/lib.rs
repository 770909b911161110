use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::{PluginFactory, push_default};
use plugin_core::{
    Command, CommandKind, Plugin, PluginContext, PluginSpec, reply, unsupported,
};
use tracing::info;

#[derive(Debug)]
pub struct AdminPlugin;

impl PluginFactory for AdminPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        push_default(specs, PluginSpec::new("admin"));
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Admin)
    }
}

/// Coin and sub-admin management for administrators.
#[derive(Debug)]
pub struct Admin;

#[async_trait]
impl Plugin for Admin {
    fn id(&self) -> &'static str {
        "admin"
    }

    fn help(&self) -> &'static str {
        "Grant or revoke coins, grant to everyone, and appoint or remove sub-admins."
    }

    fn commands(&self) -> &'static [CommandKind] {
        &[
            CommandKind::GrantCoins,
            CommandKind::GrantAll,
            CommandKind::RevokeCoins,
            CommandKind::Promote,
            CommandKind::Demote,
        ]
    }

    async fn run(
        &self,
        ctx: &mut PluginContext<'_>,
        command: &Command,
        _spec: &PluginSpec,
    ) -> Result<()> {
        match command {
            Command::GrantCoins { target, amount } => {
                let balance = ctx.store.grant_coins(target, *amount)?;
                info!(sender = %ctx.sender, target = %target, amount, balance, "Coins granted");
                reply(ctx, "コイン付与しました").await
            }
            Command::GrantAll { amount } => {
                let users = ctx.store.grant_all(*amount)?;
                info!(sender = %ctx.sender, amount, users, "Coins granted to everyone");
                reply(ctx, "全員にコインを付与しました").await
            }
            Command::RevokeCoins { target, amount } => {
                let balance = ctx.store.revoke_coins(target, *amount)?;
                info!(sender = %ctx.sender, target = %target, amount, balance, "Coins revoked");
                reply(ctx, "コインを剥奪しました").await
            }
            Command::Promote { target } => {
                ctx.store.promote(target)?;
                info!(sender = %ctx.sender, target = %target, "Sub-admin appointed");
                reply(ctx, "副管理者を付与しました").await
            }
            Command::Demote { target } => {
                let changed = ctx.store.demote(target)?;
                info!(sender = %ctx.sender, target = %target, changed, "Sub-admin removed");
                reply(ctx, "副管理者を削除しました").await
            }
            other => Err(unsupported(self.id(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_store::Role;
    use plugin_core::testing::{RecordingMessenger, context, temp_store};

    async fn run(store: &mut coin_store::Store, messenger: &RecordingMessenger, cmd: Command) {
        let mut ctx = context(store, messenger, "ADMIN");
        Admin
            .run(&mut ctx, &cmd, &PluginSpec::new("admin"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn grant_and_revoke_single_target() {
        let (_tmp, mut store) = temp_store();
        let messenger = RecordingMessenger::new();

        run(
            &mut store,
            &messenger,
            Command::GrantCoins {
                target: "U1".to_owned(),
                amount: 10,
            },
        )
        .await;
        assert_eq!(store.user("U1").unwrap().coin, 30);

        store.revoke_coins("U1", 25).unwrap();
        run(
            &mut store,
            &messenger,
            Command::RevokeCoins {
                target: "U1".to_owned(),
                amount: 100,
            },
        )
        .await;
        assert_eq!(store.user("U1").unwrap().coin, 0);
        assert_eq!(
            messenger.replies(),
            vec!["コイン付与しました", "コインを剥奪しました"]
        );
    }

    #[tokio::test]
    async fn broadcast_grant_credits_existing_users_only() {
        let (_tmp, mut store) = temp_store();
        store.ensure_user("A").unwrap();
        store.ensure_user("B").unwrap();
        store.revoke_coins("A", 17).unwrap();
        store.revoke_coins("B", 20).unwrap();
        let messenger = RecordingMessenger::new();

        run(&mut store, &messenger, Command::GrantAll { amount: 10 }).await;

        let coins: Vec<_> = store.users().map(|(id, rec)| (id, rec.coin)).collect();
        assert_eq!(coins, vec![("A", 13), ("B", 10)]);
        assert_eq!(
            messenger.last_reply().as_deref(),
            Some("全員にコインを付与しました")
        );
    }

    #[tokio::test]
    async fn promote_and_demote() {
        let (_tmp, mut store) = temp_store();
        let messenger = RecordingMessenger::new();

        run(
            &mut store,
            &messenger,
            Command::Promote {
                target: "S".to_owned(),
            },
        )
        .await;
        assert_eq!(store.user("S").unwrap().role, Role::SubAdmin);

        run(
            &mut store,
            &messenger,
            Command::Demote {
                target: "S".to_owned(),
            },
        )
        .await;
        assert_eq!(store.user("S").unwrap().role, Role::Member);
    }

    #[tokio::test]
    async fn demote_is_a_silent_no_op_for_members_and_blocked_users() {
        let (_tmp, mut store) = temp_store();
        store.ensure_user("M").unwrap();
        store.block("B").unwrap();
        let messenger = RecordingMessenger::new();

        for target in ["M", "B"] {
            run(
                &mut store,
                &messenger,
                Command::Demote {
                    target: target.to_owned(),
                },
            )
            .await;
        }

        assert_eq!(store.user("M").unwrap().role, Role::Member);
        assert_eq!(store.user("B").unwrap().role, Role::Blocked);
        assert_eq!(
            messenger.replies(),
            vec!["副管理者を削除しました", "副管理者を削除しました"]
        );
    }
}
