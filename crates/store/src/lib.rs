mod keywords;
mod user;

pub use keywords::KeywordTable;
pub use user::{Role, STARTING_COINS, UserRecord};

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

const USERS_FILE: &str = "users.json";
const KEYWORDS_FILE: &str = "keywords.json";
const BLOCKLIST_FILE: &str = "blacklist.json";
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Users, keyword replies and the legacy blocklist, persisted as three JSON
/// documents in one directory.
///
/// Every mutating method rewrites all three files before returning, so the
/// on-disk state never lags behind a reply that has been sent. A failed write
/// leaves the in-memory state as it was.
#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    users: BTreeMap<String, UserRecord>,
    keywords: KeywordTable,
    // Kept only so the file survives a round trip; blocking is decided by
    // `UserRecord::role`.
    blocklist: serde_json::Value,
}

impl Store {
    /// Loads the store from `dir`, treating missing files as empty.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating data directory at {}", dir.display()))?;

        let users: BTreeMap<String, UserRecord> = load_json(&dir.join(USERS_FILE))?;
        let keywords: KeywordTable = load_json(&dir.join(KEYWORDS_FILE))?;
        let blocklist: serde_json::Value = load_json::<Option<serde_json::Value>>(
            &dir.join(BLOCKLIST_FILE),
        )?
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        debug!(
            dir = %dir.display(),
            users = users.len(),
            keywords = keywords.len(),
            "Loaded store"
        );
        Ok(Self {
            dir,
            users,
            keywords,
            blocklist,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn user(&self, id: &str) -> Option<&UserRecord> {
        self.users.get(id)
    }

    pub fn users(&self) -> impl Iterator<Item = (&str, &UserRecord)> {
        self.users.iter().map(|(id, rec)| (id.as_str(), rec))
    }

    #[must_use]
    pub const fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Reply text for the best trigger contained in `text`.
    #[must_use]
    pub fn match_keyword(&self, text: &str) -> Option<&str> {
        self.keywords.find(text).map(|(_, reply)| reply)
    }

    /// Ids of every blocked user, sorted.
    #[must_use]
    pub fn blocked_ids(&self) -> Vec<&str> {
        self.users
            .iter()
            .filter(|(_, rec)| rec.role == Role::Blocked)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Creates a default record for `id` if none exists. Returns `true` when
    /// a record was created.
    pub fn ensure_user(&mut self, id: &str) -> Result<bool> {
        if self.users.contains_key(id) {
            return Ok(false);
        }
        self.commit(|s| {
            s.users.insert(id.to_owned(), UserRecord::default());
        })?;
        Ok(true)
    }

    pub fn set_name(&mut self, id: &str, name: &str) -> Result<()> {
        self.commit(|s| s.record_mut(id).name = name.to_owned())
    }

    /// Marks `id` as an administrator. Administrators are only created this
    /// way; no chat command grants the role.
    pub fn seed_admin(&mut self, id: &str) -> Result<()> {
        if self.users.get(id).is_some_and(|rec| rec.role == Role::Admin) {
            return Ok(());
        }
        self.commit(|s| s.record_mut(id).role = Role::Admin)
    }

    /// Takes `stake` from the user and pays out `reward` in one step.
    ///
    /// Returns the new balance, or `None` (without touching anything) when
    /// the user is unknown or cannot cover the stake.
    pub fn settle_wager(&mut self, id: &str, stake: i64, reward: i64) -> Result<Option<i64>> {
        let Some(rec) = self.users.get(id) else {
            return Ok(None);
        };
        if rec.coin <= 0 || rec.coin < stake {
            return Ok(None);
        }
        self.commit(|s| {
            let rec = s.record_mut(id);
            rec.coin = (rec.coin - stake).saturating_add(reward);
            Some(rec.coin)
        })
    }

    pub fn grant_coins(&mut self, id: &str, amount: u32) -> Result<i64> {
        self.commit(|s| {
            let rec = s.record_mut(id);
            rec.coin = rec.coin.saturating_add(i64::from(amount));
            rec.coin
        })
    }

    /// Removes up to `amount` coins; the balance never drops below zero.
    pub fn revoke_coins(&mut self, id: &str, amount: u32) -> Result<i64> {
        self.commit(|s| {
            let rec = s.record_mut(id);
            rec.coin = (rec.coin - i64::from(amount)).max(0);
            rec.coin
        })
    }

    /// Adds `amount` to every existing user. Returns how many were credited.
    pub fn grant_all(&mut self, amount: u32) -> Result<usize> {
        self.commit(|s| {
            for rec in s.users.values_mut() {
                rec.coin = rec.coin.saturating_add(i64::from(amount));
            }
            s.users.len()
        })
    }

    /// Blocks `id` whatever its current role, creating the record if needed.
    pub fn block(&mut self, id: &str) -> Result<()> {
        self.commit(|s| s.record_mut(id).role = Role::Blocked)
    }

    /// Returns `true` if `id` was blocked and is now a member.
    pub fn unblock(&mut self, id: &str) -> Result<bool> {
        self.transition(id, Role::Blocked, Role::Member)
    }

    /// Makes `id` a sub-admin whatever its current role, creating the record
    /// if needed.
    pub fn promote(&mut self, id: &str) -> Result<()> {
        self.commit(|s| s.record_mut(id).role = Role::SubAdmin)
    }

    /// Returns `true` if `id` was a sub-admin and is now a member.
    pub fn demote(&mut self, id: &str) -> Result<bool> {
        self.transition(id, Role::SubAdmin, Role::Member)
    }

    pub fn set_keyword(&mut self, trigger: &str, reply: &str) -> Result<()> {
        self.commit(|s| {
            s.keywords.insert(trigger, reply);
        })
    }

    pub fn clear_keywords(&mut self) -> Result<()> {
        self.commit(|s| s.keywords.clear())
    }

    /// Rewrites all three documents. Every temp file is written before any
    /// of them replaces its target.
    pub fn save(&self) -> Result<()> {
        let staged = [
            stage_json(&self.dir.join(USERS_FILE), &self.users)?,
            stage_json(&self.dir.join(KEYWORDS_FILE), &self.keywords)?,
            stage_json(&self.dir.join(BLOCKLIST_FILE), &self.blocklist)?,
        ];
        for (tmp, path) in &staged {
            fs::rename(tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        }
        Ok(())
    }

    /// Applies `change` and saves. If the save fails the in-memory state is
    /// restored, so nothing unsaved leaks into a later save.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Self) -> T) -> Result<T> {
        let users = self.users.clone();
        let keywords = self.keywords.clone();
        let out = change(self);
        if let Err(e) = self.save() {
            self.users = users;
            self.keywords = keywords;
            return Err(e);
        }
        Ok(out)
    }

    fn record_mut(&mut self, id: &str) -> &mut UserRecord {
        self.users.entry(id.to_owned()).or_default()
    }

    fn transition(&mut self, id: &str, from: Role, to: Role) -> Result<bool> {
        if self.users.get(id).is_none_or(|rec| rec.role != from) {
            return Ok(false);
        }
        self.commit(|s| s.record_mut(id).role = to)?;
        Ok(true)
    }
}

fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Writes `value` next to `path` under the temp suffix. Returns the temp and
/// final paths for the rename.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<(PathBuf, PathBuf)> {
    let data = serde_json::to_string_pretty(value)?;
    let tmp = PathBuf::from(format!("{}{TEMP_FILE_SUFFIX}", path.display()));
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    Ok((tmp, path.to_path_buf()))
}
