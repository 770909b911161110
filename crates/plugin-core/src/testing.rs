//! Test doubles shared by the plugin crates.

use std::{collections::HashMap, sync::Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use coin_store::Store;
use tempfile::TempDir;

use crate::{Messenger, PluginContext};

/// Records replies instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    replies: Mutex<Vec<(String, String)>>,
    names: HashMap<String, String>,
    profile_lookups: Mutex<usize>,
}

impl RecordingMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `name` for `user_id`; unknown users fail the lookup.
    #[must_use]
    pub fn with_name(mut self, user_id: &str, name: &str) -> Self {
        self.names.insert(user_id.to_owned(), name.to_owned());
        self
    }

    /// Reply texts in the order they were sent.
    #[must_use]
    pub fn replies(&self) -> Vec<String> {
        self.replies
            .lock()
            .map(|r| r.iter().map(|(_, text)| text.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last_reply(&self) -> Option<String> {
        self.replies().pop()
    }

    #[must_use]
    pub fn profile_lookups(&self) -> usize {
        self.profile_lookups.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        self.replies
            .lock()
            .map_err(|_| anyhow!("reply log poisoned"))?
            .push((reply_token.to_owned(), text.to_owned()));
        Ok(())
    }

    async fn display_name(&self, user_id: &str) -> Result<String> {
        if let Ok(mut n) = self.profile_lookups.lock() {
            *n += 1;
        }
        self.names
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("no profile for {user_id}"))
    }
}

/// A store backed by a fresh temporary directory.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn temp_store() -> (TempDir, Store) {
    let tmp = TempDir::new().expect("creating temp dir");
    let store = Store::open(tmp.path()).expect("opening store");
    (tmp, store)
}

/// Builds a context for `sender` with a fixed reply token.
pub fn context<'a>(
    store: &'a mut Store,
    messenger: &'a RecordingMessenger,
    sender: &'a str,
) -> PluginContext<'a> {
    PluginContext {
        store,
        messenger,
        sender,
        reply_token: "reply-token",
    }
}
