use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Balance granted to every user on first contact.
pub const STARTING_COINS: i64 = 20;

/// Permission tier of a user. Ordered from least to most privileged.
///
/// Serialized with the labels the bot shows in chat so existing
/// `users.json` files load unchanged; the upper-case English names are
/// accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ブラック", alias = "BLOCKED")]
    Blocked,
    #[serde(rename = "メンバー", alias = "MEMBER")]
    Member,
    #[serde(rename = "副管理者", alias = "SUBADMIN")]
    SubAdmin,
    #[serde(rename = "管理者", alias = "ADMIN")]
    Admin,
}

impl Role {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blocked => "ブラック",
            Self::Member => "メンバー",
            Self::SubAdmin => "副管理者",
            Self::Admin => "管理者",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "coin_or_zero")]
    pub coin: i64,
    pub role: Role,
    #[serde(default)]
    pub name: String,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            coin: STARTING_COINS,
            role: Role::Member,
            name: String::new(),
        }
    }
}

impl UserRecord {
    #[must_use]
    pub fn with_role(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }
}

// Older files may hold `null` where a balance was corrupted by a
// non-numeric grant; treat those as empty wallets.
fn coin_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}
