//! Chat command grammar.
//!
//! Incoming text is parsed once into a [`Command`] with typed arguments.
//! Malformed arguments surface as a [`ParseError`] instead of reaching the
//! store.

use coin_store::Role;
use thiserror::Error;

/// Minimum role needed to run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Member,
    SubAdmin,
    Admin,
}

impl Tier {
    #[must_use]
    pub const fn min_role(self) -> Role {
        match self {
            Self::Member => Role::Member,
            Self::SubAdmin => Role::SubAdmin,
            Self::Admin => Role::Admin,
        }
    }

    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        role >= self.min_role()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    Check,
    Info,
    Slot,
    Fortune,
    SetKeyword,
    ResetKeywords,
    Block,
    Unblock,
    ListBlocked,
    Lookup,
    GrantCoins,
    GrantAll,
    RevokeCoins,
    Promote,
    Demote,
}

impl CommandKind {
    pub const ALL: [Self; 15] = [
        Self::Check,
        Self::Info,
        Self::Slot,
        Self::Fortune,
        Self::SetKeyword,
        Self::ResetKeywords,
        Self::Block,
        Self::Unblock,
        Self::ListBlocked,
        Self::Lookup,
        Self::GrantCoins,
        Self::GrantAll,
        Self::RevokeCoins,
        Self::Promote,
        Self::Demote,
    ];

    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::Check | Self::Info | Self::Slot | Self::Fortune => Tier::Member,
            Self::SetKeyword
            | Self::ResetKeywords
            | Self::Block
            | Self::Unblock
            | Self::ListBlocked
            | Self::Lookup => Tier::SubAdmin,
            Self::GrantCoins | Self::GrantAll | Self::RevokeCoins | Self::Promote | Self::Demote => {
                Tier::Admin
            }
        }
    }

    /// How the command is typed in chat.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Info => "情報",
            Self::Slot => "スロット",
            Self::Fortune => "おみくじ",
            Self::SetKeyword => "key:<キーワード>:<返信>",
            Self::ResetKeywords => "notkey",
            Self::Block => "givebu:<ユーザーID>",
            Self::Unblock => "notgivebu:<ユーザーID>",
            Self::ListBlocked => "ブラックリスト一覧",
            Self::Lookup => "ID:<ユーザーID>",
            Self::GrantCoins => "coingive:<ユーザーID>:<枚数>",
            Self::GrantAll => "allcoingive:<枚数>",
            Self::RevokeCoins => "notcoingive:<ユーザーID>:<枚数>",
            Self::Promote => "付与:<ユーザーID>",
            Self::Demote => "削除:<ユーザーID>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Check,
    Info,
    Slot,
    Fortune,
    SetKeyword { trigger: String, reply: String },
    ResetKeywords,
    Block { target: String },
    Unblock { target: String },
    ListBlocked,
    Lookup { target: String },
    GrantCoins { target: String, amount: u32 },
    GrantAll { amount: u32 },
    RevokeCoins { target: String, amount: u32 },
    Promote { target: String },
    Demote { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{kind:?}: missing {field}")]
    Missing {
        kind: CommandKind,
        field: &'static str,
    },
    #[error("{kind:?}: `{value}` is not a valid amount")]
    InvalidAmount { kind: CommandKind, value: String },
}

impl ParseError {
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Missing { kind, .. } | Self::InvalidAmount { kind, .. } => *kind,
        }
    }
}

type ArgParser = fn(&str) -> Result<Command, ParseError>;

// Checked in order; no prefix is a prefix of a later one.
const PREFIXES: [(&str, ArgParser); 9] = [
    ("key:", set_keyword),
    ("givebu:", block),
    ("notgivebu:", unblock),
    ("ID:", lookup),
    ("coingive:", grant_coins),
    ("allcoingive:", grant_all),
    ("notcoingive:", revoke_coins),
    ("付与:", promote),
    ("削除:", demote),
];

impl Command {
    /// Parses trimmed chat text. `Ok(None)` means the text is not a command.
    pub fn parse(text: &str) -> Result<Option<Self>, ParseError> {
        let text = text.trim();
        let exact = match text {
            "check" => Some(Self::Check),
            "情報" => Some(Self::Info),
            "スロット" => Some(Self::Slot),
            "おみくじ" => Some(Self::Fortune),
            "notkey" => Some(Self::ResetKeywords),
            "ブラックリスト一覧" => Some(Self::ListBlocked),
            _ => None,
        };
        if exact.is_some() {
            return Ok(exact);
        }

        for (prefix, parse_args) in PREFIXES {
            if let Some(rest) = text.strip_prefix(prefix) {
                return parse_args(rest).map(Some);
            }
        }
        Ok(None)
    }

    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Check => CommandKind::Check,
            Self::Info => CommandKind::Info,
            Self::Slot => CommandKind::Slot,
            Self::Fortune => CommandKind::Fortune,
            Self::SetKeyword { .. } => CommandKind::SetKeyword,
            Self::ResetKeywords => CommandKind::ResetKeywords,
            Self::Block { .. } => CommandKind::Block,
            Self::Unblock { .. } => CommandKind::Unblock,
            Self::ListBlocked => CommandKind::ListBlocked,
            Self::Lookup { .. } => CommandKind::Lookup,
            Self::GrantCoins { .. } => CommandKind::GrantCoins,
            Self::GrantAll { .. } => CommandKind::GrantAll,
            Self::RevokeCoins { .. } => CommandKind::RevokeCoins,
            Self::Promote { .. } => CommandKind::Promote,
            Self::Demote { .. } => CommandKind::Demote,
        }
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.kind().tier()
    }
}

fn set_keyword(rest: &str) -> Result<Command, ParseError> {
    let kind = CommandKind::SetKeyword;
    // Only the segment between the second and third colon is the reply.
    let mut parts = rest.split(':');
    let trigger = parts.next().unwrap_or_default();
    let reply = parts.next().ok_or(ParseError::Missing {
        kind,
        field: "reply",
    })?;
    if trigger.is_empty() {
        return Err(ParseError::Missing {
            kind,
            field: "trigger",
        });
    }
    if reply.is_empty() {
        return Err(ParseError::Missing {
            kind,
            field: "reply",
        });
    }
    Ok(Command::SetKeyword {
        trigger: trigger.to_owned(),
        reply: reply.to_owned(),
    })
}

fn block(rest: &str) -> Result<Command, ParseError> {
    let target = first_field(CommandKind::Block, rest)?;
    Ok(Command::Block { target })
}

fn unblock(rest: &str) -> Result<Command, ParseError> {
    let target = first_field(CommandKind::Unblock, rest)?;
    Ok(Command::Unblock { target })
}

fn lookup(rest: &str) -> Result<Command, ParseError> {
    let target = non_empty(CommandKind::Lookup, Some(rest), "user id")?;
    Ok(Command::Lookup { target })
}

fn grant_coins(rest: &str) -> Result<Command, ParseError> {
    let (target, amount) = target_and_amount(CommandKind::GrantCoins, rest)?;
    Ok(Command::GrantCoins { target, amount })
}

fn grant_all(rest: &str) -> Result<Command, ParseError> {
    let amount = amount(CommandKind::GrantAll, rest.split(':').next())?;
    Ok(Command::GrantAll { amount })
}

fn revoke_coins(rest: &str) -> Result<Command, ParseError> {
    let (target, amount) = target_and_amount(CommandKind::RevokeCoins, rest)?;
    Ok(Command::RevokeCoins { target, amount })
}

fn promote(rest: &str) -> Result<Command, ParseError> {
    let target = first_field(CommandKind::Promote, rest)?;
    Ok(Command::Promote { target })
}

fn demote(rest: &str) -> Result<Command, ParseError> {
    let target = first_field(CommandKind::Demote, rest)?;
    Ok(Command::Demote { target })
}

fn first_field(kind: CommandKind, rest: &str) -> Result<String, ParseError> {
    non_empty(kind, rest.split(':').next(), "user id")
}

fn target_and_amount(kind: CommandKind, rest: &str) -> Result<(String, u32), ParseError> {
    let mut parts = rest.split(':');
    let target = non_empty(kind, parts.next(), "user id")?;
    let amount = amount(kind, parts.next())?;
    Ok((target, amount))
}

fn non_empty(
    kind: CommandKind,
    field: Option<&str>,
    name: &'static str,
) -> Result<String, ParseError> {
    match field.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_owned()),
        Some(_) | None => Err(ParseError::Missing { kind, field: name }),
    }
}

fn amount(kind: CommandKind, field: Option<&str>) -> Result<u32, ParseError> {
    let raw = non_empty(kind, field, "amount")?;
    raw.parse()
        .map_err(|_| ParseError::InvalidAmount { kind, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<Command> {
        Command::parse(text).unwrap()
    }

    #[test]
    fn exact_words() {
        assert_eq!(parse("check"), Some(Command::Check));
        assert_eq!(parse("  情報 "), Some(Command::Info));
        assert_eq!(parse("スロット"), Some(Command::Slot));
        assert_eq!(parse("おみくじ"), Some(Command::Fortune));
        assert_eq!(parse("notkey"), Some(Command::ResetKeywords));
        assert_eq!(parse("ブラックリスト一覧"), Some(Command::ListBlocked));
        assert_eq!(parse("check please"), None);
        assert_eq!(parse("hello"), None);
    }

    #[test]
    fn keyword_reply_stops_at_the_next_colon() {
        assert_eq!(
            parse("key:時間:12:00です"),
            Some(Command::SetKeyword {
                trigger: "時間".to_owned(),
                reply: "12".to_owned(),
            })
        );
        assert_eq!(
            Command::parse("key:a::c"),
            Err(ParseError::Missing {
                kind: CommandKind::SetKeyword,
                field: "reply",
            })
        );
    }

    #[test]
    fn keyword_requires_both_parts() {
        assert_eq!(
            Command::parse("key:only"),
            Err(ParseError::Missing {
                kind: CommandKind::SetKeyword,
                field: "reply"
            })
        );
        assert_eq!(
            Command::parse("key::reply"),
            Err(ParseError::Missing {
                kind: CommandKind::SetKeyword,
                field: "trigger"
            })
        );
    }

    #[test]
    fn prefixes_do_not_shadow_each_other() {
        assert_eq!(
            parse("notgivebu:U1"),
            Some(Command::Unblock {
                target: "U1".to_owned()
            })
        );
        assert_eq!(
            parse("givebu:U1"),
            Some(Command::Block {
                target: "U1".to_owned()
            })
        );
        assert_eq!(parse("allcoingive:10"), Some(Command::GrantAll { amount: 10 }));
        assert_eq!(
            parse("notcoingive:U1:5"),
            Some(Command::RevokeCoins {
                target: "U1".to_owned(),
                amount: 5
            })
        );
        assert_eq!(
            parse("coingive:U1:5"),
            Some(Command::GrantCoins {
                target: "U1".to_owned(),
                amount: 5
            })
        );
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let err = Command::parse("coingive:U1:lots").unwrap_err();
        assert_eq!(err.kind(), CommandKind::GrantCoins);
        assert!(matches!(err, ParseError::InvalidAmount { ref value, .. } if value == "lots"));

        let err = Command::parse("allcoingive:-3").unwrap_err();
        assert_eq!(err.kind(), CommandKind::GrantAll);

        let err = Command::parse("notcoingive:U1").unwrap_err();
        assert_eq!(
            err,
            ParseError::Missing {
                kind: CommandKind::RevokeCoins,
                field: "amount"
            }
        );
    }

    #[test]
    fn role_commands_take_the_first_field() {
        assert_eq!(
            parse("付与:U2"),
            Some(Command::Promote {
                target: "U2".to_owned()
            })
        );
        assert_eq!(
            parse("削除:U2:extra"),
            Some(Command::Demote {
                target: "U2".to_owned()
            })
        );
        assert_eq!(Command::parse("付与:").unwrap_err().kind(), CommandKind::Promote);
    }

    #[test]
    fn lookup_uses_whole_remainder() {
        assert_eq!(
            parse("ID:Uabc"),
            Some(Command::Lookup {
                target: "Uabc".to_owned()
            })
        );
        assert_eq!(Command::parse("ID:").unwrap_err().kind(), CommandKind::Lookup);
    }

    #[test]
    fn tiers_follow_command_groups() {
        assert_eq!(Command::Slot.tier(), Tier::Member);
        assert_eq!(Command::ListBlocked.tier(), Tier::SubAdmin);
        assert_eq!(Command::GrantAll { amount: 1 }.tier(), Tier::Admin);

        assert!(Tier::Member.permits(Role::Member));
        assert!(!Tier::Member.permits(Role::Blocked));
        assert!(!Tier::SubAdmin.permits(Role::Member));
        assert!(Tier::SubAdmin.permits(Role::Admin));
        assert!(!Tier::Admin.permits(Role::SubAdmin));
    }
}
