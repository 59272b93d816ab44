//! Logical field keys.
//!
//! Raw string keys from the configuration ("player2_hp", "common_star", ...)
//! are parsed once into a closed tagged variant so the derivation rules in
//! the resolver can match on structure instead of re-parsing strings.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::Error;

/// Number of player seats in a match.
pub const PLAYER_COUNT: u8 = 4;

/// Shared-pool counters independent of any player seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CommonKind {
    Star,
    Orange,
    Chocolate,
}

/// Match-level values outside the player blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    Dice,
    RoundCount,
    AttackDiceLeft,
    AttackDiceRight,
}

/// Player stats replicated across the four seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PlayerStat {
    Hp,
    Win,
    Star,
}

/// A logical value the engine can resolve and synchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Common(CommonKind),
    Match(MatchKind),
    Player { index: u8, stat: PlayerStat },
    PlayerName { index: u8 },
}

impl FieldKey {
    /// Every scalar field, in the fixed order ticks process them.
    pub fn roster() -> Vec<FieldKey> {
        let mut keys: Vec<FieldKey> = CommonKind::iter().map(FieldKey::Common).collect();
        keys.extend(MatchKind::iter().map(FieldKey::Match));
        for index in 1..=PLAYER_COUNT {
            keys.extend(PlayerStat::iter().map(move |stat| FieldKey::Player { index, stat }));
        }
        keys
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Common(kind) => write!(f, "common_{kind}"),
            FieldKey::Match(kind) => write!(f, "{kind}"),
            FieldKey::Player { index, stat } => write!(f, "player{index}_{stat}"),
            FieldKey::PlayerName { index } => write!(f, "player{index}_name"),
        }
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if let Some(rest) = s.strip_prefix("common_") {
            if let Ok(kind) = rest.parse() {
                return Ok(FieldKey::Common(kind));
            }
        } else if let Some(rest) = s.strip_prefix("player") {
            if let Some((index, field)) = rest.split_once('_')
                && let Ok(index) = index.parse::<u8>()
                && (1..=PLAYER_COUNT).contains(&index)
            {
                if field == "name" {
                    return Ok(FieldKey::PlayerName { index });
                }
                if let Ok(stat) = field.parse() {
                    return Ok(FieldKey::Player { index, stat });
                }
            }
        } else if let Ok(kind) = s.parse() {
            return Ok(FieldKey::Match(kind));
        }
        Err(Error::UnknownKey(s.to_string()))
    }
}
