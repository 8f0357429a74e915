//! Player-facing game log.
//!
//! Abilities emit a public line (everyone sees it) and optionally a private
//! line (only the caster sees it). Several battle abilities publish a vague
//! public line so the opponent does not learn the exact effect until the battle
//! reveals it.
//!
//! This log is game content. Diagnostics go through `tracing`.

use serde::{Deserialize, Serialize};

use crate::entity::PlayerId;

/// Who may read a log line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Every participant.
    Public,
    /// Only this player.
    Private(PlayerId),
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Round the line was written in.
    pub round: u32,
    /// Who may read it.
    pub audience: Audience,
    /// The text.
    pub text: String,
}

/// Append-only log of public and private lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameLog {
    entries: Vec<LogEntry>,
}

impl GameLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a public line.
    pub fn public(&mut self, round: u32, text: impl Into<String>) {
        self.entries.push(LogEntry {
            round,
            audience: Audience::Public,
            text: text.into(),
        });
    }

    /// Appends a line only `player` can read.
    pub fn private(&mut self, round: u32, player: PlayerId, text: impl Into<String>) {
        self.entries.push(LogEntry {
            round,
            audience: Audience::Private(player),
            text: text.into(),
        });
    }

    /// Moves every line of `other` to the end of this log.
    pub fn append(&mut self, other: &mut GameLog) {
        self.entries.append(&mut other.entries);
    }

    /// All lines, in order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Lines `player` is allowed to read, in order.
    pub fn visible_to(&self, player: PlayerId) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| match e.audience {
            Audience::Public => true,
            Audience::Private(owner) => owner == player,
        })
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
