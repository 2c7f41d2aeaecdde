//! Domain identifiers (strongly-typed IDs).
//!
//! # TaskId
//! キューごとに 0 から連番で払い出される。削除されても再利用しない。
//! ワイヤ上では素の整数として現れるので、serde は `transparent`。
//!
//! # LeaseToken
//! lease（lock）を証明する不透明な文字列。中身は ULID（Crockford base32）だが、
//! 呼び出し側はフォーマットに依存してはいけない。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a task within one queue.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The id that follows this one in allocation order.
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque proof that the holder leased a task.
///
/// Comparison against a presented token is case-insensitive: the Crockford
/// alphabet does not distinguish case, so folding it costs no entropy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseToken(String);

impl LeaseToken {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Does `presented` identify this lease?
    pub fn matches(&self, presented: &str) -> bool {
        self.0.eq_ignore_ascii_case(presented)
    }
}

impl From<Ulid> for LeaseToken {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
