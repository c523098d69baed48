//! Unique identifiers for resources created by apply-mode cases.
//!
//! Cloud resource names must not collide between cases that run at the same
//! time, or between a run and leftovers from an earlier one.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Process-wide sequence added to the random base of every entropy suffix.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);
static BASE: OnceLock<u64> = OnceLock::new();

/// How a unique id is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Decimal Unix seconds. Two ids issued in the same second collide.
    UnixSeconds,
    /// `<unix seconds>-<4 hex chars>`.
    #[default]
    SecondsWithEntropy,
}

impl NamingStrategy {
    /// Issue a fresh id using the current wall clock.
    #[must_use]
    pub fn unique_id(self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        match self {
            NamingStrategy::UnixSeconds => now.as_secs().to_string(),
            NamingStrategy::SecondsWithEntropy => {
                let suffix = entropy_base(now.as_nanos())
                    .wrapping_add(SEQUENCE.fetch_add(1, Ordering::Relaxed));
                format!("{}-{:04x}", now.as_secs(), suffix & 0xffff)
            }
        }
    }

    /// `<prefix>-<unique id>`.
    #[must_use]
    pub fn unique_name(self, prefix: &str) -> String {
        join_name(prefix, &self.unique_id())
    }
}

/// Issue an id with the default strategy.
#[must_use]
pub fn unique_id() -> String {
    NamingStrategy::default().unique_id()
}

/// `<prefix>-<unique id>` with the default strategy.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    NamingStrategy::default().unique_name(prefix)
}

/// Join a prefix and an already issued id.
#[must_use]
pub fn join_name(prefix: &str, id: &str) -> String {
    format!("{prefix}-{id}")
}

/// Random per-process starting point. Consecutive suffixes inside one process
/// differ until the 16-bit space wraps.
fn entropy_base(nanos: u128) -> u64 {
    *BASE.get_or_init(|| {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u128(nanos);
        hasher.finish()
    })
}
