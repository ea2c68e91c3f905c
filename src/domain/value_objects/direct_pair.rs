//! Normalised participant pair of a direct conversation.
//!
//! A direct thread is identified by its unordered pair of users. The pair is
//! stored with the smaller id first so that `(a, b)` and `(b, a)` produce the
//! same key, which the store protects with a UNIQUE index.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectPair {
    low: i64,
    high: i64,
}

impl DirectPair {
    /// Build the pair for two distinct users. Returns `None` for `a == b`.
    pub fn new(a: i64, b: i64) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Parse a stored key of the form `"<low>:<high>"`.
    pub fn from_key(key: &str) -> Option<Self> {
        let (low, high) = key.split_once(':')?;
        Self::new(low.parse().ok()?, high.parse().ok()?)
    }

    /// The unique key persisted alongside the thread.
    pub fn key(&self) -> String {
        format!("{}:{}", self.low, self.high)
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The member of the pair that is not `user_id`.
    pub fn other(&self, user_id: i64) -> Option<i64> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    pub fn members(&self) -> [i64; 2] {
        [self.low, self.high]
    }
}

impl fmt::Display for DirectPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
