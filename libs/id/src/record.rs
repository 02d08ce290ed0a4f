//! Identifiers for records owned by domain services.
//!
//! A [`RecordId`] is a ULID tagged with the kind of record it names and
//! written as `{prefix}_{ulid}`. The kind lives only in the type, so an
//! `IntentId` can never be passed where a `GoalId` is expected, and parsing
//! rejects identifiers minted for another kind.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::IdError;

/// A kind of record identified by a [`RecordId`].
pub trait RecordKind {
    /// Written before the ULID, without the underscore.
    const PREFIX: &'static str;

    /// Field name the identifier travels under in payloads and requests.
    const FIELD: &'static str;
}

/// An intent submitted by a person.
#[derive(Debug)]
pub enum Intent {}

/// A goal decomposed from an intent.
#[derive(Debug)]
pub enum Goal {}

/// A rendered experience.
#[derive(Debug)]
pub enum Experience {}

/// A virtual display session driven by an agent.
#[derive(Debug)]
pub enum DisplaySession {}

impl RecordKind for Intent {
    const PREFIX: &'static str = "int";
    const FIELD: &'static str = "intent_id";
}

impl RecordKind for Goal {
    const PREFIX: &'static str = "goal";
    const FIELD: &'static str = "goal_id";
}

impl RecordKind for Experience {
    const PREFIX: &'static str = "exp";
    const FIELD: &'static str = "experience_id";
}

impl RecordKind for DisplaySession {
    const PREFIX: &'static str = "vdi";
    const FIELD: &'static str = "session_id";
}

pub type IntentId = RecordId<Intent>;
pub type GoalId = RecordId<Goal>;
pub type ExperienceId = RecordId<Experience>;
pub type DisplaySessionId = RecordId<DisplaySession>;

/// Time-sortable identifier of a `K` record.
pub struct RecordId<K> {
    ulid: Ulid,
    kind: PhantomData<fn() -> K>,
}

impl<K: RecordKind> RecordId<K> {
    pub const PREFIX: &'static str = K::PREFIX;

    /// Mints a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ulid: Ulid::new(),
            kind: PhantomData,
        }
    }

    /// Milliseconds since the Unix epoch at which the identifier was minted.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.ulid.timestamp_ms()
    }

    /// Parses `{prefix}_{ulid}`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        let body = s
            .strip_prefix(K::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| IdError::WrongKind {
                expected: K::PREFIX,
                input: s.to_string(),
            })?;
        let ulid = Ulid::from_string(body).map_err(|_| IdError::InvalidBody {
            body: body.to_string(),
        })?;
        Ok(Self {
            ulid,
            kind: PhantomData,
        })
    }
}

impl<K: RecordKind> Default for RecordId<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for RecordId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for RecordId<K> {}

impl<K> PartialEq for RecordId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<K> Eq for RecordId<K> {}

impl<K> PartialOrd for RecordId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for RecordId<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<K> Hash for RecordId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<K: RecordKind> fmt::Display for RecordId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", K::PREFIX, self.ulid)
    }
}

impl<K: RecordKind> fmt::Debug for RecordId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({self})")
    }
}

impl<K: RecordKind> FromStr for RecordId<K> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<K: RecordKind> From<RecordId<K>> for String {
    fn from(id: RecordId<K>) -> Self {
        id.to_string()
    }
}

impl<K: RecordKind> Serialize for RecordId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, K: RecordKind> Deserialize<'de> for RecordId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
