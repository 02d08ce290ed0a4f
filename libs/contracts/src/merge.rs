//! Context merge strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ContractError, Record};

/// How incoming context combines with what is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Deep union. Incoming keys win on conflict; nested objects are
    /// merged key by key.
    #[default]
    Merge,
    /// Incoming context overwrites the stored context entirely.
    Replace,
}

impl MergeStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Merge => "merge",
            MergeStrategy::Replace => "replace",
        }
    }

    /// Combines `incoming` into `existing`.
    pub fn apply(&self, existing: &mut Record, incoming: Record) {
        match self {
            MergeStrategy::Merge => deep_merge(existing, incoming),
            MergeStrategy::Replace => *existing = incoming,
        }
    }
}

fn deep_merge(target: &mut Record, incoming: Record) {
    for (key, value) in incoming {
        let next = match value {
            Value::Object(next) => next,
            other => {
                target.insert(key, other);
                continue;
            }
        };
        if let Some(Value::Object(current)) = target.get_mut(&key) {
            deep_merge(current, next);
            continue;
        }
        target.insert(key, Value::Object(next));
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(MergeStrategy::Merge),
            "replace" => Ok(MergeStrategy::Replace),
            other => Err(ContractError::validation(
                "merge_strategy",
                format!("unknown strategy '{other}', expected merge or replace"),
            )),
        }
    }
}
