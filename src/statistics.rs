//! Hierarchical hit counters keyed by dot-separated paths.
//!
//! `increment("/user.args.valid", 1)` creates `{"/user": {"args": {"valid": 1}}}`.
//! Every key is either a counter (leaf) or a container of sub-keys (branch)
//! for the lifetime of the tree; using a key both ways is reported as an
//! error and leaves the tree untouched.
//!
//! The whole tree sits behind one mutex. Increments and snapshots are
//! serialized against each other, which keeps every snapshot consistent.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("invalid statistics path '{path}': segments must be non-empty")]
    InvalidPath { path: String },

    #[error("cannot increment '{path}': '{counter}' is already a counter")]
    LeafUsedAsBranch { path: String, counter: String },

    #[error("cannot increment '{path}': it already holds nested counters")]
    BranchUsedAsLeaf { path: String },

    #[error("counter '{path}' would overflow")]
    Overflow { path: String },

    #[error("failed to serialize statistics: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StatisticsError {
    /// True when a key was used inconsistently as counter and container.
    pub fn is_path_conflict(&self) -> bool {
        matches!(
            self,
            StatisticsError::LeafUsedAsBranch { .. } | StatisticsError::BranchUsedAsLeaf { .. }
        )
    }
}

/// One entry of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatisticsNode {
    Leaf(i64),
    Branch(BTreeMap<String, StatisticsNode>),
}

/// Concurrent tree of integer counters.
#[derive(Debug, Default)]
pub struct StatisticsTree {
    root: Mutex<BTreeMap<String, StatisticsNode>>,
}

impl StatisticsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the counter at `path` and returns its new value.
    ///
    /// Missing containers along the path are created. A missing counter
    /// starts at `delta`.
    pub fn increment(&self, path: &str, delta: i64) -> Result<i64, StatisticsError> {
        let segments = split_path(path)?;
        let Some((counter, parents)) = segments.split_last() else {
            return Err(StatisticsError::InvalidPath {
                path: path.to_string(),
            });
        };

        let mut root = self.root.lock();
        let mut current = &mut *root;

        // Existing nodes are only descended into. Once a segment is missing
        // every remaining segment is new, so nothing below can conflict and
        // no partially created branch is ever left behind by an error.
        for (depth, segment) in parents.iter().enumerate() {
            let node = current
                .entry((*segment).to_string())
                .or_insert_with(|| StatisticsNode::Branch(BTreeMap::new()));
            current = match node {
                StatisticsNode::Branch(children) => children,
                StatisticsNode::Leaf(_) => {
                    return Err(StatisticsError::LeafUsedAsBranch {
                        path: path.to_string(),
                        counter: segments[..=depth].join("."),
                    });
                }
            };
        }

        match current.get_mut(*counter) {
            Some(StatisticsNode::Leaf(value)) => {
                *value = value
                    .checked_add(delta)
                    .ok_or_else(|| StatisticsError::Overflow {
                        path: path.to_string(),
                    })?;
                Ok(*value)
            }
            Some(StatisticsNode::Branch(_)) => Err(StatisticsError::BranchUsedAsLeaf {
                path: path.to_string(),
            }),
            None => {
                current.insert((*counter).to_string(), StatisticsNode::Leaf(delta));
                Ok(delta)
            }
        }
    }

    /// Current value of the counter at `path`, if it exists and is a counter.
    pub fn counter(&self, path: &str) -> Option<i64> {
        let segments = split_path(path).ok()?;
        let (counter, parents) = segments.split_last()?;

        let root = self.root.lock();
        let mut current = &*root;
        for segment in parents {
            match current.get(*segment)? {
                StatisticsNode::Branch(children) => current = children,
                StatisticsNode::Leaf(_) => return None,
            }
        }
        match current.get(*counter)? {
            StatisticsNode::Leaf(value) => Some(*value),
            StatisticsNode::Branch(_) => None,
        }
    }

    /// Serializes the whole tree as compact JSON, keys sorted.
    pub fn snapshot(&self) -> Result<String, StatisticsError> {
        let root = self.root.lock();
        Ok(serde_json::to_string(&*root)?)
    }

    /// The whole tree as a JSON value.
    pub fn snapshot_value(&self) -> Result<serde_json::Value, StatisticsError> {
        let root = self.root.lock();
        Ok(serde_json::to_value(&*root)?)
    }

    pub fn is_empty(&self) -> bool {
        self.root.lock().is_empty()
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, StatisticsError> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StatisticsError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(segments)
}
