//! Persisted view of a remote collection.

use super::client::CollectionKey;
use super::error::WafResult;
use super::rule::{LockToken, RuleCollection};
use serde::{Deserialize, Serialize};

/// Flattened collection plus the identifiers needed for the next write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionState {
    /// Service-assigned identifier
    pub id: String,
    /// Token from the most recent read or write
    pub lock_token: LockToken,
    /// Flattened collection, rules sorted by priority
    pub collection: RuleCollection,
}

impl CollectionState {
    /// Remote key of the collection
    pub fn key(&self) -> CollectionKey {
        CollectionKey {
            collection_type: self.collection.kind.collection_type(),
            id: self.id.clone(),
            name: self.collection.name.clone(),
            scope: self.collection.scope,
        }
    }

    /// Encode for the state store
    ///
    /// # Errors
    ///
    /// Returns [`super::WafError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> WafResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from the state store
    ///
    /// # Errors
    ///
    /// Returns [`super::WafError::Serialization`] if the blob is not a valid
    /// state document.
    pub fn from_json(json: &str) -> WafResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
