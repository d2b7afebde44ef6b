//! Collection lifecycle against the remote control API.
//!
//! [`ControlApi`] is the transport seam: it speaks wire types and lock tokens
//! only. [`CollectionClient`] layers the grammar, the transforms, the retry
//! policy and the optimistic-lock contract on top of it.

use super::collection::RuleId;
use super::error::{WafError, WafResult};
use super::expand::Expander;
use super::flatten::flatten_collection;
use super::grammar::Grammar;
use super::retry::RetryPolicy;
use super::rule::{CollectionKind, LockToken, Rule, RuleCollection, Scope};
use super::state::CollectionState;
use super::wire::WireCollection;
use crate::config::ControlPlaneConfig;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

/// Remote collection flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionType {
    /// Web ACL
    WebAcl,
    /// Rule group
    RuleGroup,
}

impl CollectionKind {
    /// Remote flavor of this kind
    pub fn collection_type(&self) -> CollectionType {
        match self {
            Self::WebAcl { .. } => CollectionType::WebAcl,
            Self::RuleGroup { .. } => CollectionType::RuleGroup,
        }
    }
}

/// Address of a remote collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    /// Collection flavor
    pub collection_type: CollectionType,
    /// Service-assigned identifier
    pub id: String,
    /// Collection name
    pub name: String,
    /// Deployment scope
    pub scope: Scope,
}

impl CollectionKey {
    /// Key of the web ACL a rule identifier points into
    pub fn for_rule(id: &RuleId) -> Self {
        Self {
            collection_type: CollectionType::WebAcl,
            id: id.collection_id.clone(),
            name: id.collection_name.clone(),
            scope: id.scope,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.id, self.name, self.scope)
    }
}

/// Collection body as returned by a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCollection {
    /// Current lock token
    pub lock_token: LockToken,
    /// Wire body
    pub collection: WireCollection,
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCollection {
    /// Service-assigned identifier
    pub id: String,
    /// Initial lock token
    pub lock_token: LockToken,
}

/// Remote rule-engine control API.
///
/// Implementations map service exceptions onto [`WafError`]: missing
/// collections to `NotFound`, stale tokens to `Conflict`, throttling and
/// unavailable entities to `TransientService`, and referenced deletes to
/// `AssociatedItem`.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Read a collection and its current lock token
    async fn get(&self, key: &CollectionKey) -> WafResult<RemoteCollection>;

    /// Create a collection
    async fn create(
        &self,
        collection_type: CollectionType,
        scope: Scope,
        collection: &WireCollection,
    ) -> WafResult<CreatedCollection>;

    /// Replace a collection's body, rule list included; returns the next lock token
    async fn update(
        &self,
        key: &CollectionKey,
        collection: &WireCollection,
        lock_token: &LockToken,
    ) -> WafResult<LockToken>;

    /// Delete a collection
    async fn delete(&self, key: &CollectionKey, lock_token: &LockToken) -> WafResult<()>;
}

/// Grammar-checked, retrying collection client
#[derive(Debug)]
pub struct CollectionClient<A> {
    api: A,
    expander: Expander,
    retry: RetryPolicy,
}

impl<A: ControlApi> CollectionClient<A> {
    /// Create a client using the engine and retry settings of `config`
    pub fn new(api: A, config: &ControlPlaneConfig) -> Self {
        Self {
            api,
            expander: Expander::new(Grammar::from_config(&config.engine)),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Underlying API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Read and flatten a collection
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the collection does not exist, `MalformedWire`
    /// if the body cannot be flattened, or the last remote error.
    pub async fn read(&self, key: &CollectionKey) -> WafResult<CollectionState> {
        let remote = self
            .retry
            .run(&format!("read {key}"), || self.api.get(key))
            .await?;
        debug!("Read {} with lock token {}", key, remote.lock_token);
        Ok(CollectionState {
            id: key.id.clone(),
            lock_token: remote.lock_token,
            collection: flatten_collection(&remote.collection, key.scope)?,
        })
    }

    /// Read a collection, mapping `NotFound` to `None`
    ///
    /// # Errors
    ///
    /// Returns any error of [`CollectionClient::read`] other than `NotFound`.
    pub async fn find(&self, key: &CollectionKey) -> WafResult<Option<CollectionState>> {
        match self.read(key).await {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Validate, expand and create a collection
    ///
    /// # Errors
    ///
    /// Returns `Validation` before any remote call if the collection is
    /// invalid, otherwise the last remote error.
    pub async fn create(&self, collection: &RuleCollection) -> WafResult<CollectionState> {
        let wire = self.expander.expand_collection(collection)?;
        let collection_type = collection.kind.collection_type();
        let created = self
            .retry
            .run(&format!("create {}", collection.name), || {
                self.api.create(collection_type, collection.scope, &wire)
            })
            .await?;
        info!("Created {} '{}' as {}", collection.kind.as_str(), collection.name, created.id);

        Ok(CollectionState {
            id: created.id,
            lock_token: created.lock_token,
            collection: flatten_collection(&wire, collection.scope)?,
        })
    }

    /// Resubmit the whole collection under the lock token held in `state`
    ///
    /// # Errors
    ///
    /// Returns `Validation` before any remote call if `collection` is
    /// invalid, `Conflict` if the token is stale (re-read before retrying),
    /// otherwise the last remote error.
    pub async fn update(
        &self,
        state: &CollectionState,
        collection: &RuleCollection,
    ) -> WafResult<CollectionState> {
        let wire = self.expander.expand_collection(collection)?;
        let key = state.key();
        let lock_token = self
            .retry
            .run(&format!("update {key}"), || {
                self.api.update(&key, &wire, &state.lock_token)
            })
            .await?;
        info!(
            "Updated {} with {} rule(s), lock token {}",
            key,
            wire.rules.len(),
            lock_token
        );

        Ok(CollectionState {
            id: state.id.clone(),
            lock_token,
            collection: flatten_collection(&wire, collection.scope)?,
        })
    }

    /// Delete a collection; deleting a missing collection succeeds
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the token is stale, or the last remote error
    /// once the retry budget is spent.
    pub async fn delete(&self, key: &CollectionKey, lock_token: &LockToken) -> WafResult<()> {
        match self
            .retry
            .run(&format!("delete {key}"), || self.api.delete(key, lock_token))
            .await
        {
            Ok(()) => {
                info!("Deleted {}", key);
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                debug!("{} already deleted", key);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// Read a single rule of a web ACL
    ///
    /// # Errors
    ///
    /// Returns any error of [`CollectionClient::read`].
    pub async fn rule(&self, id: &RuleId) -> WafResult<Option<Rule>> {
        let state = self.read(&CollectionKey::for_rule(id)).await?;
        Ok(state.collection.rule(&id.rule_name).cloned())
    }

    /// Add or replace one rule of a web ACL.
    ///
    /// Reads the collection for a fresh lock token, then resubmits the whole
    /// rule list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the rule name does not match `id` or the
    /// edited collection is invalid, `Conflict` if the collection changed
    /// between the read and the write, otherwise the last remote error.
    pub async fn put_rule(&self, id: &RuleId, rule: Rule) -> WafResult<CollectionState> {
        if rule.name != id.rule_name {
            return Err(WafError::validation(
                "name",
                format!("rule '{}' does not match id {id}", rule.name),
            ));
        }

        let state = self.read(&CollectionKey::for_rule(id)).await?;
        let mut collection = state.collection.clone();
        let replaced = collection.upsert_rule(rule);
        debug!(
            "{} rule {}",
            if replaced.is_some() { "Replacing" } else { "Adding" },
            id
        );
        self.update(&state, &collection).await
    }

    /// Remove one rule of a web ACL; a missing rule or web ACL succeeds
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the collection changed between the read and the
    /// write, otherwise the last remote error.
    pub async fn delete_rule(&self, id: &RuleId) -> WafResult<()> {
        let Some(state) = self.find(&CollectionKey::for_rule(id)).await? else {
            debug!("Web ACL for rule {} already deleted", id);
            return Ok(());
        };

        let mut collection = state.collection.clone();
        if collection.remove_rule(&id.rule_name).is_none() {
            debug!("Rule {} already removed", id);
            return Ok(());
        }

        match self.update(&state, &collection).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
