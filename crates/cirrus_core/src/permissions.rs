//! Record-level access control.
//!
//! Grants and revokes accumulate on a record as [`PermissionChanges`] and
//! are sent after the record is saved. Pending changes are merged per
//! `(username, permission)` pair with the last write winning, so granting
//! and then revoking the same permission sends only the revoke.

use crate::error::{CoreError, CoreResult};
use cirrus_transport::{Method, Transport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Username that stands for everyone.
pub const PUBLIC: &str = "*";

/// Read access.
pub const READ: &str = "read";
/// Update access.
pub const UPDATE: &str = "update";
/// Delete access.
pub const DELETE: &str = "delete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Grant,
    Revoke,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Change {
    kind: ChangeKind,
    usernames: Vec<String>,
    permissions: Vec<String>,
}

/// Pending permission changes of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionChanges {
    changes: Vec<Change>,
}

impl PermissionChanges {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a grant.
    pub fn grant<U, P>(&mut self, usernames: U, permissions: P)
    where
        U: IntoIterator,
        U::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.push(ChangeKind::Grant, usernames, permissions);
    }

    /// Queues a revoke.
    pub fn revoke<U, P>(&mut self, usernames: U, permissions: P)
    where
        U: IntoIterator,
        U::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.push(ChangeKind::Revoke, usernames, permissions);
    }

    fn push<U, P>(&mut self, kind: ChangeKind, usernames: U, permissions: P)
    where
        U: IntoIterator,
        U::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let change = Change {
            kind,
            usernames: usernames.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        };
        if !change.usernames.is_empty() && !change.permissions.is_empty() {
            self.changes.push(change);
        }
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Drops every pending change.
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Merges the pending changes into the request body for a record.
    pub fn delta(&self, object_id: &str) -> PermissionDelta {
        let mut merged: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();

        for change in &self.changes {
            for username in &change.usernames {
                let (grants, revokes) = merged.entry(username.as_str()).or_default();
                for permission in &change.permissions {
                    let permission = permission.as_str();
                    match change.kind {
                        ChangeKind::Grant => {
                            revokes.remove(permission);
                            grants.insert(permission);
                        }
                        ChangeKind::Revoke => {
                            grants.remove(permission);
                            revokes.insert(permission);
                        }
                    }
                }
            }
        }

        let entry = |username: &str, permissions: &BTreeSet<&str>| PermissionEntry {
            object_id: object_id.to_string(),
            username: username.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        };

        let mut delta = PermissionDelta::default();
        for (username, (grants, revokes)) in &merged {
            if !grants.is_empty() {
                delta.grants.push(entry(username, grants));
            }
            if !revokes.is_empty() {
                delta.revokes.push(entry(username, revokes));
            }
        }
        delta
    }
}

/// One user's permissions on one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Record identifier.
    #[serde(rename = "sysObjectId")]
    pub object_id: String,
    /// Username, or `*` for everyone.
    pub username: String,
    /// Permission names.
    pub permissions: Vec<String>,
}

/// Body of a `POST permissions` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDelta {
    /// Permissions to add.
    pub grants: Vec<PermissionEntry>,
    /// Permissions to remove.
    pub revokes: Vec<PermissionEntry>,
}

impl PermissionDelta {
    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty() && self.revokes.is_empty()
    }
}

/// Sends permission changes to the backend.
#[derive(Debug, Clone)]
pub struct PermissionsService {
    transport: Transport,
}

impl PermissionsService {
    /// Creates a service over a transport.
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Sends a delta. Empty deltas are skipped.
    pub async fn send(&self, delta: &PermissionDelta) -> CoreResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        debug!(
            grants = delta.grants.len(),
            revokes = delta.revokes.len(),
            "sending permission changes"
        );
        let body = serde_json::to_value(delta)
            .map_err(|e| CoreError::unexpected_response(e.to_string()))?;
        self.transport
            .request(Method::Post, "permissions", &[], Some(&body))
            .await?;
        Ok(())
    }
}
