// ABOUTME: Scope resolver - decides whether a token may perform a requested operation
// ABOUTME: Conjunctive checks against injected team-membership and resource-permission capabilities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

//! # Scope Resolution
//!
//! Answers "can this token perform operation O on resource R?". The
//! membership and permission subsystems are consumed as injected capability
//! traits, never reimplemented. Checks are conjunctive and the first failing
//! check short-circuits with its specific reason; the service collapses the
//! reason at its public boundary but logs it first.

use crate::errors::AppResult;
use crate::models::{AccessToken, ResourceKind, TokenScope};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Team-membership subsystem, consulted at mint and re-consulted on every
/// validation since membership can change
#[async_trait]
pub trait TeamMembership: Send + Sync {
    /// Whether the user currently belongs to the team
    ///
    /// # Errors
    ///
    /// Returns an error on infrastructure failure, distinct from a `false`
    /// answer.
    async fn is_member(&self, user_id: Uuid, team_id: &str) -> AppResult<bool>;

    /// Whether the user currently administers the team (backs team-admin
    /// revocation)
    ///
    /// # Errors
    ///
    /// Returns an error on infrastructure failure, distinct from a `false`
    /// answer.
    async fn is_admin(&self, user_id: Uuid, team_id: &str) -> AppResult<bool>;
}

/// Team-collection/team-environment permission subsystem
#[async_trait]
pub trait ResourceAccess: Send + Sync {
    /// Whether the user can access the resource through their own effective
    /// permissions
    ///
    /// # Errors
    ///
    /// Returns an error on infrastructure failure, distinct from a `false`
    /// answer.
    async fn can_access(
        &self,
        user_id: Uuid,
        resource_kind: ResourceKind,
        resource_id: &str,
    ) -> AppResult<bool>;
}

/// A specific collection or environment named by a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Kind of the resource
    pub kind: ResourceKind,
    /// Resource identifier
    pub id: String,
}

/// The access a request is asking the token to exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAccess {
    /// Team the operation targets
    pub team_id: String,
    /// Specific resource, when the operation targets one
    pub resource: Option<ResourceRef>,
}

impl RequestedAccess {
    /// Team-level access with no specific resource
    pub fn team(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            resource: None,
        }
    }

    /// Access to one resource within a team
    pub fn resource(
        team_id: impl Into<String>,
        kind: ResourceKind,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            team_id: team_id.into(),
            resource: Some(ResourceRef {
                kind,
                id: resource_id.into(),
            }),
        }
    }
}

/// Why a scope check denied the request. Reported specifically for
/// debuggability, collapsed to a generic failure at the public boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeDenial {
    /// Token is bound to a different team than the request targets
    #[error("token is scoped to a different team")]
    ScopeMismatch,
    /// Token owner is no longer a member of the scope team
    #[error("token owner is no longer a member of the team")]
    MembershipRevoked,
    /// Resource-pinned token asked to act outside its pinned resource
    #[error("token is pinned to a different resource")]
    ResourceScopeMismatch,
    /// Owner's own effective permissions do not reach the resource
    #[error("token owner cannot access the requested resource")]
    PermissionDenied,
}

/// Outcome of scope resolution; infrastructure failures travel separately
/// as errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// All checks passed
    Granted,
    /// A check failed, with its specific reason
    Denied(ScopeDenial),
}

/// Resolves token scopes against the injected capability interfaces
#[derive(Clone)]
pub struct ScopeResolver {
    teams: Arc<dyn TeamMembership>,
    resources: Arc<dyn ResourceAccess>,
}

impl ScopeResolver {
    /// Create a resolver over the two capability interfaces
    #[must_use]
    pub fn new(teams: Arc<dyn TeamMembership>, resources: Arc<dyn ResourceAccess>) -> Self {
        Self { teams, resources }
    }

    /// Decide whether `token` may exercise `requested`.
    ///
    /// Checks run in order and the first failure wins:
    /// 1. scope team must equal the requested team;
    /// 2. the owner must still be a member of that team;
    /// 3. a team-wide scope delegates any named resource to the owner's own
    ///    permissions;
    /// 4. a resource-pinned scope additionally requires the request to name
    ///    exactly the pinned resource, and the owner must still reach it.
    ///
    /// # Errors
    ///
    /// Returns an error when a capability interface fails, distinct from a
    /// denial.
    pub async fn authorize(
        &self,
        token: &AccessToken,
        requested: &RequestedAccess,
    ) -> AppResult<Authorization> {
        if token.scope.team_id() != requested.team_id {
            return Ok(Authorization::Denied(ScopeDenial::ScopeMismatch));
        }

        if !self
            .teams
            .is_member(token.owner_user_id, requested.team_id.as_str())
            .await?
        {
            return Ok(Authorization::Denied(ScopeDenial::MembershipRevoked));
        }

        match &token.scope {
            TokenScope::Team { .. } => {
                if let Some(resource) = &requested.resource {
                    if !self
                        .resources
                        .can_access(token.owner_user_id, resource.kind, &resource.id)
                        .await?
                    {
                        return Ok(Authorization::Denied(ScopeDenial::PermissionDenied));
                    }
                }
                Ok(Authorization::Granted)
            }
            TokenScope::TeamResource {
                resource_kind,
                resource_id,
                ..
            } => {
                // narrower scope never widens: a pinned token cannot act
                // team-wide, nor on a sibling resource
                let Some(resource) = &requested.resource else {
                    return Ok(Authorization::Denied(ScopeDenial::ResourceScopeMismatch));
                };
                if resource.kind != *resource_kind || resource.id != *resource_id {
                    return Ok(Authorization::Denied(ScopeDenial::ResourceScopeMismatch));
                }
                if !self
                    .resources
                    .can_access(token.owner_user_id, resource.kind, &resource.id)
                    .await?
                {
                    return Ok(Authorization::Denied(ScopeDenial::PermissionDenied));
                }
                Ok(Authorization::Granted)
            }
        }
    }
}
