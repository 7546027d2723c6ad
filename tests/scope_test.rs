// ABOUTME: Scope resolver tests - grant paths and all four typed denial reasons
// ABOUTME: Uses stub membership/permission collaborators from the common harness
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors

mod common;

use common::{make_token, resource_scope, team_scope, test_codec, StubResources, StubTeams};
use pat_engine::models::{AccessToken, ResourceKind, TokenScope};
use pat_engine::scope::{
    Authorization, RequestedAccess, ResourceAccess, ScopeDenial, ScopeResolver, TeamMembership,
};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    resolver: ScopeResolver,
    teams: Arc<StubTeams>,
    resources: Arc<StubResources>,
    owner: Uuid,
}

fn fixture() -> Fixture {
    common::init_test_logging();
    let teams = Arc::new(StubTeams::default());
    let resources = Arc::new(StubResources::default());
    let resolver = ScopeResolver::new(
        Arc::clone(&teams) as Arc<dyn TeamMembership>,
        Arc::clone(&resources) as Arc<dyn ResourceAccess>,
    );
    Fixture {
        resolver,
        teams,
        resources,
        owner: Uuid::new_v4(),
    }
}

fn token_with(owner: Uuid, scope: TokenScope) -> AccessToken {
    make_token(&test_codec(), owner, scope, None).0
}

#[tokio::test]
async fn test_team_scope_granted_on_membership_alone() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    let token = token_with(f.owner, team_scope("T1"));

    let decision = f
        .resolver
        .authorize(&token, &RequestedAccess::team("T1"))
        .await
        .unwrap();
    assert_eq!(decision, Authorization::Granted);
}

#[tokio::test]
async fn test_wrong_team_is_scope_mismatch() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    f.teams.add_member(f.owner, "T2");
    let token = token_with(f.owner, team_scope("T1"));

    // even though the owner belongs to T2, this token does not
    let decision = f
        .resolver
        .authorize(&token, &RequestedAccess::team("T2"))
        .await
        .unwrap();
    assert_eq!(decision, Authorization::Denied(ScopeDenial::ScopeMismatch));
}

#[tokio::test]
async fn test_removed_member_is_membership_revoked() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    let token = token_with(f.owner, team_scope("T1"));

    f.teams.remove_member(f.owner, "T1");
    let decision = f
        .resolver
        .authorize(&token, &RequestedAccess::team("T1"))
        .await
        .unwrap();
    assert_eq!(
        decision,
        Authorization::Denied(ScopeDenial::MembershipRevoked)
    );
}

#[tokio::test]
async fn test_team_scope_delegates_resource_to_owner_permissions() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    f.resources.allow(f.owner, ResourceKind::Collection, "C9");
    let token = token_with(f.owner, team_scope("T1"));

    let reachable = RequestedAccess::resource("T1", ResourceKind::Collection, "C9");
    assert_eq!(
        f.resolver.authorize(&token, &reachable).await.unwrap(),
        Authorization::Granted
    );

    let unreachable = RequestedAccess::resource("T1", ResourceKind::Collection, "C10");
    assert_eq!(
        f.resolver.authorize(&token, &unreachable).await.unwrap(),
        Authorization::Denied(ScopeDenial::PermissionDenied)
    );
}

#[tokio::test]
async fn test_pinned_scope_grants_only_its_resource() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    f.resources.allow(f.owner, ResourceKind::Collection, "C9");
    f.resources.allow(f.owner, ResourceKind::Collection, "C10");
    let token = token_with(
        f.owner,
        resource_scope("T1", ResourceKind::Collection, "C9"),
    );

    let pinned = RequestedAccess::resource("T1", ResourceKind::Collection, "C9");
    assert_eq!(
        f.resolver.authorize(&token, &pinned).await.unwrap(),
        Authorization::Granted
    );

    // sibling resource the owner can reach is still outside the pin
    let sibling = RequestedAccess::resource("T1", ResourceKind::Collection, "C10");
    assert_eq!(
        f.resolver.authorize(&token, &sibling).await.unwrap(),
        Authorization::Denied(ScopeDenial::ResourceScopeMismatch)
    );
}

#[tokio::test]
async fn test_pinned_scope_rejects_kind_mismatch() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    f.resources.allow(f.owner, ResourceKind::Environment, "C9");
    let token = token_with(
        f.owner,
        resource_scope("T1", ResourceKind::Collection, "C9"),
    );

    // same id, different kind
    let request = RequestedAccess::resource("T1", ResourceKind::Environment, "C9");
    assert_eq!(
        f.resolver.authorize(&token, &request).await.unwrap(),
        Authorization::Denied(ScopeDenial::ResourceScopeMismatch)
    );
}

#[tokio::test]
async fn test_pinned_scope_rejects_team_wide_request() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    let token = token_with(
        f.owner,
        resource_scope("T1", ResourceKind::Collection, "C9"),
    );

    let decision = f
        .resolver
        .authorize(&token, &RequestedAccess::team("T1"))
        .await
        .unwrap();
    assert_eq!(
        decision,
        Authorization::Denied(ScopeDenial::ResourceScopeMismatch)
    );
}

#[tokio::test]
async fn test_pinned_scope_still_requires_owner_access() {
    let f = fixture();
    f.teams.add_member(f.owner, "T1");
    let token = token_with(
        f.owner,
        resource_scope("T1", ResourceKind::Collection, "C9"),
    );

    // pin matches, but the owner lost access to C9 since mint
    let request = RequestedAccess::resource("T1", ResourceKind::Collection, "C9");
    assert_eq!(
        f.resolver.authorize(&token, &request).await.unwrap(),
        Authorization::Denied(ScopeDenial::PermissionDenied)
    );
}

#[tokio::test]
async fn test_team_check_precedes_membership_check() {
    let f = fixture();
    // owner belongs to no team at all; the team mismatch still wins
    let token = token_with(f.owner, team_scope("T1"));

    let decision = f
        .resolver
        .authorize(&token, &RequestedAccess::team("T2"))
        .await
        .unwrap();
    assert_eq!(decision, Authorization::Denied(ScopeDenial::ScopeMismatch));
}
