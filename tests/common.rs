// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory store, stub collaborators, and fixture helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pat-engine contributors
#![allow(dead_code)]

//! Shared test setup for `pat_engine` integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pat_engine::codec::TokenCodec;
use pat_engine::config::AccessTokenConfig;
use pat_engine::errors::AppResult;
use pat_engine::models::{AccessToken, ResourceKind, TokenScope};
use pat_engine::scope::{ResourceAccess, ScopeResolver, TeamMembership};
use pat_engine::service::AccessTokenService;
use pat_engine::store::SqliteTokenStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fixed HMAC key for deterministic test hashing
pub const TEST_HASH_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

/// Codec matching the test configuration
pub fn test_codec() -> TokenCodec {
    TokenCodec::new("pat", &TEST_HASH_KEY).unwrap()
}

/// Engine configuration used by the test harness
pub fn test_config() -> AccessTokenConfig {
    AccessTokenConfig {
        token_prefix: "pat".into(),
        hash_key: TEST_HASH_KEY.to_vec(),
        mint_max_attempts: 5,
        store_timeout: Duration::from_secs(5),
    }
}

/// Standard in-memory store setup
pub async fn create_test_store() -> Arc<SqliteTokenStore> {
    init_test_logging();
    Arc::new(SqliteTokenStore::new("sqlite::memory:").await.unwrap())
}

/// Mutable in-memory stand-in for the team-membership subsystem
#[derive(Default)]
pub struct StubTeams {
    members: Mutex<HashSet<(Uuid, String)>>,
    admins: Mutex<HashSet<(Uuid, String)>>,
}

impl StubTeams {
    pub fn add_member(&self, user_id: Uuid, team_id: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((user_id, team_id.to_owned()));
    }

    pub fn remove_member(&self, user_id: Uuid, team_id: &str) {
        self.members
            .lock()
            .unwrap()
            .remove(&(user_id, team_id.to_owned()));
    }

    pub fn add_admin(&self, user_id: Uuid, team_id: &str) {
        self.add_member(user_id, team_id);
        self.admins
            .lock()
            .unwrap()
            .insert((user_id, team_id.to_owned()));
    }
}

#[async_trait]
impl TeamMembership for StubTeams {
    async fn is_member(&self, user_id: Uuid, team_id: &str) -> AppResult<bool> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .contains(&(user_id, team_id.to_owned())))
    }

    async fn is_admin(&self, user_id: Uuid, team_id: &str) -> AppResult<bool> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .contains(&(user_id, team_id.to_owned())))
    }
}

/// Mutable in-memory stand-in for the collection/environment permission
/// subsystem
#[derive(Default)]
pub struct StubResources {
    allowed: Mutex<HashSet<(Uuid, ResourceKind, String)>>,
}

impl StubResources {
    pub fn allow(&self, user_id: Uuid, kind: ResourceKind, resource_id: &str) {
        self.allowed
            .lock()
            .unwrap()
            .insert((user_id, kind, resource_id.to_owned()));
    }

    pub fn revoke_access(&self, user_id: Uuid, kind: ResourceKind, resource_id: &str) {
        self.allowed
            .lock()
            .unwrap()
            .remove(&(user_id, kind, resource_id.to_owned()));
    }
}

#[async_trait]
impl ResourceAccess for StubResources {
    async fn can_access(
        &self,
        user_id: Uuid,
        resource_kind: ResourceKind,
        resource_id: &str,
    ) -> AppResult<bool> {
        Ok(self
            .allowed
            .lock()
            .unwrap()
            .contains(&(user_id, resource_kind, resource_id.to_owned())))
    }
}

/// Fully wired service over an in-memory store and stub collaborators
pub struct TestHarness {
    pub service: AccessTokenService,
    pub store: Arc<SqliteTokenStore>,
    pub teams: Arc<StubTeams>,
    pub resources: Arc<StubResources>,
}

/// Standard service setup for lifecycle tests
pub async fn create_test_service() -> TestHarness {
    let store = create_test_store().await;
    let teams = Arc::new(StubTeams::default());
    let resources = Arc::new(StubResources::default());
    let resolver = ScopeResolver::new(
        Arc::clone(&teams) as Arc<dyn TeamMembership>,
        Arc::clone(&resources) as Arc<dyn ResourceAccess>,
    );
    let service = AccessTokenService::new(
        Arc::clone(&store) as _,
        test_codec(),
        resolver,
        Arc::clone(&teams) as Arc<dyn TeamMembership>,
        &test_config(),
    );
    TestHarness {
        service,
        store,
        teams,
        resources,
    }
}

/// Team-wide scope shorthand
pub fn team_scope(team_id: &str) -> TokenScope {
    TokenScope::Team {
        team_id: team_id.to_owned(),
    }
}

/// Resource-pinned scope shorthand
pub fn resource_scope(team_id: &str, kind: ResourceKind, resource_id: &str) -> TokenScope {
    TokenScope::TeamResource {
        team_id: team_id.to_owned(),
        resource_kind: kind,
        resource_id: resource_id.to_owned(),
    }
}

/// Build a token record plus its external string, for direct store inserts
pub fn make_token(
    codec: &TokenCodec,
    owner_user_id: Uuid,
    scope: TokenScope,
    expires_at: Option<DateTime<Utc>>,
) -> (AccessToken, String) {
    let minted = codec.mint();
    let token = AccessToken {
        id: minted.token_id,
        owner_user_id,
        label: "test token".into(),
        secret_hash: minted.secret_hash,
        scope,
        created_at: Utc::now(),
        expires_at,
        last_used_at: None,
    };
    (token, minted.external)
}
