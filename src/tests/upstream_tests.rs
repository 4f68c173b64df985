use httpmock::prelude::*;
use serde_json::json;

use crate::error::BreakwaterError;
use crate::jwt::{Audience, VerifiedClaims};
use crate::upstream::{ChatClient, Provisioner, build_username};

fn claims() -> VerifiedClaims {
    VerifiedClaims {
        iss: "https://issuer.example.com".to_string(),
        aud: Audience::One("breakwater-client".to_string()),
        sub: "user_abcdef123456".to_string(),
        email: "alice@example.com".to_string(),
        exp: 4_102_444_800,
        nbf: None,
        given_name: Some("Alice".to_string()),
        family_name: Some("Archer".to_string()),
    }
}

fn user_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": "alice@example.com",
        "username": "alice_123456",
        "first_name": "Alice",
        "last_name": "Archer",
    })
}

fn provisioner(server: &MockServer) -> Provisioner {
    Provisioner::new(
        ChatClient::new(server.base_url(), "admintoken".to_string()),
        "team1".to_string(),
        Some("chan1".to_string()),
    )
}

#[tokio::test]
async fn provision_creates_a_missing_user() {
    crate::logging::setup_test_logging();
    let server = MockServer::start_async().await;

    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/users/email/alice@example.com");
            then.status(404).json_body(json!({"message": "not found"}));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v4/users")
                .header("authorization", "Bearer admintoken")
                .json_body_partial(
                    r#"{"email": "alice@example.com", "auth_service": "oidc", "auth_data": "user_abcdef123456"}"#,
                );
            then.status(201).json_body(user_json("u1"));
        })
        .await;
    let team_lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/teams/team1/members/u1");
            then.status(404);
        })
        .await;
    let team_join = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/teams/team1/members");
            then.status(201).json_body(json!({}));
        })
        .await;
    let channel_lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/channels/chan1/members/u1");
            then.status(404);
        })
        .await;
    let channel_join = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/channels/chan1/members");
            then.status(201).json_body(json!({}));
        })
        .await;
    let session = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/users/u1/sessions");
            then.status(200)
                .json_body(json!({"token": "sess-token", "expires_at": 1735689600000_i64}));
        })
        .await;

    let (user, session_out) = provisioner(&server).provision(&claims()).await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(session_out.token.as_deref(), Some("sess-token"));
    assert_eq!(session_out.expires_at, Some(1735689600000));

    lookup.assert_async().await;
    create.assert_async().await;
    team_lookup.assert_async().await;
    team_join.assert_async().await;
    channel_lookup.assert_async().await;
    channel_join.assert_async().await;
    session.assert_async().await;
}

#[tokio::test]
async fn provision_tolerates_patch_rejection_for_existing_user() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/users/email/alice@example.com");
            then.status(200).json_body(user_json("u2"));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/v4/users/u2/patch");
            then.status(403).json_body(json!({"message": "auth change not allowed"}));
        })
        .await;
    // Already a member everywhere.
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/teams/team1/members/u2");
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/channels/chan1/members/u2");
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/users/u2/sessions");
            then.status(200).json_body(json!({"token": "sess-token"}));
        })
        .await;

    let (user, _) = provisioner(&server).provision(&claims()).await.unwrap();
    assert_eq!(user.id, "u2");
    patch.assert_async().await;
}

#[tokio::test]
async fn provision_fails_when_session_has_no_token() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/users/email/alice@example.com");
            then.status(200).json_body(user_json("u3"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/v4/users/u3/patch");
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/teams/team1/members/u3");
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v4/channels/chan1/members/u3");
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/users/u3/sessions");
            then.status(200).json_body(json!({"expires_at": 0}));
        })
        .await;

    assert!(matches!(
        provisioner(&server).provision(&claims()).await,
        Err(BreakwaterError::Other(_))
    ));
}

#[tokio::test]
async fn get_me_maps_unauthorized_to_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v4/users/me")
                .header("authorization", "Bearer stale-token");
            then.status(401).json_body(json!({"message": "expired"}));
        })
        .await;

    let client = ChatClient::new(server.base_url(), "admintoken".to_string());
    assert!(matches!(
        client.get_me("stale-token").await,
        Err(BreakwaterError::Auth(_))
    ));
}

#[test]
fn username_combines_local_part_and_subject_suffix() {
    assert_eq!(
        build_username("a.b+c@example.com", "user_abcdef123456"),
        "abc_123456"
    );
    assert_eq!(build_username("Alice@example.com", "XYZ-123"), "alice_xyz123");
}

#[test]
fn username_skips_empty_components() {
    assert_eq!(build_username("+++@example.com", "sub123"), "sub123");
    assert_eq!(build_username("bob@example.com", "___"), "bob");
    assert_eq!(build_username("@", ""), "");
}
