//! Access scenarios through the full router.
//!
//! Run with: `cargo test -p atlvs-api --test access_test`

mod helpers;

use atlvs_core::feature_flags::FEATURE_OPENDECK;
use atlvs_core::models::{MembershipStatus, Role};
use atlvs_gate::memory::InMemoryStore;
use axum::http::StatusCode;
use chrono::Utc;
use helpers::{api_path, bearer, setup_test_app, TestUser};
use serde_json::Value;
use std::sync::Arc;

fn child_ids(navigation: &Value, section: &str) -> Vec<String> {
    navigation["sections"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == section)
        .map(|s| {
            s["children"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c["id"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn section_ids(navigation: &Value) -> Vec<String> {
    navigation["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_manager_without_assignments_sees_projects_overview_only() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    store.add_project(org, "Festival build").await;
    let u1 = TestUser::new("u1@example.com");
    store.add_membership(org, u1.id, Role::Manager).await;
    let app = setup_test_app(store);
    let client = app.client();

    let navigation: Value = client
        .get(&api_path("/navigation"))
        .add_header("Authorization", bearer(&u1))
        .await
        .json();
    assert_eq!(child_ids(&navigation, "projects"), vec!["overview"]);
    assert!(!child_ids(&navigation, "settings").contains(&"billing".to_string()));

    client
        .get("/projects/overview")
        .add_header("Authorization", bearer(&u1))
        .await
        .assert_status_ok();
    client
        .get("/projects/all")
        .add_header("Authorization", bearer(&u1))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    client
        .get("/settings/billing")
        .add_header("Authorization", bearer(&u1))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let projects = client
        .get(&api_path("/projects"))
        .add_header("Authorization", bearer(&u1))
        .await;
    projects.assert_status_ok();
    let body: Value = projects.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["narrowing"], "projects_overview_only");

    client
        .post(&api_path("/projects"))
        .add_header("Authorization", bearer(&u1))
        .json(&serde_json::json!({ "name": "Side stage" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_gets_opendeck_from_user_entitlement() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    let u2 = TestUser::new("u2@example.com");
    store.add_membership(org, u2.id, Role::Admin).await;
    store
        .set_organization_entitlements(org, &[(FEATURE_OPENDECK, false)])
        .await;
    store
        .set_user_entitlements(u2.id, &[(FEATURE_OPENDECK, true)])
        .await;
    let app = setup_test_app(store);
    let client = app.client();

    let entitlements: Value = client
        .get(&api_path("/entitlements"))
        .add_header("Authorization", bearer(&u2))
        .await
        .json();
    assert_eq!(entitlements["entitlements"][FEATURE_OPENDECK], true);
    assert_eq!(entitlements["organization_id"], org.to_string());

    let navigation: Value = client
        .get(&api_path("/navigation"))
        .add_header("Authorization", bearer(&u2))
        .await
        .json();
    assert!(section_ids(&navigation).contains(&"marketplace".to_string()));

    client
        .get("/marketplace/listings")
        .add_header("Authorization", bearer(&u2))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_marketplace_hidden_without_entitlement() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    let owner = TestUser::new("owner@example.com");
    store.add_membership(org, owner.id, Role::Owner).await;
    let app = setup_test_app(store);
    let client = app.client();

    let navigation: Value = client
        .get(&api_path("/navigation"))
        .add_header("Authorization", bearer(&owner))
        .await
        .json();
    assert!(!section_ids(&navigation).contains(&"marketplace".to_string()));
    assert!(!section_ids(&navigation).contains(&"analytics".to_string()));

    client
        .get("/marketplace")
        .add_header("Authorization", bearer(&owner))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_limited_role_without_assignments_is_overview_only() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    store.add_project(org, "Arena tour").await;
    let client_user = TestUser::new("client@example.com");
    store.add_membership(org, client_user.id, Role::Client).await;
    let app = setup_test_app(store);
    let client = app.client();

    let navigation: Value = client
        .get(&api_path("/navigation"))
        .add_header("Authorization", bearer(&client_user))
        .await
        .json();
    assert_eq!(section_ids(&navigation), vec!["overview"]);

    client
        .get("/dashboard")
        .add_header("Authorization", bearer(&client_user))
        .await
        .assert_status_ok();
    client
        .get(&api_path("/projects"))
        .add_header("Authorization", bearer(&client_user))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assigned_client_sees_only_assigned_projects() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    let visible = store.add_project(org, "Visible").await;
    store.add_project(org, "Hidden").await;
    let vendor = TestUser::new("vendor@example.com");
    store.add_membership(org, vendor.id, Role::Vendor).await;
    store.assign_project(org, visible, vendor.id).await;
    let app = setup_test_app(store);

    let body: Value = app
        .client()
        .get(&api_path("/projects"))
        .add_header("Authorization", bearer(&vendor))
        .await
        .json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["scope"], "assigned_projects");
    assert_eq!(body["projects"][0]["id"], visible.to_string());
}

#[tokio::test]
async fn test_context_shape() {
    let store = Arc::new(InMemoryStore::new());
    let org = store.add_organization("O1").await;
    let crew = TestUser::new("crew@example.com");
    store.add_membership(org, crew.id, Role::TeamMember).await;
    let project = store.add_project(org, "Load-in").await;
    store.assign_project(org, project, crew.id).await;
    let app = setup_test_app(store);

    let response = app
        .client()
        .get(&api_path("/context"))
        .add_header("Authorization", bearer(&crew))
        .await;
    response.assert_status_ok();
    let ctx: Value = response.json();
    assert_eq!(ctx["orgId"], org.to_string());
    assert_eq!(ctx["role"], "team_member");
    assert_eq!(ctx["projectsAssignedCount"], 1);
    assert_eq!(ctx["user"]["id"], crew.id.to_string());
    assert!(ctx["entitlements"].is_object());
}

#[tokio::test]
async fn test_default_organization_is_oldest_membership() {
    let store = Arc::new(InMemoryStore::new());
    let first = store.add_organization("First").await;
    let second = store.add_organization("Second").await;
    let user = TestUser::new("multi@example.com");
    let joined = Utc::now() - chrono::Duration::days(30);
    store
        .add_membership_at(first, user.id, Role::Member, MembershipStatus::Active, joined)
        .await;
    store
        .add_membership_at(
            second,
            user.id,
            Role::Owner,
            MembershipStatus::Active,
            joined + chrono::Duration::days(1),
        )
        .await;
    let app = setup_test_app(store);
    let client = app.client();

    let ctx: Value = client
        .get(&api_path("/context"))
        .add_header("Authorization", bearer(&user))
        .await
        .json();
    assert_eq!(ctx["orgId"], first.to_string());

    let switched: Value = client
        .get(&api_path("/context"))
        .add_header("Authorization", bearer(&user))
        .add_header("x-organization-id", second.to_string())
        .await
        .json();
    assert_eq!(switched["orgId"], second.to_string());
    assert_eq!(switched["role"], "owner");

    let organizations: Value = client
        .get(&api_path("/organizations"))
        .add_header("Authorization", bearer(&user))
        .await
        .json();
    assert_eq!(organizations["organizations"].as_array().unwrap().len(), 2);
    assert_eq!(organizations["current_organization_id"], first.to_string());
}
