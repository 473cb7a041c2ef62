mod common;

use serde_json::Value;

#[tokio::test]
async fn verify_token_creates_user_and_issues_session() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-alice", "Alice@Example.com", "Alice")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["user"]["name"], "Alice");
    assert_eq!(body["data"]["user"]["is_admin"], false);
    assert!(body["data"]["user"]["last_login_at"].as_str().is_some());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // Session token works on protected routes
    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "alice@example.com");

    // Second sign-in reuses the same account
    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-alice", "alice@example.com", "Alice")
        }))
        .send()
        .await
        .unwrap();
    let again: Value = resp.json().await.unwrap();
    assert_eq!(again["data"]["user"]["id"], body["data"]["id"]);
}

#[tokio::test]
async fn verify_token_rejects_missing_and_invalid_tokens() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({ "id_token": "garbage" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn provider_token_is_accepted_on_protected_routes() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth(common::id_token("uid-direct", "direct@test.com", ""))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    // No provider name falls back to the email's local part
    assert_eq!(body["data"]["name"], "direct");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn pro_check_requires_pro_flag() {
    let app = common::spawn_app().await;
    let (user_id, token, _) = common::login_user(&app, "student").await;

    let resp = app
        .client
        .get(app.url("/auth/pro-check"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    common::make_pro(&app.db, user_id).await;

    let resp = app
        .client
        .get(app.url("/auth/pro-check"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_pro"], true);
}

#[tokio::test]
async fn logout_always_succeeds() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn setup_admin_requires_secret_and_enables_login() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/setup-admin"))
        .json(&serde_json::json!({
            "email": "head@test.com",
            "unique_key": "wrong-secret",
            "name": "Head"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/auth/setup-admin"))
        .json(&serde_json::json!({
            "email": "head@test.com",
            "unique_key": common::ADMIN_SECRET,
            "name": "Head"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "head@test.com");

    // Public admin directory lists the new admin
    let resp = app
        .client
        .get(app.url("/auth/admins"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let admins = body["data"].as_array().unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0]["name"], "Head");

    // Key login issues a session with admin rights
    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({
            "email": "head@test.com",
            "unique_key": common::ADMIN_SECRET
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["is_admin"], true);
    let token = body["data"]["token"].as_str().unwrap();

    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Wrong key
    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({
            "email": "head@test.com",
            "unique_key": "nope"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn setup_admin_links_to_later_provider_sign_in() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/setup-admin"))
        .json(&serde_json::json!({
            "email": "linked@test.com",
            "unique_key": common::ADMIN_SECRET,
            "name": "Linked"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-linked", "linked@test.com", "Linked")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["is_admin"], true);
}

#[tokio::test]
async fn second_identity_with_taken_email_is_refused() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-owner", "owner@test.com", "Owner")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let owner: Value = resp.json().await.unwrap();
    let owner_id = owner["data"]["user"]["id"].as_i64().unwrap() as i32;
    common::make_admin(&app.db, owner_id).await;

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-intruder", "Owner@test.com", "Intruder")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    // Raw provider tokens take the same path on protected routes.
    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(common::id_token("uid-intruder", "owner@test.com", "Intruder"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The owner keeps the account.
    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-owner", "owner@test.com", "Owner")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], owner["data"]["user"]["id"]);
    assert_eq!(body["data"]["user"]["is_admin"], true);
}

#[tokio::test]
async fn unverified_email_cannot_claim_admin_placeholder() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/setup-admin"))
        .json(&serde_json::json!({
            "email": "dean@test.com",
            "unique_key": common::ADMIN_SECRET,
            "name": "Dean"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::unverified_id_token("uid-fake-dean", "dean@test.com", "Dean")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The placeholder is still free for the verified owner.
    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-dean", "dean@test.com", "Dean")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["is_admin"], true);
}

#[tokio::test]
async fn claimed_placeholder_cannot_be_claimed_again() {
    let app = common::spawn_app().await;

    app.client
        .post(app.url("/auth/setup-admin"))
        .json(&serde_json::json!({
            "email": "chair@test.com",
            "unique_key": common::ADMIN_SECRET,
            "name": "Chair"
        }))
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-chair", "chair@test.com", "Chair")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url("/auth/verify-token"))
        .json(&serde_json::json!({
            "id_token": common::id_token("uid-other", "chair@test.com", "Other")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = common::spawn_app().await;

    for path in ["/auth/setup-admin", "/auth/login"] {
        let resp = app
            .client
            .post(app.url(path))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{}", path);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().is_some(), "{}", path);
    }

    let resp = app
        .client
        .post(app.url("/auth/setup-admin"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}
