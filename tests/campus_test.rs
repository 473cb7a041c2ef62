mod common;

use serde_json::Value;

#[tokio::test]
async fn list_campuses_returns_seeded_campuses_by_name() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/campuses")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let slugs: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["bangalore", "delhi-ncr", "pune"]);
}

#[tokio::test]
async fn campus_counts_only_approved_questions() {
    let app = common::spawn_app().await;
    let (_, token, _) = common::login_user(&app, "student").await;
    let (_, admin_token) = common::login_admin(&app).await;

    let question_id = common::contribute(&app, &token, "pune", "Two Sum").await;
    common::contribute(&app, &token, "pune", "Three Sum").await;

    let resp = app
        .client
        .put(app.url(&format!("/questions/{}/approval", question_id)))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "is_approved": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/campuses/pune"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["question_count"], 1);
}

#[tokio::test]
async fn unknown_campus_is_not_found() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/campuses/atlantis"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Campus not found");
}

#[tokio::test]
async fn semesters_cover_one_through_eight() {
    let app = common::spawn_app().await;
    let (_, token, _) = common::login_user(&app, "student").await;
    common::contribute(&app, &token, "bangalore", "Merge Intervals").await;

    let resp = app
        .client
        .get(app.url("/campuses/bangalore/semesters"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["campus"]["slug"], "bangalore");
    let semesters = body["data"]["semesters"].as_array().unwrap();
    assert_eq!(semesters.len(), 8);
    assert_eq!(semesters[0]["semester"], 1);
    assert_eq!(semesters[2]["question_count"], 1);
    assert_eq!(semesters[7]["question_count"], 0);
}

#[tokio::test]
async fn campus_crud_requires_admin() {
    let app = common::spawn_app().await;
    let (_, token, _) = common::login_user(&app, "student").await;
    let (_, admin_token) = common::login_admin(&app).await;

    let payload = serde_json::json!({
        "name": "Hyderabad",
        "slug": "hyderabad",
        "description": "New campus"
    });

    let resp = app
        .client
        .post(app.url("/campuses"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/campuses"))
        .bearer_auth(&admin_token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Duplicate slug
    let resp = app
        .client
        .post(app.url("/campuses"))
        .bearer_auth(&admin_token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Deactivate hides it from the public list
    let resp = app
        .client
        .put(app.url("/campuses/hyderabad"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Hyderabad", "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], false);

    let resp = app.client.get(app.url("/campuses")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let resp = app
        .client
        .delete(app.url("/campuses/hyderabad"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/campuses/hyderabad"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn campus_with_questions_cannot_be_deleted() {
    let app = common::spawn_app().await;
    let (_, token, _) = common::login_user(&app, "student").await;
    let (_, admin_token) = common::login_admin(&app).await;
    common::contribute(&app, &token, "delhi-ncr", "LRU Cache").await;

    let resp = app
        .client
        .delete(app.url("/campuses/delhi-ncr"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn invalid_slug_is_rejected() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::login_admin(&app).await;

    let resp = app
        .client
        .post(app.url("/campuses"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Bad", "slug": "Bad Slug!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
