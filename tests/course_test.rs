mod common;

use serde_json::Value;

async fn create_course(app: &common::TestApp, token: &str, name: &str, year: i32) -> i64 {
    let resp = app
        .client
        .post(app.url("/courses"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": name,
            "description": "Core course",
            "year": year
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn courses_are_listed_newest_year_first() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::login_admin(&app).await;

    create_course(&app, &admin_token, "Operating Systems", 2023).await;
    create_course(&app, &admin_token, "Compilers", 2024).await;
    create_course(&app, &admin_token, "Algorithms", 2024).await;

    let resp = app.client.get(app.url("/courses")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Algorithms", "Compilers", "Operating Systems"]);
}

#[tokio::test]
async fn courses_without_a_year_are_listed_last() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::login_admin(&app).await;

    let resp = app
        .client
        .post(app.url("/courses"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Electives" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    create_course(&app, &admin_token, "Databases", 2022).await;
    create_course(&app, &admin_token, "Networks", 2025).await;

    let resp = app.client.get(app.url("/courses")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Networks", "Databases", "Electives"]);
    assert!(body["data"][2]["year"].is_null());
}

#[tokio::test]
async fn inactive_courses_are_hidden_unless_requested() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::login_admin(&app).await;
    let id = create_course(&app, &admin_token, "Retired", 2020).await;

    let resp = app
        .client
        .put(app.url(&format!("/courses/{}", id)))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Retired", "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], false);

    let resp = app.client.get(app.url("/courses")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    let resp = app
        .client
        .get(app.url("/courses?include_inactive=true"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn course_detail_includes_questions() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::login_admin(&app).await;
    let id = create_course(&app, &admin_token, "Databases", 2024).await;

    let resp = app
        .client
        .post(app.url("/questions"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "question_name": "Joins",
            "subject": "DBMS",
            "topic": "SQL",
            "link": "https://example.com/joins",
            "course_id": id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/courses/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Databases");
    assert_eq!(body["data"]["question_count"], 1);
    assert_eq!(body["data"]["questions"][0]["question_name"], "Joins");

    // Referenced courses cannot be deleted
    let resp = app
        .client
        .delete(app.url(&format!("/courses/{}", id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn course_names_are_unique_and_writes_need_admin() {
    let app = common::spawn_app().await;
    let (_, token, _) = common::login_user(&app, "student").await;
    let (_, admin_token) = common::login_admin(&app).await;

    let resp = app
        .client
        .post(app.url("/courses"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Networks" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let id = create_course(&app, &admin_token, "Networks", 2024).await;

    let resp = app
        .client
        .post(app.url("/courses"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Networks" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = app
        .client
        .delete(app.url(&format!("/courses/{}", id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/courses/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
