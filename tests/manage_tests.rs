// tests/manage_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let res = app
        .client
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;
    let res = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = spawn_app().await;

    for path in ["/papers", "/manage/dashboard", "/lookup/subject-details?code=CS101"] {
        let res = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 401, "{}", path);
    }

    let res = app
        .client
        .post(app.url("/wizard"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({"username": "staff", "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({"username": "ghost", "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn revision_crud_and_duplicate_conflict() {
    let app = spawn_app().await;

    let res = app.post("/manage/revisions", &json!({"year": "2024"})).await;
    assert_eq!(res.status().as_u16(), 201);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["is_active"], true);

    let res = app.post("/manage/revisions", &json!({"year": "2024"})).await;
    assert_eq!(res.status().as_u16(), 409);

    let rows: Vec<Value> = app.get("/manage/revisions?search=202").await.json().await.unwrap();
    assert_eq!(rows.len(), 2);
    let rows: Vec<Value> = app.get("/manage/revisions?search=2024").await.json().await.unwrap();
    assert_eq!(rows.len(), 1);

    let res = app
        .put(
            &format!("/manage/revisions/{}", id),
            &json!({"year": "2025", "is_active": false}),
        )
        .await;
    assert_eq!(res.status().as_u16(), 200);

    // Renaming onto an existing year is a conflict too.
    let res = app
        .put(&format!("/manage/revisions/{}", id), &json!({"year": "2021"}))
        .await;
    assert_eq!(res.status().as_u16(), 409);

    // Inactive revisions are not offered on the heading step.
    let body: Value = app.post("/wizard", &json!({})).await.json().await.unwrap();
    let years: Vec<&str> = body["choices"]["revisions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["year"].as_str().unwrap())
        .collect();
    assert_eq!(years, vec!["2021"]);

    let res = app.delete(&format!("/manage/revisions/{}", id)).await;
    assert_eq!(res.status().as_u16(), 204);
    let res = app.delete(&format!("/manage/revisions/{}", id)).await;
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn subject_codes_feed_subject_details() {
    let app = spawn_app().await;

    let res = app
        .post(
            "/manage/subject-codes",
            &json!({"code": "ma201", "subject_name": "Calculus", "duration_hours": 2}),
        )
        .await;
    assert_eq!(res.status().as_u16(), 201);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["code"], "MA201");

    let res = app.get("/lookup/subject-details?code=MA201").await;
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["subject_name"], "Calculus");
    assert_eq!(body["duration_hours"], 2);

    let res = app.get("/lookup/subject-details?code=NOPE").await;
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let rows: Vec<Value> = app
        .get("/manage/subject-codes?search=calc")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn lookup_entities_round_trip() {
    let app = spawn_app().await;

    let res = app.post("/manage/exam-names", &json!({"name": "Model Exam", "display_order": 2})).await;
    assert_eq!(res.status().as_u16(), 201);
    let res = app.post("/manage/exam-names", &json!({"name": "Model Exam"})).await;
    assert_eq!(res.status().as_u16(), 409);

    // Modules 1 to 4 are seeded.
    let res = app.post("/manage/modules", &json!({"module_number": 1})).await;
    assert_eq!(res.status().as_u16(), 409);
    let res = app.post("/manage/modules", &json!({"module_number": 9})).await;
    assert_eq!(res.status().as_u16(), 400);

    let res = app
        .post(
            "/manage/outcomes",
            &json!({"outcome_code": "M1.02", "description": "Stacks <script>x</script>"}),
        )
        .await;
    assert_eq!(res.status().as_u16(), 201);
    let outcome: Value = res.json().await.unwrap();
    assert!(!outcome["description"].as_str().unwrap().contains("<script>"));

    let res = app
        .post("/manage/instructions", &json!({"text": "Answer all questions.", "part": "A"}))
        .await;
    assert_eq!(res.status().as_u16(), 201);
    let instruction: Value = res.json().await.unwrap();
    assert_eq!(instruction["part"], "a");

    let res = app.post("/manage/instructions", &json!({"text": "  ", "part": "b"})).await;
    assert_eq!(res.status().as_u16(), 400);

    let rows: Vec<Value> = app.get("/manage/instructions?search=answer").await.json().await.unwrap();
    assert_eq!(rows.len(), 1);

    // The counts step of Part A offers the instruction.
    let (token, _) = app.start_paper().await;
    let wizard: Value = app.get(&format!("/wizard/{}", token)).await.json().await.unwrap();
    assert_eq!(wizard["instructions"][0]["text"], "Answer all questions.");

    let dashboard: Value = app.get("/manage/dashboard").await.json().await.unwrap();
    assert_eq!(dashboard["papers"], 1);
    assert_eq!(dashboard["exam_names"], 2);
    assert_eq!(dashboard["modules"], 4);
    assert_eq!(dashboard["outcomes"], 5);
    assert_eq!(dashboard["instructions"], 1);
}

#[tokio::test]
async fn system_config_sets_default_exam_marks() {
    let app = spawn_app().await;

    let body: Value = app.get("/manage/system-config").await.json().await.unwrap();
    assert_eq!(body["default_max_marks"], 75);

    let res = app.put("/manage/system-config", &json!({"default_max_marks": 0})).await;
    assert_eq!(res.status().as_u16(), 400);

    let res = app.put("/manage/system-config", &json!({"default_max_marks": 60})).await;
    assert_eq!(res.status().as_u16(), 200);

    let (_, paper_id) = app.start_paper().await;
    let review: Value = app
        .get(&format!("/papers/{}/review", paper_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(review["paper"]["exam_marks"], 60);
}

#[tokio::test]
async fn only_admins_manage_users() {
    let app = spawn_app().await;

    let res = app.get("/manage/users").await;
    assert_eq!(res.status().as_u16(), 403);

    let res = app
        .client
        .get(app.url("/manage/users"))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let users: Vec<Value> = res.json().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    let res = app
        .client
        .post(app.url("/manage/users"))
        .bearer_auth(&app.admin_token)
        .json(&json!({"username": "teacher1", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let id = res.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let res = app
        .client
        .post(app.url("/manage/users"))
        .bearer_auth(&app.admin_token)
        .json(&json!({"username": "teacher1", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);

    // The new account can log in and compose.
    let token = common::login(&app.client, &app.address, "teacher1", "secret1").await;
    let res = app
        .client
        .get(app.url("/papers"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = app
        .client
        .delete(app.url(&format!("/manage/users/{}", id)))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);
}
