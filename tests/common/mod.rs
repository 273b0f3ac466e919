// tests/common/mod.rs

#![allow(dead_code)]

use exam_composer::{config::Config, routes, state::AppState, utils::hash::hash_password};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tempfile::TempDir;

pub struct TestApp {
    /// Base URL, e.g. "http://127.0.0.1:12345".
    pub address: String,
    /// Bearer token of the seeded staff account.
    pub token: String,
    /// Bearer token of the seeded admin account.
    pub admin_token: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    /// Media root; removed when the app is dropped.
    pub media: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Opens a wizard and saves a valid heading. Returns (token, paper id).
    pub async fn start_paper(&self) -> (String, i64) {
        let res = self.post("/wizard", &json!({})).await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        let token = body["wizard"]["token"].as_str().unwrap().to_string();

        let res = self
            .post(&format!("/wizard/{}/heading", token), &heading())
            .await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        let paper_id = body["paper"]["id"].as_i64().unwrap();

        (token, paper_id)
    }

    /// Runs the counts and questions steps of one part.
    pub async fn save_part(&self, token: &str, part: &str, counts: Value, questions: Vec<Value>) -> reqwest::Response {
        let res = self
            .post(&format!("/wizard/{}/sections/{}/counts", token, part), &counts)
            .await;
        assert_eq!(res.status().as_u16(), 200, "counts for part {}", part);

        self.post(
            &format!("/wizard/{}/sections/{}/questions", token, part),
            &json!({
                "info": "Answer all questions.",
                "questions": questions
            }),
        )
        .await
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn heading() -> Value {
    json!({
        "code": 1001,
        "revision": "2021",
        "subject_code": "CS101",
        "exam_name": "Semester Exam",
        "module1_hours": 10,
        "module2_hours": 10,
        "module3_hours": 10,
        "module4_hours": 10,
        "percent_r": 30.0,
        "percent_u": 40.0,
        "percent_a": 30.0
    })
}

pub fn question(module: i64, level: &str, text: &str) -> Value {
    json!({
        "module": module,
        "outcome": format!("M{}.01", module),
        "level": level,
        "question": text,
        "answer_text": format!("Answer to {}", text)
    })
}

pub fn sub_question(module: i64, text: &str, parent_slot: usize) -> Value {
    let mut q = question(module, "U", text);
    q["parent"] = json!({ "slot": parent_slot });
    q
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    // A single never-recycled connection keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    sqlx::query("INSERT INTO revisions (year) VALUES ('2021')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO subject_codes (code, subject_name, duration_hours) VALUES ('CS101', 'Data Structures', 3)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO exam_names (name) VALUES ('Semester Exam')")
        .execute(&pool)
        .await
        .unwrap();
    for n in 1..=4 {
        sqlx::query("INSERT INTO question_modules (module_number) VALUES (?)")
            .bind(n)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO module_outcomes (outcome_code) VALUES (?)")
            .bind(format!("M{}.01", n))
            .execute(&pool)
            .await
            .unwrap();
    }

    for (username, password, role) in [("staff", "staff-pass", "staff"), ("admin", "admin-pass", "admin")] {
        sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
            .bind(username)
            .bind(hash_password(password).unwrap())
            .bind(role)
            .execute(&pool)
            .await
            .unwrap();
    }

    let media = tempfile::tempdir().expect("Failed to create media root");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        media_root: media.path().to_path_buf(),
        port: 0,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let token = login(&client, &address, "staff", "staff-pass").await;
    let admin_token = login(&client, &address, "admin", "admin-pass").await;

    TestApp {
        address,
        token,
        admin_token,
        pool,
        client,
        media,
    }
}

pub async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let res = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(res.status().as_u16(), 200);

    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}
