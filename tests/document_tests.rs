// tests/document_tests.rs

mod common;

use std::io::Cursor;

use common::{TestApp, question, spawn_app, sub_question};
use serde_json::{Value, json};

const KINDS: [&str; 3] = ["question-paper", "answer-sheet", "blueprint"];

async fn assert_pdfs(app: &TestApp, paper_id: i64) {
    for kind in KINDS {
        let res = app.get(&format!("/papers/{}/pdf/{}", paper_id, kind)).await;
        assert_eq!(res.status().as_u16(), 200, "{}", kind);
        assert_eq!(
            res.headers()["content-type"].to_str().unwrap(),
            "application/pdf"
        );
        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.contains(&format!("_{}.pdf", paper_id)), "{}", disposition);

        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"), "{} is not a PDF", kind);
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert!(!doc.get_pages().is_empty());
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_fn(60, 30, |x, _| {
        if x < 30 {
            image::Rgb([20, 20, 20])
        } else {
            image::Rgb([240, 240, 240])
        }
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

async fn upload(app: &TestApp, bytes: Vec<u8>, name: &str) -> reqwest::Response {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    app.client
        .post(app.url("/uploads"))
        .bearer_auth(&app.token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn heading_only_paper_renders_all_documents() {
    let app = spawn_app().await;
    let (_, paper_id) = app.start_paper().await;
    assert_pdfs(&app, paper_id).await;
}

#[tokio::test]
async fn complete_paper_with_images_renders_all_documents() {
    let app = spawn_app().await;
    let (token, paper_id) = app.start_paper().await;

    let res = upload(&app, png_bytes(), "diagram.png").await;
    assert_eq!(res.status().as_u16(), 201);
    let body: Value = res.json().await.unwrap();
    let path = body["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("question_images/"));
    assert!(app.media.path().join(&path).exists());

    let mut with_image = question(1, "U", "Label the diagram.");
    with_image["image_path"] = json!(path);
    with_image["image_position"] = json!("middle");
    with_image["text_below_image"] = json!("Explain each part.");
    with_image["answer_image_path"] = json!(path);
    with_image["answer_equation"] = json!("a<sup>2</sup> + b<sup>2</sup>");

    let mut broken = question(2, "R", "Image that is gone.");
    broken["image_path"] = json!("question_images/missing.png");

    app.save_part(
        &token,
        "a",
        json!({"question_count": 2, "mark_per_question": 1}),
        vec![with_image, broken],
    )
    .await;
    app.save_part(
        &token,
        "b",
        json!({"question_count": 3, "required_count": 2, "mark_per_question": 6}),
        vec![
            question(3, "U", "Explain sorting."),
            sub_question(3, "Bubble sort.", 0),
            question(4, "A", "Explain hashing."),
        ],
    )
    .await;
    let res = app
        .save_part(
            &token,
            "c",
            json!({"question_count": 2, "required_count": 1, "mark_per_question": 14}),
            vec![question(1, "A", "Write a stack."), question(2, "A", "Write a queue.")],
        )
        .await;
    assert_eq!(res.status().as_u16(), 200);

    assert_pdfs(&app, paper_id).await;

    // Uploaded media is served read-only.
    let res = app
        .client
        .get(format!("{}/media/{}", app.address, path))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_paper_documents_are_not_found() {
    let app = spawn_app().await;
    for kind in KINDS {
        let res = app.get(&format!("/papers/4242/pdf/{}", kind)).await;
        assert_eq!(res.status().as_u16(), 404);
    }
    let res = app.get("/papers/4242/blueprint").await;
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn downloads_lists_three_documents() {
    let app = spawn_app().await;
    let (_, paper_id) = app.start_paper().await;

    let body: Value = app
        .get(&format!("/papers/{}/downloads", paper_id))
        .await
        .json()
        .await
        .unwrap();
    let docs = body["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(
        docs[1]["url"],
        format!("/api/papers/{}/pdf/answer-sheet", paper_id)
    );
    assert_eq!(docs[1]["filename"], format!("answer_sheet_{}.pdf", paper_id));
}

#[tokio::test]
async fn blueprint_splits_marks_by_module_hours() {
    let app = spawn_app().await;
    let (token, paper_id) = app.start_paper().await;

    app.save_part(
        &token,
        "a",
        json!({"question_count": 2, "mark_per_question": 1}),
        vec![question(1, "R", "One."), question(1, "R", "Two.")],
    )
    .await;
    app.save_part(
        &token,
        "b",
        json!({"question_count": 2, "required_count": 1, "mark_per_question": 6}),
        vec![question(2, "U", "Three."), question(2, "U", "Four.")],
    )
    .await;

    let res = app.get(&format!("/papers/{}/blueprint", paper_id)).await;
    assert_eq!(res.status().as_u16(), 200);
    let report: Value = res.json().await.unwrap();

    // maximum mark 2 + 6 = 8 over 40 hours, 10 each.
    assert_eq!(report["maximum_mark"], 8);
    assert_eq!(report["module_rows"][0]["mark_share"], 2.0);

    let m1 = &report["module_rows"][0];
    assert_eq!(m1["a"]["questions"], 2);
    assert_eq!(m1["a"]["marks"], 2);
    let m2 = &report["module_rows"][1];
    assert_eq!(m2["b"]["questions"], 2);
    assert_eq!(m2["b"]["marks"], 12);
    assert_eq!(m2["c"]["marks"], 0);

    let r = &report["level_rows"][0];
    assert_eq!(r["code"], "R");
    assert_eq!(r["percent"], 30.0);
    assert_eq!(r["total"]["questions"], 2);
    assert_eq!(report["level_totals"]["percent"], 100.0);
}

#[tokio::test]
async fn uploads_must_be_images() {
    let app = spawn_app().await;

    let res = upload(&app, b"plain text, not an image".to_vec(), "notes.png").await;
    assert_eq!(res.status().as_u16(), 400);

    let form = reqwest::multipart::Form::new().text("other", "value");
    let res = app
        .client
        .post(app.url("/uploads"))
        .bearer_auth(&app.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}
