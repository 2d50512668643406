mod support;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use lectern::application::form::SUBMIT_FAILED_MESSAGE;
use lectern::cache::Regeneration;

use support::{MemoryContentStore, TestApp, app, article, body_text};

const DAY: Duration = Duration::from_secs(86_400);

fn seeded_app() -> TestApp {
    app(
        MemoryContentStore::with_articles(vec![article("post-1", "hello", "Hello")]),
        DAY,
    )
}

fn api_request(content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/createComment");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/post/hello")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[tokio::test]
async fn create_comment_stores_unapproved_comment() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(api_request(
            Some("application/json"),
            r#"{"_id":"post-1","name":"Ann","email":"a@x.com","comment":"Nice post"}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Comment submitted");
    assert_eq!(body["id"], "comment-1");

    let stored = app.store.comments();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].article_id, "post-1");
    assert_eq!(stored[0].name, "Ann");
    assert_eq!(stored[0].email, "a@x.com");
    assert_eq!(stored[0].comment, "Nice post");
    assert!(!stored[0].approved);
}

#[tokio::test]
async fn create_comment_accepts_body_without_json_content_type() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(api_request(
            Some("text/plain;charset=UTF-8"),
            r#"{"_id":"post-1","name":"Ann","email":"a@x.com","comment":"Nice post"}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.comments().len(), 1);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(api_request(None, r#"{"name":"Ann""#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(app.store.comments().is_empty());
}

#[tokio::test]
async fn store_rejection_is_a_bad_gateway() {
    let app = seeded_app();
    app.store.fail_writes(true);

    let response = app
        .router
        .oneshot(api_request(
            Some("application/json"),
            r#"{"_id":"post-1","name":"Ann","email":"a@x.com","comment":"Nice post"}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "content_store");
    assert_eq!(body["error"]["message"], "Comment could not be stored");
}

#[tokio::test]
async fn incomplete_form_lists_missing_fields_and_writes_nothing() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(form_request("_id=post-1&name=&email=&comment="))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    let name = html.find("The name field is required").expect("name message");
    let comment = html
        .find("The comment field is required")
        .expect("comment message");
    let email = html.find("The email field is required").expect("email message");
    assert!(name < comment && comment < email);
    assert!(app.store.comments().is_empty());
}

#[tokio::test]
async fn incomplete_form_keeps_typed_values() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(form_request("_id=post-1&name=Ann&email=&comment=Half+a+thought"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains(r#"value="Ann""#));
    assert!(html.contains("Half a thought"));
    assert!(!html.contains("The name field is required"));
    assert!(html.contains("The email field is required"));
}

#[tokio::test]
async fn valid_form_shows_acknowledgment() {
    let app = seeded_app();

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "_id=post-1&name=Ann&email=a%40x.com&comment=Nice+post",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Thank you for submitting"));
    assert!(html.contains("Once it's been approved it will appear below"));
    assert!(!html.contains("Leave a comment below!"));

    let stored = app.store.comments();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "a@x.com");
    assert!(!stored[0].approved);

    let reload = app
        .router
        .oneshot(
            Request::builder()
                .uri("/post/hello")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let html = body_text(reload).await;
    assert!(html.contains("Leave a comment below!"));
    assert!(!html.contains("Thank you for submitting"));
}

#[tokio::test]
async fn form_without_article_id_falls_back_to_page_article() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(form_request("name=Ann&email=a%40x.com&comment=Nice+post"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.comments()[0].article_id, "post-1");
}

#[tokio::test]
async fn failed_write_keeps_form_editable() {
    let app = seeded_app();
    app.store.fail_writes(true);

    let response = app
        .router
        .oneshot(form_request(
            "_id=post-1&name=Ann&email=a%40x.com&comment=Nice+post",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains(SUBMIT_FAILED_MESSAGE));
    assert!(html.contains("Leave a comment below!"));
    assert!(!html.contains("Thank you for submitting"));
}

#[tokio::test]
async fn form_post_to_unknown_article_is_not_found() {
    let app = seeded_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/post/missing")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("name=Ann&email=a%40x.com&comment=Hi"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.comments().is_empty());
}

#[tokio::test]
async fn comment_appears_only_after_approval_and_rebuild() {
    let app = seeded_app();
    let page = |app: &TestApp| {
        app.router.clone().oneshot(
            Request::builder()
                .uri("/post/hello")
                .body(Body::empty())
                .expect("request"),
        )
    };

    let response = app
        .router
        .clone()
        .oneshot(api_request(
            Some("application/json"),
            r#"{"_id":"post-1","name":"Ann","email":"a@x.com","comment":"Lovely read"}"#,
        ))
        .await
        .expect("response");
    let id = json_body(response).await["id"]
        .as_str()
        .expect("comment id")
        .to_string();

    assert_eq!(app.pages.regenerate("hello").await, Regeneration::Replaced);
    let html = body_text(page(&app).await.expect("response")).await;
    assert!(!html.contains("Lovely read"));

    app.store.approve(&id);
    let html = body_text(page(&app).await.expect("response")).await;
    assert!(!html.contains("Lovely read"), "cached page predates approval");

    assert_eq!(app.pages.regenerate("hello").await, Regeneration::Replaced);
    let html = body_text(page(&app).await.expect("response")).await;
    assert!(html.contains("Ann: "));
    assert!(html.contains("Lovely read"));
    assert!(html.contains("First!"));
    assert!(!html.contains("a@x.com"));
}
