use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use rendergit::config::DispatchConfig;
use rendergit::contract::{MockPageGenerator, RenderedPage};
use rendergit::dispatch::RequestDispatcher;
use rendergit::server::router;
use tower::ServiceExt;

fn app(generator: MockPageGenerator) -> axum::Router {
    router(Arc::new(RequestDispatcher::new(
        Arc::new(generator),
        51200,
        DispatchConfig::default(),
    )))
}

fn rendering_generator() -> MockPageGenerator {
    let mut generator = MockPageGenerator::new();
    generator
        .expect_generate()
        .returning(|url, _| Ok(RenderedPage::new(format!("<html>{url}</html>"))));
    generator
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(resp: &axum::response::Response) -> String {
    resp.headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_get_renders_on_both_routes() {
    for path in ["/", "/api/render"] {
        let resp = app(rendering_generator())
            .oneshot(
                Request::builder()
                    .uri(format!("{path}?repo_url=https://github.com/acme/widgets"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "path {path}");
        assert_eq!(content_type(&resp), "text/html; charset=utf-8");
        assert_eq!(body_string(resp).await, "<html>https://github.com/acme/widgets</html>");
    }
}

#[tokio::test]
async fn test_get_without_repo_url_is_html_400() {
    let mut generator = MockPageGenerator::new();
    generator.expect_generate().never();
    let resp = app(generator)
        .oneshot(
            Request::builder()
                .uri("/api/render")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(content_type(&resp), "text/html; charset=utf-8");
    assert!(body_string(resp).await.contains("400 Bad Request"));
}

#[tokio::test]
async fn test_post_json_and_form() {
    let resp = app(rendering_generator())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/render")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"repo_url": "https://github.com/acme/widgets"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app(rendering_generator())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("repo_url=https%3A%2F%2Fgithub.com%2Facme%2Fgadgets"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "<html>https://github.com/acme/gadgets</html>");
}

#[tokio::test]
async fn test_post_without_repo_url_is_json_400() {
    let mut generator = MockPageGenerator::new();
    generator.expect_generate().never();
    let resp = app(generator)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/render")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(content_type(&resp), "application/json; charset=utf-8");
    assert_eq!(
        body_string(resp).await,
        r#"{"error":"Missing 'repo_url' in request body"}"#
    );
}

#[tokio::test]
async fn test_healthz() {
    let resp = app(MockPageGenerator::new())
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}
