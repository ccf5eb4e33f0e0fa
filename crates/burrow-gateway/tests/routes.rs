use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use burrow_gateway::identity::{CookieCipher, COOKIE_NAME};
use burrow_gateway::subnet::TrustedSubnet;
use burrow_gateway::{App, AppState};
use burrow_generator::{Generator, SeqGenerator};
use burrow_shortener::{DeletionConfig, DeletionPipeline, DeletionWorker, ShortenerService};
use burrow_storage::InMemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

const BASE: &str = "http://localhost:8080";

struct TestApp {
    router: Router,
    worker: DeletionWorker,
}

impl TestApp {
    fn new(trusted_subnet: Option<&str>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = DeletionConfig::builder()
            .flush_interval(Duration::from_secs(60))
            .build();
        let (queue, worker) = DeletionPipeline::spawn(store.clone(), config);

        let generator: Box<dyn Generator> = Box::new(SeqGenerator::with_prefix("bw"));
        let shortener = ShortenerService::new(store, generator, BASE, queue);
        let state = AppState::new(
            shortener,
            CookieCipher::new("test-secret"),
            trusted_subnet.map(|cidr| cidr.parse::<TrustedSubnet>().unwrap()),
        );

        Self {
            router: App::router(state),
            worker,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Issues a request without a cookie and returns the identity cookie the
    /// server hands out.
    async fn login(&self) -> String {
        let response = self.send(get("/ping", None)).await;
        issued_cookie(&response).expect("identity cookie")
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, cookie, Body::empty())
}

fn request(method: Method, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(body).unwrap()
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut request = request(method, uri, cookie, Body::from(body.to_string()));
    request
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    request
}

/// Returns `UserID=<value>` from the response's `Set-Cookie`, if any.
fn issued_cookie(response: &Response) -> Option<String> {
    let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    let pair = header.split(';').next()?.trim();
    pair.starts_with(&format!("{COOKIE_NAME}="))
        .then(|| pair.to_string())
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn post_root_then_redirect() {
    let app = TestApp::new(None);

    let response = app
        .send(request(Method::POST, "/", None, Body::from("https://example.com")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "http://localhost:8080/bw000000"
    );
    assert!(issued_cookie(&response).is_some());
    assert_eq!(body_text(response).await, "http://localhost:8080/bw000000");

    let response = app.send(get("/bw000000", None)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://example.com"
    );
}

#[tokio::test]
async fn post_root_conflict_returns_existing_url() {
    let app = TestApp::new(None);

    app.send(request(Method::POST, "/", None, Body::from("https://example.com")))
        .await;
    let response = app
        .send(request(Method::POST, "/", None, Body::from("https://example.com")))
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_text(response).await, "http://localhost:8080/bw000000");
}

#[tokio::test]
async fn post_root_rejects_invalid_url() {
    let app = TestApp::new(None);

    let response = app
        .send(request(Method::POST, "/", None, Body::from("not a url")))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_root_rejects_url_with_line_break() {
    let app = TestApp::new(None);

    let response = app
        .send(request(
            Method::POST,
            "/",
            None,
            Body::from("https://example.com/a\nb"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/bw000000", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_code_is_bad_request() {
    let app = TestApp::new(None);

    let response = app.send(get("/missing", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_shorten_json() {
    let app = TestApp::new(None);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shorten",
            None,
            json!({ "url": "https://example.com" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({ "result": "http://localhost:8080/bw000000" })
    );

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shorten",
            None,
            json!({ "url": "https://example.com" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await,
        json!({ "result": "http://localhost:8080/bw000000" })
    );

    let response = app
        .send(request(Method::POST, "/api/shorten", None, Body::from("{")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_shorten_batch() {
    let app = TestApp::new(None);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shorten/batch",
            None,
            json!([
                { "correlation_id": "a", "original_url": "https://a.example" },
                { "correlation_id": "b", "original_url": "https://b.example" },
            ]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!([
            { "correlation_id": "a", "short_url": "http://localhost:8080/bw000000" },
            { "correlation_id": "b", "short_url": "http://localhost:8080/bw000001" },
        ])
    );

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shorten/batch",
            None,
            json!([{ "correlation_id": "c", "original_url": "https://a.example" }]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(json_request(Method::POST, "/api/shorten/batch", None, json!([])))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_urls_require_identity() {
    let app = TestApp::new(None);

    let response = app.send(get("/api/user/urls", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(get("/api/user/urls", Some(&format!("{COOKIE_NAME}=forged"))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(issued_cookie(&response).is_some());
}

#[tokio::test]
async fn user_urls_list_owned_records() {
    let app = TestApp::new(None);
    let cookie = app.login().await;

    let response = app.send(get("/api/user/urls", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(issued_cookie(&response).is_none());

    app.send(request(
        Method::POST,
        "/",
        Some(&cookie),
        Body::from("https://example.com"),
    ))
    .await;
    app.send(request(
        Method::POST,
        "/",
        None,
        Body::from("https://someone-else.example"),
    ))
    .await;

    let response = app.send(get("/api/user/urls", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([
            { "short_url": "http://localhost:8080/bw000000", "original_url": "https://example.com" },
        ])
    );
}

#[tokio::test]
async fn delete_user_urls_is_applied_after_flush() {
    let app = TestApp::new(None);
    let cookie = app.login().await;

    app.send(request(
        Method::POST,
        "/",
        Some(&cookie),
        Body::from("https://example.com"),
    ))
    .await;

    let response = app
        .send(json_request(Method::DELETE, "/api/user/urls", None, json!(["bw000000"])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(Method::DELETE, "/api/user/urls", Some(&cookie), json!([])))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            Method::DELETE,
            "/api/user/urls",
            Some(&cookie),
            json!(["bw000000"]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let TestApp { router, worker } = app;
    worker.shutdown().await;

    let response = router.oneshot(get("/bw000000", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
async fn ping_reports_storage_health() {
    let app = TestApp::new(None);

    let response = app.send(get("/ping", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stats_require_trusted_subnet() {
    let app = TestApp::new(None);
    let mut request = get("/api/internal/stats", None);
    request
        .headers_mut()
        .insert("x-real-ip", "127.0.0.1".parse().unwrap());
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);

    let app = TestApp::new(Some("192.168.0.0/16"));
    app.send(request_with_body("https://a.example")).await;

    let response = app.send(get("/api/internal/stats", None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut outside = get("/api/internal/stats", None);
    outside
        .headers_mut()
        .insert("x-real-ip", "10.0.0.1".parse().unwrap());
    assert_eq!(app.send(outside).await.status(), StatusCode::FORBIDDEN);

    let mut inside = get("/api/internal/stats", None);
    inside
        .headers_mut()
        .insert("x-real-ip", "192.168.10.20".parse().unwrap());
    let response = app.send(inside).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "urls": 1, "users": 1 }));
}

fn request_with_body(url: &str) -> Request<Body> {
    request(Method::POST, "/", None, Body::from(url.to_string()))
}
