#![allow(clippy::unwrap_used)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use auth_global::{
    accounts::AccountService,
    api::{self, AppContext},
    crypto::Cipher,
    notify::{Mail, NotificationQueue, Notifier},
    store::MemoryAccountStore,
    token::TokenAuthority,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::timeout};
use tower::ServiceExt;

const APP_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";
const API_SECRET: &str = "signing-secret";
const ACCEPTED_TOKEN: &str = "letmein";
const SENDER: &str = "noreply@example.com";

struct ChannelNotifier(mpsc::UnboundedSender<Mail>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, mail: &Mail) -> Result<()> {
        self.0.send(mail.clone()).map_err(|_| anyhow!("receiver gone"))
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _mail: &Mail) -> Result<()> {
        Err(anyhow!("smtp unreachable"))
    }
}

struct Options {
    notifier: Arc<dyn Notifier>,
    allow_visible_reset: bool,
    accepted_token: Option<&'static str>,
    mail_sender: Option<&'static str>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            notifier: Arc::new(FailingNotifier),
            allow_visible_reset: false,
            accepted_token: None,
            mail_sender: None,
        }
    }
}

fn app(options: Options) -> Router {
    let cipher = Cipher::new(APP_KEY).unwrap();
    let tokens = TokenAuthority::new(cipher.clone(), API_SECRET.as_bytes());
    let (queue, _worker) = NotificationQueue::spawn(options.notifier.clone());

    let accounts = AccountService::new(Arc::new(MemoryAccountStore::new()), cipher, tokens, queue)
        .with_visible_reset(options.allow_visible_reset);

    let ctx = AppContext::new(
        accounts,
        options.notifier,
        SecretString::from(API_SECRET.to_string()),
    )
    .with_accepted_token(options.accepted_token.map(|t| SecretString::from(t.to_string())))
    .with_mail_sender(options.mail_sender.map(str::to_string));

    api::router(Arc::new(ctx))
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "auth.example.com")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn register(router: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
    let (status, _, body) = call(
        router,
        json_request(
            Method::POST,
            "/v1/register",
            &json!({"name": name, "email": email, "password": password}),
        ),
    )
    .await;
    (status, body)
}

async fn login(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let (status, _, body) = call(
        router,
        json_request(
            Method::POST,
            "/v1/login",
            &json!({"email": email, "password": password}),
        ),
    )
    .await;
    (status, body)
}

async fn token_for(router: &Router, email: &str, password: &str) -> String {
    let (status, body) = login(router, email, password).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_reports_ok() {
    let router = app(Options::default());
    let (status, headers, body) = call(&router, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "OK", "data": "OK"}));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn request_id_is_propagated() {
    let router = app(Options::default());
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = call(&router, request).await;
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn health_reports_store_status() {
    let router = app(Options::default());
    let (status, headers, body) = call(&router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert!(headers.contains_key("X-App"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let router = app(Options::default());
    let (status, _, body) = call(&router, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/login"].is_object());
}

#[tokio::test]
async fn register_then_conflict() {
    let router = app(Options::default());

    let (status, headers, body) = call(
        &router,
        json_request(
            Method::POST,
            "/v1/register",
            &json!({"name": "Jane", "email": "jane@example.com", "password": "correct horse"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Created");
    assert_eq!(body["data"]["name"], "Jane");
    assert_eq!(body["data"]["email"], "jane@example.com");
    let public_id = body["data"]["public_id"].as_str().unwrap();
    assert_eq!(public_id.len(), 64);
    assert!(body["data"]["created_at"].is_string());
    assert!(body["data"].get("password").is_none());

    let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, format!("auth.example.com/v1/register/{public_id}"));

    let (status, body) = register(&router, "Other", "jane@example.com", "another password").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        json!({"success": false, "message": "Conflict", "data": {"error": "email already taken"}})
    );

    // the first account still logs in with its own password
    let (status, body) = login(&router, "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Jane");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let router = app(Options::default());

    let (status, body) = register(&router, "", "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "required name");

    let (status, body) = register(&router, "Jane", "jane", "correct horse").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "invalid email format");

    let (status, body) = register(&router, &"&".repeat(60), "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "name maximum is 255 characters");

    let (status, body) = register(&router, "Jane", "jane@example.com", "short").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "password minimum is 8 characters");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_failures_are_generic() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;

    let (status, wrong) = login(&router, "jane@example.com", "wrong password").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(wrong["data"]["error"], "incorrect email or password");

    let (status, unknown) = login(&router, "nobody@example.com", "wrong password").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown, wrong);

    let (status, body) = login(&router, "jane@example.com", "").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "required password");
}

#[tokio::test]
async fn login_returns_token_and_profile() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;

    let (status, body) = login(&router, "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["name"], "Jane");
    assert_eq!(body["data"]["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn user_profile_with_query_or_header_token() {
    let router = app(Options::default());
    let (_, registered) = register(&router, "Jane", "jane@example.com", "correct horse").await;
    let token = token_for(&router, "jane@example.com", "correct horse").await;

    let (status, _, by_query) = call(&router, get(&format!("/v1/user?token={token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_query["data"]["name"], "Jane");
    assert_eq!(by_query["data"]["email"], "jane@example.com");
    assert_eq!(by_query["data"]["public_id"], registered["data"]["public_id"]);
    assert!(by_query["data"]["last_update"].is_string());

    let (status, _, by_header) = call(&router, get_with_bearer("/v1/user", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_header["data"], by_query["data"]);
}

#[tokio::test]
async fn protected_routes_require_valid_token() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;
    let token = token_for(&router, "jane@example.com", "correct horse").await;

    let unauthorized =
        json!({"success": false, "message": "Unauthorized", "data": {"error": "unauthorized"}});

    let (status, _, body) = call(&router, get("/v1/user")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthorized);

    let (status, _, _) = call(&router, get_with_bearer("/v1/user", "not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut tampered = token.clone();
    tampered.push('x');
    let (status, _, _) = call(&router, get_with_bearer("/v1/user", &tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = call(
        &router,
        json_request(Method::PUT, "/v1/user/edit", &json!({"name": "Mallory"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the token is well formed but its account does not exist in this store
    let other = app(Options::default());
    let (status, _, _) = call(&other, get_with_bearer("/v1/user", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn edit_profile_updates_name() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;
    register(&router, "John", "john@example.com", "correct horse").await;
    let token = token_for(&router, "jane@example.com", "correct horse").await;

    let mut request = json_request(Method::PUT, "/v1/user/edit", &json!({"name": " Janet "}));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, _, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Janet");
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert!(body["data"]["last_updated"].is_string());

    let (_, _, shown) = call(&router, get_with_bearer("/v1/user", &token)).await;
    assert_eq!(shown["data"]["name"], "Janet");

    let john = token_for(&router, "john@example.com", "correct horse").await;
    let (_, _, shown) = call(&router, get_with_bearer("/v1/user", &john)).await;
    assert_eq!(shown["data"]["name"], "John");

    let mut request = json_request(Method::PUT, "/v1/user/edit", &json!({"name": ""}));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, _, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "required name");
}

#[tokio::test]
async fn change_password_succeeds_when_notice_fails() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;
    let token = token_for(&router, "jane@example.com", "correct horse").await;

    let (status, _, body) = call(
        &router,
        json_request(
            Method::POST,
            &format!("/v1/user/change-password?notify=true&token={token}"),
            &json!({"password": "battery staple"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "new password created");
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert!(body["data"]["password_changed_at"].is_string());

    let (status, _) = login(&router, "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = login(&router, "jane@example.com", "battery staple").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = call(
        &router,
        json_request(
            Method::POST,
            &format!("/v1/user/change-password?token={token}"),
            &json!({"password": "short"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "password minimum is 8 characters");
}

#[tokio::test]
async fn change_password_notice_is_mailed() {
    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
    let router = app(Options {
        notifier: Arc::new(ChannelNotifier(sent_tx)),
        ..Options::default()
    });
    register(&router, "Jane", "jane@example.com", "correct horse").await;
    let token = token_for(&router, "jane@example.com", "correct horse").await;

    let (status, _, _) = call(
        &router,
        json_request(
            Method::POST,
            &format!("/v1/user/change-password?notify=true&token={token}"),
            &json!({"password": "battery staple"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mail = timeout(Duration::from_secs(1), sent_rx.recv()).await.unwrap().unwrap();
    assert_eq!(mail.to, vec!["jane@example.com".to_string()]);
    assert_eq!(mail.subject, "New Password Change!");
}

#[tokio::test]
async fn forget_password_visible_when_allowed() {
    let router = app(Options {
        allow_visible_reset: true,
        ..Options::default()
    });
    register(&router, "Jane", "jane@example.com", "correct horse").await;

    let (status, _, body) = call(
        &router,
        json_request(
            Method::POST,
            "/v1/forget-password?visible=true&notify=true",
            &json!({"email": "jane@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "new password generated");
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert!(body["data"]["request_time"].is_string());

    let generated = body["data"]["generated_password"].as_str().unwrap();
    assert_eq!(generated.len(), 20);

    let (status, _) = login(&router, "jane@example.com", generated).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&router, "jane@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn forget_password_hidden_by_default() {
    let router = app(Options::default());
    register(&router, "Jane", "jane@example.com", "correct horse").await;

    for uri in [
        "/v1/forget-password?visible=true",
        "/v1/forget-password?visible=true&notify=true",
        "/v1/forget-password?notify=true",
        "/v1/forget-password",
    ] {
        let (status, _, body) = call(
            &router,
            json_request(Method::POST, uri, &json!({"email": "jane@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Kindly check your email inbox/spam");
        assert!(body["data"].get("generated_password").is_none());
    }
}

#[tokio::test]
async fn forget_password_mails_generated_password() {
    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
    let router = app(Options {
        notifier: Arc::new(ChannelNotifier(sent_tx)),
        ..Options::default()
    });
    register(&router, "Jane", "jane@example.com", "correct horse").await;

    let (status, _, _) = call(
        &router,
        json_request(
            Method::POST,
            "/v1/forget-password?notify=true",
            &json!({"email": "jane@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mail = timeout(Duration::from_secs(1), sent_rx.recv()).await.unwrap().unwrap();
    assert_eq!(mail.subject, "Change Password");
    let generated = mail.body.lines().nth(2).unwrap();
    let (status, _) = login(&router, "jane@example.com", generated).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forget_password_unknown_email() {
    let router = app(Options::default());

    let (status, _, body) = call(
        &router,
        json_request(
            Method::POST,
            "/v1/forget-password",
            &json!({"email": "nobody@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["error"], "user not found");

    let (status, _, body) = call(
        &router,
        json_request(Method::POST, "/v1/forget-password", &json!({"email": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "required email");
}

#[tokio::test]
async fn api_secret_requires_accepted_token() {
    let closed = app(Options::default());
    let (status, _, body) = call(&closed, get("/api-secret?token=anything")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["error"], "not found");
    let (status, _, _) = call(&closed, get("/api-secret")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let open = app(Options {
        accepted_token: Some(ACCEPTED_TOKEN),
        ..Options::default()
    });
    for token in ["wrong", "letme", "letmein2"] {
        let (status, _, _) = call(&open, get(&format!("/api-secret?token={token}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _, body) = call(&open, get_with_bearer("/api-secret", ACCEPTED_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], API_SECRET);
}

#[tokio::test]
async fn mail_sends_test_message() {
    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
    let router = app(Options {
        notifier: Arc::new(ChannelNotifier(sent_tx)),
        mail_sender: Some(SENDER),
        ..Options::default()
    });

    let (status, _, body) = call(&router, get("/v1/mail")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "OK", "data": "Success"}));

    let mail = sent_rx.try_recv().unwrap();
    assert_eq!(mail.to, vec![SENDER.to_string()]);
}

#[tokio::test]
async fn mail_reports_failures() {
    let failing = app(Options {
        mail_sender: Some(SENDER),
        ..Options::default()
    });
    let (status, _, body) = call(&failing, get("/v1/mail")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["data"]["error"], "something went wrong");

    let unconfigured = app(Options::default());
    let (status, _, _) = call(&unconfigured, get("/v1/mail")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
