use crate::{accounts::AccountService, notify::Notifier};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post, put},
    Extension, Router,
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod response;

pub use auth::Authenticated;
pub use response::ApiError;

/// Everything the handlers share; built once at startup.
pub struct AppContext {
    accounts: AccountService,
    notifier: Arc<dyn Notifier>,
    mail_sender: Option<String>,
    api_secret: SecretString,
    accepted_token: Option<SecretString>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("accounts", &self.accounts)
            .field("mail_sender", &self.mail_sender)
            .field("api_secret", &"***")
            .field("accepted_token", &self.accepted_token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl AppContext {
    #[must_use]
    pub fn new(accounts: AccountService, notifier: Arc<dyn Notifier>, api_secret: SecretString) -> Self {
        Self {
            accounts,
            notifier,
            mail_sender: None,
            api_secret,
            accepted_token: None,
        }
    }

    #[must_use]
    pub fn with_accepted_token(mut self, token: Option<SecretString>) -> Self {
        self.accepted_token = token;
        self
    }

    #[must_use]
    pub fn with_mail_sender(mut self, sender: Option<String>) -> Self {
        self.mail_sender = sender;
        self
    }

    #[must_use]
    pub const fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    #[must_use]
    pub fn mail_sender(&self) -> Option<&str> {
        self.mail_sender.as_deref()
    }

    #[must_use]
    pub const fn api_secret(&self) -> &SecretString {
        &self.api_secret
    }

    #[must_use]
    pub const fn accepted_token(&self) -> Option<&SecretString> {
        self.accepted_token.as_ref()
    }
}

/// Build the application router with its request-id and tracing layers.
pub fn router(ctx: Arc<AppContext>) -> Router {
    use handlers::{forget_password, health, login, mail, register, root, secret, user};

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .route("/api-secret", get(secret::api_secret))
        .route("/v1/login", post(login::login))
        .route("/v1/register", post(register::register))
        .route("/v1/user", get(user::show))
        .route("/v1/user/edit", put(user::edit))
        .route("/v1/user/change-password", post(user::change_password))
        .route("/v1/forget-password", post(forget_password::forget_password))
        .route("/v1/mail", get(mail::mail))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(ctx)),
        )
}

/// Start the server and run until SIGINT or SIGTERM.
///
/// # Errors
/// Return error if the listener can not be bound or the server fails.
pub async fn new(port: u16, ctx: Arc<AppContext>) -> Result<()> {
    let app = router(ctx);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
