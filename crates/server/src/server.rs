use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use chrono::Utc;

use std::sync::Arc;

use crate::{balances, expenses, groups, invitations, mailer::Mailer, settlements};
use engine::Engine;

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");
static USER_EMAIL_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-user-email");
static USER_NAME_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-user-name");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub mailer: Arc<Mailer>,
}

impl ServerState {
    /// Fire-and-forget notification. Runs after the engine operation has
    /// committed; delivery failure is logged and never affects the response.
    pub(crate) fn notify(&self, to: String, subject: String, text: String) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&to, &subject, &text).await {
                tracing::warn!("mail delivery failed: {err}");
            }
        });
    }
}

/// The identity asserted by the fronting auth collaborator.
///
/// The engine trusts these attributes; nothing here re-verifies credentials.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

/// Generates a `TypedHeader` newtype for one identity header.
macro_rules! identity_header {
    ($name:ident, $header:expr) => {
        #[derive(Debug)]
        struct $name(String);

        impl Header for $name {
            fn name() -> &'static axum::http::HeaderName {
                &$header
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
            where
                Self: Sized,
                I: Iterator<Item = &'i axum::http::HeaderValue>,
            {
                let value = values.next().ok_or_else(AxumError::invalid)?;
                let Ok(value) = value.to_str() else {
                    return Err(AxumError::invalid());
                };
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AxumError::invalid());
                }
                Ok($name(trimmed.to_string()))
            }

            fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
                match axum::http::HeaderValue::from_str(&self.0) {
                    Ok(value) => values.extend(std::iter::once(value)),
                    Err(_) => tracing::error!("failed to encode identity header"),
                }
            }
        }
    };
}

identity_header!(UserIdHeader, USER_ID_HEADER);
identity_header!(UserEmailHeader, USER_EMAIL_HEADER);
identity_header!(UserNameHeader, USER_NAME_HEADER);

async fn auth(
    user_id: Option<TypedHeader<UserIdHeader>>,
    user_email: Option<TypedHeader<UserEmailHeader>>,
    user_name: Option<TypedHeader<UserNameHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_id else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(TypedHeader(UserEmailHeader(email))) = user_email else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let display_name = match user_name {
        Some(TypedHeader(UserNameHeader(name))) => name,
        // Fall back to the email local part.
        None => email.split('@').next().unwrap_or(&email).to_string(),
    };

    // Keep the users row in sync with the asserted identity.
    if let Err(err) = state
        .engine
        .sync_user(&user_id, &email, &display_name, Utc::now())
        .await
    {
        return match err {
            engine::EngineError::Database(db_err) => {
                tracing::error!("identity sync failed: {db_err}");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => Err(StatusCode::UNAUTHORIZED),
        };
    }

    request.extensions_mut().insert(AuthUser {
        id: user_id,
        email,
        display_name,
    });
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::create).get(groups::list))
        .route(
            "/groups/{group_id}",
            get(groups::overview).delete(groups::delete),
        )
        .route(
            "/groups/{group_id}/members/{member_id}",
            axum::routing::delete(groups::remove_member),
        )
        .route(
            "/groups/{group_id}/invitations",
            post(invitations::create).get(invitations::list),
        )
        .route(
            "/groups/{group_id}/invitations/{invitation_id}/revoke",
            post(invitations::revoke),
        )
        .route("/invitations/accept", post(invitations::accept))
        .route(
            "/groups/{group_id}/expenses",
            post(expenses::create).get(expenses::list),
        )
        .route("/groups/{group_id}/balances", get(balances::group))
        .route("/groups/{group_id}/balances/{user_id}", get(balances::user))
        .route(
            "/groups/{group_id}/settlements",
            post(settlements::create).get(settlements::list),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

/// Builds the full application router. Exposed for in-process tests.
pub fn app(engine: Engine, mailer: Mailer) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        mailer: Arc::new(mailer),
    };
    router(state)
}

pub async fn run_with_listener(
    engine: Engine,
    mailer: Mailer,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, mailer)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    mailer: Mailer,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, mailer, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
