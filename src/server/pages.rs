use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::auth::{LoginOutcome, authenticate};
use crate::server::AppState;
use crate::server::dto::LoginForm;
use crate::server::response::{ApiError, StoreResultExt};

const LOGIN_PAGE: &str = "login.html";
const ADMIN_DASHBOARD: &str = "admin_dashboard.html";
const USER_DASHBOARD: &str = "user_dashboard.html";

const INVALID_LOGIN: &str = "<script>alert('Invalid Register Number or Team Number');\
                             window.location.href='/';</script>";

async fn serve_page(state: &AppState, name: &str) -> Result<Response, ApiError> {
    let path = state.static_dir.join(name);

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Html(bytes).into_response()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("Page {} missing from {}", name, state.static_dir.display());
            Err(ApiError::not_found("Page not found"))
        }
        Err(e) => {
            tracing::error!("Failed to read page {}: {e}", path.display());
            Err(ApiError::internal("Failed to read page"))
        }
    }
}

/// GET / and /login
pub async fn login_page(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    serve_page(&state, LOGIN_PAGE).await
}

/// GET /admin_dashboard.html
pub async fn admin_dashboard(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    serve_page(&state, ADMIN_DASHBOARD).await
}

/// GET /user_dashboard.html
pub async fn user_dashboard(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    serve_page(&state, USER_DASHBOARD).await
}

/// POST / and /login
///
/// Users are sent to their dashboard with `?regno=`; the dashboard trusts it.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let LoginForm { username, password } = form;

    let outcome = state
        .with_store(move |store| authenticate(store, &username, &password))
        .await
        .api_err("Failed to check credentials")?;

    let response = match outcome {
        LoginOutcome::Admin => {
            info!("Admin login");
            Redirect::to(&format!("/{ADMIN_DASHBOARD}")).into_response()
        }
        LoginOutcome::User { regno } => {
            info!(regno = %regno, "User login");
            Redirect::to(&format!(
                "/{USER_DASHBOARD}?regno={}",
                urlencoding::encode(&regno)
            ))
            .into_response()
        }
        LoginOutcome::Invalid => (StatusCode::UNAUTHORIZED, Html(INVALID_LOGIN)).into_response(),
    };

    Ok(response)
}
