use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::AddUserForm;
use crate::server::response::{ApiError, Message, StoreOptionExt, StoreResultExt};
use crate::server::validation::required;
use crate::types::User;

/// POST /add_user
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AddUserForm>,
) -> Result<Message, ApiError> {
    let user = User {
        regno: required("regno", &form.regno)?,
        name: required("name", &form.name)?,
        teamname: required("teamname", &form.teamname)?,
        teamno: required("teamno", &form.teamno)?,
        email: required("email", &form.email)?,
    };
    let regno = user.regno.clone();

    match state.with_store(move |store| store.create_user(&user)).await {
        Ok(()) => {
            info!(regno = %regno, "Registered user");
            Ok(Message::ok("User added successfully"))
        }
        Err(Error::AlreadyExists) => Ok(Message::new(
            StatusCode::CONFLICT,
            "Register Number already exists",
        )),
        Err(e) => Err(ApiError::from_store(e, "Failed to add user")),
    }
}

/// GET /get_profile/{regno}
///
/// No ownership check: any caller can read any registrant's record.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(regno): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .with_store(move |store| store.get_user(&regno))
        .await
        .api_err("Failed to get profile")?
        .or_not_found("User not found")?;

    Ok(Json(user))
}
