use std::sync::Arc;

use axum::{Form, Json, extract::State, response::IntoResponse};
use tracing::info;

use crate::server::AppState;
use crate::server::dto::{AddScoreForm, ScoresResponse};
use crate::server::response::{ApiError, Message, StoreResultExt};
use crate::server::validation::{parse_score, required};
use crate::types::Score;

/// POST /add_score
///
/// Appends a row; the team does not have to be registered.
pub async fn add_score(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AddScoreForm>,
) -> Result<Message, ApiError> {
    let score = Score {
        teamno: required("teamno", &form.teamno)?,
        teamname: required("teamname", &form.teamname)?,
        score: parse_score(&form.score)?,
    };

    info!(teamno = %score.teamno, score = score.score, "Recording score");

    state
        .with_store(move |store| store.add_score(&score))
        .await
        .api_err("Failed to add score")?;

    Ok(Message::ok("Score added successfully"))
}

/// GET /get_scores
///
/// Ordered by score descending. Ties come back in whatever order SQLite yields.
pub async fn get_scores(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let scores = state
        .with_store(|store| store.list_scores())
        .await
        .api_err("Failed to list scores")?;

    Ok(Json(ScoresResponse { scores }))
}
