use serde::{Deserialize, Serialize};

use crate::types::Score;

// Form fields default to empty so a missing field reaches validation and gets
// the same 400 as an empty one.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddUserForm {
    pub regno: String,
    pub name: String,
    pub teamname: String,
    pub teamno: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddScoreForm {
    pub teamno: String,
    pub teamname: String,
    pub score: String,
}

#[derive(Debug, Serialize)]
pub struct ScoresResponse {
    pub scores: Vec<Score>,
}
