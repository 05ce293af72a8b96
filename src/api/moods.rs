//! Mood log endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState, CurrentUser};
use crate::Error;
use crate::db::mood::{Mood, parse_date};

#[derive(Deserialize)]
pub struct SetMoodRequest {
    pub mood: Mood,
}

#[derive(Serialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub mood: Mood,
    pub index: u8,
    pub label: &'static str,
}

impl MoodEntry {
    fn new(date: NaiveDate, mood: Mood) -> Self {
        Self {
            date,
            mood,
            index: mood.index(),
            label: mood.label(),
        }
    }
}

#[derive(Serialize)]
pub struct MoodListResponse {
    pub entries: Vec<MoodEntry>,
}

/// Record the caller's mood for a day, replacing any earlier entry
async fn set_mood(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
    Path(date): Path<String>,
    Json(req): Json<SetMoodRequest>,
) -> Result<Json<MoodEntry>, ApiError> {
    let identity = user.require()?;
    let date = parse_date(&date)?;

    state.mood_repo.save(&identity.uid, date, req.mood)?;
    tracing::debug!(uid = %identity.uid, %date, mood = req.mood.label(), "mood saved");

    Ok(Json(MoodEntry::new(date, req.mood)))
}

async fn get_mood(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
    Path(date): Path<String>,
) -> Result<Json<MoodEntry>, ApiError> {
    let identity = user.require()?;
    let date = parse_date(&date)?;

    let mood = state
        .mood_repo
        .for_date(&identity.uid, date)?
        .ok_or_else(|| Error::NotFound(format!("no mood recorded for {date}")))?;

    Ok(Json(MoodEntry::new(date, mood)))
}

/// Every recorded day, oldest first
async fn list_moods(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
) -> Result<Json<MoodListResponse>, ApiError> {
    let identity = user.require()?;
    let entries = state
        .mood_repo
        .all(&identity.uid)?
        .into_iter()
        .map(|(date, mood)| MoodEntry::new(date, mood))
        .collect();

    Ok(Json(MoodListResponse { entries }))
}

/// Build mood router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(list_moods))
        .route("/{date}", get(get_mood).put(set_mood))
        .with_state(state)
}
