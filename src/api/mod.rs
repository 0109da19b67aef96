use axum::Json;
use axum::extract::Path;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, TrackerError};
use crate::models::*;
use crate::services::{RoundSummary, ScoreEntry};
use crate::state::AppState;

#[derive(Deserialize)]
struct StartRoundRequest {
    course_id: String,
    #[serde(default)]
    round_type: RoundType,
}

#[derive(Deserialize)]
struct NavigateRequest {
    hole: u32,
}

#[derive(Serialize)]
struct HoleScoreResponse {
    #[serde(flatten)]
    score: HoleScore,
    relative_to_par: Option<i32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course))
        .route("/rounds", get(list_rounds).post(start_round))
        .route("/rounds/{id}/resume", post(resume_round))
        .route("/round", get(current_round))
        .route("/round/scores", post(record_score))
        .route("/round/hole", put(navigate))
        .route("/round/holes/{n}", get(hole_score))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state.catalog.list_courses().await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = req.into_course(Uuid::new_v4().to_string());
    let course = state.catalog.add_course(course).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = state.catalog.get_course(&id).await?;
    Ok(Json(Course::clone(&course)))
}

async fn list_rounds(State(state): State<AppState>) -> Result<Json<Vec<Round>>, AppError> {
    let rounds = state.gateway.list_rounds().await?;
    Ok(Json(rounds))
}

async fn start_round(
    State(state): State<AppState>,
    Json(req): Json<StartRoundRequest>,
) -> Result<(StatusCode, Json<RoundSummary>), AppError> {
    let course = state
        .catalog
        .get_course(&req.course_id)
        .await
        .map_err(TrackerError::from)?;

    let mut tracker = state.tracker.lock().await;
    tracker.start_round_with_type(course, req.round_type).await?;
    let summary = tracker.summary().ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn resume_round(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    let mut tracker = state.tracker.lock().await;
    tracker.resume(state.catalog.as_ref(), &id).await?;
    let summary = tracker.summary().ok_or(AppError::NotFound)?;
    Ok(Json(summary))
}

async fn current_round(State(state): State<AppState>) -> Result<Json<RoundSummary>, AppError> {
    let tracker = state.tracker.lock().await;
    let summary = tracker.summary().ok_or(AppError::NotFound)?;
    Ok(Json(summary))
}

async fn record_score(
    State(state): State<AppState>,
    Json(entry): Json<ScoreEntry>,
) -> Result<Json<RoundSummary>, AppError> {
    let mut tracker = state.tracker.lock().await;
    tracker.record_hole_score(entry).await?;
    let summary = tracker.summary().ok_or(AppError::NotFound)?;
    Ok(Json(summary))
}

async fn navigate(
    State(state): State<AppState>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    let mut tracker = state.tracker.lock().await;
    tracker.navigate_to_hole(req.hole)?;
    let summary = tracker.summary().ok_or(AppError::NotFound)?;
    Ok(Json(summary))
}

async fn hole_score(
    State(state): State<AppState>,
    Path(n): Path<u32>,
) -> Result<Json<HoleScoreResponse>, AppError> {
    let tracker = state.tracker.lock().await;
    let score = tracker.hole_score(n).cloned().ok_or(AppError::NotFound)?;
    Ok(Json(HoleScoreResponse {
        score,
        relative_to_par: tracker.hole_score_relative_to_par(n),
    }))
}
