use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Identity, Intent, ProfileSnapshot};
use crate::session::registry::SessionHandle;
use crate::session::{prompts, CommitStatus, LoadOutcome, ProfileSession, SessionPhase};
use crate::state::AppState;

/// What the caller renders after every session operation.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    pub profile: ProfileSnapshot,
    pub recommendations: Option<String>,
    pub last_interaction: Option<DateTime<Utc>>,
    pub degraded_reason: Option<String>,
    pub name_update_pending: bool,
    pub completion_percent: u8,
}

impl SessionView {
    fn of(session_id: Uuid, session: &ProfileSession) -> Self {
        Self {
            session_id,
            phase: session.phase(),
            identity: session.identity().cloned(),
            profile: session.profile().clone(),
            recommendations: session.recommendations().map(str::to_string),
            last_interaction: session.last_interaction(),
            degraded_reason: session.degraded_reason().map(str::to_string),
            name_update_pending: session.name_update_pending(),
            completion_percent: session.completion_percent(),
        }
    }
}

#[derive(Deserialize)]
pub struct IdentifyRequest {
    pub name: String,
    pub employee_number: String,
}

#[derive(Serialize)]
pub struct IdentifyResponse {
    #[serde(flatten)]
    pub outcome: LoadOutcome,
    pub session: SessionView,
}

#[derive(Deserialize)]
pub struct AdviceRequest {
    pub intent: Intent,
}

#[derive(Serialize)]
pub struct AdviceResponse {
    pub advice: String,
    pub fallback: bool,
    pub commit: CommitStatus,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub commit: CommitStatus,
    pub session: SessionView,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub answer: String,
    pub fallback: bool,
}

async fn session_handle(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let id = state.sessions.open(Utc::now()).await;
    let handle = session_handle(&state, id).await?;
    let tracked = handle.lock().await;
    Ok((StatusCode::CREATED, Json(SessionView::of(id, &tracked.session))))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = session_handle(&state, id).await?;
    let tracked = handle.lock().await;
    Ok(Json(SessionView::of(id, &tracked.session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/identify
pub async fn handle_identify(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<IdentifyRequest>,
) -> Result<Json<IdentifyResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut tracked = handle.lock().await;
    let now = Utc::now();
    tracked.touch(now);

    let outcome = tracked
        .session
        .identify(state.store.as_ref(), &req.name, &req.employee_number, now)
        .await?;

    Ok(Json(IdentifyResponse {
        outcome,
        session: SessionView::of(id, &tracked.session),
    }))
}

/// PUT /api/v1/sessions/:id/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(profile): Json<ProfileSnapshot>,
) -> Result<Json<SessionView>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut tracked = handle.lock().await;
    tracked.touch(Utc::now());
    tracked.session.update_profile(profile)?;
    Ok(Json(SessionView::of(id, &tracked.session)))
}

/// POST /api/v1/sessions/:id/advice
pub async fn handle_advice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut tracked = handle.lock().await;
    let now = Utc::now();
    tracked.touch(now);

    let outcome = tracked
        .session
        .interact(&state.advisor, state.store.as_ref(), &req.intent, now)
        .await?;

    Ok(Json(AdviceResponse {
        fallback: outcome.advice.is_fallback(),
        advice: outcome.advice.into_text(),
        commit: outcome.commit,
        session: SessionView::of(id, &tracked.session),
    }))
}

/// POST /api/v1/sessions/:id/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut tracked = handle.lock().await;
    let now = Utc::now();
    tracked.touch(now);

    let commit = tracked.session.save(state.store.as_ref(), now).await?;
    Ok(Json(SaveResponse {
        commit,
        session: SessionView::of(id, &tracked.session),
    }))
}

/// POST /api/advice
/// Stateless question endpoint: no session, no persistence.
pub async fn handle_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let intent = Intent::CustomQuestion { text: req.question };
    let prompt = prompts::build(&intent, &ProfileSnapshot::default())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let advice = state.advisor.generate(&prompt).await;
    Ok(Json(QuestionResponse {
        success: true,
        fallback: advice.is_fallback(),
        answer: advice.into_text(),
    }))
}
