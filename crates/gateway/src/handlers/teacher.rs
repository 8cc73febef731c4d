//! Teacher handlers: profile, session lifecycle, and attendance reporting

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::MessageResponse;
use crate::AppState;
use rollcall_common::{
    auth::{AuthContext, Role},
    db::repository::ClassSubjectRow,
    db::{models::Teacher, Repository},
    errors::{AppError, Result},
    metrics,
};

/// Resolve the teacher row backing the authenticated user
async fn current_teacher(repo: &Repository, auth: &AuthContext) -> Result<Teacher> {
    repo.find_teacher_by_user(auth.user_id)
        .await?
        .ok_or(AppError::TeacherNotFound)
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Serialize)]
pub struct TeacherProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subjects: Vec<AssignmentResponse>,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub subject_name: String,
    pub course_code: String,
    pub class_name: String,
}

/// The teacher's identity and assignment list
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<TeacherProfileResponse>> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    let profile = repo
        .teacher_profile(auth.user_id)
        .await?
        .ok_or(AppError::TeacherNotFound)?;

    let subjects = repo
        .teacher_assignments(profile.teacher_id)
        .await?
        .into_iter()
        .map(|a| AssignmentResponse {
            subject_name: a.subject_name,
            course_code: a.course_code,
            class_name: a.class_name,
        })
        .collect();

    Ok(Json(TeacherProfileResponse {
        id: profile.teacher_id,
        name: profile.name,
        email: profile.email,
        subjects,
    }))
}

/// The (class, subject) pairs this teacher may start sessions for
pub async fn classes_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ClassSubjectRow>>> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    let teacher = current_teacher(&repo, &auth).await?;

    Ok(Json(repo.teacher_class_subjects(teacher.id).await?))
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub class_id: Uuid,
    pub subject_id: Uuid,
}

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub id: Uuid,
    pub code: String,
    pub class_name: String,
    pub subject_name: String,
}

/// Open a time-boxed attendance session and hand out its check-in code
pub async fn start_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>)> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    let teacher = current_teacher(&repo, &auth).await?;

    let session = repo
        .start_session(
            teacher.id,
            request.class_id,
            request.subject_id,
            state.config.attendance.code_length,
        )
        .await?;

    metrics::record_session_started();

    let display = repo
        .session_display(session.id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound {
            id: session.id.to_string(),
        })?;

    tracing::info!(
        session_id = %session.id,
        teacher_id = %teacher.id,
        class_id = %request.class_id,
        subject_id = %request.subject_id,
        "Session started"
    );

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            id: display.id,
            code: display.code,
            class_name: display.class_name,
            subject_name: display.subject_name,
        }),
    ))
}

#[derive(Serialize)]
pub struct AttendeeResponse {
    pub name: String,
    pub email: String,
    pub marked_at: String,
}

/// Students checked in for a session, latest first
pub async fn session_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<AttendeeResponse>>> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    let attendees = repo
        .session_attendance(session_id)
        .await?
        .into_iter()
        .map(|a| AttendeeResponse {
            name: a.name,
            email: a.email,
            marked_at: a.marked_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(attendees))
}

/// End a session. Terminal: an ended session never accepts check-ins again.
pub async fn end_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(session_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    repo.end_session(session_id).await?;

    metrics::record_session_ended();
    tracing::info!(session_id = %session_id, "Session ended");

    Ok(Json(MessageResponse::new("Session ended successfully")))
}

// ============================================================================
// Reporting
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub class_id: Uuid,
    pub subject_id: Uuid,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub records: Vec<ReportRecordResponse>,
}

#[derive(Serialize)]
pub struct ReportRecordResponse {
    pub date: String,
    pub student_name: String,
    pub status: String,
}

/// Present/absent matrix over every session of a (class, subject) and the
/// class roster; recomputed from the ledger on every request
pub async fn report(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>> {
    auth.require_role(Role::Teacher)?;

    let repo = Repository::new(state.db.clone());
    let records = repo
        .class_subject_report(query.class_id, query.subject_id)
        .await?
        .into_iter()
        .map(|r| ReportRecordResponse {
            date: r.date.to_rfc3339(),
            student_name: r.student_name,
            status: r.status,
        })
        .collect();

    Ok(Json(ReportResponse { records }))
}
