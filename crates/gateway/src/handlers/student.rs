//! Student handlers: profile, face registration, and the check-in workflow
//!
//! Check-in runs the cheap, local preconditions (registered encoding,
//! not-already-marked) before the expensive face scan, so most rejections
//! never touch the engine.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::handlers::MessageResponse;
use crate::AppState;
use rollcall_common::{
    auth::{AuthContext, Role},
    db::{models::Student, Repository},
    errors::{AppError, Result},
    face::{self, Encoding, RgbFrame},
    metrics,
};

/// Resolve the student row backing the authenticated user
async fn current_student(repo: &Repository, auth: &AuthContext) -> Result<Student> {
    repo.find_student_by_user(auth.user_id)
        .await?
        .ok_or(AppError::StudentNotFound)
}

/// Scan a frame and insist on exactly one face
async fn scan_single_face(state: &AppState, frame: &RgbFrame) -> Result<Encoding> {
    let start = Instant::now();
    let result = state.faces.scan(frame).await;
    metrics::record_face_scan(start.elapsed().as_secs_f64(), result.is_ok());

    let mut encodings = result?;
    match encodings.len() {
        0 => Err(AppError::NoFaceDetected),
        1 => Ok(encodings.remove(0)),
        _ => Err(AppError::MultipleFacesDetected),
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Serialize)]
pub struct StudentProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub class_name: String,
    pub face_registered: bool,
    pub subjects: Vec<SubjectInfo>,
}

#[derive(Serialize)]
pub struct SubjectInfo {
    pub name: String,
    pub code: String,
}

/// The student's identity, class, and subject list
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<StudentProfileResponse>> {
    auth.require_role(Role::Student)?;

    let repo = Repository::new(state.db.clone());
    let profile = repo
        .student_profile(auth.user_id)
        .await?
        .ok_or(AppError::StudentNotFound)?;

    let subjects = repo
        .class_subjects(profile.class_id)
        .await?
        .into_iter()
        .map(|s| SubjectInfo {
            name: s.name,
            code: s.code,
        })
        .collect();

    Ok(Json(StudentProfileResponse {
        id: profile.student_id,
        name: profile.name,
        email: profile.email,
        class_name: profile.class_name,
        face_registered: profile.face_registered,
        subjects,
    }))
}

// ============================================================================
// Face registration
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterFaceRequest {
    /// Data-URI-encoded bitmap from the capture widget
    pub image: String,
}

/// Register the student's face encoding
///
/// Requires exactly one face in the frame. Re-registration overwrites the
/// previous encoding; no history is kept.
pub async fn register_face(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RegisterFaceRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Student)?;

    let repo = Repository::new(state.db.clone());
    let student = current_student(&repo, &auth).await?;

    let frame = face::decode_data_uri(&request.image)?;
    let encoding = scan_single_face(&state, &frame).await?;

    repo.store_face_encoding(student.id, &encoding).await?;

    tracing::info!(student_id = %student.id, "Face registered");

    Ok(Json(MessageResponse::new("Face registered successfully")))
}

// ============================================================================
// Code verification
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub session_id: Uuid,
    pub class_id: Uuid,
    pub class_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
}

/// Resolve a check-in code to its session
///
/// The code matches only while its session is active and inside the
/// check-in window; a matching session of another class is rejected as
/// ineligible rather than expired.
pub async fn verify_code(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>> {
    auth.require_role(Role::Student)?;

    let repo = Repository::new(state.db.clone());
    let student = current_student(&repo, &auth).await?;

    let session = repo
        .find_open_session_by_code(
            request.code.trim(),
            state.config.attendance.code_window_secs,
        )
        .await?
        .ok_or(AppError::InvalidSessionCode)?;

    if session.class_id != student.class_id {
        return Err(AppError::NotEligible);
    }

    Ok(Json(VerifyCodeResponse {
        session_id: session.session_id,
        class_id: session.class_id,
        class_name: session.class_name,
        subject_id: session.subject_id,
        subject_name: session.subject_name,
    }))
}

// ============================================================================
// Attendance marking
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub session_id: Uuid,

    /// Data-URI-encoded bitmap of the live capture
    pub image: String,
}

/// Verify the student's face and write the attendance record
pub async fn mark_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<MarkAttendanceRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Student)?;

    let repo = Repository::new(state.db.clone());
    let student = current_student(&repo, &auth).await?;

    // Cheap preconditions first
    let stored = student.encoding().ok_or(AppError::FaceNotRegistered)?;

    repo.find_session_by_id(request.session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound {
            id: request.session_id.to_string(),
        })?;

    if repo
        .find_attendance(request.session_id, student.id)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyMarked);
    }

    // Biometric verification
    let frame = face::decode_data_uri(&request.image)?;
    let probe = scan_single_face(&state, &frame).await?;

    let matched = face::is_match(&stored, &probe, state.config.face.match_tolerance);
    metrics::record_face_verification(matched);

    if !matched {
        return Err(AppError::FaceVerificationFailed);
    }

    // The composite key turns a racing duplicate into AlreadyMarked
    repo.mark_attendance(request.session_id, student.id).await?;
    metrics::record_attendance_marked();

    tracing::info!(
        session_id = %request.session_id,
        student_id = %student.id,
        "Attendance marked"
    );

    Ok(Json(MessageResponse::new("Attendance marked successfully")))
}

// ============================================================================
// Self-report
// ============================================================================

#[derive(Serialize)]
pub struct AttendanceReportResponse {
    pub subjects: Vec<SubjectReportResponse>,
}

#[derive(Serialize)]
pub struct SubjectReportResponse {
    pub name: String,
    pub code: String,
    pub total: i64,
    pub present: i64,
}

/// Per-subject totals for the authenticated student
pub async fn attendance_report(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<AttendanceReportResponse>> {
    auth.require_role(Role::Student)?;

    let repo = Repository::new(state.db.clone());
    let student = current_student(&repo, &auth).await?;

    let subjects = repo
        .student_attendance_report(student.id, student.class_id)
        .await?
        .into_iter()
        .map(|s| SubjectReportResponse {
            name: s.name,
            code: s.code,
            total: s.total,
            present: s.present,
        })
        .collect();

    Ok(Json(AttendanceReportResponse { subjects }))
}
