//! Admin handlers: directory management (classes, subjects, teachers,
//! students) and the dashboard stats

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::MessageResponse;
use crate::AppState;
use rollcall_common::{
    auth::{self, AuthContext, Role},
    db::repository::{AdminStats, StudentOverview, TeacherOverview},
    db::Repository,
    errors::{AppError, Result},
};

fn validated<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

// ============================================================================
// Stats
// ============================================================================

/// Headline counts for the admin dashboard
pub async fn stats(State(state): State<AppState>, auth: AuthContext) -> Result<Json<AdminStats>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.admin_stats().await?))
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ClassRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Serialize)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
    pub student_count: i64,
}

/// List all classes with their roster sizes
pub async fn list_classes(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ClassResponse>>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    let classes = repo
        .list_classes()
        .await?
        .into_iter()
        .map(|c| ClassResponse {
            id: c.id,
            name: c.name,
            created_at: c.created_at.to_rfc3339(),
            student_count: c.student_count,
        })
        .collect();

    Ok(Json(classes))
}

/// Create a class
pub async fn create_class(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ClassRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let repo = Repository::new(state.db.clone());
    let class = repo.create_class(&request.name).await?;

    tracing::info!(class_id = %class.id, name = %class.name, "Class created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Class created successfully")),
    ))
}

/// Rename a class
pub async fn update_class(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
    Json(request): Json<ClassRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let repo = Repository::new(state.db.clone());
    repo.rename_class(class_id, &request.name).await?;

    Ok(Json(MessageResponse::new("Class updated successfully")))
}

/// Delete a class and everything under it
pub async fn delete_class(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    repo.delete_class(class_id).await?;

    tracing::info!(class_id = %class_id, "Class deleted");

    Ok(Json(MessageResponse::new("Class deleted successfully")))
}

// ============================================================================
// Subjects
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub code: String,
}

#[derive(Serialize)]
pub struct SubjectResponse {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: String,
    pub code: String,
}

/// List the subjects of a class
pub async fn list_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<SubjectResponse>>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    let subjects = repo
        .class_subjects(class_id)
        .await?
        .into_iter()
        .map(|s| SubjectResponse {
            id: s.id,
            class_id: s.class_id,
            name: s.name,
            code: s.code,
        })
        .collect();

    Ok(Json(subjects))
}

/// Create a subject under a class
pub async fn create_subject(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
    Json(request): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let repo = Repository::new(state.db.clone());
    repo.create_subject(class_id, &request.name, &request.code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Subject created successfully")),
    ))
}

/// Delete a subject
pub async fn delete_subject(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    repo.delete_subject(subject_id).await?;

    Ok(Json(MessageResponse::new("Subject deleted successfully")))
}

// ============================================================================
// Teachers
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,

    /// Subject ids of the class to assign this teacher to
    #[serde(default)]
    pub subjects: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeacherRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    /// When present, resets the password
    pub password: Option<String>,

    /// When present together with class_id, replaces the assignments for
    /// that class
    pub subjects: Option<Vec<Uuid>>,

    pub class_id: Option<Uuid>,
}

/// List the teachers assigned to a class
pub async fn list_teachers(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<TeacherOverview>>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_class_teachers(class_id).await?))
}

/// Create a teacher account with its subject assignments
pub async fn create_teacher(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
    Json(request): Json<CreateTeacherRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let password_hash = auth::hash_password(&request.password)?;

    let repo = Repository::new(state.db.clone());
    let teacher = repo
        .create_teacher_account(
            &request.name,
            &request.email,
            &password_hash,
            class_id,
            &request.subjects,
        )
        .await?;

    tracing::info!(teacher_id = %teacher.id, class_id = %class_id, "Teacher created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Teacher created successfully")),
    ))
}

/// Update a teacher's account and assignments
pub async fn update_teacher(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(teacher_id): Path<Uuid>,
    Json(request): Json<UpdateTeacherRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let password_hash = match request.password.as_deref() {
        Some(password) if !password.is_empty() => Some(auth::hash_password(password)?),
        _ => None,
    };

    let repo = Repository::new(state.db.clone());
    repo.update_teacher_account(
        teacher_id,
        &request.name,
        &request.email,
        password_hash.as_deref(),
        request.class_id,
        request.subjects.as_deref(),
    )
    .await?;

    Ok(Json(MessageResponse::new("Teacher updated successfully")))
}

/// Delete a teacher and its backing user account
pub async fn delete_teacher(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    repo.delete_teacher(teacher_id).await?;

    tracing::info!(teacher_id = %teacher_id, "Teacher deleted");

    Ok(Json(MessageResponse::new("Teacher deleted successfully")))
}

/// Subject ids a teacher is assigned for one class
pub async fn teacher_class_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((teacher_id, class_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Uuid>>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.teacher_subject_ids(teacher_id, class_id).await?))
}

// ============================================================================
// Students
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    /// When present, resets the password
    pub password: Option<String>,
}

/// List the students of a class with their face registration state
pub async fn list_students(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<StudentOverview>>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_class_students(class_id).await?))
}

/// Create a student account in a class
pub async fn create_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
    Json(request): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let password_hash = auth::hash_password(&request.password)?;

    let repo = Repository::new(state.db.clone());
    let student = repo
        .create_student_account(&request.name, &request.email, &password_hash, class_id)
        .await?;

    tracing::info!(student_id = %student.id, class_id = %class_id, "Student created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Student created successfully")),
    ))
}

/// Update a student's account details
pub async fn update_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(student_id): Path<Uuid>,
    Json(request): Json<UpdateStudentRequest>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;
    validated(&request)?;

    let password_hash = match request.password.as_deref() {
        Some(password) if !password.is_empty() => Some(auth::hash_password(password)?),
        _ => None,
    };

    let repo = Repository::new(state.db.clone());
    repo.update_student_account(
        student_id,
        &request.name,
        &request.email,
        password_hash.as_deref(),
    )
    .await?;

    Ok(Json(MessageResponse::new("Student updated successfully")))
}

/// Delete a student and its backing user account
pub async fn delete_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(student_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    auth.require_role(Role::Admin)?;

    let repo = Repository::new(state.db.clone());
    repo.delete_student(student_id).await?;

    tracing::info!(student_id = %student_id, "Student deleted");

    Ok(Json(MessageResponse::new("Student deleted successfully")))
}
