//! Repository pattern for database operations
//!
//! All data access for the attendance domain goes through here: account
//! CRUD, session lifecycle, attendance writes, and report queries. The
//! join-heavy reporting queries use raw SQL statements.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
    TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

/// Attempts to allocate a session code before giving up. Collisions are
/// only possible against other currently-active sessions.
const CODE_ATTEMPTS: usize = 5;

/// Headline counts for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub classes: u64,
    pub students: u64,
    pub teachers: u64,
    pub subjects: u64,
}

/// Class row with its roster size
#[derive(Debug, Clone, Serialize)]
pub struct ClassOverview {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<FixedOffset>,
    pub student_count: i64,
}

/// Teacher row as listed for a class
#[derive(Debug, Clone, Serialize)]
pub struct TeacherOverview {
    pub user_id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Student row as listed for a class
#[derive(Debug, Clone, Serialize)]
pub struct StudentOverview {
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub face_registered: bool,
}

/// Teacher identity for the profile view
#[derive(Debug, Clone, Serialize)]
pub struct TeacherProfile {
    pub teacher_id: Uuid,
    pub name: String,
    pub email: String,
}

/// One (subject, class) assignment of a teacher
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRow {
    pub subject_name: String,
    pub course_code: String,
    pub class_name: String,
}

/// Assignment row carrying the ids needed to start a session
#[derive(Debug, Clone, Serialize)]
pub struct ClassSubjectRow {
    pub class_id: Uuid,
    pub class_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub course_code: String,
}

/// Student identity for the profile view
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub class_id: Uuid,
    pub class_name: String,
    pub face_registered: bool,
}

/// Session with denormalized names for display after start
#[derive(Debug, Clone, Serialize)]
pub struct SessionDisplay {
    pub id: Uuid,
    pub code: String,
    pub class_name: String,
    pub subject_name: String,
}

/// Session descriptor returned by code verification
#[derive(Debug, Clone, Serialize)]
pub struct OpenSession {
    pub session_id: Uuid,
    pub class_id: Uuid,
    pub class_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
}

/// One checked-in student of a session
#[derive(Debug, Clone, Serialize)]
pub struct AttendeeRow {
    pub name: String,
    pub email: String,
    pub marked_at: DateTime<FixedOffset>,
}

/// One (session, student) cell of the teacher report
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub date: DateTime<FixedOffset>,
    pub student_name: String,
    pub status: String,
}

/// Per-subject totals of the student self-report
#[derive(Debug, Clone, Serialize)]
pub struct SubjectTotals {
    pub name: String,
    pub code: String,
    pub total: i64,
    pub present: i64,
}

/// Map a unique-constraint violation to a domain rejection, passing other
/// database errors through unchanged
fn unique_violation(err: DbErr, duplicate: AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate,
        _ => AppError::Database(err),
    }
}

fn duplicate_email() -> AppError {
    AppError::Duplicate {
        message: "Email already exists".to_string(),
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Find a user account by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            name: Set(name.to_string()),
            role: Set(role.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        user.insert(conn)
            .await
            .map_err(|e| unique_violation(e, duplicate_email()))
    }

    async fn update_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        let user = UserEntity::find_by_id(user_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "user".to_string(),
                id: user_id.to_string(),
            })?;

        let mut user: UserActiveModel = user.into();
        user.name = Set(name.to_string());
        user.email = Set(email.to_string());
        if let Some(hash) = password_hash {
            user.password_hash = Set(hash.to_string());
        }

        user.update(conn)
            .await
            .map_err(|e| unique_violation(e, duplicate_email()))?;
        Ok(())
    }

    // ========================================================================
    // Admin dashboard
    // ========================================================================

    /// Headline counts for the admin dashboard
    pub async fn admin_stats(&self) -> Result<AdminStats> {
        let conn = self.read_conn();
        Ok(AdminStats {
            classes: ClassEntity::find().count(conn).await?,
            students: StudentEntity::find().count(conn).await?,
            teachers: TeacherEntity::find().count(conn).await?,
            subjects: SubjectEntity::find().count(conn).await?,
        })
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// List all classes with their roster sizes, ordered by name
    pub async fn list_classes(&self) -> Result<Vec<ClassOverview>> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            r#"
            SELECT c.id, c.name, c.created_at, COUNT(DISTINCT s.id) AS student_count
            FROM classes c
            LEFT JOIN students s ON c.id = s.class_id
            GROUP BY c.id, c.name, c.created_at
            ORDER BY c.name
            "#,
        );

        let mut classes = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            classes.push(ClassOverview {
                id: row.try_get_by_index(0)?,
                name: row.try_get_by_index(1)?,
                created_at: row.try_get_by_index(2)?,
                student_count: row.try_get_by_index(3)?,
            });
        }
        Ok(classes)
    }

    /// Create a class with a unique name
    pub async fn create_class(&self, name: &str) -> Result<Class> {
        let class = ClassActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        class.insert(self.write_conn()).await.map_err(|e| {
            unique_violation(
                e,
                AppError::Duplicate {
                    message: "Class already exists".to_string(),
                },
            )
        })
    }

    /// Rename a class
    pub async fn rename_class(&self, class_id: Uuid, name: &str) -> Result<Class> {
        let class = ClassEntity::find_by_id(class_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "class".to_string(),
                id: class_id.to_string(),
            })?;

        let mut class: ClassActiveModel = class.into();
        class.name = Set(name.to_string());

        class.update(self.write_conn()).await.map_err(|e| {
            unique_violation(
                e,
                AppError::Duplicate {
                    message: "Class name already exists".to_string(),
                },
            )
        })
    }

    /// Delete a class; dependents are removed by cascade
    pub async fn delete_class(&self, class_id: Uuid) -> Result<bool> {
        let result = ClassEntity::delete_by_id(class_id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Subjects
    // ========================================================================

    /// List the subjects of a class, ordered by name
    pub async fn class_subjects(&self, class_id: Uuid) -> Result<Vec<Subject>> {
        SubjectEntity::find()
            .filter(SubjectColumn::ClassId.eq(class_id))
            .order_by_asc(SubjectColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a subject under a class
    pub async fn create_subject(&self, class_id: Uuid, name: &str, code: &str) -> Result<Subject> {
        let subject = SubjectActiveModel {
            id: Set(Uuid::new_v4()),
            class_id: Set(class_id),
            name: Set(name.to_string()),
            code: Set(code.to_string()),
        };

        subject.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a subject
    pub async fn delete_subject(&self, subject_id: Uuid) -> Result<bool> {
        let result = SubjectEntity::delete_by_id(subject_id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Teachers
    // ========================================================================

    /// Find the teacher row backing a user account
    pub async fn find_teacher_by_user(&self, user_id: Uuid) -> Result<Option<Teacher>> {
        TeacherEntity::find()
            .filter(TeacherColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List the teachers assigned to at least one subject of a class
    pub async fn list_class_teachers(&self, class_id: Uuid) -> Result<Vec<TeacherOverview>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT DISTINCT u.id, t.id AS teacher_id, u.name, u.email
            FROM users u
            JOIN teachers t ON u.id = t.user_id
            JOIN teacher_subjects ts ON t.id = ts.teacher_id
            WHERE ts.class_id = $1
            ORDER BY u.name
            "#,
            vec![class_id.into()],
        );

        let mut teachers = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            teachers.push(TeacherOverview {
                user_id: row.try_get_by_index(0)?,
                teacher_id: row.try_get_by_index(1)?,
                name: row.try_get_by_index(2)?,
                email: row.try_get_by_index(3)?,
            });
        }
        Ok(teachers)
    }

    /// Create a teacher account with its subject assignments in one
    /// transaction
    pub async fn create_teacher_account(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        class_id: Uuid,
        subject_ids: &[Uuid],
    ) -> Result<Teacher> {
        let txn = self.write_conn().begin().await?;

        let user = self
            .insert_user(&txn, name, email, password_hash, "teacher")
            .await?;

        let teacher = TeacherActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
        };
        let teacher = teacher.insert(&txn).await?;

        for subject_id in subject_ids {
            let assignment = TeacherSubjectActiveModel {
                id: Set(Uuid::new_v4()),
                teacher_id: Set(teacher.id),
                subject_id: Set(*subject_id),
                class_id: Set(class_id),
            };
            assignment.insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(teacher)
    }

    /// Update a teacher's account and, when a class is given, replace its
    /// subject assignments for that class
    pub async fn update_teacher_account(
        &self,
        teacher_id: Uuid,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
        class_id: Option<Uuid>,
        subject_ids: Option<&[Uuid]>,
    ) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let teacher = TeacherEntity::find_by_id(teacher_id)
            .one(&txn)
            .await?
            .ok_or(AppError::TeacherNotFound)?;

        self.update_user(&txn, teacher.user_id, name, email, password_hash)
            .await?;

        if let (Some(class_id), Some(subject_ids)) = (class_id, subject_ids) {
            TeacherSubjectEntity::delete_many()
                .filter(TeacherSubjectColumn::TeacherId.eq(teacher_id))
                .filter(TeacherSubjectColumn::ClassId.eq(class_id))
                .exec(&txn)
                .await?;

            for subject_id in subject_ids {
                let assignment = TeacherSubjectActiveModel {
                    id: Set(Uuid::new_v4()),
                    teacher_id: Set(teacher_id),
                    subject_id: Set(*subject_id),
                    class_id: Set(class_id),
                };
                assignment.insert(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Delete a teacher by removing the backing user; cascade removes the
    /// teacher row and assignments
    pub async fn delete_teacher(&self, teacher_id: Uuid) -> Result<bool> {
        let Some(teacher) = TeacherEntity::find_by_id(teacher_id)
            .one(self.write_conn())
            .await?
        else {
            return Ok(false);
        };

        let result = UserEntity::delete_by_id(teacher.user_id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Subject ids a teacher is assigned for one class
    pub async fn teacher_subject_ids(
        &self,
        teacher_id: Uuid,
        class_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let assignments = TeacherSubjectEntity::find()
            .filter(TeacherSubjectColumn::TeacherId.eq(teacher_id))
            .filter(TeacherSubjectColumn::ClassId.eq(class_id))
            .all(self.read_conn())
            .await?;

        Ok(assignments.into_iter().map(|a| a.subject_id).collect())
    }

    /// Teacher identity for the profile view
    pub async fn teacher_profile(&self, user_id: Uuid) -> Result<Option<TeacherProfile>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT t.id, u.name, u.email
            FROM teachers t
            JOIN users u ON t.user_id = u.id
            WHERE u.id = $1
            "#,
            vec![user_id.into()],
        );

        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(None);
        };

        Ok(Some(TeacherProfile {
            teacher_id: row.try_get_by_index(0)?,
            name: row.try_get_by_index(1)?,
            email: row.try_get_by_index(2)?,
        }))
    }

    /// All (subject, class) assignments of a teacher
    pub async fn teacher_assignments(&self, teacher_id: Uuid) -> Result<Vec<AssignmentRow>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.name AS subject_name, s.code AS course_code, c.name AS class_name
            FROM teacher_subjects ts
            JOIN subjects s ON ts.subject_id = s.id
            JOIN classes c ON ts.class_id = c.id
            WHERE ts.teacher_id = $1
            "#,
            vec![teacher_id.into()],
        );

        let mut assignments = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            assignments.push(AssignmentRow {
                subject_name: row.try_get_by_index(0)?,
                course_code: row.try_get_by_index(1)?,
                class_name: row.try_get_by_index(2)?,
            });
        }
        Ok(assignments)
    }

    /// Distinct (class, subject) pairs a teacher may start sessions for
    pub async fn teacher_class_subjects(&self, teacher_id: Uuid) -> Result<Vec<ClassSubjectRow>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT DISTINCT c.id AS class_id, c.name AS class_name,
                   s.id AS subject_id, s.name AS subject_name, s.code AS course_code
            FROM teacher_subjects ts
            JOIN classes c ON ts.class_id = c.id
            JOIN subjects s ON ts.subject_id = s.id
            WHERE ts.teacher_id = $1
            ORDER BY c.name, s.name
            "#,
            vec![teacher_id.into()],
        );

        let mut pairs = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            pairs.push(ClassSubjectRow {
                class_id: row.try_get_by_index(0)?,
                class_name: row.try_get_by_index(1)?,
                subject_id: row.try_get_by_index(2)?,
                subject_name: row.try_get_by_index(3)?,
                course_code: row.try_get_by_index(4)?,
            });
        }
        Ok(pairs)
    }

    // ========================================================================
    // Students
    // ========================================================================

    /// Find the student row backing a user account
    pub async fn find_student_by_user(&self, user_id: Uuid) -> Result<Option<Student>> {
        StudentEntity::find()
            .filter(StudentColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List the students of a class
    pub async fn list_class_students(&self, class_id: Uuid) -> Result<Vec<StudentOverview>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT u.id, s.id AS student_id, u.name, u.email, s.face_registered
            FROM users u
            JOIN students s ON u.id = s.user_id
            WHERE s.class_id = $1
            ORDER BY u.name
            "#,
            vec![class_id.into()],
        );

        let mut students = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            students.push(StudentOverview {
                user_id: row.try_get_by_index(0)?,
                student_id: row.try_get_by_index(1)?,
                name: row.try_get_by_index(2)?,
                email: row.try_get_by_index(3)?,
                face_registered: row.try_get_by_index(4)?,
            });
        }
        Ok(students)
    }

    /// Create a student account in its class
    pub async fn create_student_account(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        class_id: Uuid,
    ) -> Result<Student> {
        let txn = self.write_conn().begin().await?;

        let user = self
            .insert_user(&txn, name, email, password_hash, "student")
            .await?;

        let student = StudentActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            class_id: Set(class_id),
            face_encoding: Set(None),
            face_registered: Set(false),
        };
        let student = student.insert(&txn).await?;

        txn.commit().await?;
        Ok(student)
    }

    /// Update a student's account details
    pub async fn update_student_account(
        &self,
        student_id: Uuid,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        let student = StudentEntity::find_by_id(student_id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::StudentNotFound)?;

        self.update_user(self.write_conn(), student.user_id, name, email, password_hash)
            .await
    }

    /// Delete a student by removing the backing user
    pub async fn delete_student(&self, student_id: Uuid) -> Result<bool> {
        let Some(student) = StudentEntity::find_by_id(student_id)
            .one(self.write_conn())
            .await?
        else {
            return Ok(false);
        };

        let result = UserEntity::delete_by_id(student.user_id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Store a student's face encoding, replacing any previous one
    pub async fn store_face_encoding(&self, student_id: Uuid, encoding: &[f32]) -> Result<()> {
        let student = StudentEntity::find_by_id(student_id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::StudentNotFound)?;

        let mut student: StudentActiveModel = student.into();
        student.face_encoding = Set(Some(serde_json::json!(encoding)));
        student.face_registered = Set(true);
        student.update(self.write_conn()).await?;
        Ok(())
    }

    /// Student identity for the profile view
    pub async fn student_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.id, u.name, u.email, s.class_id, c.name AS class_name, s.face_registered
            FROM students s
            JOIN users u ON s.user_id = u.id
            JOIN classes c ON s.class_id = c.id
            WHERE u.id = $1
            "#,
            vec![user_id.into()],
        );

        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(None);
        };

        Ok(Some(StudentProfile {
            student_id: row.try_get_by_index(0)?,
            name: row.try_get_by_index(1)?,
            email: row.try_get_by_index(2)?,
            class_id: row.try_get_by_index(3)?,
            class_name: row.try_get_by_index(4)?,
            face_registered: row.try_get_by_index(5)?,
        }))
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Start a session with a freshly generated code
    ///
    /// The partial unique index on active codes rejects a collision with
    /// another currently-active session; on that rejection a new code is
    /// generated and the insert retried.
    pub async fn start_session(
        &self,
        teacher_id: Uuid,
        class_id: Uuid,
        subject_id: Uuid,
        code_length: usize,
    ) -> Result<Session> {
        for _ in 0..CODE_ATTEMPTS {
            let session = SessionActiveModel {
                id: Set(Uuid::new_v4()),
                teacher_id: Set(teacher_id),
                class_id: Set(class_id),
                subject_id: Set(subject_id),
                code: Set(generate_code(code_length)),
                start_time: Set(chrono::Utc::now().into()),
                end_time: Set(None),
                is_active: Set(true),
            };

            match session.insert(self.write_conn()).await {
                Ok(session) => return Ok(session),
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    tracing::warn!("Session code collided with an active session, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal {
            message: "Could not allocate a unique session code".to_string(),
        })
    }

    /// Find a session by id
    pub async fn find_session_by_id(&self, session_id: Uuid) -> Result<Option<Session>> {
        SessionEntity::find_by_id(session_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Session with denormalized class/subject names for display
    pub async fn session_display(&self, session_id: Uuid) -> Result<Option<SessionDisplay>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.id, s.code, c.name AS class_name, sub.name AS subject_name
            FROM sessions s
            JOIN classes c ON s.class_id = c.id
            JOIN subjects sub ON s.subject_id = sub.id
            WHERE s.id = $1
            "#,
            vec![session_id.into()],
        );

        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(None);
        };

        Ok(Some(SessionDisplay {
            id: row.try_get_by_index(0)?,
            code: row.try_get_by_index(1)?,
            class_name: row.try_get_by_index(2)?,
            subject_name: row.try_get_by_index(3)?,
        }))
    }

    /// End a session. The guard on `is_active` keeps the first end_time
    /// when callers race; a second call is a no-op.
    pub async fn end_session(&self, session_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE sessions
            SET is_active = FALSE, end_time = NOW()
            WHERE id = $1 AND is_active
            "#,
            vec![session_id.into()],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Find the most recent active session matching `code` whose check-in
    /// window is still open
    pub async fn find_open_session_by_code(
        &self,
        code: &str,
        window_secs: i64,
    ) -> Result<Option<OpenSession>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.id, s.class_id, c.name AS class_name,
                   s.subject_id, sub.name AS subject_name
            FROM sessions s
            JOIN classes c ON s.class_id = c.id
            JOIN subjects sub ON s.subject_id = sub.id
            WHERE s.code = $1
              AND s.is_active
              AND s.start_time + make_interval(secs => $2) > NOW()
            ORDER BY s.start_time DESC
            LIMIT 1
            "#,
            vec![code.into(), (window_secs as f64).into()],
        );

        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(None);
        };

        Ok(Some(OpenSession {
            session_id: row.try_get_by_index(0)?,
            class_id: row.try_get_by_index(1)?,
            class_name: row.try_get_by_index(2)?,
            subject_id: row.try_get_by_index(3)?,
            subject_name: row.try_get_by_index(4)?,
        }))
    }

    // ========================================================================
    // Attendance
    // ========================================================================

    /// Find the attendance record of a student for a session
    pub async fn find_attendance(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Attendance>> {
        AttendanceEntity::find_by_id((session_id, student_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert an attendance record
    ///
    /// The composite primary key makes this the atomic at-most-once guard:
    /// a concurrent duplicate resolves to `AlreadyMarked` instead of a
    /// second row.
    pub async fn mark_attendance(&self, session_id: Uuid, student_id: Uuid) -> Result<Attendance> {
        let record = AttendanceActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            marked_at: Set(chrono::Utc::now().into()),
            status: Set(STATUS_PRESENT.to_string()),
        };

        record
            .insert(self.write_conn())
            .await
            .map_err(|e| unique_violation(e, AppError::AlreadyMarked))
    }

    /// Students checked in for a session, latest first
    pub async fn session_attendance(&self, session_id: Uuid) -> Result<Vec<AttendeeRow>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT u.name, u.email, a.marked_at
            FROM attendance a
            JOIN students s ON a.student_id = s.id
            JOIN users u ON s.user_id = u.id
            WHERE a.session_id = $1
            ORDER BY a.marked_at DESC
            "#,
            vec![session_id.into()],
        );

        let mut attendees = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            attendees.push(AttendeeRow {
                name: row.try_get_by_index(0)?,
                email: row.try_get_by_index(1)?,
                marked_at: row.try_get_by_index(2)?,
            });
        }
        Ok(attendees)
    }

    /// Present/absent cell for every (session, student) pair of a class and
    /// subject; students without a record for a session are absent
    pub async fn class_subject_report(
        &self,
        class_id: Uuid,
        subject_id: Uuid,
    ) -> Result<Vec<ReportRow>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.start_time AS date, u.name AS student_name,
                   CASE WHEN a.session_id IS NOT NULL THEN 'present' ELSE 'absent' END AS status
            FROM sessions s
            CROSS JOIN students st
            JOIN users u ON st.user_id = u.id
            LEFT JOIN attendance a ON s.id = a.session_id AND st.id = a.student_id
            WHERE s.class_id = $1 AND s.subject_id = $2 AND st.class_id = $1
            ORDER BY s.start_time DESC, u.name
            "#,
            vec![class_id.into(), subject_id.into()],
        );

        let mut records = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            records.push(ReportRow {
                date: row.try_get_by_index(0)?,
                student_name: row.try_get_by_index(1)?,
                status: row.try_get_by_index(2)?,
            });
        }
        Ok(records)
    }

    /// Per-subject session and attendance totals for one student
    pub async fn student_attendance_report(
        &self,
        student_id: Uuid,
        class_id: Uuid,
    ) -> Result<Vec<SubjectTotals>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT sub.name, sub.code,
                   COUNT(DISTINCT s.id) AS total,
                   COUNT(a.session_id) AS present
            FROM subjects sub
            LEFT JOIN sessions s ON s.subject_id = sub.id AND s.class_id = sub.class_id
            LEFT JOIN attendance a ON a.session_id = s.id AND a.student_id = $2
            WHERE sub.class_id = $1
            GROUP BY sub.id, sub.name, sub.code
            ORDER BY sub.name
            "#,
            vec![class_id.into(), student_id.into()],
        );

        let mut subjects = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            subjects.push(SubjectTotals {
                name: row.try_get_by_index(0)?,
                code: row.try_get_by_index(1)?,
                total: row.try_get_by_index(2)?,
                present: row.try_get_by_index(3)?,
            });
        }
        Ok(subjects)
    }
}
