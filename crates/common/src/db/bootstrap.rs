//! Schema bootstrap and default-admin seeding
//!
//! Called explicitly once from `main` before the server accepts requests.
//! Every statement is idempotent, so re-running at each process start is
//! safe and leaves existing data untouched.

use crate::auth;
use crate::config::AuthConfig;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tracing::info;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS classes (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subjects (
        id UUID PRIMARY KEY,
        class_id UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        code TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teachers (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teacher_subjects (
        id UUID PRIMARY KEY,
        teacher_id UUID NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
        subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
        class_id UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS students (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        class_id UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
        face_encoding JSONB,
        face_registered BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id UUID PRIMARY KEY,
        teacher_id UUID NOT NULL REFERENCES teachers(id),
        class_id UUID NOT NULL REFERENCES classes(id),
        subject_id UUID NOT NULL REFERENCES subjects(id),
        code TEXT NOT NULL,
        start_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        end_time TIMESTAMPTZ,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    // Two concurrently active sessions may never share a code; historical
    // (ended) sessions are exempt.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS sessions_active_code_idx
        ON sessions (code) WHERE is_active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
        marked_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        status TEXT NOT NULL DEFAULT 'present',
        PRIMARY KEY (session_id, student_id)
    )
    "#,
];

/// Create the schema and seed the default admin account
pub async fn initialize(db: &DbPool, auth_config: &AuthConfig) -> Result<()> {
    info!("Initializing database schema...");

    for ddl in SCHEMA {
        db.write().execute_unprepared(ddl).await?;
    }

    seed_admin(db, auth_config).await?;

    info!("Database schema ready");
    Ok(())
}

async fn seed_admin(db: &DbPool, auth_config: &AuthConfig) -> Result<()> {
    let password_hash = auth::hash_password(&auth_config.admin_password)?;

    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        INSERT INTO users (id, email, password_hash, name, role, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (email) DO NOTHING
        "#,
        vec![
            Uuid::new_v4().into(),
            auth_config.admin_email.clone().into(),
            password_hash.into(),
            "Admin".into(),
            "admin".into(),
        ],
    );

    let result = db.write().execute(stmt).await?;
    if result.rows_affected() > 0 {
        info!(email = %auth_config.admin_email, "Default admin account created");
    }

    Ok(())
}
