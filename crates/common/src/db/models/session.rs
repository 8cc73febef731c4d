//! Attendance session entity
//!
//! A session is open for check-in only while it is active and the check-in
//! window after `start_time` has not elapsed. Ending a session is terminal.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub teacher_id: Uuid,

    pub class_id: Uuid,

    pub subject_id: Uuid,

    /// Short decimal check-in code. Unique among active sessions only.
    #[sea_orm(column_type = "Text")]
    pub code: String,

    pub start_time: DateTimeWithTimeZone,

    pub end_time: Option<DateTimeWithTimeZone>,

    pub is_active: bool,
}

impl Model {
    /// Latest instant at which check-in is still accepted
    pub fn checkin_deadline(&self, window_secs: i64) -> DateTime<Utc> {
        self.start_time.with_timezone(&Utc) + Duration::seconds(window_secs)
    }

    /// Whether a student may check in at `now`
    pub fn is_open_for_checkin(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
        self.is_active && now < self.checkin_deadline(window_secs)
    }
}

/// Generate a session code of `length` decimal digits
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teacher::Entity",
        from = "Column::TeacherId",
        to = "super::teacher::Column::Id"
    )]
    Teacher,

    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,

    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Records,
}

impl Related<super::teacher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: DateTime<Utc>, active: bool) -> Model {
        Model {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            code: "482913".to_string(),
            start_time: start.into(),
            end_time: if active { None } else { Some(start.into()) },
            is_active: active,
        }
    }

    #[test]
    fn test_open_within_window() {
        let start = Utc::now();
        let s = session(start, true);
        assert!(s.is_open_for_checkin(start + Duration::seconds(30), 60));
    }

    #[test]
    fn test_closed_after_window() {
        let start = Utc::now();
        let s = session(start, true);
        assert!(!s.is_open_for_checkin(start + Duration::seconds(61), 60));
        // the boundary instant itself is closed: now must be strictly earlier
        assert!(!s.is_open_for_checkin(start + Duration::seconds(60), 60));
    }

    #[test]
    fn test_ended_session_is_closed() {
        let start = Utc::now();
        let s = session(start, false);
        assert!(!s.is_open_for_checkin(start + Duration::seconds(10), 60));
    }

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..50 {
            let code = generate_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
