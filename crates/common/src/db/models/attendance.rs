//! Attendance record entity
//!
//! Composite primary key (session_id, student_id): the storage layer
//! guarantees at most one record per student per session, so a racing
//! duplicate submission fails on insert instead of writing a second row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status written for a successful check-in
pub const STATUS_PRESENT: &str = "present";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: Uuid,

    pub marked_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,

    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
