//! Student entity, one-to-one with a user account
//!
//! Holds the registered face encoding. `face_registered` must stay
//! consistent with `face_encoding` presence; both are written together.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub class_id: Uuid,

    /// Fixed-length encoding vector stored as a JSONB array of floats
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub face_encoding: Option<Json>,

    pub face_registered: bool,
}

impl Model {
    /// Decode the stored face encoding, if any
    pub fn encoding(&self) -> Option<Vec<f32>> {
        self.face_encoding
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(encoding: Option<Json>, registered: bool) -> Model {
        Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            face_encoding: encoding,
            face_registered: registered,
        }
    }

    #[test]
    fn test_encoding_roundtrip() {
        let vector = vec![0.25f32, -0.5, 0.75];
        let model = student(Some(serde_json::json!(vector)), true);
        assert_eq!(model.encoding().unwrap(), vector);
    }

    #[test]
    fn test_missing_encoding() {
        let model = student(None, false);
        assert!(model.encoding().is_none());
    }

    #[test]
    fn test_malformed_encoding_yields_none() {
        let model = student(Some(serde_json::json!({"not": "a vector"})), true);
        assert!(model.encoding().is_none());
    }
}
