//! Assignment entity

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub due_date: DateTimeWithTimeZone,

    pub max_score: i32,

    pub teacher_id: Uuid,

    pub class_id: Uuid,

    /// Reference into the file store, not a filesystem path
    #[sea_orm(column_type = "Text", nullable)]
    pub attachment_ref: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_overdue(&self) -> bool {
        Utc::now() > self.due_date
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,

    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id",
        on_delete = "Cascade"
    )]
    Class,

    #[sea_orm(has_many = "super::submission::Entity", on_delete = "Cascade")]
    Submissions,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(due_in_hours: i64) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            title: "HW1".to_string(),
            description: None,
            due_date: (now + Duration::hours(due_in_hours)).into(),
            max_score: 10,
            teacher_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            attachment_ref: None,
            created_at: now.into(),
        }
    }

    #[test]
    fn test_is_overdue() {
        assert!(!assignment(24).is_overdue());
        assert!(assignment(-1).is_overdue());
    }
}
