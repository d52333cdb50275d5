//! Submission entity
//!
//! At most one submission per (assignment, student); a resubmission mutates
//! the row in place and clears the grading fields.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub assignment_id: Uuid,

    pub student_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Reference into the file store, not a filesystem path
    #[sea_orm(column_type = "Text", nullable)]
    pub file_ref: Option<String>,

    pub submitted_at: DateTimeWithTimeZone,

    // Grading fields; score present iff graded
    pub score: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,

    pub graded_at: Option<DateTimeWithTimeZone>,

    pub graded_by: Option<Uuid>,
}

impl Model {
    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }

    pub fn is_late(&self, due_date: DateTimeWithTimeZone) -> bool {
        self.submitted_at > due_date
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id",
        on_delete = "Cascade"
    )]
    Assignment,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_graded_and_late_predicates() {
        let now = Utc::now();
        let mut submission = Model {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            text: "first draft".to_string(),
            file_ref: None,
            submitted_at: now.into(),
            score: None,
            feedback: None,
            graded_at: None,
            graded_by: None,
        };
        assert!(!submission.is_graded());

        submission.score = Some(8);
        assert!(submission.is_graded());

        let due_before: DateTimeWithTimeZone = (now - Duration::hours(1)).into();
        let due_after: DateTimeWithTimeZone = (now + Duration::hours(1)).into();
        assert!(submission.is_late(due_before));
        assert!(!submission.is_late(due_after));
    }
}
