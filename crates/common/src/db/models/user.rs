//! User entity and the role model

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of roles; capability checks are exhaustive matches on it.
/// Role is assigned at creation and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn is_student(self) -> bool {
        matches!(self, Role::Student)
    }

    pub fn is_teacher(self) -> bool {
        matches!(self, Role::Teacher)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub role: Role,

    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Course a student registered for; drives auto-enrollment on class creation
    pub course_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_student(&self) -> bool {
        self.role.is_student()
    }

    pub fn is_teacher(&self) -> bool {
        self.role.is_teacher()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,

    #[sea_orm(has_many = "super::class::Entity")]
    TaughtClasses,

    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,

    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities_are_exclusive() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            let flags = [role.is_student(), role.is_teacher(), role.is_admin()];
            assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        }
        assert!(Role::Teacher.is_teacher());
        assert!(Role::Admin.is_admin());
        assert!(Role::Student.is_student());
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
