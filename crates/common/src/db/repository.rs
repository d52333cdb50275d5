//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling. Multi-step domain mutations with
//! notification fan-out live in the `services` module; the repository
//! is the read/query surface both share.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

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

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find a student by email (enrollment targets must hold the student role)
    pub async fn find_student_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .filter(UserColumn::Role.eq(Role::Student))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>> {
        UserEntity::find()
            .order_by_asc(UserColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List users with a given role
    pub async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        UserEntity::find()
            .filter(UserColumn::Role.eq(role))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List every user except the given one
    pub async fn list_users_except(&self, user_id: Uuid) -> Result<Vec<User>> {
        UserEntity::find()
            .filter(UserColumn::Id.ne(user_id))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Course Operations
    // ========================================================================

    /// Find course by ID
    pub async fn find_course_by_id(&self, id: Uuid) -> Result<Option<Course>> {
        CourseEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find course by name (names are unique)
    pub async fn find_course_by_name(&self, name: &str) -> Result<Option<Course>> {
        CourseEntity::find()
            .filter(CourseColumn::Name.eq(name))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List all courses
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        CourseEntity::find()
            .order_by_asc(CourseColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Class Operations
    // ========================================================================

    /// List all classes
    pub async fn list_classes(&self) -> Result<Vec<Class>> {
        ClassEntity::find()
            .order_by_desc(ClassColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find class by ID
    pub async fn find_class_by_id(&self, id: Uuid) -> Result<Option<Class>> {
        ClassEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List classes taught by a teacher
    pub async fn list_classes_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<Class>> {
        ClassEntity::find()
            .filter(ClassColumn::TeacherId.eq(teacher_id))
            .order_by_desc(ClassColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List classes a student is enrolled in
    pub async fn list_enrolled_classes(&self, student_id: Uuid) -> Result<Vec<Class>> {
        let class_ids: Vec<Uuid> = self
            .list_enrollments_by_student(student_id)
            .await?
            .into_iter()
            .map(|e| e.class_id)
            .collect();

        if class_ids.is_empty() {
            return Ok(Vec::new());
        }

        ClassEntity::find()
            .filter(ClassColumn::Id.is_in(class_ids))
            .order_by_desc(ClassColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Enrollment Operations
    // ========================================================================

    /// Find the enrollment row for a (student, class) pair
    pub async fn find_enrollment(
        &self,
        student_id: Uuid,
        class_id: Uuid,
    ) -> Result<Option<Enrollment>> {
        EnrollmentEntity::find()
            .filter(EnrollmentColumn::StudentId.eq(student_id))
            .filter(EnrollmentColumn::ClassId.eq(class_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Check whether a student is enrolled in a class
    pub async fn is_enrolled(&self, student_id: Uuid, class_id: Uuid) -> Result<bool> {
        Ok(self.find_enrollment(student_id, class_id).await?.is_some())
    }

    /// List enrollments for a class
    pub async fn list_enrollments_by_class(&self, class_id: Uuid) -> Result<Vec<Enrollment>> {
        EnrollmentEntity::find()
            .filter(EnrollmentColumn::ClassId.eq(class_id))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List enrollments for a student
    pub async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>> {
        EnrollmentEntity::find()
            .filter(EnrollmentColumn::StudentId.eq(student_id))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Assignment Operations
    // ========================================================================

    /// Find assignment by ID
    pub async fn find_assignment_by_id(&self, id: Uuid) -> Result<Option<Assignment>> {
        AssignmentEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List assignments created by a teacher, newest due date first
    pub async fn list_assignments_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<Assignment>> {
        AssignmentEntity::find()
            .filter(AssignmentColumn::TeacherId.eq(teacher_id))
            .order_by_desc(AssignmentColumn::DueDate)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List assignments belonging to any of the given classes
    pub async fn list_assignments_for_classes(
        &self,
        class_ids: Vec<Uuid>,
    ) -> Result<Vec<Assignment>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }

        AssignmentEntity::find()
            .filter(AssignmentColumn::ClassId.is_in(class_ids))
            .order_by_desc(AssignmentColumn::DueDate)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Submission Operations
    // ========================================================================

    /// Find submission by ID
    pub async fn find_submission_by_id(&self, id: Uuid) -> Result<Option<Submission>> {
        SubmissionEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find the submission for an (assignment, student) pair
    pub async fn find_submission(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Submission>> {
        SubmissionEntity::find()
            .filter(SubmissionColumn::AssignmentId.eq(assignment_id))
            .filter(SubmissionColumn::StudentId.eq(student_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List submissions for an assignment
    pub async fn list_submissions_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<Submission>> {
        SubmissionEntity::find()
            .filter(SubmissionColumn::AssignmentId.eq(assignment_id))
            .order_by_desc(SubmissionColumn::SubmittedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List a student's submissions, newest first
    pub async fn list_submissions_by_student(&self, student_id: Uuid) -> Result<Vec<Submission>> {
        SubmissionEntity::find()
            .filter(SubmissionColumn::StudentId.eq(student_id))
            .order_by_desc(SubmissionColumn::SubmittedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List a student's graded submissions, most recently graded first
    pub async fn list_graded_submissions(&self, student_id: Uuid) -> Result<Vec<Submission>> {
        SubmissionEntity::find()
            .filter(SubmissionColumn::StudentId.eq(student_id))
            .filter(SubmissionColumn::Score.is_not_null())
            .order_by_desc(SubmissionColumn::GradedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Notification Operations
    // ========================================================================

    /// List a user's notifications, newest first
    pub async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        NotificationEntity::find()
            .filter(NotificationColumn::UserId.eq(user_id))
            .order_by_desc(NotificationColumn::Timestamp)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Both directions of a conversation, oldest first
    pub async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>> {
        MessageEntity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(MessageColumn::SenderId.eq(user_a))
                            .add(MessageColumn::ReceiverId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(MessageColumn::SenderId.eq(user_b))
                            .add(MessageColumn::ReceiverId.eq(user_a)),
                    ),
            )
            .order_by_asc(MessageColumn::Timestamp)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Count unread messages a sender has waiting for a receiver
    pub async fn unread_count_from(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<u64> {
        MessageEntity::find()
            .filter(MessageColumn::SenderId.eq(sender_id))
            .filter(MessageColumn::ReceiverId.eq(receiver_id))
            .filter(MessageColumn::IsRead.eq(false))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }
}
