//! SeaORM entity models
//!
//! The eight LearnTrack relations: users, courses, classes, enrollments,
//! assignments, submissions, notifications, messages.

pub mod assignment;
pub mod class;
pub mod course;
pub mod enrollment;
pub mod message;
pub mod notification;
pub mod submission;
pub mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    Role,
};

pub use course::{
    Entity as CourseEntity,
    Model as Course,
    ActiveModel as CourseActiveModel,
    Column as CourseColumn,
};

pub use class::{
    Entity as ClassEntity,
    Model as Class,
    ActiveModel as ClassActiveModel,
    Column as ClassColumn,
};

pub use enrollment::{
    Entity as EnrollmentEntity,
    Model as Enrollment,
    ActiveModel as EnrollmentActiveModel,
    Column as EnrollmentColumn,
};

pub use assignment::{
    Entity as AssignmentEntity,
    Model as Assignment,
    ActiveModel as AssignmentActiveModel,
    Column as AssignmentColumn,
};

pub use submission::{
    Entity as SubmissionEntity,
    Model as Submission,
    ActiveModel as SubmissionActiveModel,
    Column as SubmissionColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
    NotificationKind,
};

pub use message::{
    Entity as MessageEntity,
    Model as Message,
    ActiveModel as MessageActiveModel,
    Column as MessageColumn,
};
