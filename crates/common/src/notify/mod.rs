//! Notification fan-out
//!
//! Pure derivation: given a domain event and the graph state at the moment
//! of the event, compute the recipient set and message text. The caller
//! persists one row per draft inside the same transaction as the triggering
//! mutation, so fan-out is never observable without its trigger.
//!
//! Recipients never include the actor who triggered the event.

use crate::db::models::{assignment, class, notification, user, NotificationKind};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use uuid::Uuid;

/// A notification to be persisted, one per recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub kind: NotificationKind,
}

/// Domain events that trigger fan-out
#[derive(Debug)]
pub enum DomainEvent<'a> {
    /// A teacher created a class; students were auto-enrolled into it
    ClassCreated {
        class: &'a class::Model,
        teacher: &'a user::Model,
    },

    /// A teacher posted an assignment to a class
    AssignmentCreated {
        assignment: &'a assignment::Model,
        teacher: &'a user::Model,
    },

    /// A student submitted (or resubmitted) an assignment
    AssignmentSubmitted {
        assignment: &'a assignment::Model,
        student: &'a user::Model,
    },
}

impl DomainEvent<'_> {
    /// The user who triggered the event; always excluded from recipients
    fn actor_id(&self) -> Uuid {
        match self {
            DomainEvent::ClassCreated { teacher, .. } => teacher.id,
            DomainEvent::AssignmentCreated { teacher, .. } => teacher.id,
            DomainEvent::AssignmentSubmitted { student, .. } => student.id,
        }
    }
}

/// Graph state relevant to the event, captured inside the same transaction
#[derive(Debug, Default)]
pub struct Audience<'a> {
    /// Students affected by the event (auto-enrolled or enrolled in the class)
    pub students: &'a [user::Model],

    /// Every admin user
    pub admins: &'a [user::Model],

    /// The teacher owning the touched class/assignment, where relevant
    pub teacher: Option<&'a user::Model>,
}

/// Compute the notification set for a domain event.
///
/// The returned drafts are exactly the rows to persist: one per recipient,
/// actor excluded, message text fixed per event kind.
pub fn fan_out(event: &DomainEvent<'_>, audience: &Audience<'_>) -> Vec<NotificationDraft> {
    let mut drafts = Vec::new();

    match event {
        DomainEvent::ClassCreated { class, teacher } => {
            for student in audience.students {
                drafts.push(NotificationDraft {
                    user_id: student.id,
                    message: format!("New class \"{}\" created for your course.", class.name),
                    link: Some(format!("/v1/classes/{}", class.id)),
                    kind: NotificationKind::Info,
                });
            }
            for admin in audience.admins {
                drafts.push(NotificationDraft {
                    user_id: admin.id,
                    message: format!(
                        "New class \"{}\" created by {}.",
                        class.name, teacher.name
                    ),
                    link: Some(format!("/v1/classes/{}", class.id)),
                    kind: NotificationKind::Info,
                });
            }
        }

        DomainEvent::AssignmentCreated {
            assignment,
            teacher,
        } => {
            for student in audience.students {
                drafts.push(NotificationDraft {
                    user_id: student.id,
                    message: format!(
                        "New assignment \"{}\" has been posted.",
                        assignment.title
                    ),
                    link: Some(format!("/v1/assignments/{}", assignment.id)),
                    kind: NotificationKind::Info,
                });
            }
            for admin in audience.admins {
                drafts.push(NotificationDraft {
                    user_id: admin.id,
                    message: format!(
                        "New assignment \"{}\" created by {}.",
                        assignment.title, teacher.name
                    ),
                    link: Some(format!("/v1/assignments/{}", assignment.id)),
                    kind: NotificationKind::Info,
                });
            }
        }

        DomainEvent::AssignmentSubmitted {
            assignment,
            student,
        } => {
            let message = format!(
                "{} submitted assignment \"{}\".",
                student.name, assignment.title
            );
            let link = format!("/v1/assignments/{}/submissions", assignment.id);

            if let Some(teacher) = audience.teacher {
                drafts.push(NotificationDraft {
                    user_id: teacher.id,
                    message: message.clone(),
                    link: Some(link.clone()),
                    kind: NotificationKind::Info,
                });
            }
            for admin in audience.admins {
                drafts.push(NotificationDraft {
                    user_id: admin.id,
                    message: message.clone(),
                    link: Some(link.clone()),
                    kind: NotificationKind::Info,
                });
            }
        }
    }

    let actor = event.actor_id();
    drafts.retain(|d| d.user_id != actor);
    drafts
}

/// Turn drafts into insertable rows stamped with the transaction time
pub fn into_active_models(
    drafts: Vec<NotificationDraft>,
    now: DateTime<Utc>,
) -> Vec<notification::ActiveModel> {
    drafts
        .into_iter()
        .map(|d| notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(d.user_id),
            message: Set(d.message),
            link: Set(d.link),
            is_read: Set(false),
            timestamp: Set(now.into()),
            kind: Set(d.kind),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn person(name: &str, role: Role, course_id: Option<Uuid>) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            role,
            password_hash: String::new(),
            course_id,
            created_at: Utc::now().into(),
        }
    }

    fn section(name: &str, teacher_id: Uuid, course_id: Uuid) -> class::Model {
        class::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            teacher_id,
            course_id,
            created_at: Utc::now().into(),
        }
    }

    fn homework(title: &str, teacher_id: Uuid, class_id: Uuid) -> assignment::Model {
        assignment::Model {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            due_date: Utc::now().into(),
            max_score: 10,
            teacher_id,
            class_id,
            attachment_ref: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_class_created_notifies_enrolled_students_and_admins() {
        // Course "Algebra I": Alice matches, Bob belongs to another course and
        // is never part of the captured audience. Carol creates the class.
        let algebra = Uuid::new_v4();
        let alice = person("Alice", Role::Student, Some(algebra));
        let carol = person("Carol", Role::Teacher, None);
        let admin = person("Root", Role::Admin, None);
        let class = section("Algebra Section A", carol.id, algebra);

        let drafts = fan_out(
            &DomainEvent::ClassCreated {
                class: &class,
                teacher: &carol,
            },
            &Audience {
                students: std::slice::from_ref(&alice),
                admins: std::slice::from_ref(&admin),
                teacher: None,
            },
        );

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].user_id, alice.id);
        assert_eq!(
            drafts[0].message,
            "New class \"Algebra Section A\" created for your course."
        );
        assert_eq!(drafts[1].user_id, admin.id);
        assert_eq!(
            drafts[1].message,
            "New class \"Algebra Section A\" created by Carol."
        );
        assert!(drafts.iter().all(|d| d.kind == NotificationKind::Info));
    }

    #[test]
    fn test_assignment_created_fan_out() {
        let course_id = Uuid::new_v4();
        let students = vec![
            person("Alice", Role::Student, Some(course_id)),
            person("Dave", Role::Student, Some(course_id)),
        ];
        let admins = vec![person("Root", Role::Admin, None)];
        let carol = person("Carol", Role::Teacher, None);
        let hw = homework("HW1", carol.id, Uuid::new_v4());

        let drafts = fan_out(
            &DomainEvent::AssignmentCreated {
                assignment: &hw,
                teacher: &carol,
            },
            &Audience {
                students: &students,
                admins: &admins,
                teacher: None,
            },
        );

        assert_eq!(drafts.len(), 3);
        assert_eq!(
            drafts[0].message,
            "New assignment \"HW1\" has been posted."
        );
        assert_eq!(
            drafts[2].message,
            "New assignment \"HW1\" created by Carol."
        );
    }

    #[test]
    fn test_submission_notifies_teacher_and_admins() {
        let carol = person("Carol", Role::Teacher, None);
        let alice = person("Alice", Role::Student, None);
        let admins = vec![person("Root", Role::Admin, None)];
        let hw = homework("HW1", carol.id, Uuid::new_v4());

        let drafts = fan_out(
            &DomainEvent::AssignmentSubmitted {
                assignment: &hw,
                student: &alice,
            },
            &Audience {
                students: &[],
                admins: &admins,
                teacher: Some(&carol),
            },
        );

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].user_id, carol.id);
        assert_eq!(drafts[0].message, "Alice submitted assignment \"HW1\".");
        assert_eq!(drafts[1].user_id, admins[0].id);
    }

    #[test]
    fn test_actor_never_receives_own_event() {
        // A teacher who is somehow also in the admin list must not be
        // notified about their own class.
        let algebra = Uuid::new_v4();
        let carol = person("Carol", Role::Teacher, None);
        let class = section("Algebra Section A", carol.id, algebra);
        let admins = vec![carol.clone()];

        let drafts = fan_out(
            &DomainEvent::ClassCreated {
                class: &class,
                teacher: &carol,
            },
            &Audience {
                students: &[],
                admins: &admins,
                teacher: None,
            },
        );

        assert!(drafts.is_empty());
    }

    #[test]
    fn test_empty_audience_yields_no_drafts() {
        let carol = person("Carol", Role::Teacher, None);
        let class = section("Empty", carol.id, Uuid::new_v4());

        let drafts = fan_out(
            &DomainEvent::ClassCreated {
                class: &class,
                teacher: &carol,
            },
            &Audience::default(),
        );

        assert!(drafts.is_empty());
    }

    #[test]
    fn test_into_active_models_defaults() {
        let draft = NotificationDraft {
            user_id: Uuid::new_v4(),
            message: "hello".to_string(),
            link: None,
            kind: NotificationKind::Info,
        };
        let now = Utc::now();

        let models = into_active_models(vec![draft], now);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].is_read.clone().unwrap(), false);
        assert_eq!(models[0].message.clone().unwrap(), "hello");
    }
}
