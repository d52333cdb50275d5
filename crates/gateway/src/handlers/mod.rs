//! API handlers module

pub mod admin;
pub mod assignments;
pub mod auth;
pub mod classes;
pub mod courses;
pub mod files;
pub mod health;
pub mod messages;
pub mod notifications;
