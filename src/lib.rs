//! Task tracking backend: user authentication plus per-user task CRUD over a
//! JSON REST API.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod messages;
pub mod state;
pub mod tasks;
pub mod validation;
