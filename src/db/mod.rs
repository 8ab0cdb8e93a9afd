//! Typed data access over the backend's record and storage APIs.
//!
//! Each function is a single request. Nothing here retries, validates beyond
//! the types, or spans multiple rows atomically.

pub mod chat_messages;
pub mod documents;
pub mod project_files;
pub mod projects;
pub mod storage;
pub mod users;
