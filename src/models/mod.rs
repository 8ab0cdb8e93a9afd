pub mod chat_message;
pub mod document;
pub mod project;
pub mod project_file;
pub mod user;

pub use chat_message::{ChatMessage, ChatRole, NewChatMessage};
pub use document::{Document, NewDocument};
pub use project::{NewProject, Project, ProjectStatus, ProjectType, ProjectUpdate};
pub use project_file::{NewProjectFile, ProjectFile};
pub use user::{NewUser, User};
