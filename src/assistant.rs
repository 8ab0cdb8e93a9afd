use async_trait::async_trait;

use crate::models::Project;

pub const GREETING: &str = "Hello! I'm here to help you with your project. I can help you modify code, add features, fix bugs, or answer questions about your project. What would you like to work on?";

#[derive(Debug)]
pub struct AssistantError {
    pub message: String,
}

impl std::fmt::Display for AssistantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<&str> for AssistantError {
    fn from(s: &str) -> Self {
        AssistantError {
            message: s.to_string(),
        }
    }
}

/// Produces the assistant side of a project chat.
#[async_trait]
pub trait Assistant: Send + Sync {
    fn greeting(&self) -> &str;
    async fn reply(&self, project: &Project, input: &str) -> Result<String, AssistantError>;
}

/// Echoes the request back in a fixed sentence. No model is called.
pub struct CannedAssistant;

#[async_trait]
impl Assistant for CannedAssistant {
    fn greeting(&self) -> &str {
        GREETING
    }

    async fn reply(&self, _project: &Project, input: &str) -> Result<String, AssistantError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AssistantError::from("Message cannot be empty"));
        }

        Ok(format!(
            "I understand you want to {}. Let me help you with that. I can generate the necessary code changes and explain the implementation.",
            input.to_lowercase()
        ))
    }
}
