//! Simulated project generation.
//!
//! A run walks six fixed phases, holding each one for [`PHASE_DELAY`], and
//! reports progress over a channel. No work is done; the run exists to drive
//! the progress display before the client is sent to the editor.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

pub const PHASES: [&str; 6] = [
    "Analyzing requirements...",
    "Generating file structure...",
    "Creating frontend components...",
    "Setting up backend logic...",
    "Configuring database...",
    "Finalizing project...",
];

pub const PHASE_DELAY: Duration = Duration::from_secs(2);

/// Editor target used when the run is not backed by a project row.
pub const PLACEHOLDER_PROJECT: &str = "new-project";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    EmptyDescription,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::EmptyDescription => {
                write!(f, "Please provide a project description")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    PhaseStarted {
        index: usize,
        label: &'static str,
        progress: f64,
    },
    PhaseCompleted {
        index: usize,
    },
    Completed {
        redirect: String,
    },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The receiver went away before the run finished.
    Cancelled,
}

/// Trimmed description, or the validation error shown to the user.
pub fn validate_description(description: &str) -> Result<&str, GenerationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyDescription);
    }
    Ok(trimmed)
}

/// Percentage reached once phase `index` (0-based) is current.
pub fn progress_for(index: usize) -> f64 {
    (index + 1) as f64 / PHASES.len() as f64 * 100.0
}

pub fn editor_path(project_id: &str) -> String {
    format!("/editor/{project_id}")
}

/// Drive the phase sequence, sending events to `tx`. Returns `Cancelled` as
/// soon as a send fails.
pub async fn simulate(tx: mpsc::Sender<GenerationEvent>, project_id: &str) -> Outcome {
    for (index, label) in PHASES.iter().copied().enumerate() {
        let started = GenerationEvent::PhaseStarted {
            index,
            label,
            progress: progress_for(index),
        };
        if tx.send(started).await.is_err() {
            return Outcome::Cancelled;
        }

        tokio::time::sleep(PHASE_DELAY).await;

        if tx.send(GenerationEvent::PhaseCompleted { index }).await.is_err() {
            return Outcome::Cancelled;
        }
    }

    let completed = GenerationEvent::Completed {
        redirect: editor_path(project_id),
    };
    if tx.send(completed).await.is_err() {
        return Outcome::Cancelled;
    }

    Outcome::Completed
}

/// A spawned run. Dropping `events` cancels it at its next step.
pub struct Run {
    pub events: mpsc::Receiver<GenerationEvent>,
    pub handle: tokio::task::JoinHandle<Outcome>,
}

/// Validate the description and spawn a run on the current runtime.
pub fn start(description: &str, project_id: String) -> Result<Run, GenerationError> {
    validate_description(description)?;

    let (tx, events) = mpsc::channel(PHASES.len() * 2 + 1);
    let handle = tokio::spawn(async move { simulate(tx, &project_id).await });
    Ok(Run { events, handle })
}
