//! Action Model
//!
//! One instruction emitted by the LLM inside the per-task loop, modeled
//! as a tagged variant dispatching on the JSON `type` field. Unknown
//! kinds are rejected at parse time.

use serde::{Deserialize, Serialize};

use crate::models::task::Task;
use crate::utils::error::{AppError, AppResult};

/// A single search/replace operation within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub old_text: String,
    pub new_text: String,
}

/// One instruction produced by the LLM. Each kind carries only the
/// fields relevant to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ReadFile {
        path: String,
    },
    EditFile {
        path: String,
        #[serde(default)]
        edits: Vec<TextEdit>,
    },
    CreateFile {
        path: String,
        #[serde(default)]
        content: String,
    },
    DeleteFile {
        path: String,
    },
    RunCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workdir: Option<String>,
        /// Timeout in seconds; the executor default applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Search {
        query: String,
    },
    AskUser {
        question: String,
    },
    Complete {
        #[serde(default)]
        summary: String,
    },
    Fail {
        #[serde(default)]
        reason: String,
    },
}

impl Action {
    /// Parse a single JSON object into an action.
    ///
    /// Unknown `type` values and malformed JSON both surface as parse
    /// errors; the runner decides how to terminate the task.
    pub fn from_json(text: &str) -> AppResult<Self> {
        serde_json::from_str(text.trim())
            .map_err(|e| AppError::parse(format!("could not parse action JSON: {}", e)))
    }

    /// Short label used in history summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ReadFile { .. } => "read_file",
            Action::EditFile { .. } => "edit_file",
            Action::CreateFile { .. } => "create_file",
            Action::DeleteFile { .. } => "delete_file",
            Action::RunCommand { .. } => "run_command",
            Action::Search { .. } => "search",
            Action::AskUser { .. } => "ask_user",
            Action::Complete { .. } => "complete",
            Action::Fail { .. } => "fail",
        }
    }

    /// The file path this action targets, when it targets one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Action::ReadFile { path }
            | Action::EditFile { path, .. }
            | Action::CreateFile { path, .. }
            | Action::DeleteFile { path } => Some(path),
            _ => None,
        }
    }

    /// Whether this action ends the per-task loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Complete { .. } | Action::Fail { .. })
    }
}

/// Outcome of executing a single action.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_changed: Vec<String>,
    /// Elapsed wall-clock time in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl ActionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn with_changed(mut self, path: impl Into<String>) -> Self {
        self.files_changed.push(path.into());
        self
    }
}

/// Record of a single task's execution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    pub task: Task,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ActionResult>,
    pub completed: bool,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failure_msg: String,
}
