//! Action Executor
//!
//! Carries out one action against the project: file reads and writes,
//! shell commands with timeouts, symbol search, and the terminal
//! complete/fail markers. Every failure becomes an unsuccessful
//! `ActionResult`; the executor never panics. Dry-run mode reports
//! what it would do without touching disk or spawning processes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::models::action::{Action, ActionResult, TextEdit};
use crate::services::indexer::index::ProjectIndex;
use crate::services::indexer::search::{format_search_result, SearchEngine};
use crate::utils::error::AppResult;
use crate::utils::paths::{check_path, DEFAULT_BLOCKLIST};

/// Default shell command timeout.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for an executor instance.
pub struct ExecutorConfig {
    pub project_root: PathBuf,
    pub index: Option<Arc<ProjectIndex>>,
    pub dry_run: bool,
    /// Substring blocklist; empty means the default list.
    pub blocklist: Vec<String>,
}

impl ExecutorConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            index: None,
            dry_run: false,
            blocklist: Vec::new(),
        }
    }
}

/// Executes actions produced by the agent loop.
pub struct Executor {
    project_root: PathBuf,
    index: Option<Arc<ProjectIndex>>,
    dry_run: bool,
    blocklist: Vec<String>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let blocklist = if config.blocklist.is_empty() {
            DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect()
        } else {
            config.blocklist
        };

        Self {
            project_root: config.project_root,
            index: config.index,
            dry_run: config.dry_run,
            blocklist,
        }
    }

    /// Run a single action and return its result.
    pub async fn execute(&self, action: &Action) -> ActionResult {
        let start = Instant::now();
        let mut result = match action {
            Action::ReadFile { path } => self.read_file(path),
            Action::CreateFile { path, content } => self.create_file(path, content),
            Action::EditFile { path, edits } => self.edit_file(path, edits),
            Action::DeleteFile { path } => self.delete_file(path),
            Action::RunCommand {
                command,
                workdir,
                timeout,
            } => {
                self.run_command(command, workdir.as_deref(), *timeout)
                    .await
            }
            Action::Search { query } => self.search(query),
            Action::AskUser { question } => {
                let mut res = ActionResult::err("user input required");
                res.output = question.clone();
                res
            }
            Action::Complete { summary } => ActionResult::ok(summary.clone()),
            Action::Fail { reason } => ActionResult::err(reason.clone()),
        };
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    fn checked_path(&self, path: &str) -> AppResult<PathBuf> {
        check_path(&self.project_root, path, &self.blocklist)
    }

    fn read_file(&self, path: &str) -> ActionResult {
        let abs = match self.checked_path(path) {
            Ok(p) => p,
            Err(e) => return ActionResult::err(e.to_string()),
        };
        match std::fs::read_to_string(&abs) {
            Ok(content) => ActionResult::ok(content),
            Err(e) => ActionResult::err(format!("failed to read {}: {}", path, e)),
        }
    }

    fn create_file(&self, path: &str, content: &str) -> ActionResult {
        let abs = match self.checked_path(path) {
            Ok(p) => p,
            Err(e) => return ActionResult::err(e.to_string()),
        };

        if self.dry_run {
            return ActionResult::ok(format!("[dry-run] would create {}", path));
        }

        if let Some(parent) = abs.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ActionResult::err(format!("failed to create directories: {}", e));
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755));
            }
        }

        if let Err(e) = std::fs::write(&abs, content) {
            return ActionResult::err(format!("failed to write {}: {}", path, e));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&abs, std::fs::Permissions::from_mode(0o644));
        }

        ActionResult::ok(format!("created {}", path)).with_changed(path)
    }

    fn edit_file(&self, path: &str, edits: &[TextEdit]) -> ActionResult {
        let abs = match self.checked_path(path) {
            Ok(p) => p,
            Err(e) => return ActionResult::err(e.to_string()),
        };
        if edits.is_empty() {
            return ActionResult::err("no edits provided");
        }

        let mut content = match std::fs::read_to_string(&abs) {
            Ok(c) => c,
            Err(e) => return ActionResult::err(format!("failed to read {}: {}", path, e)),
        };

        for edit in edits {
            if !content.contains(&edit.old_text) {
                return ActionResult::err(format!("old_text not found in {}", path));
            }
            content = content.replacen(&edit.old_text, &edit.new_text, 1);
        }

        if self.dry_run {
            return ActionResult::ok(format!("[dry-run] would edit {}", path));
        }

        if let Err(e) = std::fs::write(&abs, content) {
            return ActionResult::err(format!("failed to write {}: {}", path, e));
        }
        ActionResult::ok(format!("edited {}", path)).with_changed(path)
    }

    fn delete_file(&self, path: &str) -> ActionResult {
        let abs = match self.checked_path(path) {
            Ok(p) => p,
            Err(e) => return ActionResult::err(e.to_string()),
        };

        if self.dry_run {
            return ActionResult::ok(format!("[dry-run] would delete {}", path));
        }

        match std::fs::remove_file(&abs) {
            Ok(()) => ActionResult::ok(format!("deleted {}", path)).with_changed(path),
            Err(e) => ActionResult::err(format!("failed to delete {}: {}", path, e)),
        }
    }

    async fn run_command(
        &self,
        command: &str,
        workdir: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> ActionResult {
        let workdir = match workdir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.project_root.clone(),
        };
        let limit = match timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_COMMAND_TIMEOUT,
        };

        if self.dry_run {
            return ActionResult::ok(format!(
                "[dry-run] would run '{}' (cwd={})",
                command,
                workdir.display()
            ));
        }

        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(command).current_dir(&workdir);

        match timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));

                if output.status.success() {
                    ActionResult::ok(combined)
                } else {
                    let code = output.status.code().unwrap_or(-1);
                    let mut res =
                        ActionResult::err(format!("command exited with status {}", code));
                    res.output = combined;
                    res
                }
            }
            Ok(Err(e)) => ActionResult::err(format!("failed to run command: {}", e)),
            Err(_) => ActionResult::err(format!(
                "command timed out after {} seconds",
                limit.as_secs()
            )),
        }
    }

    fn search(&self, query: &str) -> ActionResult {
        let Some(index) = &self.index else {
            return ActionResult::err("search unavailable: no project index");
        };

        let engine = SearchEngine::new(index);
        let results = engine.search_symbol(query);
        let output = results
            .iter()
            .map(format_search_result)
            .collect::<Vec<_>>()
            .join("\n");
        ActionResult::ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn executor(dir: &TempDir, dry_run: bool) -> Executor {
        Executor::new(ExecutorConfig {
            dry_run,
            ..ExecutorConfig::new(dir.path())
        })
    }

    #[tokio::test]
    async fn read_file_returns_contents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

        let result = executor(&dir, false)
            .execute(&Action::ReadFile {
                path: "hello.txt".to_string(),
            })
            .await;
        assert!(result.success);
        assert_eq!(result.output, "hi there");
        assert!(result.files_changed.is_empty());
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::ReadFile {
                path: "nope.txt".to_string(),
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("nope.txt"));
    }

    #[tokio::test]
    async fn create_file_writes_and_reports_change() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::CreateFile {
                path: "sub/dir/new.txt".to_string(),
                content: "body".to_string(),
            })
            .await;
        assert!(result.success, "{}", result.error);
        assert_eq!(result.files_changed, vec!["sub/dir/new.txt".to_string()]);
        assert_eq!(
            fs::read_to_string(dir.path().join("sub/dir/new.txt")).unwrap(),
            "body"
        );
    }

    #[tokio::test]
    async fn create_file_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, true)
            .execute(&Action::CreateFile {
                path: "hello.txt".to_string(),
                content: "hi".to_string(),
            })
            .await;
        assert!(result.success);
        assert!(result.output.contains("[dry-run] would create hello.txt"));
        assert!(result.files_changed.is_empty());
        assert!(!dir.path().join("hello.txt").exists());
    }

    #[tokio::test]
    async fn edit_file_replaces_first_occurrence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("code.py"), "a = 1\na = 1\n").unwrap();

        let result = executor(&dir, false)
            .execute(&Action::EditFile {
                path: "code.py".to_string(),
                edits: vec![TextEdit {
                    old_text: "a = 1".to_string(),
                    new_text: "a = 2".to_string(),
                }],
            })
            .await;
        assert!(result.success);
        assert_eq!(
            fs::read_to_string(dir.path().join("code.py")).unwrap(),
            "a = 2\na = 1\n"
        );
    }

    #[tokio::test]
    async fn edit_file_missing_old_text_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("code.py"), "a = 1\n").unwrap();

        let result = executor(&dir, false)
            .execute(&Action::EditFile {
                path: "code.py".to_string(),
                edits: vec![TextEdit {
                    old_text: "does not exist".to_string(),
                    new_text: "x".to_string(),
                }],
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("old_text not found"));
    }

    #[tokio::test]
    async fn edit_file_requires_edits() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("code.py"), "a = 1\n").unwrap();

        let result = executor(&dir, false)
            .execute(&Action::EditFile {
                path: "code.py".to_string(),
                edits: vec![],
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("no edits"));
    }

    #[tokio::test]
    async fn delete_file_removes_and_dry_run_does_not() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gone.txt"), "x").unwrap();

        let dry = executor(&dir, true)
            .execute(&Action::DeleteFile {
                path: "gone.txt".to_string(),
            })
            .await;
        assert!(dry.success);
        assert!(dir.path().join("gone.txt").exists());

        let wet = executor(&dir, false)
            .execute(&Action::DeleteFile {
                path: "gone.txt".to_string(),
            })
            .await;
        assert!(wet.success);
        assert!(!dir.path().join("gone.txt").exists());
    }

    #[tokio::test]
    async fn path_escape_is_a_safety_failure() {
        let dir = TempDir::new().unwrap();
        for action in [
            Action::ReadFile {
                path: "../outside.txt".to_string(),
            },
            Action::CreateFile {
                path: "/tmp/other/outside.txt".to_string(),
                content: String::new(),
            },
            Action::DeleteFile {
                path: "../../etc/hosts".to_string(),
            },
        ] {
            let result = executor(&dir, false).execute(&action).await;
            assert!(!result.success, "{:?} must fail", action.kind());
            assert!(
                result.error.contains("escapes project root"),
                "{}",
                result.error
            );
        }
    }

    #[tokio::test]
    async fn blocklisted_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::CreateFile {
                path: ".env".to_string(),
                content: "SECRET=1".to_string(),
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("blocked"));
    }

    #[tokio::test]
    async fn run_command_captures_output_and_status() {
        let dir = TempDir::new().unwrap();
        let ok = executor(&dir, false)
            .execute(&Action::RunCommand {
                command: "echo out; echo err 1>&2".to_string(),
                workdir: None,
                timeout: None,
            })
            .await;
        assert!(ok.success);
        assert!(ok.output.contains("out"));
        assert!(ok.output.contains("err"));

        let bad = executor(&dir, false)
            .execute(&Action::RunCommand {
                command: "exit 3".to_string(),
                workdir: None,
                timeout: None,
            })
            .await;
        assert!(!bad.success);
        assert!(bad.error.contains("status 3"));
    }

    #[tokio::test]
    async fn run_command_times_out() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::RunCommand {
                command: "sleep 5".to_string(),
                workdir: None,
                timeout: Some(1),
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("timed out"));
    }

    #[tokio::test]
    async fn run_command_dry_run_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, true)
            .execute(&Action::RunCommand {
                command: format!("touch {}", dir.path().join("made.txt").display()),
                workdir: None,
                timeout: None,
            })
            .await;
        assert!(result.success);
        assert!(result.output.contains("[dry-run] would run"));
        assert!(!dir.path().join("made.txt").exists());
    }

    #[tokio::test]
    async fn ask_user_fails_with_question() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::AskUser {
                question: "which branch?".to_string(),
            })
            .await;
        assert!(!result.success);
        assert_eq!(result.output, "which branch?");
        assert!(result.error.contains("user input required"));
    }

    #[tokio::test]
    async fn terminal_markers() {
        let dir = TempDir::new().unwrap();
        let done = executor(&dir, false)
            .execute(&Action::Complete {
                summary: "all good".to_string(),
            })
            .await;
        assert!(done.success);
        assert_eq!(done.output, "all good");

        let failed = executor(&dir, false)
            .execute(&Action::Fail {
                reason: "cannot proceed".to_string(),
            })
            .await;
        assert!(!failed.success);
        assert_eq!(failed.error, "cannot proceed");
    }

    #[tokio::test]
    async fn search_without_index_fails() {
        let dir = TempDir::new().unwrap();
        let result = executor(&dir, false)
            .execute(&Action::Search {
                query: "Add".to_string(),
            })
            .await;
        assert!(!result.success);
        assert!(result.error.contains("search unavailable"));
    }

    #[tokio::test]
    async fn search_with_index_returns_matches() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("m.go"),
            "package m\n\nfunc Add(a, b int) int {\n\treturn a + b\n}\n",
        )
        .unwrap();
        let mut indexer = crate::services::indexer::index::Indexer::new();
        let index = indexer.index_project(dir.path()).unwrap();

        let exec = Executor::new(ExecutorConfig {
            index: Some(index),
            ..ExecutorConfig::new(dir.path())
        });
        let result = exec
            .execute(&Action::Search {
                query: "Add".to_string(),
            })
            .await;
        assert!(result.success);
        assert!(result.output.contains("Add (function)"));
    }
}
