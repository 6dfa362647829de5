//! Coding Agent & Runner
//!
//! Orchestrates the full loop: index the project, plan a task breakdown
//! with the LLM, then execute each task through a bounded action loop
//! where the LLM picks one JSON action per step.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::action::{Action, ActionResult, TaskExecution};
use crate::models::task::{Task, TaskBreakdown, TaskStatus};
use crate::services::indexer::context::{format_context, ContextFetcher};
use crate::services::indexer::index::Indexer;
use crate::services::indexer::search::{SearchEngine, SymbolMatch};
use crate::services::indexer::summary::Summarizer;
use crate::services::llm::provider::{create_client, LlmClient};
use crate::services::llm::types::{LlmConfig, LlmResponse, Message};
use crate::utils::error::{AppError, AppResult};

use super::executor::{Executor, ExecutorConfig};
use super::task_manager::TaskManager;

/// Controls the autonomous execution loop.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub max_iterations: usize,
    pub max_context_results: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_iterations: 25,
            max_context_results: 8,
        }
    }
}

/// Outcome of a full agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub plan: TaskBreakdown,
    pub executions: Vec<TaskExecution>,
}

/// The coding agent: planning, retrieval-backed context, and the
/// per-task action loop.
pub struct CodingAgent {
    llm_client: Arc<dyn LlmClient>,
    indexer: Indexer,
    task_manager: TaskManager,
    project_path: PathBuf,
}

impl CodingAgent {
    /// Build an agent from LLM configuration.
    pub fn new(project_path: impl Into<PathBuf>, llm_config: LlmConfig) -> AppResult<Self> {
        let llm_client = create_client(llm_config)?;
        Ok(Self::with_client(project_path, llm_client))
    }

    /// Build an agent around an existing client (tests inject mocks here).
    pub fn with_client(project_path: impl Into<PathBuf>, llm_client: Arc<dyn LlmClient>) -> Self {
        Self {
            llm_client,
            indexer: Indexer::new(),
            task_manager: TaskManager::new(),
            project_path: project_path.into(),
        }
    }

    /// Generate a task breakdown for a user prompt.
    pub async fn plan_task(&mut self, user_prompt: &str) -> AppResult<TaskBreakdown> {
        info!(prompt = user_prompt, "planning task");

        let index = self.indexer.index_project(&self.project_path)?;
        let fetcher = ContextFetcher::new(&index);
        let context = fetcher.fetch_context(user_prompt, 10);
        let context_str = format_context(&context);

        let task_prompt = self
            .task_manager
            .generate_task_prompt(user_prompt, &context_str);

        debug!(
            provider = self.llm_client.provider(),
            model = self.llm_client.model(),
            "requesting task breakdown"
        );
        let response = self
            .llm_client
            .chat(&[
                Message::system(
                    "You are an expert coding assistant that helps break down development \
                     tasks into actionable steps.",
                ),
                Message::user(task_prompt),
            ])
            .await?;

        let mut breakdown = self.task_manager.parse_tasks_from_llm(&response.content)?;
        breakdown.user_prompt = user_prompt.to_string();
        breakdown.summary = format!("Task breakdown for: {}", user_prompt);
        Ok(breakdown)
    }

    /// Execute the full loop: plan, then run every task in order.
    pub async fn run(&mut self, user_prompt: &str, opts: RunOptions) -> AppResult<RunResult> {
        let max_iterations = if opts.max_iterations == 0 {
            25
        } else {
            opts.max_iterations
        };
        let max_context = if opts.max_context_results == 0 {
            8
        } else {
            opts.max_context_results
        };

        let index = self.indexer.index_project(&self.project_path)?;
        let mut plan = self.plan_task(user_prompt).await?;

        let executor = Executor::new(ExecutorConfig {
            index: Some(index.clone()),
            dry_run: opts.dry_run,
            ..ExecutorConfig::new(&self.project_path)
        });

        let mut executions = Vec::new();
        let tasks: Vec<Task> = plan.tasks.clone();

        for task in tasks {
            let _ = plan.update_task_status(task.id, TaskStatus::InProgress);

            let fetcher = ContextFetcher::new(&index);
            let context = fetcher.fetch_context(&task.description, max_context);
            let context_str = format_context(&context);

            let execution = self
                .execute_task(&executor, task.clone(), &context_str, max_iterations)
                .await;

            let status = if execution.completed {
                TaskStatus::Completed
            } else if execution.failed {
                TaskStatus::Blocked
            } else {
                TaskStatus::Pending
            };
            let _ = plan.update_task_status(task.id, status);
            if let Some(t) = plan.tasks.iter_mut().find(|t| t.id == task.id) {
                t.details = format!("Ran {} action(s)", execution.actions.len());
            }

            executions.push(execution);
        }

        plan.update_stats();
        Ok(RunResult { plan, executions })
    }

    /// One task's bounded action loop.
    async fn execute_task(
        &self,
        executor: &Executor,
        task: Task,
        context_str: &str,
        max_iterations: usize,
    ) -> TaskExecution {
        let mut actions: Vec<Action> = Vec::new();
        let mut results: Vec<ActionResult> = Vec::new();
        let mut history: Vec<String> = Vec::new();

        for _ in 0..max_iterations {
            let prompt = build_action_prompt(&task.description, context_str, &history);

            let response = match self
                .llm_client
                .chat(&[
                    Message::system(
                        "You are executing a coding task. Pick and emit ONE action in JSON. \
                         Do not add commentary outside JSON.",
                    ),
                    Message::user(prompt),
                ])
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    return TaskExecution {
                        task,
                        actions,
                        results,
                        completed: false,
                        failed: true,
                        failure_msg: format!("llm error: {}", e),
                    }
                }
            };

            let action = match Action::from_json(&response.content) {
                Ok(a) => a,
                Err(e) => {
                    return TaskExecution {
                        task,
                        actions,
                        results,
                        completed: false,
                        failed: true,
                        failure_msg: e.to_string(),
                    }
                }
            };

            let result = executor.execute(&action).await;
            history.push(summarize_step(&action, &result));
            actions.push(action.clone());
            results.push(result.clone());

            if action.is_terminal() {
                let completed = matches!(action, Action::Complete { .. }) && result.success;
                return TaskExecution {
                    task,
                    actions,
                    results,
                    completed,
                    failed: !completed,
                    failure_msg: result.error,
                };
            }

            if !result.success {
                return TaskExecution {
                    task,
                    actions,
                    results,
                    completed: false,
                    failed: true,
                    failure_msg: result.error,
                };
            }
        }

        TaskExecution {
            task,
            actions,
            results,
            completed: false,
            failed: true,
            failure_msg: "max iterations reached before completion".to_string(),
        }
    }

    /// Chat with the LLM, optionally prepending fetched project context.
    pub async fn chat(
        &mut self,
        user_message: &str,
        include_context: bool,
    ) -> AppResult<LlmResponse> {
        let content = if include_context {
            let index = self.indexer.index_project(&self.project_path)?;
            let fetcher = ContextFetcher::new(&index);
            let context = fetcher.fetch_context(user_message, 10);
            format!(
                "PROJECT CONTEXT:\n{}\n\nUSER QUESTION:\n{}",
                format_context(&context),
                user_message
            )
        } else {
            user_message.to_string()
        };

        self.llm_client.chat(&[Message::user(content)]).await
    }

    /// Ask the LLM to explain a code symbol found in the index.
    pub async fn explain_code(&mut self, symbol_name: &str) -> AppResult<LlmResponse> {
        let results = self.search_code(symbol_name)?;
        let result = results
            .first()
            .ok_or_else(|| AppError::not_found(format!("symbol '{}'", symbol_name)))?;

        let prompt = format!(
            "Please explain this code:\n\n\
             Symbol: {}\n\
             Type: {}\n\
             Location: {}:{}\n\
             Signature: {}\n\
             Documentation: {}\n\n\
             Provide a clear explanation of what this code does, its purpose, and how it's used.",
            result.name, result.kind, result.file_path, result.line, result.signature, result.doc
        );

        self.llm_client
            .chat(&[
                Message::system("You are an expert code reviewer and educator."),
                Message::user(prompt),
            ])
            .await
    }

    /// Symbol search over the (cached) project index.
    pub fn search_code(&mut self, query: &str) -> AppResult<Vec<SymbolMatch>> {
        let index = self.indexer.index_project(&self.project_path)?;
        let engine = SearchEngine::new(&index);
        Ok(engine.search_symbol(query))
    }

    /// Overview of the indexed project.
    pub fn project_summary(&mut self) -> AppResult<String> {
        let index = self.indexer.index_project(&self.project_path)?;
        Ok(Summarizer::new().generate_project_overview(&index))
    }

    /// Disable or enable index caching (refresh forces a re-walk).
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.indexer.set_cache_enabled(enabled);
    }
}

/// Prompt for one loop step: task, context, prior step summaries, and
/// the action menu.
fn build_action_prompt(task_desc: &str, context_str: &str, history: &[String]) -> String {
    let mut out = String::new();
    out.push_str("CURRENT TASK:\n");
    out.push_str(task_desc);
    out.push_str("\n\nPROJECT CONTEXT:\n");
    out.push_str(context_str);

    if !history.is_empty() {
        out.push_str("\n\nPREVIOUS STEPS:\n");
        for step in history {
            out.push_str("- ");
            out.push_str(step);
            out.push('\n');
        }
    }

    out.push_str(
        r#"

You can take exactly ONE of these actions:
- read_file: { "type": "read_file", "path": "<relative path>" }
- edit_file: { "type": "edit_file", "path": "<relative path>", "edits": [{ "old_text": "...", "new_text": "..." }] }
- create_file: { "type": "create_file", "path": "<relative path>", "content": "full file content" }
- delete_file: { "type": "delete_file", "path": "<relative path>" }
- run_command: { "type": "run_command", "command": "<shell command>", "workdir": "<dir>", "timeout": 120 }
- search: { "type": "search", "query": "<symbol or keyword>" }
- ask_user: { "type": "ask_user", "question": "<clarifying question>" }
- complete: { "type": "complete", "summary": "what you accomplished" }
- fail: { "type": "fail", "reason": "why you cannot proceed" }

Respond with a single JSON object describing the action."#,
    );

    out
}

/// One-line history entry: `<type> <path> → ok|err (output-prefix)`.
fn summarize_step(action: &Action, result: &ActionResult) -> String {
    let status = if result.success { "ok" } else { "err" };
    let mut output = result.output.trim().to_string();
    if output.chars().count() > 240 {
        output = output.chars().take(240).collect::<String>() + "...";
    }
    format!(
        "{} {} → {} ({})",
        action.kind(),
        action.path().unwrap_or_default(),
        status,
        output
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted client: returns canned responses in order, repeating the
    /// last one when exhausted.
    #[derive(Debug)]
    struct ScriptedClient {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat(&self, _messages: &[Message]) -> AppResult<LlmResponse> {
            let mut responses = self.responses.lock().unwrap();
            let content = if responses.len() > 1 {
                responses.pop().unwrap()
            } else {
                responses.last().cloned().unwrap_or_default()
            };
            Ok(LlmResponse {
                content,
                provider: "mock".to_string(),
                model: "scripted".to_string(),
                tokens_used: 0,
                finish_reason: "stop".to_string(),
            })
        }

        fn provider(&self) -> &'static str {
            "mock"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn write_project(dir: &tempfile::TempDir) {
        std::fs::write(
            dir.path().join("app.py"),
            "def greet(name):\n    \"\"\"Say hello.\"\"\"\n    return f\"hi {name}\"\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn plan_task_parses_checklist() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        let client = ScriptedClient::new(vec!["☐ Inspect greet\n☐ Add a test"]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let plan = agent.plan_task("improve greeting").await.unwrap();
        assert_eq!(plan.total_tasks, 2);
        assert_eq!(plan.user_prompt, "improve greeting");
        assert!(plan.summary.contains("improve greeting"));
    }

    #[tokio::test]
    async fn unparsable_action_fails_the_task() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        let client = ScriptedClient::new(vec![
            "☐ do something",
            "I think I should read the file first.",
        ]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let result = agent.run("do something", RunOptions::default()).await.unwrap();
        let execution = &result.executions[0];
        assert!(execution.failed);
        assert!(execution.failure_msg.contains("could not parse action JSON"));
        assert_eq!(result.plan.tasks[0].status, TaskStatus::Blocked);
    }

    #[tokio::test]
    async fn iteration_cap_blocks_the_task() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        // The loop keeps reading the same file and never completes.
        let client = ScriptedClient::new(vec![
            "☐ loop forever",
            r#"{"type":"read_file","path":"app.py"}"#,
        ]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let result = agent
            .run(
                "loop forever",
                RunOptions {
                    max_iterations: 3,
                    ..RunOptions::default()
                },
            )
            .await
            .unwrap();

        let execution = &result.executions[0];
        assert!(execution.failed);
        assert_eq!(
            execution.failure_msg,
            "max iterations reached before completion"
        );
        assert_eq!(execution.actions.len(), 3);
    }

    #[tokio::test]
    async fn fail_action_blocks_with_reason() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        let client = ScriptedClient::new(vec![
            "☐ attempt the impossible",
            r#"{"type":"fail","reason":"missing credentials"}"#,
        ]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let result = agent
            .run("attempt the impossible", RunOptions::default())
            .await
            .unwrap();
        let execution = &result.executions[0];
        assert!(execution.failed);
        assert!(!execution.completed);
        assert_eq!(execution.failure_msg, "missing credentials");
    }

    #[tokio::test]
    async fn plan_counters_stay_consistent_after_run() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        let client = ScriptedClient::new(vec![
            "☐ task one\n☐ task two",
            r#"{"type":"complete","summary":"one done"}"#,
            r#"{"type":"fail","reason":"stuck"}"#,
        ]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let result = agent.run("two tasks", RunOptions::default()).await.unwrap();
        let plan = &result.plan;
        assert_eq!(
            plan.completed + plan.in_progress + plan.pending + plan.blocked,
            plan.total_tasks
        );
        assert_eq!(plan.completed, 1);
        assert_eq!(plan.blocked, 1);
    }

    #[tokio::test]
    async fn explain_code_reports_missing_symbol() {
        let dir = tempfile::TempDir::new().unwrap();
        write_project(&dir);

        let client = ScriptedClient::new(vec!["explanation"]);
        let mut agent = CodingAgent::with_client(dir.path(), client);

        let err = agent.explain_code("NoSuchSymbol").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let ok = agent.explain_code("greet").await.unwrap();
        assert_eq!(ok.content, "explanation");
    }

    #[test]
    fn step_summary_truncates_long_output() {
        let action = Action::ReadFile {
            path: "big.txt".to_string(),
        };
        let result = ActionResult::ok("x".repeat(500));
        let summary = summarize_step(&action, &result);
        assert!(summary.starts_with("read_file big.txt → ok ("));
        assert!(summary.contains("..."));
        assert!(summary.chars().count() < 300);
    }
}
