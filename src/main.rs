//! codescout CLI
//!
//! Command-line front-end over the engine: structural indexing and
//! search, semantic RAG indexing and search, hybrid queries, and the
//! autonomous coding agent.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use codescout::services::agent::{CodingAgent, RunOptions, TaskManager};
use codescout::services::indexer::{
    format_context, format_search_result, ContextFetcher, Direction, Indexer, SearchEngine,
    Summarizer,
};
use codescout::services::llm::{LlmConfig, ProviderType};
use codescout::services::rag::{Embedder, OllamaEmbedder, RagIndexer, SqliteVectorStore};
use codescout::services::retrieval::{
    fetch_hybrid_context, format_hybrid_result, DEFAULT_TOKEN_BUDGET,
};
use codescout::utils::error::{AppError, AppResult};

/// Code-aware retrieval and planning engine for LLM coding agents
#[derive(Parser, Debug)]
#[command(name = "codescout")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a project and print an overview
    Index {
        /// Path to the project
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Force refresh (ignore cache)
        #[arg(long)]
        refresh: bool,
    },
    /// Search for symbols in a project
    Search {
        query: String,
        #[command(flatten)]
        project: ProjectArgs,
        /// Search kind: symbol or doc
        #[arg(long, default_value = "symbol")]
        kind: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the project structure tree
    Structure {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Maximum tree depth
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },
    /// Show the call graph for a function
    Callgraph {
        function: String,
        #[command(flatten)]
        project: ProjectArgs,
        /// Direction: callers, callees, or both
        #[arg(long, default_value = "both")]
        dir: String,
    },
    /// Show import relationships for a module
    Imports {
        module: String,
        #[command(flatten)]
        project: ProjectArgs,
        /// Direction: imports, imported_by, or both
        #[arg(long, default_value = "both")]
        dir: String,
    },
    /// Detailed information about a symbol
    Info {
        symbol: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(long)]
        json: bool,
    },
    /// Keyword-ranked context for a task
    FetchContext {
        task: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(long, default_value_t = 10)]
        max_results: usize,
        #[arg(long)]
        json: bool,
    },
    /// Classify a query and run hybrid retrieval
    Query {
        query: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(long, default_value_t = 10)]
        max_results: usize,
        /// Token budget for merged results
        #[arg(long, default_value_t = DEFAULT_TOKEN_BUDGET)]
        budget: usize,
        /// Embedding model served by Ollama
        #[arg(long, default_value = "nomic-embed-text")]
        embedding_model: String,
    },
    /// LLM-backed agent operations
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Semantic (RAG) index operations
    Rag {
        #[command(subcommand)]
        command: RagCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Generate a task breakdown for a coding task
    Plan {
        task: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        llm: LlmArgs,
        #[arg(long)]
        json: bool,
    },
    /// Chat with the LLM using project context
    Chat {
        message: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        llm: LlmArgs,
        /// Skip project context
        #[arg(long)]
        no_context: bool,
    },
    /// Ask the LLM to explain a code symbol
    Explain {
        symbol: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Plan and autonomously execute a task
    Run {
        task: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        llm: LlmArgs,
        /// Report actions without touching disk or spawning processes
        #[arg(long)]
        dry_run: bool,
        /// Max action iterations per task
        #[arg(long, default_value_t = 25)]
        max_iterations: usize,
        /// Max context results per task
        #[arg(long, default_value_t = 8)]
        max_context: usize,
    },
}

#[derive(Subcommand, Debug)]
enum RagCommand {
    /// Build the semantic index for a project
    Index {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Embedding model served by Ollama
        #[arg(long, default_value = "nomic-embed-text")]
        model: String,
    },
    /// Semantic search over the indexed project
    Search {
        query: String,
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value = "nomic-embed-text")]
        model: String,
        #[arg(long)]
        json: bool,
    },
    /// Show semantic index statistics
    Status {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long, default_value = "nomic-embed-text")]
        model: String,
    },
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Path to the project
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM provider: claude, gemini, openai, ollama
    #[arg(long, default_value = "claude")]
    provider: String,
    /// Model name (provider-specific)
    #[arg(long)]
    model: Option<String>,
    /// API key (falls back to CLAUDE_API_KEY / GEMINI_API_KEY / OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

impl LlmArgs {
    fn into_config(self) -> AppResult<LlmConfig> {
        let provider = ProviderType::from_str(&self.provider).map_err(AppError::Validation)?;
        let api_key = self.api_key.or_else(|| {
            let var = match provider {
                ProviderType::Claude => "CLAUDE_API_KEY",
                ProviderType::Gemini => "GEMINI_API_KEY",
                ProviderType::OpenAI => "OPENAI_API_KEY",
                ProviderType::Ollama => return None,
            };
            std::env::var(var).ok()
        });

        Ok(LlmConfig {
            provider,
            api_key,
            model: self.model,
            base_url: None,
        })
    }
}

fn rag_db_path(project: &Path) -> PathBuf {
    project.join(".index").join("rag_vectors.db")
}

fn open_rag_indexer(project: &Path, model: &str) -> AppResult<RagIndexer> {
    let embedder = OllamaEmbedder::new(model);
    let store = SqliteVectorStore::new(&rag_db_path(project), embedder.dimension())?;
    Ok(RagIndexer::new(Arc::new(embedder), Arc::new(store)))
}

fn abs_path(path: &Path) -> AppResult<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    if !abs.exists() {
        return Err(AppError::validation(format!(
            "project path does not exist: {}",
            abs.display()
        )));
    }
    Ok(abs)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(e) = run(cli.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> AppResult<()> {
    match command {
        Command::Index {
            path,
            json,
            refresh,
        } => {
            let root = abs_path(&path)?;
            let mut indexer = Indexer::new();
            indexer.set_cache_enabled(!refresh);
            let index = indexer.index_project(&root)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&*index)?);
            } else {
                print!("{}", Summarizer::new().generate_project_overview(&index));
                println!(
                    "\n✓ Indexed {} modules, {} symbols",
                    index.modules.len(),
                    index.symbol_count()
                );
            }
        }

        Command::Search {
            query,
            project,
            kind,
            json,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let engine = SearchEngine::new(&index);
            let results = match kind.as_str() {
                "doc" => engine.search_documentation(&query),
                _ => engine.search_symbol(&query),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("Found {} results for '{}':\n", results.len(), query);
                for result in &results {
                    println!("{}", format_search_result(result));
                }
            }
        }

        Command::Structure { path, depth } => {
            let root = abs_path(&path)?;
            let index = Indexer::new().index_project(&root)?;
            print!("{}", Summarizer::new().generate_structure_tree(&index, depth));
        }

        Command::Callgraph {
            function,
            project,
            dir,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let engine = SearchEngine::new(&index);
            let results = engine.search_by_call_graph(&function, Direction::parse(&dir));

            println!("Call graph for '{}' ({}):\n", function, dir);
            for name in &results {
                println!("  - {}", name);
            }
            println!("\nTotal: {} functions", results.len());
        }

        Command::Imports {
            module,
            project,
            dir,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let engine = SearchEngine::new(&index);
            let results = engine.search_imports(&module, Direction::parse(&dir));

            println!("Import graph for '{}' ({}):\n", module, dir);
            for path in &results {
                println!("  - {}", path);
            }
            println!("\nTotal: {} modules", results.len());
        }

        Command::Info {
            symbol,
            project,
            json,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let engine = SearchEngine::new(&index);
            match engine.get_symbol_details(&symbol) {
                Some(details) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&details)?);
                    } else {
                        println!("{}", format_search_result(&details));
                    }
                }
                None => return Err(AppError::not_found(format!("symbol '{}'", symbol))),
            }
        }

        Command::FetchContext {
            task,
            project,
            max_results,
            json,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let fetcher = ContextFetcher::new(&index);
            let context = fetcher.fetch_context(&task, max_results);

            if json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                print!("{}", format_context(&context));
            }
        }

        Command::Query {
            query,
            project,
            max_results,
            budget,
            embedding_model,
        } => {
            let root = abs_path(&project.path)?;
            let index = Indexer::new().index_project(&root)?;
            let rag = open_rag_indexer(&root, &embedding_model)?;
            let result = fetch_hybrid_context(&index, &rag, &query, max_results, budget).await?;
            print!("{}", format_hybrid_result(&result, max_results));
        }

        Command::Agent { command } => run_agent(command).await?,

        Command::Rag { command } => run_rag(command).await?,
    }

    Ok(())
}

async fn run_agent(command: AgentCommand) -> AppResult<()> {
    match command {
        AgentCommand::Plan {
            task,
            project,
            llm,
            json,
        } => {
            let root = abs_path(&project.path)?;
            let mut agent = CodingAgent::new(root, llm.into_config()?)?;
            let breakdown = agent.plan_task(&task).await?;

            let tm = TaskManager::new();
            if json {
                println!("{}", tm.format_as_json(&breakdown)?);
            } else {
                print!("{}", tm.format_as_checklist(&breakdown));
            }
        }

        AgentCommand::Chat {
            message,
            project,
            llm,
            no_context,
        } => {
            let root = abs_path(&project.path)?;
            let mut agent = CodingAgent::new(root, llm.into_config()?)?;
            let response = agent.chat(&message, !no_context).await?;
            println!("{}", response.content);
            println!("\n[Tokens: {} | Model: {}]", response.tokens_used, response.model);
        }

        AgentCommand::Explain {
            symbol,
            project,
            llm,
        } => {
            let root = abs_path(&project.path)?;
            let mut agent = CodingAgent::new(root, llm.into_config()?)?;
            let response = agent.explain_code(&symbol).await?;
            println!("{}", response.content);
            println!("\n[Tokens: {} | Model: {}]", response.tokens_used, response.model);
        }

        AgentCommand::Run {
            task,
            project,
            llm,
            dry_run,
            max_iterations,
            max_context,
        } => {
            let root = abs_path(&project.path)?;
            let mut agent = CodingAgent::new(root, llm.into_config()?)?;
            let result = agent
                .run(
                    &task,
                    RunOptions {
                        dry_run,
                        max_iterations,
                        max_context_results: max_context,
                    },
                )
                .await?;

            let tm = TaskManager::new();
            print!("{}", tm.format_as_checklist(&result.plan));

            println!("\nExecution details:");
            for execution in &result.executions {
                let status = if execution.completed {
                    "done"
                } else if execution.failed {
                    "failed"
                } else {
                    "pending"
                };
                println!(
                    "\n- Task {}: {} [{}]",
                    execution.task.id, execution.task.description, status
                );
                for (action, res) in execution.actions.iter().zip(&execution.results) {
                    println!(
                        "  • {} {} -> {}",
                        action.kind(),
                        action.path().unwrap_or_default(),
                        res.success
                    );
                    let out = res.output.trim();
                    if !out.is_empty() {
                        let preview: String = out.chars().take(160).collect();
                        println!("    {}", preview);
                    }
                    if !res.error.is_empty() {
                        println!("    error: {}", res.error);
                    }
                }
                if !execution.failure_msg.is_empty() {
                    println!("  failure: {}", execution.failure_msg);
                }
            }
        }
    }

    Ok(())
}

async fn run_rag(command: RagCommand) -> AppResult<()> {
    match command {
        RagCommand::Index { path, model } => {
            let root = abs_path(&path)?;
            println!("Building semantic index for: {}\n", root.display());

            let mut indexer = open_rag_indexer(&root, &model)?;
            indexer.index_project(&root).await?;

            let stats = indexer.stats()?;
            println!("\nIndex statistics:");
            println!("  Files:  {}", stats.total_files);
            println!("  Chunks: {}", stats.total_chunks);
            println!("  Model:  {}", stats.embedding_model);
            println!("  Dims:   {}", stats.dimensions);
        }

        RagCommand::Search {
            query,
            project,
            top_k,
            model,
            json,
        } => {
            let root = abs_path(&project.path)?;
            let mut indexer = open_rag_indexer(&root, &model)?;

            if indexer.stats()?.total_chunks == 0 {
                return Err(AppError::validation(
                    "semantic index is empty; run 'codescout rag index' first",
                ));
            }

            let results = indexer.search(&query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            println!("Found {} results:\n", results.len());
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [Score: {:.3}] {}",
                    i + 1,
                    result.score,
                    result.chunk.file_path
                );
                println!(
                    "   Lines {}-{}: {}",
                    result.chunk.start_line, result.chunk.end_line, result.chunk.symbol_name
                );
                println!(
                    "   Type: {} | Language: {}",
                    result.chunk.chunk_type, result.chunk.language
                );
                let preview: Vec<&str> = result.chunk.content.lines().take(3).collect();
                println!("   Preview: {}", preview.join("\n            "));
                println!();
            }
        }

        RagCommand::Status { path, model } => {
            let root = abs_path(&path)?;
            let mut indexer = open_rag_indexer(&root, &model)?;
            let stats = indexer.stats()?;

            println!("Total files:     {}", stats.total_files);
            println!("Total chunks:    {}", stats.total_chunks);
            println!("Embedding model: {}", stats.embedding_model);
            println!("Dimensions:      {}", stats.dimensions);
            if !stats.last_updated.is_empty() {
                println!("Last updated:    {}", stats.last_updated);
            }
            if stats.total_chunks == 0 {
                println!("\nIndex is empty. Run 'codescout rag index' to build it.");
            }
        }
    }

    Ok(())
}
