use bunki::prelude::*;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Inspect and diff conditional validation workflows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional TOML config (layout, store, notes)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a workflow JSON file and print its render graph
    Render {
        /// Path to a workflow record as returned by the fetch endpoint
        workflow_path: String,
    },
    /// Print the bulk requests that would turn `original` into `current`
    Plan {
        original_path: String,
        /// Steps with ids at or above the original watermark are treated as new
        current_path: String,
    },
    /// Fetch a workflow from the configured store and print its render graph
    Fetch { workflow_id: WorkflowId },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bunki=info,warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Render { workflow_path } => run_render(&workflow_path, &config),
        Command::Plan {
            original_path,
            current_path,
        } => run_plan(&original_path, &current_path, &config),
        Command::Fetch { workflow_id } => run_fetch(workflow_id, config).await,
    }
}

fn read_workflow(path: &str) -> WorkflowRecord {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read workflow file '{}': {}", path, e)));
    serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse workflow JSON '{}': {}", path, e)))
}

fn load(record: WorkflowRecord, config: &EditorConfig) -> LoadedWorkflow {
    let loaded = PresentationAdapter::load(record, &config.layout)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load workflow: {}", e)));
    for warning in &loaded.warnings {
        eprintln!("Warning: {}", warning);
    }
    loaded
}

fn print_render(loaded: &LoadedWorkflow) {
    let render = RenderGraph::build(&loaded.graph, loaded.initial_step.as_deref(), EditorStatus::default());
    let json = render
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode render graph: {}", e)));
    println!("{}", json);
}

fn run_render(workflow_path: &str, config: &EditorConfig) {
    let loaded = load(read_workflow(workflow_path), config);
    print_render(&loaded);
}

fn run_plan(original_path: &str, current_path: &str, config: &EditorConfig) {
    let original = load(read_workflow(original_path), config);
    let mut current = load(read_workflow(current_path), config);

    let mut engine = SyncEngine::new(
        original.meta.id,
        original.watermark,
        original.snapshots,
        config.notes.clone(),
    );
    let pending = engine
        .begin_save(&mut current.graph)
        .unwrap_or_else(|e| exit_with_error(&format!("Cannot save: {}", e)));

    let Some(pending) = pending else {
        println!("{}", SaveOutcome::NoChanges.notification().message);
        return;
    };

    if let Some(create) = &pending.create {
        println!("--- bulk-create ---");
        println!("{}", to_json(create));
    }
    if let Some(update) = &pending.update {
        println!("--- bulk-update ---");
        println!("{}", to_json(update));
    }
}

async fn run_fetch(workflow_id: WorkflowId, config: EditorConfig) {
    let store = HttpStepStore::new(&config.store)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to set up store: {}", e)));
    let editor = WorkflowEditor::open(Arc::new(store), workflow_id, config)
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to open workflow {}: {}", workflow_id, e)));

    let json = editor
        .render()
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode render graph: {}", e)));
    println!("{}", json);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode request: {}", e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
