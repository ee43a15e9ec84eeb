// src/lib.rs

pub mod bundle;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod session;
pub mod style;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{BuildConfig, load_and_validate};
use crate::dag::{Composition, Orchestrator, TaskGraph, builtin_task_graph};
use crate::errors::Result;
use crate::exec::RealActions;
use crate::fs::{FileSystem, RealFileSystem};
use crate::session::SessionState;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the built-in task graph and the orchestrator
/// - the production action backend
/// - in watch mode, Ctrl-C handling and shutdown of watcher and server
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_deref().map(PathBuf::from);
    let cfg = load_and_validate(config_path.as_deref())?;
    let graph = builtin_task_graph()?;

    if args.list {
        print_task_list(&graph);
        return Ok(());
    }

    if args.dry_run {
        return print_dry_run(&cfg, &graph, &args.task);
    }

    let root = project_root(config_path.as_deref());
    info!(root = ?root, task = %args.task, "buildloop starting");

    let cfg = Arc::new(cfg);
    let session = SessionState::shared();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let actions = RealActions::new(Arc::clone(&cfg), root, fs, Arc::clone(&session));
    let ctx = Arc::clone(actions.context());

    let orchestrator = Orchestrator::new(graph, actions);
    let result = orchestrator.run(&args.task).await;

    if result.is_ok() && ctx.is_watching().await {
        // Ctrl-C → graceful shutdown.
        {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                ctx.request_shutdown().await;
            });
        }

        info!("initial build done; press Ctrl+C to stop");
        ctx.wait_for_runtime().await?;
    }

    ctx.shutdown().await;

    let report = result?;
    debug!(events = report.events().len(), "run complete");
    Ok(())
}

/// Figure out a sensible project root.
///
/// - If the config path has a non-empty parent (e.g. "web/Buildloop.toml"),
///   we use that directory.
/// - Otherwise we fall back to the current working directory.
fn project_root(config_path: Option<&Path>) -> PathBuf {
    match config_path.and_then(|p| p.parent()) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(graph: &TaskGraph) {
    println!("tasks:");
    for name in graph.tasks() {
        println!("  - {}", describe_task(graph, name));
    }
}

fn describe_task(graph: &TaskGraph, name: &str) -> String {
    let Some(def) = graph.get(name) else {
        return name.to_string();
    };
    let mut out = name.to_string();
    if let Some(action) = def.action {
        out.push_str(&format!(" [{action}]"));
    }
    if !def.depends_on.is_empty() {
        let sep = match def.composition {
            Composition::Series => " -> ",
            Composition::Parallel => " | ",
        };
        out.push_str(&format!(" = {}", def.depends_on.join(sep)));
    }
    out
}

/// Print the resolved configuration and the order actions would start in.
fn print_dry_run(cfg: &BuildConfig, graph: &TaskGraph, task: &str) -> Result<()> {
    let plan = graph.action_plan(task)?;

    println!("buildloop dry-run");
    println!("  dist = {:?}", cfg.dist);
    println!(
        "  script: {} -> {} (bundler: {})",
        cfg.script.entry_point,
        cfg.bundle_file_name(),
        cfg.script.bundler
    );
    println!("  style: {:?} -> {}", cfg.sources.scss, cfg.style.dest_file);
    println!("  markup: {}", cfg.sources.html);
    println!(
        "  server: {} {} (raw port {}, reload port {}, settle {}ms)",
        cfg.server.runner,
        cfg.server.script,
        cfg.server.raw_port,
        cfg.server.port,
        cfg.server.settle_delay_ms
    );
    println!(
        "  watch: rebuild_policy = {:?}, use_hash = {}",
        cfg.watch.rebuild_policy, cfg.watch.use_hash
    );
    println!();

    println!("plan for '{task}' ({} actions):", plan.len());
    for (i, (name, action)) in plan.iter().enumerate() {
        println!("  {}. {name} [{action}]", i + 1);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
