use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use stepwise::cli::commands::ListCommand;
use stepwise::cli::output::*;
use stepwise::cli::{Cli, Command};
use stepwise::core::config::DEFAULT_CONFIG_FILE;
use stepwise::{
    Action, Config, ControlFileStore, ExecutionEvent, InvocationController, PipelineRegistry,
    StateStore,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Load pipeline declarations; control files live next to the config
    let config_path = PathBuf::from(
        cli.config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
    );
    let config = Config::from_file(&config_path)?;
    let project_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let registry = config.into_registry();

    let outcome = match &cli.command {
        Command::Start(cmd) => {
            run_action(&registry, &project_dir, &cmd.pipeline, Action::Start, cmd.force).await
        }
        Command::Continue(cmd) => {
            run_action(&registry, &project_dir, &cmd.pipeline, Action::Continue, false).await
        }
        Command::Abort(cmd) => {
            run_action(&registry, &project_dir, &cmd.pipeline, Action::Abort, false).await
        }
        Command::List(cmd) => list_pipelines(&registry, &project_dir, cmd).await,
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", CROSS, style(e).red());
        std::process::exit(1);
    }

    Ok(())
}

async fn run_action(
    registry: &PipelineRegistry,
    project_dir: &Path,
    pipeline: &str,
    action: Action,
    force: bool,
) -> Result<()> {
    let definition = registry.get(pipeline)?;
    let store = ControlFileStore::for_pipeline(project_dir, pipeline);
    let mut controller = InvocationController::new(definition, &store);

    // Console reporting: print each event, keep a spinner alive while a
    // step is running
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    let spinner_slot = spinner.clone();
    controller.add_event_handler(move |event| {
        let mut slot = spinner_slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = slot.take() {
            active.finish_and_clear();
        }
        println!("{}", format_execution_event(&event));
        if let ExecutionEvent::StepStarted { step, .. } = &event {
            *slot = Some(create_spinner(format!("running {}", step)));
        }
    });

    let result = controller.run(action, force).await;
    if let Some(active) = spinner.lock().unwrap_or_else(|e| e.into_inner()).take() {
        active.finish_and_clear();
    }
    result
}

async fn list_pipelines(
    registry: &PipelineRegistry,
    project_dir: &Path,
    cmd: &ListCommand,
) -> Result<()> {
    if registry.is_empty() {
        println!("{} No pipelines defined", INFO);
        return Ok(());
    }

    let mut rows = Vec::new();
    for name in registry.names() {
        let definition = registry.get(&name)?;
        let store = ControlFileStore::for_pipeline(project_dir, &name);
        let (status, progress) = match store.load().await {
            Ok(None) => ("idle".to_string(), None),
            Ok(Some(state)) => (
                format_status(state.status),
                Some((state.completed_steps(), state.total_steps())),
            ),
            Err(_) => (style("corrupt control file").red().to_string(), None),
        };

        if cmd.json {
            rows.push(json!({
                "name": name,
                "steps": definition.len(),
                "status": console::strip_ansi_codes(&status),
                "completed_steps": progress.map(|(done, _)| done),
            }));
        } else {
            match progress {
                Some((done, total)) => println!(
                    "  {} ({} steps) - {} ({}/{})",
                    style(&name).bold(),
                    definition.len(),
                    status,
                    done,
                    total
                ),
                None => println!(
                    "  {} ({} steps) - {}",
                    style(&name).bold(),
                    definition.len(),
                    status
                ),
            }
        }
    }

    if cmd.json {
        let data = json!({ "pipelines": rows });
        println!("{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}
