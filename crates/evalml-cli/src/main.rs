//! EvalML - experiment planning CLI
//!
//! The `evalml` command resolves an experiment configuration and prints
//! what the workflow engine will run.
//!
//! ## Commands
//!
//! - `validate`: Resolve the configuration and print a summary
//! - `dates`: List initialization times
//! - `runs`: List resolved runs with their identifiers
//! - `participants`: List report participants and their artifacts
//! - `plan`: List every task with its upstream dependency
//! - `route`: Show the task descriptor of one `(run, init time)` pair
//! - `command`: Print the workflow launch command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use evalml_core::{InitTime, PipelineContext, Profile, RunDefinition, RunId, TaskDescriptor};

/// Workflow engine invoked by `evalml command`.
const WORKFLOW_ENGINE: &str = "snakemake";

#[derive(Parser)]
#[command(name = "evalml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluation workflows for ML weather-forecast experiments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and report what it contains
    Validate {
        /// Experiment configuration (YAML or JSON)
        config: PathBuf,
    },

    /// List initialization times (YYYYMMDDHHMM)
    Dates {
        config: PathBuf,
    },

    /// List resolved runs
    Runs {
        config: PathBuf,

        /// Print as JSON
        #[arg(long)]
        as_json: bool,
    },

    /// List report participants and their aggregated artifacts
    Participants {
        config: PathBuf,

        #[arg(long)]
        as_json: bool,
    },

    /// List every (run, init time) task with its upstream
    Plan {
        config: PathBuf,

        /// Only show tasks of this run
        #[arg(long)]
        run: Option<String>,

        #[arg(long)]
        as_json: bool,
    },

    /// Show the task descriptor for one run at one init time
    Route {
        config: PathBuf,

        #[arg(long)]
        run: String,

        /// ISO-8601 or YYYYMMDDHHMM
        #[arg(long)]
        init_time: String,
    },

    /// Print the workflow launch command (never executed)
    ///
    /// With `--verbose` the engine is asked to print shell commands.
    Command {
        config: PathBuf,

        /// Workflow target rule
        #[arg(short, long, default_value = "experiment_all")]
        target: String,

        /// Number of cores
        #[arg(short, long, default_value_t = 4)]
        cores: u32,

        /// Pass --dry-run to the workflow engine
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Remove a lock on the working directory
        #[arg(long)]
        unlock: bool,

        /// Create a self-contained HTML report (default: <TARGET>_report.html)
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        report: Option<Option<PathBuf>>,

        /// Arguments after `--` are appended verbatim
        #[arg(last = true, value_name = "EXTRA_ARGS")]
        extra_args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    evalml_core::init_tracing(cli.json, level);
    let verbose = cli.verbose;

    match cli.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Dates { config } => cmd_dates(&config),
        Commands::Runs { config, as_json } => cmd_runs(&config, as_json),
        Commands::Participants { config, as_json } => cmd_participants(&config, as_json),
        Commands::Plan {
            config,
            run,
            as_json,
        } => cmd_plan(&config, run.as_deref(), as_json),
        Commands::Route {
            config,
            run,
            init_time,
        } => cmd_route(&config, &run, &init_time),
        Commands::Command {
            config,
            target,
            cores,
            dry_run,
            unlock,
            report,
            extra_args,
        } => {
            let report = report.map(|file| {
                file.unwrap_or_else(|| PathBuf::from(format!("{target}_report.html")))
            });
            let options = LaunchOptions {
                target,
                cores,
                dry_run,
                unlock,
                print_shell_cmds: verbose,
                report,
                extra_args,
            };
            cmd_command(&config, &options)
        }
    }
}

fn load(config: &Path) -> Result<PipelineContext> {
    PipelineContext::load(config)
        .with_context(|| format!("Failed to resolve configuration {}", config.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_validate(config: &Path) -> Result<()> {
    let ctx = load(config)?;
    let participants = ctx.participants()?;
    let plan = ctx.plan()?;
    info!(config = %config.display(), "configuration is valid");

    println!("Configuration OK: {}", config.display());
    println!("  init times:   {}", ctx.init_times().len());
    println!(
        "  runs:         {} ({} candidates)",
        ctx.runs().len(),
        ctx.runs().candidates().count()
    );
    println!("  baselines:    {}", ctx.baselines().len());
    println!("  participants: {}", participants.len());
    println!("  tasks:        {}", plan.len());
    Ok(())
}

fn cmd_dates(config: &Path) -> Result<()> {
    let ctx = load(config)?;
    for t in ctx.init_times() {
        println!("{t}");
    }
    Ok(())
}

fn cmd_runs(config: &Path, as_json: bool) -> Result<()> {
    let ctx = load(config)?;
    if as_json {
        let runs: Vec<&RunDefinition> = ctx.runs().definitions().collect();
        return print_json(&runs);
    }

    for run in ctx.runs().definitions() {
        let role = if run.is_candidate { "candidate" } else { "dependency" };
        let upstream = run
            .upstream()
            .map(|u| format!("  <- {}", u.tag()))
            .unwrap_or_default();
        println!(
            "{:<12} {:<10} {}  [{}]{}",
            run.kind().as_str(),
            role,
            run.run_id,
            run.display_name(),
            upstream
        );
    }
    Ok(())
}

fn cmd_participants(config: &Path, as_json: bool) -> Result<()> {
    let ctx = load(config)?;
    let participants = ctx.participants()?;
    if as_json {
        return print_json(&participants);
    }

    for (label, artifact) in participants.artifacts() {
        println!("{label}\t{}", artifact.display());
    }
    Ok(())
}

fn describe(task: &TaskDescriptor) -> String {
    match &task.upstream {
        Some(up) => format!("{}  after {}", task.task, up),
        None => task.task.to_string(),
    }
}

fn cmd_plan(config: &Path, run: Option<&str>, as_json: bool) -> Result<()> {
    let ctx = load(config)?;
    let plan = ctx.plan()?;

    let Some(run) = run else {
        if as_json {
            return print_json(&plan);
        }
        for task in &plan.tasks {
            println!("{}", describe(task));
        }
        return Ok(());
    };

    let run_id = RunId::from(run);
    if !ctx.runs().contains(&run_id) {
        anyhow::bail!("Unknown run id: {run}");
    }
    let tasks: Vec<&TaskDescriptor> = plan.for_run(&run_id).collect();
    if as_json {
        return print_json(&tasks);
    }
    for task in tasks {
        println!("{}", describe(task));
    }

    let group_size = ctx.config().execution.run_group_size;
    for (i, group) in plan.groups(&run_id, group_size).iter().enumerate() {
        let times: Vec<String> = group.iter().map(ToString::to_string).collect();
        println!("group {i}: {}", times.join(","));
    }
    Ok(())
}

fn cmd_route(config: &Path, run: &str, init_time: &str) -> Result<()> {
    let ctx = load(config)?;
    let init_time = InitTime::parse(init_time).context("Invalid --init-time")?;
    let descriptor = ctx.route(&RunId::from(run), init_time)?;

    println!("{}", describe(&descriptor));
    println!(
        "marker: {}",
        ctx.layout().completion_marker(&descriptor.task).display()
    );
    if let Some(up) = &descriptor.upstream {
        println!("waits:  {}", ctx.layout().completion_marker(up).display());
    }
    Ok(())
}

/// Workflow-engine switches for `evalml command`.
struct LaunchOptions {
    target: String,
    cores: u32,
    dry_run: bool,
    unlock: bool,
    print_shell_cmds: bool,
    /// Report file; ignored on dry runs since nothing is produced.
    report: Option<PathBuf>,
    extra_args: Vec<String>,
}

fn workflow_command(config: &Path, profile: Option<&Profile>, options: &LaunchOptions) -> Vec<String> {
    let mut command = vec![WORKFLOW_ENGINE.to_string()];
    if let Some(profile) = profile {
        command.extend(profile.to_args());
    }
    command.push("--configfile".to_string());
    command.push(config.display().to_string());
    command.push("--cores".to_string());
    command.push(options.cores.to_string());

    if options.dry_run {
        command.push("--dry-run".to_string());
    }
    if options.unlock {
        command.push("--unlock".to_string());
    }
    if options.print_shell_cmds {
        command.push("--printshellcmds".to_string());
    }
    if let Some(report) = options.report.as_ref().filter(|_| !options.dry_run) {
        command.push("--report-after-run".to_string());
        command.push("--report".to_string());
        command.push(report.display().to_string());
    }

    command.push(options.target.clone());
    command.extend(options.extra_args.iter().cloned());
    command
}

fn cmd_command(config: &Path, options: &LaunchOptions) -> Result<()> {
    let ctx = load(config)?;
    let command = workflow_command(config, ctx.config().profile.as_ref(), options);
    println!("{}", command.join(" "));
    Ok(())
}
