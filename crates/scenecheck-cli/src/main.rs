//! scenecheck CLI - replay recorded scene edits through the rule pipeline
//!
//! Useful for reproducing a validation verdict outside the editor and for
//! checking a rule configuration before shipping it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scenecheck::{
    default_bindings, CommandInterpreter, LogReporter, RuleFactory, ValidatingInterpreter,
    ValidationConfig, ValidationSession,
};
use scenecheck_ir::{Command, Scene};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenecheck")]
#[command(about = "Validate recorded scene edits against a rule configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and apply a list of commands, one edit at a time
    Replay {
        /// Scene JSON file
        scene: PathBuf,
        /// JSON array of commands
        commands: PathBuf,
        /// Rule configuration (TOML); built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the resulting scene here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print one JSON verdict per edit instead of text
        #[arg(long)]
        json: bool,
    },
    /// Parse a configuration and list the rule bindings it produces
    CheckConfig {
        /// Rule configuration (TOML)
        config: PathBuf,
    },
    /// Print the default configuration with its rule bindings spelled out
    DefaultConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            scene,
            commands,
            config,
            output,
            json,
        } => {
            replay(&scene, &commands, config.as_deref(), output.as_deref(), json)?;
        }
        Commands::CheckConfig { config } => {
            check_config(&config)?;
        }
        Commands::DefaultConfig => {
            let config = ValidationConfig {
                bindings: default_bindings(),
                ..ValidationConfig::default()
            };
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ValidationConfig::default()),
    }
}

fn replay(
    scene_path: &Path,
    commands_path: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut scene = Scene::from_json(&fs::read_to_string(scene_path)?)
        .with_context(|| format!("parsing scene {}", scene_path.display()))?;
    let commands: Vec<Command> = serde_json::from_str(&fs::read_to_string(commands_path)?)
        .with_context(|| format!("parsing commands {}", commands_path.display()))?;

    let mut interpreter = ValidatingInterpreter::from_config(load_config(config)?)?
        .with_reporter(LogReporter);
    let mut session = ValidationSession::new();

    let mut rejected = 0;
    for (index, command) in commands.iter().enumerate() {
        let outcome = interpreter.validate(&mut session, &scene, command);
        if !outcome.approved {
            rejected += 1;
        }

        if json {
            let verdict = serde_json::json!({
                "index": index,
                "command": command.id,
                "kind": command.kind().name(),
                "approved": outcome.approved,
                "severity": outcome.severity,
                "notes": outcome.notes,
                "fault": outcome.fault.as_ref().map(|e| e.to_string()),
                "executed": outcome.command,
            });
            println!("{}", serde_json::to_string(&verdict)?);
        } else {
            println!(
                "#{} {} {}: {} ({:?}, {} command(s) executed)",
                index,
                command.kind().name(),
                command.id,
                if outcome.approved { "approved" } else { "rejected" },
                outcome.severity,
                outcome.command.children().len().max(1),
            );
            for note in &outcome.notes {
                println!("    {}", note);
            }
            if let Some(fault) = &outcome.fault {
                println!("    fault: {}", fault);
            }
        }

        // the executed commands can still fail against the live scene, e.g.
        // a restore for an entity the batch never created
        if let Err(err) = scene.apply(&outcome.command) {
            tracing::warn!("applying result of command {} failed: {}", command.id, err);
        }
    }

    if !json {
        println!(
            "{} edit(s), {} rejected, {} entities in final scene",
            commands.len(),
            rejected,
            scene.entities.len()
        );
    }

    if let Some(output) = output {
        fs::write(output, scene.to_json()?)?;
        if !json {
            println!("Wrote scene to {}", output.display());
        }
    }

    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let directory = RuleFactory::with_builtins().build_directory(&config)?;

    println!(
        "rule checking: {}",
        if config.rule_checking { "on" } else { "off" }
    );
    println!(
        "collision: epsilon {}, surrogates {}",
        config.collision.epsilon, config.collision.use_surrogates
    );
    if config.bindings.is_empty() {
        println!("no bindings configured, using the default set");
    }
    for binding in directory.bindings() {
        let kinds: Vec<&str> = binding.kinds().iter().map(|k| k.name()).collect();
        let property = binding
            .property()
            .map(|p| format!(" [{}.{}]", p.sheet, p.name))
            .unwrap_or_default();
        println!(
            "{}{} -> {}",
            kinds.join(", "),
            property,
            binding.engine().rule_names().join(", ")
        );
    }
    Ok(())
}
