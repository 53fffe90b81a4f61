//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(command) => {
            let settings = Settings::load(cli.config.as_deref())?;
            debug!(?settings, "settings loaded");
            let container = ServiceContainer::new(settings);
            dispatch(&container, cli.config.as_deref(), command)
        }
        None => Err(CliError::Usage(
            "no command given, see `ahp --help`".to_string(),
        )),
    }
}

fn dispatch(container: &ServiceContainer, config: Option<&Path>, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Solve { file } => solve(container, file),
        Commands::Show { file } => show(container, file),
        Commands::Check { file } => check(container, file),
        Commands::Config { command } => config_command(container, config, command),
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(skip(container))]
fn solve(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let precision = container.settings.precision;
    let report = container.decisions.solve(file)?;

    output::header(&report.problem);
    for (rank, (key, priority)) in report.ranking.iter().enumerate() {
        output::info(&output::ranking_line(
            rank + 1,
            &key.to_string(),
            *priority,
            precision,
        ));
    }
    for entry in report.inconsistent() {
        output::warning(&format!(
            "{} is inconsistent (CR {})",
            entry.key,
            output::ratio(entry.ratio, precision)
        ));
    }
    Ok(())
}

#[instrument(skip(container))]
fn show(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let model = container.decisions.load_model(file)?;
    output::info(&model.to_tree_string());
    Ok(())
}

#[instrument(skip(container))]
fn check(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let precision = container.settings.precision;
    let threshold = container.settings.consistency_threshold;
    let report = container.decisions.check(file)?;

    output::header(&format!("Consistency (threshold {threshold})"));
    for entry in &report {
        let line = format!(
            "{} ({}x{}): CR {}",
            entry.key,
            entry.size,
            entry.size,
            output::ratio(entry.ratio, precision)
        );
        if entry.consistent {
            output::success_detail(&line);
        } else {
            output::failure(&line);
        }
    }
    let failed = report.iter().filter(|entry| !entry.consistent).count();
    if failed > 0 {
        output::warning(&format!("{failed} matrix(es) exceed the threshold"));
    }
    Ok(())
}

fn config_command(
    container: &ServiceContainer,
    local: Option<&Path>,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if container.fs.exists(&path) { "" } else { " (missing)" };
                    output::detail(&format!("global: {}{state}", path.display()));
                }
                None => output::detail(&"global: unavailable"),
            }
            if let Some(path) = local {
                output::detail(&format!("local:  {}", path.display()));
            }
        }
    }
    Ok(())
}
