//! `foldersync config`: inspect or create `~/.foldersync/settings.yaml`.

use anyhow::{Context, Result};
use clap::Subcommand;

use foldersync_core::settings;

use super::RunStatus;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings and where they come from.
    Show,
    /// Write a default settings file if none exists.
    Init,
}

pub fn run(command: ConfigCommand) -> Result<RunStatus> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let path = settings::settings_path_at(&home);

    match command {
        ConfigCommand::Show => {
            let current = settings::load_at(&home).context("failed to load settings")?;
            if path.exists() {
                println!("# {}", path.display());
            } else {
                println!("# {} (not found, showing defaults)", path.display());
            }
            print!("{}", current.to_yaml()?);
        }
        ConfigCommand::Init => {
            let existed = path.exists();
            let written = settings::init_at(&home).context("failed to write settings")?;
            if existed {
                println!("settings already exist at {}", written.display());
            } else {
                println!("✓ wrote default settings to {}", written.display());
            }
        }
    }
    Ok(RunStatus::Clean)
}
