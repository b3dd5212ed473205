//! `cadet-learn config` - inspect the layered configuration

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the merged configuration as TOML
    Show,
    /// List the files that are merged, in precedence order
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = ConfigLoader::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Path => {
            match ConfigLoader::user_config_path() {
                Some(path) => println!("user     {}", describe(&path)),
                None => println!("user     (no home directory)"),
            }
            println!("project  {}", describe(&ConfigLoader::project_config_path()));
            Ok(())
        }
    }
}

fn describe(path: &Path) -> String {
    let status = if path.exists() { "" } else { " (not found)" };
    format!("{}{}", path.display(), status)
}
