mod cli;
mod paths;
mod run;
mod settings;
mod watch;

use anyhow::Result;
use cli::{Command, ConfigAction, RunArgs};
use paths::AppPaths;
use settings::load_config;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;

    match action {
        ConfigAction::Print => {
            let loaded = load_config(&paths, args)?;
            print!("{}", loaded.config.to_toml_string()?);
        }
        ConfigAction::Where => {
            let config_file = args.config.clone().unwrap_or_else(|| paths.config_file());
            println!("Configuration:");
            println!("  config dir:  {}", paths.config_dir().display());
            println!(
                "  config file: {} ({})",
                config_file.display(),
                if config_file.is_file() {
                    "present"
                } else {
                    "missing, using defaults"
                }
            );
        }
    }

    Ok(())
}
