use crate::config::Config;
use crate::errors::AppResult;

use crate::cli::parser::Commands;

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config { print_config } = cmd
        && *print_config
    {
        println!("📄 Current configuration:\n");
        println!("{}", serde_yaml::to_string(cfg)?);

        let limits = cfg.role_limits()?;
        println!("⏱️  Role limits:");
        for (role, hours) in limits.iter() {
            println!("    {role:<16} {hours:>6.2} h");
        }
    }

    Ok(())
}
