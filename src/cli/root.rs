use anyhow::Result;
use crate::cli::args::{Args, Commands, ScanArgs};
use crate::cli::commands::{run_rules_command, run_scan_command};
use crate::config::DatashapeConfig;

pub struct RootCommand;

impl RootCommand {
    pub async fn execute(args: Args) -> Result<()> {
        match &args.command {
            Some(Commands::Rules { action }) => run_rules_command(action, &args.rules, !args.no_builtin_rules),
            None => {
                let scan_args = ScanArgs::from(&args);

                if scan_args.generate_config {
                    println!("{}", DatashapeConfig::generate_default_config());
                    return Ok(());
                }

                run_scan_command(scan_args).await
            }
        }
    }
}
