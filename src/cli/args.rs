use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use datashape_reports::OutputFormat;

use crate::config::IdStrategy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File or directory to scan
    pub target: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Custom rule file or directory of rule files (repeatable)
    #[arg(short, long, global = true)]
    pub rules: Vec<PathBuf>,

    /// Do not load the built-in rules
    #[arg(long, global = true)]
    pub no_builtin_rules: bool,

    /// Restrict scanning to these languages (comma separated)
    #[arg(long)]
    pub languages: Option<String>,

    /// Write detections here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Maximum files scanned at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// How identity tags are generated
    #[arg(long, value_enum)]
    pub id_strategy: Option<IdStrategy>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub generate_config: bool,
}

impl Args {
    /// Default log filter for the `-v` count.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect custom rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RulesAction {
    /// Compile every rule and report failures
    Check,
    /// Print the generated queries of one rule
    Query {
        /// Rule name
        rule: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub target: Option<PathBuf>,
    pub rules: Vec<PathBuf>,
    pub no_builtin_rules: bool,
    pub languages: Option<String>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub concurrency: Option<usize>,
    pub id_strategy: Option<IdStrategy>,
    pub config: Option<PathBuf>,
    pub generate_config: bool,
}

impl From<&Args> for ScanArgs {
    fn from(args: &Args) -> Self {
        ScanArgs {
            target: args.target.clone(),
            rules: args.rules.clone(),
            no_builtin_rules: args.no_builtin_rules,
            languages: args.languages.clone(),
            output: args.output.clone(),
            format: args.format,
            concurrency: args.concurrency,
            id_strategy: args.id_strategy,
            config: args.config.clone(),
            generate_config: args.generate_config,
        }
    }
}

pub fn validate_scan_args(args: &ScanArgs) -> Result<()> {
    if let Some(target) = &args.target {
        if !target.exists() {
            anyhow::bail!("Target does not exist: {}", target.display());
        }
    }

    for rules in &args.rules {
        if !rules.exists() {
            anyhow::bail!("Rule path does not exist: {}", rules.display());
        }
    }

    if args.concurrency == Some(0) {
        anyhow::bail!("--concurrency must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_flags() {
        let args = Args::try_parse_from([
            "datashape",
            "app",
            "--rules",
            "a.yml",
            "-r",
            "b.yml",
            "--format",
            "json",
            "--id-strategy",
            "sequential",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.target, Some(PathBuf::from("app")));
        assert_eq!(args.rules, vec![PathBuf::from("a.yml"), PathBuf::from("b.yml")]);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.id_strategy, Some(IdStrategy::Sequential));
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.log_level(), "debug");
        assert!(args.command.is_none());
    }

    #[test]
    fn test_log_level_counts_only_verbose_flags() {
        let quiet = Args::try_parse_from(["datashape", "-rvendor.yml", "app"]).unwrap();
        assert_eq!(quiet.rules, vec![PathBuf::from("vendor.yml")]);
        assert_eq!(quiet.log_level(), "warn");

        let loud = Args::try_parse_from(["datashape", "rules", "check", "-vvv"]).unwrap();
        assert_eq!(loud.log_level(), "trace");
    }

    #[test]
    fn test_parse_rules_query() {
        let args = Args::try_parse_from(["datashape", "rules", "query", "stripe"]).unwrap();
        match args.command {
            Some(Commands::Rules {
                action: RulesAction::Query { rule },
            }) => assert_eq!(rule, "stripe"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Args::try_parse_from(["datashape", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_validate_missing_target() {
        let args = ScanArgs {
            target: Some(PathBuf::from("/definitely/not/here")),
            ..ScanArgs::default()
        };
        assert!(validate_scan_args(&args).is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let args = ScanArgs {
            concurrency: Some(0),
            ..ScanArgs::default()
        };
        assert!(validate_scan_args(&args).is_err());
    }
}
