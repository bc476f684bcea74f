use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::Arc;

use datashape_analyzer::{CustomDetector, FileScanner};
use datashape_reports::write_detections;
use datashape_utils::FileDiscovery;

use crate::cli::args::{validate_scan_args, ScanArgs};
use crate::config::DatashapeConfig;
use crate::rules::load_rules;
use crate::scanner::{scan_files, ScanOptions};

pub async fn run_scan_command(args: ScanArgs) -> Result<()> {
    validate_scan_args(&args)?;

    // Precedence: CLI args > env vars > config files
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let config = DatashapeConfig::load_with_precedence(args.config.clone(), &args, &env_vars)?;

    let target = config
        .scan
        .target
        .clone()
        .ok_or_else(|| anyhow!("Target must be specified, or configured in a config file"))?;
    let languages = config.languages()?;

    let rules = load_rules(&config.scan.rules, config.scan.builtin_rules)?;
    let (detector, errors) = CustomDetector::compile(&rules);
    if !errors.is_empty() {
        eprintln!("⚠️  {} rule patterns failed to compile (see `datashape rules check`)", errors.len());
    }

    let files = FileDiscovery::for_languages(target.clone(), &languages).get_files()?;
    log::info!("Scanning {} files under {}", files.len(), target.display());

    let options = ScanOptions {
        languages,
        concurrency: config.scan.concurrency,
        max_file_size: config.scan.max_file_size,
        id_strategy: config.identity.strategy,
        show_progress: config.output.path.is_some(),
    };
    let scanner = FileScanner::new(Arc::new(detector));
    let outcome = scan_files(&target, files, scanner, &options).await;

    match &config.output.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path).map_err(|e| anyhow!("Cannot create {}: {}", path.display(), e))?;
            write_detections(BufWriter::new(file), config.output.format, &outcome.detections)?;
            eprintln!("📝 Detections written to {}", path.display());
        }
        None => write_detections(io::stdout().lock(), config.output.format, &outcome.detections)?,
    }

    eprint!("{}", outcome.summary);
    Ok(())
}
