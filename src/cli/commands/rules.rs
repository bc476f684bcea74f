use anyhow::{bail, Result};
use std::path::PathBuf;

use datashape_analyzer::CustomDetector;

use crate::cli::args::RulesAction;
use crate::rules::load_rules;

pub fn run_rules_command(action: &RulesAction, paths: &[PathBuf], include_builtin: bool) -> Result<()> {
    let rules = load_rules(paths, include_builtin)?;
    let (detector, errors) = CustomDetector::compile(&rules);

    match action {
        RulesAction::Check => {
            println!("{} rules, {} compiled patterns", rules.len(), detector.len());
            for error in &errors {
                println!("❌ {}", error);
                if let Some(pattern) = &error.pattern {
                    println!("   pattern: {}", pattern);
                }
            }
            if !errors.is_empty() {
                bail!("{} rule patterns failed to compile", errors.len());
            }
            println!("✅ All rules compiled");
        }
        RulesAction::Query { rule } => {
            if rules.get(rule).is_none() {
                bail!("Unknown rule: {}", rule);
            }
            let compiled: Vec<_> = detector.iter().filter(|compiled| &compiled.name == rule).collect();
            for compiled in &compiled {
                println!("# {} ({}): {}", compiled.name, compiled.language.id(), compiled.pattern);
                println!("{}\n", compiled.query_text);
            }
            for error in errors.iter().filter(|error| &error.rule == rule) {
                println!("❌ {}", error);
            }
        }
    }

    Ok(())
}
