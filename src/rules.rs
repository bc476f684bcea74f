//! Rule file loading.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use datashape_core::RuleSet;

const BUILTIN_RULES: &str = include_str!("../rules/builtin.yml");

pub fn builtin_rules() -> Result<RuleSet> {
    RuleSet::from_yaml(BUILTIN_RULES).context("Built-in rules are invalid")
}

/// Built-in rules (unless disabled) merged with every file under `paths`, in
/// order. Later files replace same-named rules.
pub fn load_rules(paths: &[PathBuf], include_builtin: bool) -> Result<RuleSet> {
    let mut rules = if include_builtin {
        builtin_rules()?
    } else {
        RuleSet::new()
    };

    for path in paths {
        for file in rule_files(path)? {
            let loaded = RuleSet::load_from_file(&file)?;
            log::debug!("Loaded {} rules from {}", loaded.len(), file.display());
            rules.merge(loaded);
        }
    }

    Ok(rules)
}

/// `path` itself, or the `.yml`/`.yaml` files directly inside it, sorted.
fn rule_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(path).with_context(|| format!("Cannot read rule directory {}", path.display()))?;
    for entry in entries {
        let file = entry?.path();
        let is_yaml = file
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if file.is_file() && is_yaml {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}
