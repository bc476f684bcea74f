use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use datashape_core::{IdGenerator, Language, SequentialIdGenerator, UuidGenerator};
use datashape_reports::OutputFormat;

use crate::cli::args::ScanArgs;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct DatashapeConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub target: Option<PathBuf>,

    /// Rule files or directories, loaded after the built-in rules
    #[serde(default)]
    pub rules: Vec<PathBuf>,

    #[serde(default = "default_builtin_rules")]
    pub builtin_rules: bool,

    /// Language ids to scan; empty scans every supported language
    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Files larger than this many bytes are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct IdentityConfig {
    #[serde(default)]
    pub strategy: IdStrategy,
}

/// How identity tags are generated for exported records.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random v4 UUIDs
    #[default]
    Uuid,
    /// Per-file counters, reproducible across runs
    Sequential,
}

impl IdStrategy {
    /// A fresh generator; one per scanned file.
    pub fn generator(self) -> Box<dyn IdGenerator + Send> {
        match self {
            IdStrategy::Uuid => Box::new(UuidGenerator),
            IdStrategy::Sequential => Box::new(SequentialIdGenerator::new()),
        }
    }
}

fn default_builtin_rules() -> bool {
    true
}

fn default_concurrency() -> usize {
    8
}

fn default_max_file_size() -> u64 {
    2_000_000
}

const MAX_CONCURRENCY: usize = 64;

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: None,
            rules: Vec::new(),
            builtin_rules: default_builtin_rules(),
            languages: Vec::new(),
            concurrency: default_concurrency(),
            max_file_size: default_max_file_size(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid path in {field}: {path} does not exist")]
    InvalidPath { field: String, path: PathBuf },

    #[error("Invalid range in {field}: {value} (valid range: {valid_range})")]
    InvalidRange {
        field: String,
        value: u64,
        valid_range: String,
    },

    #[error("Invalid value in {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatashapeConfig {
    /// Merge another config into this one (other takes precedence for set values)
    pub fn merge(&mut self, other: &DatashapeConfig) {
        if other.scan.target.is_some() {
            self.scan.target = other.scan.target.clone();
        }
        self.scan.rules.extend(other.scan.rules.iter().cloned());
        if !other.scan.builtin_rules {
            self.scan.builtin_rules = false;
        }
        if !other.scan.languages.is_empty() {
            self.scan.languages = other.scan.languages.clone();
        }
        if other.scan.concurrency != default_concurrency() {
            self.scan.concurrency = other.scan.concurrency;
        }
        if other.scan.max_file_size != default_max_file_size() {
            self.scan.max_file_size = other.scan.max_file_size;
        }

        if other.output.path.is_some() {
            self.output.path = other.output.path.clone();
        }
        if other.output.format != OutputFormat::default() {
            self.output.format = other.output.format;
        }

        if other.identity.strategy != IdStrategy::default() {
            self.identity.strategy = other.identity.strategy;
        }
    }

    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_else(|_| {
            r#"# datashape configuration

[scan]
# target = "app"
# rules = ["rules/custom.yml"]
builtin_rules = true
# languages = ["ruby", "javascript"]
concurrency = 8
max_file_size = 2000000

[output]
# path = "detections.jsonl"
format = "jsonl"

[identity]
strategy = "uuid"
"#
            .to_string()
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: DatashapeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// `~/.config/datashape/config.toml`
    pub fn get_user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/datashape/config.toml"))
    }

    /// `./datashape.toml`
    pub fn get_current_config_path() -> PathBuf {
        PathBuf::from("./datashape.toml")
    }

    /// Defaults, then the user config, then `./datashape.toml`.
    pub fn load_with_merged_configs() -> Self {
        let mut config = Self::default();

        let candidates = Self::get_user_config_path()
            .into_iter()
            .chain(std::iter::once(Self::get_current_config_path()));
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(loaded) => {
                    config.merge(&loaded);
                    log::debug!("Loaded config from: {}", path.display());
                }
                Err(e) => log::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }

        config
    }

    pub fn apply_env_vars(&mut self, env_vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in env_vars {
            let Some(config_key) = key.strip_prefix("DATASHAPE_") else {
                continue;
            };
            match config_key {
                "SCAN_TARGET" => self.scan.target = Some(PathBuf::from(value)),
                "SCAN_RULES" => {
                    self.scan.rules.extend(split_list(value).map(PathBuf::from));
                }
                "SCAN_BUILTIN_RULES" => {
                    self.scan.builtin_rules = value
                        .parse()
                        .map_err(|_| anyhow!("Invalid builtin_rules value: {}", value))?;
                }
                "SCAN_LANGUAGES" => self.scan.languages = split_list(value).map(String::from).collect(),
                "SCAN_CONCURRENCY" => {
                    self.scan.concurrency = value
                        .parse()
                        .map_err(|_| anyhow!("Invalid concurrency value: {}", value))?;
                }
                "SCAN_MAX_FILE_SIZE" => {
                    self.scan.max_file_size = value
                        .parse()
                        .map_err(|_| anyhow!("Invalid max_file_size value: {}", value))?;
                }
                "OUTPUT_PATH" => self.output.path = Some(PathBuf::from(value)),
                "OUTPUT_FORMAT" => self.output.format = value.parse().map_err(|e: String| anyhow!(e))?,
                "IDENTITY_STRATEGY" => {
                    self.identity.strategy = match value.to_lowercase().as_str() {
                        "uuid" => IdStrategy::Uuid,
                        "sequential" => IdStrategy::Sequential,
                        _ => return Err(anyhow!("Invalid identity strategy: {}", value)),
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if let Some(ref target) = args.target {
            self.scan.target = Some(target.clone());
        }
        self.scan.rules.extend(args.rules.iter().cloned());
        if args.no_builtin_rules {
            self.scan.builtin_rules = false;
        }
        if let Some(ref languages) = args.languages {
            self.scan.languages = split_list(languages).map(String::from).collect();
        }
        if let Some(concurrency) = args.concurrency {
            self.scan.concurrency = concurrency;
        }
        if let Some(ref output) = args.output {
            self.output.path = Some(output.clone());
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }
        if let Some(strategy) = args.id_strategy {
            self.identity.strategy = strategy;
        }
    }

    /// Load configuration with full precedence chain:
    /// 1. Default values (lowest)
    /// 2. User config (~/.config/datashape/config.toml)
    /// 3. Current directory (./datashape.toml)
    /// 4. Explicit `--config` file
    /// 5. Environment variables (DATASHAPE_*)
    /// 6. CLI arguments (highest)
    pub fn load_with_precedence(
        config_path: Option<PathBuf>,
        cli_args: &ScanArgs,
        env_vars: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut config = Self::load_with_merged_configs();

        if let Some(path) = config_path {
            let explicit = Self::load_from_file(&path)
                .map_err(|e| anyhow!("Failed to load config file {}: {}", path.display(), e))?;
            config.merge(&explicit);
        }

        config.apply_env_vars(env_vars)?;
        config.apply_scan_args(cli_args);
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref target) = self.scan.target {
            if !target.exists() {
                return Err(ConfigError::InvalidPath {
                    field: "scan.target".to_string(),
                    path: target.clone(),
                });
            }
        }

        for rules in &self.scan.rules {
            if !rules.exists() {
                return Err(ConfigError::InvalidPath {
                    field: "scan.rules".to_string(),
                    path: rules.clone(),
                });
            }
        }

        if self.scan.concurrency == 0 || self.scan.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidRange {
                field: "scan.concurrency".to_string(),
                value: self.scan.concurrency as u64,
                valid_range: format!("1-{}", MAX_CONCURRENCY),
            });
        }

        self.languages()?;
        Ok(())
    }

    /// Languages to scan, every supported one when none are configured.
    pub fn languages(&self) -> Result<Vec<Language>, ConfigError> {
        if self.scan.languages.is_empty() {
            return Ok(Language::SUPPORTED.to_vec());
        }

        self.scan
            .languages
            .iter()
            .map(|name| {
                let language = name.parse::<Language>().map_err(|message| ConfigError::InvalidValue {
                    field: "scan.languages".to_string(),
                    message,
                })?;
                if !language.is_supported() {
                    return Err(ConfigError::InvalidValue {
                        field: "scan.languages".to_string(),
                        message: format!("{} has no pattern support", name),
                    });
                }
                Ok(language)
            })
            .collect()
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = DatashapeConfig::default();
        assert!(config.scan.builtin_rules);
        assert_eq!(config.scan.concurrency, 8);
        assert_eq!(config.output.format, OutputFormat::Jsonl);
        assert_eq!(config.identity.strategy, IdStrategy::Uuid);
        assert_eq!(config.languages().unwrap(), Language::SUPPORTED.to_vec());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[scan]
languages = ["ruby"]
concurrency = 4

[output]
format = "json"

[identity]
strategy = "sequential"
"#
        )
        .unwrap();

        let config = DatashapeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.scan.languages, vec!["ruby".to_string()]);
        assert_eq!(config.scan.concurrency, 4);
        assert!(config.scan.builtin_rules);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.identity.strategy, IdStrategy::Sequential);
    }

    #[test]
    fn test_generated_default_config_parses() {
        let text = DatashapeConfig::generate_default_config();
        let parsed: DatashapeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, DatashapeConfig::default());
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut base = DatashapeConfig::default();
        base.scan.concurrency = 4;
        base.output.format = OutputFormat::Json;

        let mut other = DatashapeConfig::default();
        other.identity.strategy = IdStrategy::Sequential;
        base.merge(&other);

        assert_eq!(base.scan.concurrency, 4);
        assert_eq!(base.output.format, OutputFormat::Json);
        assert_eq!(base.identity.strategy, IdStrategy::Sequential);
    }

    #[test]
    fn test_env_vars_override_file_values() {
        let mut config = DatashapeConfig::default();
        config.scan.concurrency = 4;

        let env: HashMap<String, String> = [
            ("DATASHAPE_SCAN_CONCURRENCY", "16"),
            ("DATASHAPE_SCAN_LANGUAGES", "javascript, ruby"),
            ("DATASHAPE_OUTPUT_FORMAT", "json"),
            ("DATASHAPE_IDENTITY_STRATEGY", "sequential"),
            ("UNRELATED", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        config.apply_env_vars(&env).unwrap();

        assert_eq!(config.scan.concurrency, 16);
        assert_eq!(config.scan.languages, vec!["javascript", "ruby"]);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.identity.strategy, IdStrategy::Sequential);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = DatashapeConfig::default();
        let env = HashMap::from([("DATASHAPE_SCAN_CONCURRENCY".to_string(), "many".to_string())]);
        assert!(config.apply_env_vars(&env).is_err());
    }

    #[test]
    fn test_cli_args_win() {
        let mut config = DatashapeConfig::default();
        config.output.format = OutputFormat::Json;

        let args = ScanArgs {
            format: Some(OutputFormat::Jsonl),
            concurrency: Some(2),
            no_builtin_rules: true,
            ..ScanArgs::default()
        };
        config.apply_scan_args(&args);

        assert_eq!(config.output.format, OutputFormat::Jsonl);
        assert_eq!(config.scan.concurrency, 2);
        assert!(!config.scan.builtin_rules);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DatashapeConfig::default();
        config.scan.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));

        let mut config = DatashapeConfig::default();
        config.scan.languages = vec!["cobol".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = DatashapeConfig::default();
        config.scan.target = Some(PathBuf::from("/definitely/not/here"));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPath { .. })));
    }
}
