use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::demand::DuplicatePolicy;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub demand: DemandConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub skip_invalid_rows: bool,
    #[serde(default = "default_missing_values")]
    pub missing_values: Vec<String>,
    #[serde(default)]
    pub columns: ColumnNames,
}

/// Header names of the seven required input columns.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnNames {
    #[serde(default = "default_bidder_column")]
    pub bidder: String,
    #[serde(default = "default_round_column")]
    pub round: String,
    #[serde(default = "default_market_column")]
    pub market: String,
    #[serde(default = "default_category_column")]
    pub category: String,
    #[serde(default = "default_quantity_column")]
    pub quantity: String,
    #[serde(default = "default_price_column")]
    pub price: String,
    #[serde(default = "default_rivals_column")]
    pub rivals_quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DemandConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub run_log: bool,
    #[serde(default = "default_run_log_path")]
    pub run_log_path: String,
}

fn default_input_path() -> String { "data/bids.csv".to_string() }
fn default_delimiter() -> char { ',' }
fn default_output_path() -> String { "output/demand.json".to_string() }
fn default_run_log_path() -> String { "output/runs.csv".to_string() }

fn default_missing_values() -> Vec<String> {
    ["", "NaN", "nan", "NA", "N/A", "null", "None"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_bidder_column() -> String { "bidder".to_string() }
fn default_round_column() -> String { "round".to_string() }
fn default_market_column() -> String { "market".to_string() }
fn default_category_column() -> String { "category".to_string() }
fn default_quantity_column() -> String { "quantity".to_string() }
fn default_price_column() -> String { "bid_amount".to_string() }
fn default_rivals_column() -> String { "aggregate_rivals_quantity".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: default_delimiter(),
            skip_invalid_rows: false,
            missing_values: default_missing_values(),
            columns: ColumnNames::default(),
        }
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            bidder: default_bidder_column(),
            round: default_round_column(),
            market: default_market_column(),
            category: default_category_column(),
            quantity: default_quantity_column(),
            price: default_price_column(),
            rivals_quantity: default_rivals_column(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: false,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            run_log: false,
            run_log_path: default_run_log_path(),
        }
    }
}

/// Overrides taken from the process environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub parallel: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(path) = &env.input_path {
            self.input.path = path.clone();
        }
        if let Some(path) = &env.output_path {
            self.output.path = path.clone();
        }
        if let Some(parallel) = env.parallel {
            self.demand.parallel = parallel;
        }
    }

    /// Command-line flags win over both the file and the environment.
    /// The boolean flags can only switch a feature on.
    pub fn apply_cli(
        &mut self,
        input: Option<String>,
        output: Option<String>,
        parallel: bool,
        pretty: bool,
    ) {
        if let Some(path) = input {
            self.input.path = path;
        }
        if let Some(path) = output {
            self.output.path = path;
        }
        self.demand.parallel |= parallel;
        self.output.pretty |= pretty;
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parallel = match var("DEMAND_PARALLEL") {
            Some(value) => Some(
                value
                    .parse()
                    .with_context(|| format!("DEMAND_PARALLEL is not a bool: {}", value))?,
            ),
            None => None,
        };

        Ok(Self {
            input_path: var("BIDS_INPUT_PATH"),
            output_path: var("DEMAND_OUTPUT_PATH"),
            parallel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.input.path, "data/bids.csv");
        assert_eq!(config.input.delimiter, ',');
        assert_eq!(config.input.columns.price, "bid_amount");
        assert!(config.input.missing_values.contains(&"NaN".to_string()));
        assert_eq!(config.output.path, "output/demand.json");
        assert_eq!(config.demand.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert!(!config.demand.parallel);
        assert!(!config.monitoring.run_log);
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
            [input]
            path = "bids.tsv"
            delimiter = "\t"
            skip_invalid_rows = true

            [input.columns]
            bidder = "bidder_name"

            [demand]
            duplicate_policy = "keep_last"
            parallel = true
            "#,
        )
        .unwrap();

        assert_eq!(config.input.path, "bids.tsv");
        assert_eq!(config.input.delimiter, '\t');
        assert!(config.input.skip_invalid_rows);
        assert_eq!(config.input.columns.bidder, "bidder_name");
        assert_eq!(config.input.columns.round, "round");
        assert_eq!(config.demand.duplicate_policy, DuplicatePolicy::KeepLast);
        assert!(config.demand.parallel);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.apply_env(&EnvConfig {
            input_path: Some("other.csv".to_string()),
            output_path: None,
            parallel: Some(true),
        });

        assert_eq!(config.input.path, "other.csv");
        assert_eq!(config.output.path, "output/demand.json");
        assert!(config.demand.parallel);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_env_from_vars() {
        let env = EnvConfig::from_vars(vars(&[
            ("BIDS_INPUT_PATH", "env.csv"),
            ("DEMAND_PARALLEL", "false"),
        ]))
        .unwrap();

        assert_eq!(env.input_path.as_deref(), Some("env.csv"));
        assert_eq!(env.output_path, None);
        assert_eq!(env.parallel, Some(false));
    }

    #[test]
    fn test_env_rejects_non_bool_parallel() {
        let err = EnvConfig::from_vars(vars(&[("DEMAND_PARALLEL", "yes")])).unwrap_err();
        assert!(err.to_string().contains("DEMAND_PARALLEL"));
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let mut config = Config::parse(
            r#"
            [input]
            path = "file.csv"

            [output]
            path = "file.json"

            [demand]
            parallel = true
            "#,
        )
        .unwrap();

        let env = EnvConfig::from_vars(vars(&[
            ("BIDS_INPUT_PATH", "env.csv"),
            ("DEMAND_OUTPUT_PATH", "env.json"),
            ("DEMAND_PARALLEL", "false"),
        ]))
        .unwrap();
        config.apply_env(&env);

        assert_eq!(config.input.path, "env.csv");
        assert_eq!(config.output.path, "env.json");
        assert!(!config.demand.parallel);

        config.apply_cli(Some("cli.csv".to_string()), None, true, true);

        assert_eq!(config.input.path, "cli.csv");
        assert_eq!(config.output.path, "env.json");
        assert!(config.demand.parallel);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_cli_flags_off_keep_lower_layers() {
        let mut config = Config::parse("[output]\npretty = true\n[demand]\nparallel = true").unwrap();

        config.apply_cli(None, None, false, false);

        assert_eq!(config.input.path, "data/bids.csv");
        assert!(config.demand.parallel);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(Config::parse("[demand]\nduplicate_policy = \"newest\"").is_err());
    }
}
