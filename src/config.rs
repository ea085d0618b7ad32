use crate::error::{AppError, Result};
use crate::models::{Parameter, TimeRange};
use crate::region::RegionQuery;
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Everything the acquisition layer needs, passed in explicitly at construction.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    "argo-feed/0.1.0".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    /// ERDDAP endpoints answering `.json` tables
    #[serde(default)]
    pub primary: Vec<EndpointConfig>,
    /// ERDDAP endpoints answering `.csv` text
    #[serde(default)]
    pub secondary: Vec<EndpointConfig>,
    /// Reachability probe tried after both ERDDAP tiers
    #[serde(default)]
    pub alternative: Option<EndpointConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default, deserialize_with = "deserialize_seconds")]
    pub timeout_seconds: Option<u64>,
    /// ERDDAP variables to request instead of the format's defaults.
    /// Only primary (`.json`) endpoints may override; `.csv` is read by position.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
}

/// Custom deserializer that handles a timeout as both number and string
///
/// Accepts:
/// - `timeout_seconds: 15` (number)
/// - `timeout_seconds: "15"` (string that parses to number)
/// - `timeout_seconds: ${PRIMARY_TIMEOUT}` (env var substituted to either)
fn deserialize_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SecondsValue {
        Number(u64),
        String(String),
    }

    match Option::<SecondsValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SecondsValue::Number(n)) => Ok(Some(n)),
        Some(SecondsValue::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timeout seconds: '{}'", s))),
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct QueryConfig {
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default)]
    pub region: RegionQuery,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default)]
    pub parameter: Parameter,
    #[serde(default = "default_point_budget")]
    pub point_budget: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parameter: Parameter::default(),
            point_budget: default_point_budget(),
        }
    }
}

fn default_point_budget() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SyntheticConfig {
    /// Fixed seed for reproducible synthetic data; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

const MAX_TIMEOUT_SECONDS: u64 = 60;

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    /// Parse YAML after substituting `${VAR}` placeholders, then validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Unexpanded environment variables
    /// - Non-empty endpoint names
    /// - Parseable http(s) base URLs
    /// - Timeouts between 1 and 60 seconds
    /// - Variable overrides only on primary endpoints, and well-formed
    /// - A non-zero point budget
    fn validate(&self) -> Result<()> {
        let endpoints = self
            .sources
            .primary
            .iter()
            .chain(self.sources.secondary.iter())
            .chain(self.sources.alternative.iter());

        for endpoint in endpoints {
            if endpoint.name.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Endpoint with base_url '{}' has an empty name",
                    endpoint.base_url
                )));
            }

            if endpoint.base_url.contains("${") {
                return Err(AppError::Config(format!(
                    "Endpoint '{}' base_url contains an unexpanded environment variable",
                    endpoint.name
                )));
            }

            let url = url::Url::parse(&endpoint.base_url).map_err(|e| {
                AppError::Config(format!(
                    "Endpoint '{}' has invalid base_url '{}': {}",
                    endpoint.name, endpoint.base_url, e
                ))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(AppError::Config(format!(
                    "Endpoint '{}' must use http or https, got '{}'",
                    endpoint.name,
                    url.scheme()
                )));
            }

            if let Some(seconds) = endpoint.timeout_seconds {
                if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS {
                    return Err(AppError::Config(format!(
                        "Endpoint '{}' timeout_seconds must be between 1 and {}, got {}",
                        endpoint.name, MAX_TIMEOUT_SECONDS, seconds
                    )));
                }
            }
        }

        for endpoint in &self.sources.primary {
            if let Some(variables) = &endpoint.variables {
                validate_variables(&endpoint.name, variables)?;
            }
        }

        let positional = self
            .sources
            .secondary
            .iter()
            .chain(self.sources.alternative.iter());
        for endpoint in positional {
            if endpoint.variables.is_some() {
                return Err(AppError::Config(format!(
                    "Endpoint '{}' cannot override variables; only primary endpoints may",
                    endpoint.name
                )));
            }
        }

        if self.render.point_budget == 0 {
            return Err(AppError::Config(
                "render.point_budget must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

const REQUIRED_VARIABLES: [&str; 6] = [
    "time",
    "latitude",
    "longitude",
    "pres",
    "temp",
    "psal",
];

fn validate_variables(endpoint: &str, variables: &[String]) -> Result<()> {
    if let Some(bad) = variables
        .iter()
        .find(|v| v.is_empty() || !v.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    {
        return Err(AppError::Config(format!(
            "Endpoint '{}' has invalid variable name '{}'",
            endpoint, bad
        )));
    }

    let missing: Vec<&str> = REQUIRED_VARIABLES
        .iter()
        .copied()
        .filter(|required| !variables.iter().any(|v| v == required))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "Endpoint '{}' variables must include {}",
            endpoint,
            missing.join(", ")
        )));
    }

    Ok(())
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid placeholder pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or set {} in your environment before running",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}
