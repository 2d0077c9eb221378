use crate::core::ConfigProvider;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_timeout_seconds() -> u64 {
    30
}

fn default_concurrent_requests() -> usize {
    5
}

fn default_max_installments() -> u32 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub student: Option<StudentConfig>,
    #[serde(default)]
    pub notifications: Option<NotificationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    #[serde(default = "default_max_installments")]
    pub max_installments: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
            max_installments: default_max_installments(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentConfig {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
}

impl LedgerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LedgerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LedgerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| LedgerError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.notifications
            .as_ref()
            .and_then(|n| n.webhook_url.as_deref())
    }

    pub fn student_id(&self) -> Option<i64> {
        self.student.as_ref().map(|s| s.id)
    }
}

impl Validate for LedgerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("backend.base_url", &self.backend.base_url)?;
        validation::validate_positive_number(
            "ledger.concurrent_requests",
            self.ledger.concurrent_requests,
            1,
        )?;
        validation::validate_range("ledger.max_installments", self.ledger.max_installments, 1, 24)?;
        validation::validate_range("backend.timeout_seconds", self.backend.timeout_seconds, 1, 600)?;
        if let Some(token) = &self.backend.auth_token {
            validation::validate_non_empty_string("backend.auth_token", token)?;
        }
        if let Some(url) = self.webhook_url() {
            validation::validate_url("notifications.webhook_url", url)?;
        }
        Ok(())
    }
}

impl ConfigProvider for LedgerConfig {
    fn api_base_url(&self) -> &str {
        &self.backend.base_url
    }

    fn auth_token(&self) -> Option<&str> {
        self.backend.auth_token.as_deref()
    }

    fn concurrent_requests(&self) -> usize {
        self.ledger.concurrent_requests
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.backend.timeout_seconds
    }
}
