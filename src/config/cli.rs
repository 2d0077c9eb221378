use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "enrollment-ledger")]
#[command(about = "Attendance ledger and class substitutions for dance-school enrollments")]
pub struct CliConfig {
    #[arg(long, default_value = "http://localhost:8000/api/")]
    pub api_base_url: String,

    #[arg(long)]
    pub auth_token: Option<String>,

    /// Acting student for request commands
    #[arg(long)]
    pub student_id: Option<i64>,

    #[arg(long, default_value = "5")]
    pub concurrent_requests: usize,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "6")]
    pub max_installments: u32,

    /// TOML configuration; replaces the connection flags above
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the attendance ledger of an enrollment
    Attendance {
        #[arg(long)]
        enrollment: i64,
        /// Print as CSV instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// List attendances that can be swapped for another class
    Eligible {
        #[arg(long)]
        enrollment: i64,
    },
    /// List replacement sessions on a date
    Candidates {
        #[arg(long)]
        enrollment: i64,
        #[arg(long)]
        attendance: i64,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Request a substitution
    Request {
        #[arg(long)]
        enrollment: i64,
        #[arg(long)]
        attendance: i64,
        #[arg(long)]
        session: i64,
        #[arg(long)]
        reason: String,
    },
    /// List the acting student's substitution requests
    Requests,
    /// Record attendance for several classes in one batch
    Mark {
        #[arg(long)]
        enrollment: i64,
        #[arg(long, value_delimiter = ',')]
        present: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        absent: Vec<i64>,
    },
    /// Split a total into installments
    Installments {
        #[arg(long)]
        total: f64,
        #[arg(long, default_value = "1")]
        count: u32,
        /// Sessions bought; a single session is always paid at once
        #[arg(long, default_value = "2")]
        sessions: u32,
    },
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_base_url", &self.api_base_url)?;
        validation::validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;
        validation::validate_range("max_installments", self.max_installments, 1, 24)?;
        if let Command::Request { reason, .. } = &self.command {
            validation::validate_non_empty_string("reason", reason)?;
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mark_command() {
        let config = CliConfig::parse_from([
            "enrollment-ledger",
            "mark",
            "--enrollment",
            "7",
            "--present",
            "1,2",
            "--absent",
            "3",
        ]);
        assert!(config.validate().is_ok());
        match config.command {
            Command::Mark {
                enrollment,
                present,
                absent,
            } => {
                assert_eq!(enrollment, 7);
                assert_eq!(present, vec![1, 2]);
                assert_eq!(absent, vec![3]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_blank_reason_fails_validation() {
        let config = CliConfig::parse_from([
            "enrollment-ledger",
            "request",
            "--enrollment",
            "7",
            "--attendance",
            "1",
            "--session",
            "20",
            "--reason",
            "   ",
        ]);
        assert!(config.validate().is_err());
    }
}
