use std::fmt;

use serde::Serialize;

/// Nagios-style alerting state.
///
/// Ordered by severity for everything except `Unknown`, which sits last
/// so that it never masks a real warning when results are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl AlertStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Outcome of evaluating one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertResult {
    status: AlertStatus,
    message: String,
}

impl AlertResult {
    pub fn new(status: AlertStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(AlertStatus::Ok, message)
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

impl fmt::Display for AlertResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.label(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_nagios() {
        assert_eq!(AlertStatus::Ok.exit_code(), 0);
        assert_eq!(AlertStatus::Warning.exit_code(), 1);
        assert_eq!(AlertStatus::Critical.exit_code(), 2);
        assert_eq!(AlertStatus::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_display_prefixes_status() {
        let result = AlertResult::new(AlertStatus::Critical, "Pipeline \"Deploy\" failed");

        assert_eq!(result.to_string(), "CRITICAL: Pipeline \"Deploy\" failed");
        assert_eq!(result.exit_code(), 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertStatus::Ok < AlertStatus::Warning);
        assert!(AlertStatus::Warning < AlertStatus::Critical);
    }
}
