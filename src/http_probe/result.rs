use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::{CertificateError, CheckError};

/// What a single check learned about a target.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub url: String,
    pub response_time: Duration,
    pub status_code: u16,
    pub http_version: String,
    /// `NotAfter` of the leaf certificate. Only set for https targets that
    /// presented a certificate.
    pub ssl_expiration: Option<DateTime<Utc>>,
    pub ssl_expiry_warning: bool,
}

/// The three ways a check can end.
#[derive(Debug)]
pub enum Outcome {
    /// HTTP probe and, for https targets, certificate probe both succeeded.
    Complete(CheckResult),
    /// HTTP probe succeeded, certificate probe did not. `result` is still valid.
    Partial {
        result: CheckResult,
        error: CertificateError,
    },
    /// HTTP probe failed.
    Failed(CheckError),
}

impl Outcome {
    pub fn result(&self) -> Option<&CheckResult> {
        match self {
            Outcome::Complete(result) | Outcome::Partial { result, .. } => Some(result),
            Outcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

pub fn format_http_version(version: reqwest::Version) -> String {
    match version {
        reqwest::Version::HTTP_09 => "HTTP/0.9".to_string(),
        reqwest::Version::HTTP_10 => "HTTP/1.0".to_string(),
        reqwest::Version::HTTP_11 => "HTTP/1.1".to_string(),
        reqwest::Version::HTTP_2 => "HTTP/2.0".to_string(),
        reqwest::Version::HTTP_3 => "HTTP/3.0".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}
