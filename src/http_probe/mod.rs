pub mod certificate;
pub mod error;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::error::{CertificateError, CheckError};
    pub use super::probe::TargetChecker;
    pub use super::result::{CheckResult, Outcome, format_http_version};
}

use std::fmt::Write;

/// Renders an error and its sources on one line. Sources whose text is
/// already part of the message are skipped.
pub fn error_chain(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let text = src.to_string();
        if !s.contains(&text) {
            let _ = write!(s, ": {}", text);
        }
        err = src;
    }
    s
}
