#![deny(missing_docs)]

//! # CLI Errors
//!
//! Error types for the CLI crate.

use derive_more::{Display, From};

/// Main error enum for CLI operations.
#[derive(Debug, Display, From)]
pub enum CliError {
    /// IO Error wrapper.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// Bundle archive could not be opened or read.
    #[display("Archive Error: {}", _0)]
    Zip(zip::result::ZipError),

    /// Resolver error bubbled up from the core crate.
    #[display("Conversion Error: {}", _0)]
    Core(apigee2oas_core::AppError),

    /// YAML rendering failure.
    #[display("YAML Error: {}", _0)]
    Yaml(serde_yaml::Error),

    /// JSON rendering failure.
    #[display("JSON Error: {}", _0)]
    Json(serde_json::Error),

    /// Management API request failure.
    #[cfg(feature = "client")]
    #[display("HTTP Error: {}", _0)]
    Http(ureq::Error),

    /// General failure message.
    #[display("Operation failed: {}", _0)]
    General(String),
}

/// Manual implementation of the standard Error trait.
///
/// We implement this manually (instead of `derive(Error)`) because the `General(String)`
/// variant contains a `String`, which does not implement `std::error::Error`, causing
/// auto-derived `source()` implementations to fail compilation.
impl std::error::Error for CliError {}

/// Result type alias.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "test");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io(_)));
    }

    #[test]
    fn test_core_conversion() {
        let core_err = apigee2oas_core::AppError::Malformed("bad root".into());
        let cli_err: CliError = core_err.into();
        assert_eq!(
            format!("{}", cli_err),
            "Conversion Error: Malformed Document: bad root"
        );
    }

    #[test]
    fn test_string_defaults_to_general() {
        let cli_err: CliError = String::from("boom").into();
        assert!(matches!(cli_err, CliError::General(_)));
    }
}
