use thiserror::Error;

/// Structured errors for the boundaries that are allowed to propagate.
///
/// Everything inside the scan/fetch/render pipeline degrades locally to a
/// valid (if empty) output; only configuration at startup and registry
/// persistence surface typed errors. Transport glue continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN environment variable not set")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed domain file: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_names_the_variable() {
        assert!(
            ConfigError::MissingToken
                .to_string()
                .contains("DISCORD_TOKEN")
        );
    }

    #[test]
    fn io_error_wraps_transparently() {
        let err: RegistryError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.to_string().contains("denied"));
    }
}
