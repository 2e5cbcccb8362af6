/// Closed set of configuration failures.
///
/// Messages name config pointers and env var names, never secret values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A leaf value looks like a pasted secret.
    SecretDetected { pointer: String },
    /// A credential's env var is unset or blank.
    MissingCredential { name: String, env: String },
    /// Two credentials share a name.
    DuplicateCredential { name: String },
    /// A setting is out of range.
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::SecretDetected { pointer } => {
                write!(f, "CONFIG_SECRET_DETECTED leaf={pointer} value=REDACTED")
            }
            ConfigError::MissingCredential { name, env } => write!(
                f,
                "CONFIG_CREDENTIAL_MISSING credential={name}: env var '{env}' is not set or empty"
            ),
            ConfigError::DuplicateCredential { name } => {
                write!(f, "CONFIG_CREDENTIAL_DUPLICATE credential={name}")
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "CONFIG_INVALID field={field}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
