pub mod redaction;
pub mod subscriber;

pub use redaction::*;
pub use subscriber::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn test_redact_key_keeps_first_segment() {
        assert_eq!(redact_key("defaultRealm:alice:9f86d081"), "defaultRealm:[REDACTED]");
        assert_eq!(redact_key("cert:ab12cd"), "cert:[REDACTED]");
        assert_eq!(redact_key("sso:ffee"), "sso:[REDACTED]");
    }

    #[test]
    fn test_redact_key_without_separator() {
        assert_eq!(redact_key("my-custom-key"), "[REDACTED]");
        assert_eq!(redact_key(":leading"), "[REDACTED]");
        assert_eq!(redact_key(""), "[REDACTED]");
    }

    #[test]
    fn test_tracing_subscriber_initialization() {
        let json_config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
        };
        let invalid_config = LoggingConfig {
            level: "info".to_string(),
            format: "invalid".to_string(),
        };

        // May fail if another test installed a subscriber first
        let _ = setup_tracing(&json_config);

        let result = setup_tracing(&invalid_config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Unsupported log format")
        );
    }
}
