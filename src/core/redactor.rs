//! Secret redaction
//!
//! Keeps credentials passed through the environment out of logs and
//! `appstart plan` output.

/// Placeholder text for redacted values
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Key fragments that mark an environment variable as sensitive
const SENSITIVE_KEY_PARTS: [&str; 4] = ["SECRET", "TOKEN", "PASSWORD", "KEY"];

/// Check whether an environment variable name looks like it holds a secret
pub fn is_sensitive_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| upper.contains(part))
}

/// Return the value to display for `key`
pub fn redact_env_value<'a>(key: &str, value: &'a str, is_enabled: bool) -> &'a str {
    if is_enabled && is_sensitive_key(key) {
        REDACTED_PLACEHOLDER
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_keys() {
        assert!(is_sensitive_key("JWT_SECRET"));
        assert!(is_sensitive_key("github_token"));
        assert!(is_sensitive_key("DB_PASSWORD"));
        assert!(is_sensitive_key("OPENAI_API_KEY"));
        assert!(is_sensitive_key("ENCRYPTION_KEY"));
        assert!(is_sensitive_key("APIKEY"));
        assert!(is_sensitive_key("KEY"));
        assert!(is_sensitive_key("keystore_path"));
    }

    #[test]
    fn test_plain_keys() {
        assert!(!is_sensitive_key("PORT"));
        assert!(!is_sensitive_key("PYTHONPATH"));
        assert!(!is_sensitive_key("PYTHONDONTWRITEBYTECODE"));
        assert!(!is_sensitive_key("APP_STAGE"));
    }

    #[test]
    fn test_redact_env_value() {
        assert_eq!(redact_env_value("DB_PASSWORD", "hunter2", true), REDACTED_PLACEHOLDER);
        assert_eq!(redact_env_value("DB_PASSWORD", "hunter2", false), "hunter2");
        assert_eq!(redact_env_value("PORT", "5000", true), "5000");
    }
}
