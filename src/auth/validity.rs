use chrono::Utc;

use super::subject::Subject;

/// Decides whether a cached subject may still be handed out
pub trait CredentialsValidator: Send + Sync {
    fn is_subject_valid(&self, subject: &Subject) -> bool;
}

/// Valid until `expires_at`. Subjects without an expiration never expire.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpirationValidator;

impl CredentialsValidator for ExpirationValidator {
    fn is_subject_valid(&self, subject: &Subject) -> bool {
        subject
            .expires_at
            .is_none_or(|expires_at| expires_at > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiration() {
        let validator = ExpirationValidator;

        assert!(validator.is_subject_valid(&Subject::new()));
        assert!(validator.is_subject_valid(&Subject::new().with_expiration(Utc::now() + Duration::minutes(5))));
        assert!(!validator.is_subject_valid(&Subject::new().with_expiration(Utc::now() - Duration::seconds(1))));
    }
}
