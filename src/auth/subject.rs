//! Authenticated subjects as stored in the cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Realm used when a principal does not name one
pub const DEFAULT_REALM: &str = "defaultRealm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub realm: Option<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: None,
        }
    }

    pub fn with_realm(name: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: Some(realm.into()),
        }
    }

    pub fn realm(&self) -> &str {
        self.realm.as_deref().unwrap_or(DEFAULT_REALM)
    }
}

/// Credential attached to a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    /// Marker for password authentication. The password itself is never kept.
    Basic { user_id: String },
    SsoToken(Vec<u8>),
    CustomCacheKey(String),
    /// DER-encoded X.509 certificate
    Certificate(Vec<u8>),
    /// Handle to a resource owned by this process. It has no meaning
    /// elsewhere and refuses to be serialized.
    #[serde(serialize_with = "reject_in_process", skip_deserializing)]
    InProcess(String),
}

fn reject_in_process<S: Serializer>(name: &str, _serializer: S) -> Result<S::Ok, S::Error> {
    Err(serde::ser::Error::custom(format!(
        "in-process credential '{name}' cannot leave this process"
    )))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub principals: Vec<Principal>,
    pub credentials: Vec<Credential>,
    /// `None` means the credentials never expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn primary_principal(&self) -> Option<&Principal> {
        self.principals.first()
    }

    /// Realm of the first principal, or [`DEFAULT_REALM`]
    pub fn realm(&self) -> &str {
        self.primary_principal()
            .map(Principal::realm)
            .unwrap_or(DEFAULT_REALM)
    }

    pub fn sso_tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.credentials.iter().filter_map(|credential| match credential {
            Credential::SsoToken(token) => Some(token.as_slice()),
            _ => None,
        })
    }

    pub fn custom_cache_key(&self) -> Option<&str> {
        self.credentials.iter().find_map(|credential| match credential {
            Credential::CustomCacheKey(key) => Some(key.as_str()),
            _ => None,
        })
    }

    /// Whether every credential can be written to a shared store
    pub fn is_distributable(&self) -> bool {
        !self
            .credentials
            .iter()
            .any(|credential| matches!(credential, Credential::InProcess(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_defaults() {
        let subject = Subject::new().with_principal(Principal::new("alice"));
        assert_eq!(subject.realm(), DEFAULT_REALM);
        assert_eq!(Subject::new().realm(), DEFAULT_REALM);

        let subject = Subject::new().with_principal(Principal::with_realm("bob", "corp"));
        assert_eq!(subject.realm(), "corp");
    }

    #[test]
    fn test_credential_accessors() {
        let subject = Subject::new()
            .with_credential(Credential::SsoToken(b"one".to_vec()))
            .with_credential(Credential::CustomCacheKey("custom".to_string()))
            .with_credential(Credential::SsoToken(b"two".to_vec()));

        let tokens: Vec<&[u8]> = subject.sso_tokens().collect();
        assert_eq!(tokens, vec![b"one".as_slice(), b"two".as_slice()]);
        assert_eq!(subject.custom_cache_key(), Some("custom"));
        assert!(subject.is_distributable());
    }

    #[test]
    fn test_in_process_credential_refuses_serialization() {
        let subject = Subject::new()
            .with_principal(Principal::new("alice"))
            .with_credential(Credential::InProcess("kerberos-ticket".to_string()));

        assert!(!subject.is_distributable());
        let err = bincode::serialize(&subject).unwrap_err();
        assert!(err.to_string().contains("kerberos-ticket"));
    }

    #[test]
    fn test_serializable_subject_survives_bincode() {
        let subject = Subject::new()
            .with_principal(Principal::with_realm("alice", "corp"))
            .with_credential(Credential::Basic {
                user_id: "alice".to_string(),
            })
            .with_expiration(Utc::now());

        let bytes = bincode::serialize(&subject).unwrap();
        let decoded: Subject = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, subject);
    }
}
