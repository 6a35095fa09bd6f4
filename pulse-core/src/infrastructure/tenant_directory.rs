//! Static credential to tenant mapping

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::domain::TenantId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantDirectoryError {
    #[error("No API keys configured")]
    Empty,

    #[error("API key for tenant '{second}' is already assigned to tenant '{first}'")]
    ConflictingCredential { first: String, second: String },
}

/// Credential lookup built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    tenants_by_key: HashMap<String, TenantId>,
}

impl TenantDirectory {
    /// Parse `tenant_a:key_a,tenant_b:key_b`.
    ///
    /// Whitespace around pairs and around each side of the `:` is trimmed.
    /// Pairs without a `:` or with an empty side are skipped.
    pub fn parse(spec: &str) -> Result<Self, TenantDirectoryError> {
        let mut tenants_by_key: HashMap<String, TenantId> = HashMap::new();

        for pair in spec.split(',') {
            let Some((tenant, key)) = pair.trim().split_once(':') else {
                continue;
            };
            let (tenant, key) = (tenant.trim(), key.trim());
            if tenant.is_empty() || key.is_empty() {
                continue;
            }

            match tenants_by_key.get(key) {
                Some(existing) if existing.as_str() != tenant => {
                    return Err(TenantDirectoryError::ConflictingCredential {
                        first: existing.to_string(),
                        second: tenant.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    tenants_by_key.insert(key.to_string(), TenantId::new(tenant));
                }
            }
        }

        if tenants_by_key.is_empty() {
            return Err(TenantDirectoryError::Empty);
        }

        debug!(tenants = tenants_by_key.len(), "Loaded tenant directory");

        Ok(Self { tenants_by_key })
    }

    pub fn from_pairs<I, T, K>(pairs: I) -> Result<Self, TenantDirectoryError>
    where
        I: IntoIterator<Item = (T, K)>,
        T: AsRef<str>,
        K: AsRef<str>,
    {
        let spec = pairs
            .into_iter()
            .map(|(tenant, key)| format!("{}:{}", tenant.as_ref(), key.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&spec)
    }

    /// Resolve a credential. Empty credentials never match.
    pub fn resolve(&self, credential: &str) -> Option<&TenantId> {
        if credential.is_empty() {
            return None;
        }
        self.tenants_by_key.get(credential)
    }

    pub fn len(&self) -> usize {
        self.tenants_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants_by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_mapping() {
        let directory = TenantDirectory::parse("tenant_a:key_a,tenant_b:key_b").unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.resolve("key_a").unwrap().as_str(), "tenant_a");
        assert_eq!(directory.resolve("key_b").unwrap().as_str(), "tenant_b");
        assert!(directory.resolve("key_c").is_none());
        assert!(directory.resolve("").is_none());
    }

    #[test]
    fn test_whitespace_trimmed_and_malformed_skipped() {
        let directory = TenantDirectory::parse(" tenant_a : key_a , garbage, :nokey, notenant:,").unwrap();

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.resolve("key_a").unwrap().as_str(), "tenant_a");
    }

    #[test]
    fn test_credential_may_contain_colon() {
        let directory = TenantDirectory::parse("tenant_a:abc:def").unwrap();
        assert_eq!(directory.resolve("abc:def").unwrap().as_str(), "tenant_a");
    }

    #[test]
    fn test_empty_mapping_rejected() {
        assert_eq!(
            TenantDirectory::parse("").unwrap_err(),
            TenantDirectoryError::Empty
        );
        assert_eq!(
            TenantDirectory::parse("nonsense").unwrap_err(),
            TenantDirectoryError::Empty
        );
    }

    #[test]
    fn test_conflicting_credential_rejected() {
        let err = TenantDirectory::parse("tenant_a:shared,tenant_b:shared").unwrap_err();
        assert!(matches!(
            err,
            TenantDirectoryError::ConflictingCredential { .. }
        ));

        // Repeating the same pair is harmless
        assert!(TenantDirectory::parse("tenant_a:k,tenant_a:k").is_ok());
    }

    #[test]
    fn test_from_pairs() {
        let directory = TenantDirectory::from_pairs([("t1", "k1"), ("t2", "k2")]).unwrap();
        assert_eq!(directory.resolve("k2").unwrap().as_str(), "t2");
    }
}
