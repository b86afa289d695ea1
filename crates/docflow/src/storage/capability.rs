//! HMAC-signed, time-limited read links

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// A minted read link
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks capability URLs of the form
/// `{base_url}/api/blobs/{path}?expires={unix}&signature={hex}`.
#[derive(Clone)]
pub struct CapabilitySigner {
    secret: Vec<u8>,
    base_url: String,
}

impl std::fmt::Debug for CapabilitySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CapabilitySigner {
    pub fn new(secret: impl AsRef<[u8]>, base_url: impl Into<String>) -> StorageResult<Self> {
        let secret = secret.as_ref().to_vec();
        if secret.is_empty() {
            return Err(StorageError::Config(
                "capability signing secret is not set".to_string(),
            ));
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StorageError::Config(
                "public base URL for capability links is not set".to_string(),
            ));
        }
        Ok(Self { secret, base_url })
    }

    pub fn mint(&self, path: &str, ttl: Duration) -> StorageResult<Capability> {
        let expires_at = Utc::now().checked_add_signed(ttl).ok_or_else(|| {
            StorageError::Config(format!("capability TTL out of range: {}", ttl))
        })?;
        self.mint_until(path, expires_at)
    }

    pub fn mint_until(&self, path: &str, expires_at: DateTime<Utc>) -> StorageResult<Capability> {
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(path, expires)?.finalize().into_bytes());
        let encoded: Vec<String> = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();

        Ok(Capability {
            url: format!(
                "{}/api/blobs/{}?expires={}&signature={}",
                self.base_url,
                encoded.join("/"),
                expires,
                signature
            ),
            expires_at,
        })
    }

    /// Constant-time signature check plus expiry check against now.
    pub fn verify(&self, path: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        match self.mac(path, expires) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, path: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::Config(format!("invalid signing key: {}", e)))?;
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> CapabilitySigner {
        CapabilitySigner::new("test-secret", "http://localhost:8080/").unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|kv| kv.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[test]
    fn test_unrepresentable_expiry_is_config_error() {
        let err = signer()
            .mint("documents/u1/1_a.pdf", Duration::days(100_000_000))
            .unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_mint_and_verify() {
        let cap = signer()
            .mint("documents/u1/1_plan v2.pdf", Duration::days(7))
            .unwrap();
        assert!(cap
            .url
            .starts_with("http://localhost:8080/api/blobs/documents/u1/1_plan%20v2.pdf?"));

        let expires: i64 = query_param(&cap.url, "expires").parse().unwrap();
        let sig = query_param(&cap.url, "signature");
        assert_eq!(expires, cap.expires_at.timestamp());
        assert!(signer().verify("documents/u1/1_plan v2.pdf", expires, sig));
        assert!(!signer().verify("documents/u1/other.pdf", expires, sig));
        assert!(!signer().verify("documents/u1/1_plan v2.pdf", expires + 1, sig));
    }

    #[test]
    fn test_expired_capability_rejected() {
        let cap = signer()
            .mint_until("a/b", Utc::now() - Duration::seconds(5))
            .unwrap();
        let sig = query_param(&cap.url, "signature");
        assert!(!signer().verify("a/b", cap.expires_at.timestamp(), sig));
    }

    #[test]
    fn test_other_secret_rejected() {
        let cap = signer().mint("a/b", Duration::hours(1)).unwrap();
        let sig = query_param(&cap.url, "signature");
        let other = CapabilitySigner::new("other", "http://localhost").unwrap();
        assert!(!other.verify("a/b", cap.expires_at.timestamp(), sig));
        assert!(!signer().verify("a/b", cap.expires_at.timestamp(), "zz"));
    }

    #[test]
    fn test_missing_configuration() {
        assert!(matches!(
            CapabilitySigner::new("", "http://x"),
            Err(StorageError::Config(_))
        ));
        assert!(matches!(
            CapabilitySigner::new("s", ""),
            Err(StorageError::Config(_))
        ));
    }
}
