use std::fmt;
use std::path::Path;

use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, SubtransError};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host";
const CONTENT_TYPE: &str = "application/json";
const TERMINATOR: &str = "tc3_request";

pub const SECRET_ID_ENV: &str = "TENCENTCLOUD_SECRET_ID";
pub const SECRET_KEY_ENV: &str = "TENCENTCLOUD_SECRET_KEY";

/// API key pair. The key never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    secret_id: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let secret_id = secret_id.into().trim().to_string();
        let secret_key = secret_key.into().trim().to_string();

        if secret_id.is_empty() {
            return Err(SubtransError::Credentials("secret id is empty".to_string()));
        }
        if secret_key.is_empty() {
            return Err(SubtransError::Credentials("secret key is empty".to_string()));
        }

        Ok(Self { secret_id, secret_key })
    }

    /// Read `TENCENTCLOUD_SECRET_ID` / `TENCENTCLOUD_SECRET_KEY`
    pub fn from_env() -> Option<Result<Self>> {
        let secret_id = std::env::var(SECRET_ID_ENV).ok()?;
        let secret_key = std::env::var(SECRET_KEY_ENV).ok()?;
        Some(Self::new(secret_id, secret_key))
    }

    /// Read a key file made of `secret_id=...` and `secret_key=...` lines
    pub fn from_key_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SubtransError::Credentials(format!("Failed to read key file {}: {}", path.display(), e))
        })?;
        Self::parse_key_file(&content)
    }

    fn parse_key_file(content: &str) -> Result<Self> {
        let mut secret_id = None;
        let mut secret_key = None;

        for line in content.lines().map(str::trim) {
            if let Some(value) = line.strip_prefix("secret_id=") {
                secret_id = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("secret_key=") {
                secret_key = Some(value.to_string());
            }
        }

        match (secret_id, secret_key) {
            (Some(id), Some(key)) => Self::new(id, key),
            _ => Err(SubtransError::Credentials(
                "key file must contain secret_id= and secret_key= lines".to_string(),
            )),
        }
    }

    /// Environment first, then the key file
    pub fn resolve<P: AsRef<Path>>(key_file: P) -> Result<Self> {
        match Self::from_env() {
            Some(credentials) => credentials,
            None => Self::from_key_file(key_file),
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// TC3-HMAC-SHA256 request signer
#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
    host: String,
    service: String,
}

impl Signer {
    pub fn new(credentials: Credentials, host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            host: host.into(),
            service: service.into(),
        }
    }

    /// Authorization header value for `payload` sent at `timestamp` (Unix seconds)
    pub fn authorization(&self, payload: &str, timestamp: i64) -> String {
        let date = signing_date(timestamp);
        let scope = format!("{}/{}/{}", date, self.service, TERMINATOR);

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            scope,
            sha256_hex(&self.canonical_request(payload))
        );

        let key_date = hmac_sha256(format!("TC3{}", self.credentials.secret_key).as_bytes(), &date);
        let key_service = hmac_sha256(&key_date, &self.service);
        let key_signing = hmac_sha256(&key_service, TERMINATOR);
        let signature = hex::encode(hmac_sha256(&key_signing, &string_to_sign));

        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.secret_id, scope, SIGNED_HEADERS, signature
        )
    }

    fn canonical_request(&self, payload: &str) -> String {
        format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
            CONTENT_TYPE,
            self.host,
            SIGNED_HEADERS,
            sha256_hex(payload)
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// UTC date of the timestamp as `YYYY-MM-DD`
fn signing_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"SourceText":"Hello","Source":"auto","Target":"zh","ProjectId":0}"#;

    fn signer() -> Signer {
        let credentials = Credentials::new("AKIDEXAMPLE", "secretkeyexample").unwrap();
        Signer::new(credentials, "tmt.tencentcloudapi.com", "tmt")
    }

    #[test]
    fn matches_known_signature() {
        assert_eq!(
            signer().authorization(PAYLOAD, 1_700_000_000),
            "TC3-HMAC-SHA256 Credential=AKIDEXAMPLE/2023-11-14/tmt/tc3_request, \
             SignedHeaders=content-type;host, \
             Signature=f802f460f597f733b3920c8cb3b280d80d5a4412ba21d1596dbbf08f641100dd"
        );
    }

    #[test]
    fn signature_is_deterministic() {
        let signer = signer();
        let first = signer.authorization(PAYLOAD, 1_700_000_000);
        for _ in 0..5 {
            assert_eq!(signer.authorization(PAYLOAD, 1_700_000_000), first);
        }
    }

    #[test]
    fn timestamp_and_payload_change_signature() {
        let signer = signer();
        let base = signer.authorization(PAYLOAD, 1_700_000_000);
        assert_ne!(signer.authorization(PAYLOAD, 1_700_000_001), base);
        assert_ne!(signer.authorization("{}", 1_700_000_000), base);
    }

    #[test]
    fn canonical_request_layout() {
        let canonical = signer().canonical_request(PAYLOAD);
        assert_eq!(
            canonical,
            "POST\n/\n\ncontent-type:application/json\nhost:tmt.tencentcloudapi.com\n\n\
             content-type;host\n\
             547e693996154ef3c35dd00284f2b8a7b8226ef8f8405453aae1a3990689acd1"
        );
    }

    #[test]
    fn date_is_utc() {
        assert_eq!(signing_date(0), "1970-01-01");
        assert_eq!(signing_date(1_700_006_399), "2023-11-14");
        assert_eq!(signing_date(1_700_006_400), "2023-11-15");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(matches!(Credentials::new("", "key"), Err(SubtransError::Credentials(_))));
        assert!(matches!(Credentials::new("id", "  "), Err(SubtransError::Credentials(_))));
    }

    #[test]
    fn debug_hides_secret_key() {
        let credentials = Credentials::new("AKIDEXAMPLE", "secretkeyexample").unwrap();
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("secretkeyexample"));
    }

    #[test]
    fn parses_key_file_lines() {
        let credentials =
            Credentials::parse_key_file("# keys\nsecret_id=AKID1\n  secret_key=abc \n").unwrap();
        assert_eq!(credentials.secret_id(), "AKID1");
        assert!(Credentials::parse_key_file("secret_id=AKID1\n").is_err());
        assert!(Credentials::parse_key_file("secret_id=\nsecret_key=k\n").is_err());
    }
}
