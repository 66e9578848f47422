//! Persisted session tokens.
//!
//! The only durable client state is the access/refresh token pair, stored as a
//! small JSON document under the keys `accessToken` and `refreshToken`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::models::TokenPair;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl From<TokenPair> for Session {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Expiry of a JWT, read from its `exp` claim. The signature is not checked:
/// the client cannot verify it and only needs to know whether to bother
/// sending the token.
pub fn token_expiry(token: &str) -> Result<DateTime<Utc>, SessionError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<ExpiryClaim>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(|e| SessionError::InvalidToken(e.to_string()))?;

    DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
        .ok_or_else(|| SessionError::InvalidToken(format!("exp out of range: {}", data.claims.exp)))
}

pub fn is_token_expired(token: &str) -> Result<bool, SessionError> {
    Ok(token_expiry(token)? <= Utc::now())
}

/// File-backed store for the session tokens.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/opshub/session.json` (or the platform equivalent).
    pub fn default_location() -> Result<PathBuf, SessionError> {
        dirs::config_dir()
            .map(|dir| dir.join("opshub").join("session.json"))
            .ok_or(SessionError::NoConfigDir)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, SessionError> {
        match &config.session_file {
            Some(path) => Ok(Self::new(path.clone())),
            None => Ok(Self::new(Self::default_location()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored session, or `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::io(&self.path, e)),
        };
        let session = serde_json::from_str(&raw).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(session))
    }

    /// Stored session whose access token is still valid. An expired access
    /// token yields `None`; the file is kept while the refresh token can still
    /// renew it and removed otherwise.
    pub fn load_valid(&self) -> Result<Option<Session>, SessionError> {
        let Some(session) = self.load()? else {
            return Ok(None);
        };
        match is_token_expired(&session.access_token) {
            Ok(false) => return Ok(Some(session)),
            Ok(true) => tracing::info!("Stored access token has expired"),
            Err(e) => tracing::warn!(error = %e, "Stored access token is unreadable"),
        }
        if matches!(is_token_expired(&session.refresh_token), Ok(false)) {
            tracing::debug!("Keeping session for refresh");
        } else {
            tracing::info!("Refresh token is no longer usable, clearing session");
            self.clear()?;
        }
        Ok(None)
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }
        let body = serde_json::to_string_pretty(session).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, body).map_err(|e| SessionError::io(&self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| SessionError::io(&self.path, e))?;
        }

        tracing::debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    /// Remove both tokens. Succeeds when there is nothing to remove.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    fn token_with_exp(exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &json!({ "sub": "1", "exp": exp }),
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }

    fn session_expiring_in(secs: i64) -> Session {
        Session {
            access_token: token_with_exp(Utc::now().timestamp() + secs),
            refresh_token: token_with_exp(Utc::now().timestamp() + 7 * 24 * 3600),
        }
    }

    #[test]
    fn reads_expiry_without_knowing_the_secret() {
        let exp = Utc::now().timestamp() + 3600;
        let token = token_with_exp(exp);
        assert_eq!(token_expiry(&token).unwrap().timestamp(), exp);
        assert!(!is_token_expired(&token).unwrap());
        assert!(is_token_expired(&token_with_exp(exp - 7200)).unwrap());
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            token_expiry("not-a-jwt"),
            Err(SessionError::InvalidToken(_))
        ));
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().unwrap().is_none());

        let session = session_expiring_in(3600);
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session.clone()));

        let raw = fs::read_to_string(store.path()).unwrap();
        let keys: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(keys.get("accessToken").is_some());
        assert!(keys.get("refreshToken").is_some());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn expired_access_token_keeps_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        let session = session_expiring_in(-60);
        store.save(&session).unwrap();

        assert!(store.load_valid().unwrap().is_none());
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[test]
    fn fully_expired_session_is_cleared_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        store
            .save(&Session {
                access_token: token_with_exp(Utc::now().timestamp() - 60),
                refresh_token: "not-a-jwt".to_string(),
            })
            .unwrap();

        assert!(store.load_valid().unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = TokenStore::new(path);
        assert!(matches!(store.load(), Err(SessionError::Corrupt { .. })));
    }
}
