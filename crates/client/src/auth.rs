//! Session credentials and the thread-safe session store.
//!
//! Responsibilities:
//! - Hold the identity provider token, the appliance session token, issuance
//!   time, validity and the credential material needed to log in again.
//! - Answer expiry questions (`expires_at`, `is_expired`, `remaining`).
//!
//! Does NOT handle:
//! - Performing logins (see `client::session`).
//! - Scheduling renewals (see `client::refresh`).
//!
//! Invariants:
//! - Every accessor takes the lock once and returns owned data, so a reader
//!   never sees fields from two different writes.
//! - A login replaces the whole [`SessionState`]; nothing patches a live session.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use tokio::time::Instant;

/// How the current session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Password,
    Certificate,
    Interactive,
    /// Imported from an exported session token.
    AccessToken,
}

impl Modality {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Modality::Password => "password",
            Modality::Certificate => "certificate",
            Modality::Interactive => "interactive",
            Modality::AccessToken => "token",
        }
    }

    /// Whether a session of this modality can be renewed without the user.
    pub const fn is_renewable(&self) -> bool {
        matches!(self, Modality::Password | Modality::Certificate)
    }
}

/// Credential material kept for silent re-authentication.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password {
        username: String,
        password: SecretString,
        provider: String,
    },
    Certificate {
        path: PathBuf,
        password: Option<SecretString>,
        provider: String,
    },
    Interactive,
    AccessToken,
}

impl Credentials {
    pub fn modality(&self) -> Modality {
        match self {
            Credentials::Password { .. } => Modality::Password,
            Credentials::Certificate { .. } => Modality::Certificate,
            Credentials::Interactive => Modality::Interactive,
            Credentials::AccessToken => Modality::AccessToken,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Issued {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Issued {
    fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// A complete session, replaced wholesale on every login or renewal.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    token: Option<SecretString>,
    session_token: Option<SecretString>,
    issued: Option<Issued>,
    valid_for: Duration,
    credentials: Option<Credentials>,
}

impl SessionState {
    /// A freshly issued session.
    pub fn issued_now(
        token: Option<SecretString>,
        session_token: SecretString,
        valid_for: Duration,
        credentials: Credentials,
    ) -> Self {
        Self {
            token,
            session_token: Some(session_token),
            issued: Some(Issued::now()),
            valid_for,
            credentials: Some(credentials),
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn modality(&self) -> Option<Modality> {
        self.credentials.as_ref().map(Credentials::modality)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued.map(|issued| issued.wall)
    }

    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }

    /// `issued_at + valid_for`, or `None` before the first login.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let issued = self.issued?;
        let valid_for = TimeDelta::from_std(self.valid_for).unwrap_or(TimeDelta::MAX);
        issued.wall.checked_add_signed(valid_for)
    }

    /// True before the first login or once the validity has elapsed.
    pub fn is_expired(&self) -> bool {
        match self.issued {
            None => true,
            Some(issued) => issued.at.elapsed() > self.valid_for,
        }
    }

    /// Time left until expiry; zero before the first login, negative once expired.
    pub fn remaining(&self) -> TimeDelta {
        let Some(issued) = self.issued else {
            return TimeDelta::zero();
        };
        let elapsed = issued.at.elapsed();
        let to_delta = |d: Duration| TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX);
        if elapsed <= self.valid_for {
            to_delta(self.valid_for - elapsed)
        } else {
            -to_delta(elapsed - self.valid_for)
        }
    }
}

/// Thread-safe holder for the current [`SessionState`].
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Consistent copy of the whole session.
    pub fn snapshot(&self) -> SessionState {
        self.read(SessionState::clone)
    }

    /// Replace the whole session in one write.
    pub fn replace(&self, state: SessionState) {
        self.update(|current| *current = state);
    }

    /// Forget everything, including credential material.
    pub fn clear(&self) {
        self.replace(SessionState::default());
    }

    /// Raw identity provider token.
    pub fn token(&self) -> Option<SecretString> {
        self.read(|s| s.token.clone())
    }

    pub fn set_token(&self, token: Option<SecretString>) {
        self.update(|s| s.token = token);
    }

    /// Appliance session token sent as the bearer credential.
    pub fn session_token(&self) -> Option<SecretString> {
        self.read(|s| s.session_token.clone())
    }

    /// Store a session token and restart the validity clock.
    pub fn set_session_token(&self, token: SecretString, valid_for: Duration) {
        self.update(|s| {
            s.session_token = Some(token);
            s.issued = Some(Issued::now());
            s.valid_for = valid_for;
        });
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read(|s| s.credentials.clone())
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.update(|s| s.credentials = Some(credentials));
    }

    pub fn modality(&self) -> Option<Modality> {
        self.read(SessionState::modality)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read(SessionState::expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.read(SessionState::is_expired)
    }

    pub fn remaining(&self) -> TimeDelta {
        self.read(SessionState::remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_string().into())
    }

    #[test]
    fn test_empty_store_is_expired() {
        let store = SessionStore::new();
        assert!(store.is_expired());
        assert_eq!(store.remaining(), TimeDelta::zero());
        assert!(store.expires_at().is_none());
        assert!(store.session_token().is_none());
    }

    #[test]
    fn test_expires_at_is_issued_plus_validity() {
        let store = SessionStore::new();
        store.set_session_token(secret("tok"), Duration::from_secs(3600));

        let snapshot = store.snapshot();
        let issued = snapshot.issued_at().unwrap();
        assert_eq!(
            snapshot.expires_at().unwrap(),
            issued + TimeDelta::seconds(3600)
        );
        assert!(!snapshot.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_and_goes_negative() {
        let store = SessionStore::new();
        store.set_session_token(secret("tok"), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        let remaining = store.remaining();
        assert!(remaining > TimeDelta::zero());
        assert!(remaining < TimeDelta::seconds(10));

        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(store.is_expired());
        assert!(store.remaining() < TimeDelta::zero());
    }

    #[test]
    fn test_replace_is_wholesale() {
        let store = SessionStore::new();
        store.replace(SessionState::issued_now(
            Some(secret("raw-1")),
            secret("session-1"),
            Duration::from_secs(60),
            Credentials::Interactive,
        ));
        store.replace(SessionState::issued_now(
            None,
            secret("session-2"),
            Duration::from_secs(120),
            Credentials::AccessToken,
        ));

        let snapshot = store.snapshot();
        assert!(snapshot.token().is_none());
        assert_eq!(snapshot.session_token().unwrap().expose_secret(), "session-2");
        assert_eq!(snapshot.valid_for(), Duration::from_secs(120));
        assert_eq!(snapshot.modality(), Some(Modality::AccessToken));
    }

    #[test]
    fn test_clear_forgets_credentials() {
        let store = SessionStore::new();
        store.set_credentials(Credentials::Password {
            username: "admin".to_string(),
            password: secret("pw"),
            provider: "local".to_string(),
        });
        store.set_session_token(secret("tok"), Duration::from_secs(60));
        store.clear();
        assert!(store.credentials().is_none());
        assert!(store.is_expired());
    }

    #[test]
    fn test_renewable_modalities() {
        assert!(Modality::Password.is_renewable());
        assert!(Modality::Certificate.is_renewable());
        assert!(!Modality::Interactive.is_renewable());
        assert!(!Modality::AccessToken.is_renewable());
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let password = "secret-password-45678";
        let credentials = Credentials::Password {
            username: "admin".to_string(),
            password: secret(password),
            provider: "local".to_string(),
        };
        let debug_output = format!("{:?}", credentials);
        assert!(!debug_output.contains(password));
        assert!(debug_output.contains("admin"));
    }

    #[test]
    fn test_session_token_not_exposed_in_debug() {
        let store = SessionStore::new();
        store.set_session_token(secret("session-token-abcdef"), Duration::from_secs(60));
        let debug_output = format!("{:?}", store);
        assert!(!debug_output.contains("session-token-abcdef"));
    }
}
