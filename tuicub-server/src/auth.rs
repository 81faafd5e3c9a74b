//! Bearer-token authentication for users and the two internal channels.

use crate::config::sha256;
use crate::store::Session;
use rand::RngCore;
use tuicub::error::Error;
use tuicub::user::User;

/// Authorizes user requests against the store and internal requests against
/// the preconfigured shared secrets. Secrets are SHA-256 hex digests; the
/// plain values never reach this type.
#[derive(Debug, Clone)]
pub struct AuthService {
    events_secret: String,
    messages_secret: String,
}

impl AuthService {
    pub fn new(events_secret: String, messages_secret: String) -> Self {
        Self {
            events_secret,
            messages_secret,
        }
    }

    /// Authorizes a user request from its `Authorization` header value.
    pub fn authorize(
        &self,
        session: &Session,
        authorization: Option<&str>,
    ) -> Result<User, Error> {
        let token = parse_token(authorization).ok_or(Error::Unauthorized)?;
        session.get_user_by_token(&token)
    }

    /// Authorizes a disconnect callback from the events server.
    pub fn authorize_events_server(&self, authorization: Option<&str>) -> Result<(), Error> {
        match parse_token(authorization) {
            Some(token) if constant_time_eq(&token, &self.events_secret) => Ok(()),
            _ => Err(Error::Unauthorized),
        }
    }

    /// Authorizes a message-bus frame by its envelope token.
    pub fn authorize_message(&self, secret: &str) -> Result<(), Error> {
        if !constant_time_eq(secret, &self.messages_secret) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// Generates a fresh opaque user token: the SHA-256 hex digest of 16
    /// random bytes.
    pub fn generate_token(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
        sha256(&hex)
    }
}

/// Extracts the token from a `Bearer` authorization header value.
///
/// Only the character class `[A-Za-z0-9._=-]` is accepted in tokens; any
/// other shape yields `None`.
pub fn parse_token(authorization: Option<&str>) -> Option<String> {
    let value = authorization?.trim();
    let (prefix, token) = value.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    let valid = !token.is_empty()
        && token.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'=')
        });
    valid.then(|| token.to_string())
}

/// Equality that does not short-circuit on the first differing byte.
fn constant_time_eq(lhs: &str, rhs: &str) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    lhs.bytes()
        .zip(rhs.bytes())
        .fold(0u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use pretty_assertions::assert_eq;
    use tuicub::user::UserToken;

    fn sut() -> AuthService {
        AuthService::new(sha256("events"), sha256("messages"))
    }

    #[test]
    fn parses_well_formed_bearer_headers() {
        assert_eq!(
            Some("abc-123._=".to_string()),
            parse_token(Some("Bearer abc-123._="))
        );
        assert_eq!(Some("abc".to_string()), parse_token(Some("bearer abc")));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(None, parse_token(None));
        assert_eq!(None, parse_token(Some("")));
        assert_eq!(None, parse_token(Some("Bearer")));
        assert_eq!(None, parse_token(Some("Basic abc")));
        assert_eq!(None, parse_token(Some("Bearer to ken")));
        assert_eq!(None, parse_token(Some("Bearer tok~en")));
    }

    #[tokio::test]
    async fn authorize_resolves_the_token_to_a_user() {
        let store = Store::temporary();
        let user = User::new("Alice");
        let token = UserToken::new(user.id, sut().generate_token());

        let mut session = store.session();
        session.save_user(&user).unwrap();
        session.save_user_token(&token).unwrap();
        session.commit().unwrap();

        let session = store.session();
        let header = format!("Bearer {}", token.token);
        let authorized = sut().authorize(&session, Some(&header)).unwrap();

        assert_eq!(user.id, authorized.id);
    }

    #[tokio::test]
    async fn authorize_fails_without_a_header() {
        let store = Store::temporary();
        let session = store.session();

        assert_eq!(
            Err(Error::Unauthorized),
            sut().authorize(&session, None).map(|_| ())
        );
    }

    #[test]
    fn events_server_secret_is_checked() {
        let service = sut();
        let header = format!("Bearer {}", sha256("events"));

        assert!(service.authorize_events_server(Some(&header)).is_ok());
        assert_eq!(
            Err(Error::Unauthorized),
            service.authorize_events_server(Some("Bearer wrong"))
        );
        assert_eq!(Err(Error::Unauthorized), service.authorize_events_server(None));
    }

    #[test]
    fn message_secret_is_checked() {
        let service = sut();

        assert!(service.authorize_message(&sha256("messages")).is_ok());
        assert_eq!(
            Err(Error::Unauthorized),
            service.authorize_message("nope")
        );
    }

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = sut().generate_token();

        assert_eq!(64, token.len());
        assert!(token.bytes().all(|byte| byte.is_ascii_hexdigit()));
    }
}
