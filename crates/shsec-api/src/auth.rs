// Account credentials, password hashing, and the in-memory session.
//
// The vendor login form expects the MD5 hex digest of the password plus a
// marker declaring it pre-hashed. MD5 is not a password KDF; it is kept
// because the server accepts nothing else.

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::models::deserialize_id;

/// Username and password for one SmartHomeSec account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The login form body for these credentials.
    pub(crate) fn login_form(&self) -> LoginForm<'_> {
        LoginForm {
            account: &self.username,
            password: hash_password(&self.password),
            pw_encrypted: "hashed",
            login_entry: "web",
        }
    }
}

/// Lower-case hex MD5 digest of the UTF-8 password.
pub fn hash_password(password: &SecretString) -> String {
    hex::encode(Md5::digest(password.expose_secret().as_bytes()))
}

/// Form-encoded body of `POST auth/login`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginForm<'a> {
    pub account: &'a str,
    pub password: String,
    pub pw_encrypted: &'static str,
    pub login_entry: &'static str,
}

/// Successful `auth/login` response: `{ "token": "...", "data": { "user_id": ... } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub data: LoginData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
}

/// Token and user id obtained from the last successful login.
///
/// Both are cleared when a request comes back unauthorized so the next
/// call logs in again.
#[derive(Debug, Default, Clone)]
pub struct Session {
    token: Option<SecretString>,
    user_id: Option<String>,
}

impl Session {
    pub(crate) fn establish(&mut self, token: String, user_id: String) {
        self.token = Some(SecretString::from(token));
        self.user_id = Some(user_id);
    }

    pub(crate) fn invalidate(&mut self) {
        self.token = None;
        self.user_id = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// `Cookie` header value the REST API expects alongside the `token` header.
    pub(crate) fn cookie_header(&self) -> Option<String> {
        let token = self.token.as_ref()?.expose_secret();
        let user_id = self.user_id.as_deref().unwrap_or_default();
        Some(format!(
            "isPrivacy=1; api_token={token}; id={user_id}; cookiePath=%2FByDemes%2F0%2F0%2F"
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_is_md5_hex() {
        let secret = SecretString::from("password".to_string());
        assert_eq!(hash_password(&secret), "5f4dcc3b5aa765d61d8327deb882cf99");
    }

    #[test]
    fn login_form_declares_prehashed_password() {
        let creds = Credentials::new("alice@example.com", SecretString::from("1234".to_string()));
        let form = creds.login_form();
        assert_eq!(form.account, "alice@example.com");
        assert_eq!(form.password, "81dc9bdb52d04dc20036dbd8313ed055");
        assert_eq!(form.pw_encrypted, "hashed");
        assert_eq!(form.login_entry, "web");
    }

    #[test]
    fn login_response_accepts_numeric_user_id() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"token":"tok","data":{"user_id":4711}}"#).unwrap();
        assert_eq!(resp.token, "tok");
        assert_eq!(resp.data.user_id, "4711");
    }

    #[test]
    fn login_response_without_user_id_is_rejected() {
        let resp = serde_json::from_str::<LoginResponse>(r#"{"token":"tok","data":{}}"#);
        assert!(resp.is_err());
    }

    #[test]
    fn invalidated_session_has_no_cookie() {
        let mut session = Session::default();
        session.establish("tok".into(), "7".into());
        assert_eq!(
            session.cookie_header().unwrap(),
            "isPrivacy=1; api_token=tok; id=7; cookiePath=%2FByDemes%2F0%2F0%2F"
        );

        session.invalidate();
        assert!(!session.is_authenticated());
        assert!(session.cookie_header().is_none());
    }
}
