use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::convert::Infallible;

use super::domain::{Role, SessionUser};
use super::views::PageContext;
use crate::config::SessionConfig;

pub const SESSION_COOKIE_NAME: &str = "recruiting_session";

/// Signing material and cookie attributes shared by every request.
#[derive(Clone)]
pub struct SessionKeys {
    key: Key,
    secure: bool,
}

impl SessionKeys {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret, config.secure_cookie)
    }

    /// Derives the 64-byte signing key from a secret of any length.
    pub fn new(secret: &str, secure: bool) -> Self {
        let digest = Sha512::digest(secret.as_bytes());
        Self {
            key: Key::from(digest.as_slice()),
            secure,
        }
    }
}

/// State persisted in the signed session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<String>,
}

impl SessionData {
    fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_vec(self)
            .ok()
            .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
    }

    fn is_empty(&self) -> bool {
        self.user.is_none() && self.flashes.is_empty()
    }
}

/// Request-scoped view of the session; handlers mutate it and hand it back with the response.
pub struct Session {
    jar: SignedCookieJar,
    data: SessionData,
    secure: bool,
}

impl Session {
    pub fn from_jar(jar: SignedCookieJar, secure: bool) -> Self {
        let data = jar
            .get(SESSION_COOKIE_NAME)
            .and_then(|cookie| SessionData::decode(cookie.value()))
            .unwrap_or_default();
        Self { jar, data, secure }
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.user().map(|user| user.username.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.user().and_then(SessionUser::role)
    }

    pub fn flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push(message.into());
    }

    pub fn take_flashes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.data.flashes)
    }

    pub fn sign_in(&mut self, user: SessionUser) {
        self.data.user = Some(user);
    }

    pub fn clear(&mut self) {
        self.data = SessionData::default();
    }

    /// Writes the current state back into the jar, dropping the cookie once nothing is left.
    pub fn into_jar(self) -> SignedCookieJar {
        let Self { jar, data, secure } = self;
        match data.encode().filter(|_| !data.is_empty()) {
            Some(value) => jar.add(
                Cookie::build((SESSION_COOKIE_NAME, value))
                    .http_only(true)
                    .secure(secure)
                    .same_site(SameSite::Lax)
                    .path("/")
                    .build(),
            ),
            None => jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/").build()),
        }
    }

    pub fn redirect(self, location: &str) -> Response {
        (self.into_jar(), Redirect::to(location)).into_response()
    }

    pub fn flash_redirect(mut self, message: impl Into<String>, location: &str) -> Response {
        self.flash(message);
        self.redirect(location)
    }

    /// Renders a page, consuming pending flash messages.
    pub fn render<F>(mut self, page: F) -> Response
    where
        F: FnOnce(&PageContext) -> String,
    {
        let context = PageContext {
            flashes: self.take_flashes(),
            username: self.username().map(str::to_string),
            role: self.role(),
        };
        let body = page(&context);
        (self.into_jar(), Html(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: axum::extract::FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = <SessionKeys as axum::extract::FromRef<S>>::from_ref(state);
        let jar = SignedCookieJar::from_headers(&parts.headers, keys.key.clone());
        Ok(Session::from_jar(jar, keys.secure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn keys() -> SessionKeys {
        SessionKeys::new("unit-test-secret", false)
    }

    fn cookie_header(jar: SignedCookieJar) -> HeaderValue {
        let response = (jar, "ok").into_response();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie issued")
            .to_str()
            .expect("ascii cookie")
            .to_string();
        let pair = set_cookie.split(';').next().expect("name=value pair");
        HeaderValue::from_str(pair).expect("valid header")
    }

    #[test]
    fn signed_cookie_restores_user_and_flashes() {
        let keys = keys();
        let mut session = Session::from_jar(SignedCookieJar::new(keys.key.clone()), false);
        session.sign_in(SessionUser {
            id: Some(9),
            username: "lucia".to_string(),
            role: Some("reclutador".to_string()),
        });
        session.flash("Bienvenido lucia");

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie_header(session.into_jar()));

        let mut restored = Session::from_jar(
            SignedCookieJar::from_headers(&headers, keys.key.clone()),
            false,
        );
        assert_eq!(restored.username(), Some("lucia"));
        assert_eq!(restored.role(), Some(Role::Recruiter));
        assert_eq!(restored.take_flashes(), vec!["Bienvenido lucia".to_string()]);
    }

    #[test]
    fn cookie_signed_with_another_secret_is_ignored() {
        let mut session = Session::from_jar(SignedCookieJar::new(keys().key), false);
        session.sign_in(SessionUser {
            id: Some(1),
            username: "root".to_string(),
            role: Some("admin".to_string()),
        });

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie_header(session.into_jar()));

        let other = SessionKeys::new("another-secret", false);
        let restored = Session::from_jar(SignedCookieJar::from_headers(&headers, other.key), false);
        assert!(restored.user().is_none());
        assert_eq!(restored.data(), &SessionData::default());
    }
}
