use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;

use super::AppState;
use crate::session::{Flash, FlashLevel, Identity, SESSION_COOKIE};

/// Session id carried by the request cookie, if any
#[derive(Debug, Clone, Default)]
pub struct SessionId(pub Option<String>);

impl SessionId {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionId(read_cookie(&parts.headers, SESSION_COOKIE)))
    }
}

/// The logged-in identity; anonymous requests are sent to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: String,
    pub identity: Identity,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = read_cookie(&parts.headers, SESSION_COOKIE);

        if let Some(id) = session.as_deref() {
            if let Some(identity) = state.sessions.identity(id) {
                return Ok(CurrentUser {
                    session: id.to_string(),
                    identity,
                });
            }
        }

        let flash = Flash::new(FlashLevel::Error, state.messages.login_required);
        Err(redirect_with_flash(state, session.as_deref(), flash, "/login"))
    }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// Redirect carrying the session cookie
pub fn redirect_with_session(session: &str, to: &str) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, session_cookie(session))]),
        Redirect::to(to),
    )
        .into_response()
}

/// Queue a flash on the caller's session and redirect
pub fn redirect_with_flash(
    state: &AppState,
    session: Option<&str>,
    flash: Flash,
    to: &str,
) -> Response {
    let id = state.sessions.push_flash(session, flash);
    redirect_with_session(&id, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; classifieds_session=abc123; other=1"),
        );

        assert_eq!(
            read_cookie(&headers, SESSION_COOKIE).as_deref(),
            Some("abc123")
        );
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("classifieds_session="));

        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("classifieds_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }
}
