use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::common::types::UserId;

/// Close code for a handshake missing a required header.
pub const CLOSE_MISSING_HEADER: u16 = 4000;
/// Close code for a wrong password.
pub const CLOSE_AUTH_FAILED: u16 = 4001;

/// Who is on the other end of a control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub user_id: UserId,
    /// `"<user agent> (<remote address>)"`, used as log prefix.
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing \"{0}\" header.")]
    MissingHeader(&'static str),
    #[error("Authorization failed.")]
    Failed,
}

impl AuthError {
    pub fn close_code(&self) -> u16 {
        match self {
            Self::MissingHeader(_) => CLOSE_MISSING_HEADER,
            Self::Failed => CLOSE_AUTH_FAILED,
        }
    }

    /// Reason sent in the close frame.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingHeader(name))
}

/// Validates the handshake headers in order: `User-Agent`, `User-Id`,
/// `Authorization`.
pub fn authenticate(
    headers: &HeaderMap,
    remote: SocketAddr,
    password: &str,
) -> Result<Identity, AuthError> {
    let user_agent = header(headers, "User-Agent")?;
    let client_name = format!("{} ({})", user_agent, remote);
    let user_id = header(headers, "User-Id")?;
    let authorization = header(headers, "Authorization")?;

    if authorization != password {
        return Err(AuthError::Failed);
    }

    Ok(Identity {
        user_agent: user_agent.to_string(),
        user_id: UserId::from(user_id.to_string()),
        client_name,
    })
}
