use crate::{
    common::types::{GuildId, UserId},
    voice::ConnectRequest,
};

/// Strips the `wss://` scheme and any trailing `:port` from a voice endpoint.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let host = endpoint.trim();
    let host = host.strip_prefix("wss://").unwrap_or(host);
    let host = host.trim_end_matches('/');

    match host.rsplit_once(':') {
        Some((name, port))
            if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name.to_string()
        }
        _ => host.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPart {
    pub token: String,
    pub endpoint: String,
}

/// Accumulates the two halves of a voice session: the session id and the
/// token plus endpoint. Both arrive independently and in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSessionCredentials {
    Incomplete {
        session_id: Option<String>,
        server: Option<ServerPart>,
    },
    Complete {
        session_id: String,
        token: String,
        endpoint: String,
    },
}

impl Default for VoiceSessionCredentials {
    fn default() -> Self {
        Self::Incomplete {
            session_id: None,
            server: None,
        }
    }
}

impl VoiceSessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Returns `true` when this update completes the credentials or changes
    /// an already complete set.
    pub fn apply_session_update(&mut self, new_session_id: String) -> bool {
        match self {
            Self::Complete { session_id, .. } => {
                let changed = *session_id != new_session_id;
                *session_id = new_session_id;
                changed
            },
            Self::Incomplete { session_id, .. } => {
                *session_id = Some(new_session_id);
                self.try_complete()
            },
        }
    }

    /// Same contract as [`Self::apply_session_update`]. `endpoint` is
    /// normalized before it is stored.
    pub fn apply_server_update(&mut self, new_token: String, new_endpoint: &str) -> bool {
        let new_endpoint = normalize_endpoint(new_endpoint);

        match self {
            Self::Complete {
                token, endpoint, ..
            } => {
                let changed = *token != new_token || *endpoint != new_endpoint;
                *token = new_token;
                *endpoint = new_endpoint;
                changed
            },
            Self::Incomplete { server, .. } => {
                *server = Some(ServerPart {
                    token: new_token,
                    endpoint: new_endpoint,
                });
                self.try_complete()
            },
        }
    }

    fn try_complete(&mut self) -> bool {
        let Self::Incomplete {
            session_id: Some(session_id),
            server: Some(server),
        } = self
        else {
            return false;
        };

        *self = Self::Complete {
            session_id: std::mem::take(session_id),
            token: std::mem::take(&mut server.token),
            endpoint: std::mem::take(&mut server.endpoint),
        };
        true
    }

    /// Builds the connect request once both halves are known.
    pub fn connect_request(&self, guild_id: &GuildId, user_id: &UserId) -> Option<ConnectRequest> {
        match self {
            Self::Complete {
                session_id,
                token,
                endpoint,
            } => Some(ConnectRequest {
                guild_id: guild_id.clone(),
                user_id: user_id.clone(),
                session_id: session_id.clone(),
                token: token.clone(),
                endpoint: endpoint.clone(),
            }),
            Self::Incomplete { .. } => None,
        }
    }
}
