use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use super::{ConnectRequest, TransportError, VoiceConnection, VoiceTransport};

/// Transport used when no audio backend is linked into the binary. Every
/// connect fails fatally, so players are torn down instead of retrying.
pub struct UnavailableTransport;

#[async_trait]
impl VoiceTransport for UnavailableTransport {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        error!(
            "[{}] Cannot connect to voice server '{}': no voice transport available",
            request.guild_id, request.endpoint
        );
        Err(TransportError::Fatal(
            "no voice transport available".to_string(),
        ))
    }
}
