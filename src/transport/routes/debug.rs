use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    routeplanner::RotatorStatus,
    server::{AppState, ConnectionInfo},
};

#[derive(Debug, Serialize)]
pub struct DebugStats {
    pub connections: Vec<ConnectionInfo>,
    pub rotator: RotatorStatus,
}

/// GET /debug
pub async fn debug_stats(State(state): State<Arc<AppState>>) -> Json<DebugStats> {
    tracing::debug!("GET /debug");

    let mut connections: Vec<_> = state
        .connections
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    connections.sort_by_key(|info| info.connected_at);

    Json(DebugStats {
        connections,
        rotator: state.rotator.status(),
    })
}
