use std::collections::BTreeMap;

use axum::Router;
use axum::extract::State;
use axum::routing::get;

use super::AppState;
use crate::config::Target;
use crate::envelope::Envelope;
use crate::pool::PoolState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Report each target's pool state. Never opens a connection.
async fn health(State(state): State<AppState>) -> Envelope {
    let pools: BTreeMap<Target, PoolState> = state
        .pools
        .targets()
        .filter_map(|target| state.pools.state(target).map(|s| (target, s)))
        .collect();
    Envelope::success(serde_json::json!({ "pools": pools }))
}
