use std::time::Duration;

use swkit_core::{FetchError, Request, Response};
use tracing::debug;

use super::StrategyHandler;
use crate::error::StrategyError;

// The fetch is tracked by the handler, so a timeout stops waiting for it
// without cancelling it.
pub(super) async fn handle(
    handler: &StrategyHandler,
    request: Request,
    network_timeout: Option<Duration>,
) -> Result<Response, StrategyError> {
    let fetch = handler.spawn_tracked("network_only", {
        let handler = handler.clone();
        let request = request.clone();
        async move { handler.fetch(request).await }
    });

    let outcome = match network_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(url = %request.url(), ?timeout, "network request timed out");
                Err(FetchError::Timeout(timeout).into())
            }
        },
        None => fetch.await,
    };

    outcome.map_err(|error| StrategyError::no_response(request.url(), Some(error)))
}
