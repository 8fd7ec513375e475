use swkit_core::{Request, Response};
use tracing::debug;

use super::StrategyHandler;
use crate::error::StrategyError;

pub(super) async fn handle(
    handler: &StrategyHandler,
    request: Request,
) -> Result<Response, StrategyError> {
    if let Some(response) = handler.cache_match(request.clone()).await? {
        return Ok(response);
    }

    debug!(url = %request.url(), "cache miss, falling back to the network");
    handler
        .fetch_and_cache_put(request.clone())
        .await
        .map_err(|error| StrategyError::no_response(request.url(), Some(error)))
}
