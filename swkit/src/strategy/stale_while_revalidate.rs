use swkit_core::{Request, Response};
use tracing::debug;

use super::StrategyHandler;
use crate::error::StrategyError;

pub(super) async fn handle(
    handler: &StrategyHandler,
    request: Request,
) -> Result<Response, StrategyError> {
    let revalidation = handler.spawn_tracked("revalidate", {
        let handler = handler.clone();
        let request = request.clone();
        async move { handler.fetch_and_cache_put(request).await }
    });

    if let Some(response) = handler.cache_match(request.clone()).await? {
        debug!(url = %request.url(), "serving the cached response while revalidating");
        return Ok(response);
    }

    revalidation
        .await
        .map_err(|error| StrategyError::no_response(request.url(), Some(error)))
}
