use std::time::Duration;

use swkit_core::{Request, Response};
use tracing::debug;

use super::StrategyHandler;
use crate::error::StrategyError;

pub(super) async fn handle(
    handler: &StrategyHandler,
    request: Request,
    network_timeout: Option<Duration>,
) -> Result<Response, StrategyError> {
    let network = handler.spawn_tracked(
        "network_first",
        network_or_cache(handler.clone(), request.clone()),
    );

    let first = match network_timeout {
        Some(timeout) => {
            let timer = cache_after(handler, request.clone(), timeout);
            tokio::pin!(timer);
            tokio::select! {
                outcome = network.clone() => outcome?,
                outcome = &mut timer => {
                    debug!(url = %request.url(), ?timeout, "network is slow, trying the cache");
                    outcome?
                }
            }
        }
        None => network.clone().await?,
    };

    let response = match first {
        Some(response) => Some(response),
        None => network.await?,
    };
    response.ok_or_else(|| StrategyError::no_response(request.url(), None))
}

async fn network_or_cache(
    handler: StrategyHandler,
    request: Request,
) -> Result<Option<Response>, StrategyError> {
    match handler.fetch_and_cache_put(request.clone()).await {
        Ok(response) => Ok(Some(response)),
        Err(error) => {
            debug!(
                url = %request.url(),
                %error,
                "network request failed, falling back to the cache"
            );
            handler.cache_match(request).await
        }
    }
}

async fn cache_after(
    handler: &StrategyHandler,
    request: Request,
    timeout: Duration,
) -> Result<Option<Response>, StrategyError> {
    tokio::time::sleep(timeout).await;
    handler.cache_match(request).await
}
