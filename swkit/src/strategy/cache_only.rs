use swkit_core::{Request, Response};

use super::StrategyHandler;
use crate::error::StrategyError;

pub(super) async fn handle(
    handler: &StrategyHandler,
    request: Request,
) -> Result<Response, StrategyError> {
    handler
        .cache_match(request.clone())
        .await?
        .ok_or_else(|| StrategyError::no_response(request.url(), None))
}
