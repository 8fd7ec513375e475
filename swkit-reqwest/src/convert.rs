//! Conversions between swkit messages and reqwest types.

use http::HeaderMap;
use http::header::{AUTHORIZATION, CACHE_CONTROL, COOKIE, HeaderValue, PRAGMA};
use swkit_core::{CacheMode, Credentials, FetchError, FetchOptions, Request, Response};

/// Converts a swkit request into a reqwest request, applying `options`.
pub(crate) fn to_reqwest(
    request: Request,
    options: Option<&FetchOptions>,
) -> Result<reqwest::Request, FetchError> {
    let mut http_request = request.into_http();
    if let Some(options) = options {
        apply_options(http_request.headers_mut(), options);
    }
    reqwest::Request::try_from(http_request)
        .map_err(|error: reqwest::Error| FetchError::InvalidRequest(error.to_string()))
}

fn apply_options(headers: &mut HeaderMap, options: &FetchOptions) {
    for (name, value) in &options.headers {
        headers.append(name.clone(), value.clone());
    }

    match options.cache {
        CacheMode::Default => {}
        CacheMode::NoStore => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        CacheMode::NoCache | CacheMode::Reload => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
    }

    if options.credentials == Credentials::Omit {
        headers.remove(COOKIE);
        headers.remove(AUTHORIZATION);
    }
}

/// Buffers a reqwest response into a swkit response.
pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Response, FetchError> {
    let status = response.status();
    let headers = response.headers().clone();
    let url = response.url().as_str().parse::<http::Uri>().ok();
    let body = response.bytes().await.map_err(FetchError::network)?;

    let mut http_response = http::Response::new(body);
    *http_response.status_mut() = status;
    *http_response.headers_mut() = headers;

    let converted = Response::from(http_response);
    Ok(match url {
        Some(url) => converted.with_url(url),
        None => converted,
    })
}
