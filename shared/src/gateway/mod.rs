//! Request builders and response decoders for the two remote collections.
//!
//! Builders hand back `crux_http` request builders for the app to send;
//! decoders turn response bodies into domain values.

pub mod catalog;
pub mod reviews;

use crux_http::ResponseAsync;
use serde::de::DeserializeOwned;

use crate::capabilities::{HttpResult, ValidatedUrl};
use crate::error::{AppError, AppResult, ErrorKind};

pub use catalog::{decode_detail, decode_page_index, fetch_details, join_details, page_request};
pub use reviews::{
    create_request, decode_list, delete_request, interpret_mutation, list_request,
    update_request, MutationOutcome,
};

/// Unwraps a transport result and turns non-2xx statuses into typed errors.
pub fn ensure_success(result: HttpResult) -> AppResult<Vec<u8>> {
    let mut response = result?;
    let status = response.status();
    let body = response.take_body().unwrap_or_default();
    if !status.is_success() {
        return Err(AppError::from_http_status(u16::from(status), Some(&body)));
    }
    Ok(body)
}

/// [`ensure_success`] for responses awaited inside a composed task.
pub async fn read_success(result: crux_http::Result<ResponseAsync>) -> AppResult<Vec<u8>> {
    let mut response = result?;
    let status = response.status();
    let body = response.body_bytes().await?;
    if !status.is_success() {
        return Err(AppError::from_http_status(u16::from(status), Some(&body)));
    }
    Ok(body)
}

fn json<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "response body is not the expected JSON")
            .with_internal(e.to_string())
    })
}

fn url(raw: &str) -> AppResult<ValidatedUrl> {
    Ok(ValidatedUrl::new(raw)?)
}
