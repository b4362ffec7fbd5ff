//! Sending a request and turning non-success responses into errors.
//!
//! Only 200, 201, 202 and 204 count as success. Anything else becomes
//! [`ClientError::ApiError`] carrying the status, URL and response body.

use reqwest::{RequestBuilder, Response};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::redaction::redact_body;

/// Statuses treated as success.
pub const SUCCESS_STATUSES: [u16; 4] = [200, 201, 202, 204];

pub fn is_success_status(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Send `builder` and check the response status.
///
/// # Errors
///
/// Transport failures propagate as [`ClientError::HttpError`]; non-success
/// statuses as [`ClientError::ApiError`].
pub async fn send_checked(builder: RequestBuilder) -> Result<Response> {
    let response = builder.send().await?;
    check_response(response).await
}

/// Pass through a success response or convert it into an error.
pub async fn check_response(response: Response) -> Result<Response> {
    let status = response.status().as_u16();
    if is_success_status(status) {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response body".to_string());
    debug!(status, %url, body = %redact_body(&body), "Request failed");

    Err(ClientError::ApiError {
        status,
        url,
        message: error_message(&body),
    })
}

/// Prefer the appliance's `Message` field when the body is a JSON error object.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("Message")
                .or_else(|| value.get("error_description"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
