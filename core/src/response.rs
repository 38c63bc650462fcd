//! Classifies responses and maps failure statuses to `PostmarkError`.
//!
//! - 2xx: the body is decoded into a `DynamicRecord`. A blank body is an
//!   empty record; a body that is not UTF-8 JSON is `MalformedResponse`.
//! - 4xx / 5xx: `Client` / `Server`, with `ErrorCode` and `Message` taken
//!   from the body when it decodes as a JSON object.
//! - anything else: `UnexpectedStatus`.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{HttpFailure, PostmarkError};
use crate::http::HttpResponse;
use crate::record::DynamicRecord;

pub fn parse_response(response: HttpResponse) -> Result<DynamicRecord, PostmarkError> {
    let HttpResponse { status, body, .. } = response;
    debug!(status, "classifying response");

    if (200..=299).contains(&status) {
        return decode_success(status, &body);
    }
    let failure = map_failure(status, String::from_utf8_lossy(&body).into_owned());
    match status {
        400..=499 => Err(PostmarkError::Client(failure)),
        500..=599 => Err(PostmarkError::Server(failure)),
        _ => Err(PostmarkError::UnexpectedStatus(failure)),
    }
}

/// `from_slice` rejects invalid UTF-8, so a damaged body is never repaired
/// into a success record.
fn decode_success(status: u16, body: &[u8]) -> Result<DynamicRecord, PostmarkError> {
    if body.trim_ascii().is_empty() {
        return Ok(DynamicRecord::default());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(DynamicRecord::from_value(value)),
        Err(source) => Err(PostmarkError::MalformedResponse {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
            source,
        }),
    }
}

/// Build an `HttpFailure`, pulling the server's error code and message out of
/// a JSON object body. Key lookup goes through `DynamicRecord`, so
/// `ErrorCode`, `errorCode` and `error_code` are all recognised.
pub fn map_failure(status: u16, body: String) -> HttpFailure {
    let (error_code, message) = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => {
            let record = DynamicRecord::new(map);
            let code = record.get("ErrorCode").and_then(Value::as_i64);
            let message = record
                .get("Message")
                .and_then(Value::as_str)
                .map(str::to_string);
            (code, message)
        }
        _ => (None, None),
    };

    let failure = HttpFailure {
        status,
        error_code,
        message,
        body,
    };
    warn!(status, error_code = ?failure.error_code, "request failed: {}", failure);
    failure
}
