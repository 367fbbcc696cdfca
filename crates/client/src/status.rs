//! Operator-facing descriptions of HTTP status codes.

use std::borrow::Cow;

/// Short description of `code` for log lines and status pages.
pub fn describe_status(code: u16) -> Cow<'static, str> {
    let text = match code {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        other => return Cow::Owned(format!("Network Error (Code: {other})")),
    };
    Cow::Borrowed(text)
}
