use axum::http::StatusCode;
use axum::response::Response;

use crate::net::error;

#[inline]
pub fn html_response(contents: String) -> error::Result<Response<String>> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/html; charset=utf-8")
        .header("content-length", contents.len())
        .body(contents)?)
}
