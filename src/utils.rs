use axum::http::StatusCode;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server error: See Server Logs";

pub fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: Display,
{
    tracing::error!("{}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR_MESSAGE.into(),
    )
}

pub async fn with_timeout<F: Future>(
    duration_in_mills: u64,
    task: F,
) -> Result<<F as Future>::Output, (StatusCode, String)> {
    timeout(Duration::from_millis(duration_in_mills), task)
        .await
        .map_err(internal_error)
}
