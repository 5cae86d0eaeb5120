//! Helper for running blocking service calls in async handlers.
//!
//! The storage layer is synchronous (rusqlite behind a mutex); every
//! handler hops through `spawn_blocking` so DB work never stalls the
//! async runtime.

use tokio::task::spawn_blocking;

use pipeline_service::ServiceError;

use crate::api_error::ApiError;

/// Runs a blocking closure and maps both join and service errors to
/// [`ApiError`].
///
/// # Example
/// ```ignore
/// let service = Arc::clone(&state.opportunities);
/// let opportunity = blocking(move || service.show(&scope, &id)).await?;
/// ```
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("Join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
        .map_err(ApiError::from)
}
