pub mod authorizations;
pub mod buckets;
pub mod client;
pub mod common;
pub mod error;
pub mod labels;
pub mod orgs;
pub mod tasks;
pub mod users;

pub use client::{Client, RetryConfig};
pub use common::{ApiQueryParams, PaginationParams};
pub use error::ApiError;

use std::future::Future;
use tfplug::Context;

/// Runs an API call until it completes or the request context is cancelled
pub async fn cancellable<T, F>(ctx: &Context, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if ctx.is_cancelled() {
        return Err(ApiError::Cancelled);
    }

    tokio::select! {
        result = call => result,
        _ = ctx.cancelled() => Err(ApiError::Cancelled),
    }
}
