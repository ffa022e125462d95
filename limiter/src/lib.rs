use std::num::NonZeroU32;

use common::error::{AppError, Res};
use middleware::global::GlobalLimiter;

pub mod middleware {
    pub mod global;
}
pub mod phone;

pub use phone::{AttemptLimiter, PhoneLimiter};

/// Limits every incoming request, regardless of who sends it.
pub fn global_middleware(permits_per_second: u32) -> Res<GlobalLimiter> {
    let permits = NonZeroU32::new(permits_per_second).ok_or_else(|| {
        AppError::Internal("GLOBAL_RATE_LIMIT_PER_SECOND must be positive".to_string())
    })?;
    Ok(GlobalLimiter::new(permits))
}
