use std::num::NonZeroU32;

use common::error::{AppError, Res};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, QuantaClock},
    state::keyed::DashMapStateStore,
};

type PhoneStateStore = DashMapStateStore<String>;

/// One token bucket per phone number, `max_per_hour` permits refilled evenly
/// over the hour.
struct PhoneBuckets {
    limiter: RateLimiter<String, PhoneStateStore, QuantaClock>,
    clock: QuantaClock,
}

impl PhoneBuckets {
    fn new(max_per_hour: u32, setting: &str) -> Res<Self> {
        let permits = NonZeroU32::new(max_per_hour)
            .ok_or_else(|| AppError::Internal(format!("{} must be positive", setting)))?;
        Ok(Self {
            limiter: RateLimiter::keyed(Quota::per_hour(permits)),
            clock: QuantaClock::default(),
        })
    }

    fn check(&self, phone_number: &str, action: &str) -> Res<()> {
        self.limiter
            .check_key(&phone_number.to_string())
            .map_err(|not_until| {
                let wait = not_until.wait_time_from(self.clock.now());
                log::warn!("{} throttled for {}", action, phone_number);
                AppError::TooManyRequests(format!(
                    "Too many {}, try again in {} seconds",
                    action,
                    wait.as_secs().max(1)
                ))
            })
    }

    fn shrink(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    fn len(&self) -> usize {
        self.limiter.len()
    }
}

/// Guards verification code issuance per phone number.
pub struct PhoneLimiter(PhoneBuckets);

impl PhoneLimiter {
    pub fn new(max_per_hour: u32) -> Res<Self> {
        PhoneBuckets::new(max_per_hour, "OTP_MAX_SENDS_PER_HOUR").map(Self)
    }

    /// Takes one permit for `phone_number` or fails with `TooManyRequests`.
    pub fn check(&self, phone_number: &str) -> Res<()> {
        self.0.check(phone_number, "verification codes requested")
    }

    /// Drops buckets that are full again so idle numbers do not pile up.
    pub fn shrink(&self) {
        self.0.shrink();
    }

    pub fn tracked_numbers(&self) -> usize {
        self.0.len()
    }
}

/// Budget of code submissions per phone number. Every submission takes a
/// permit, right or wrong, so a code cannot be guessed within its lifetime.
pub struct AttemptLimiter(PhoneBuckets);

impl AttemptLimiter {
    pub fn new(max_per_hour: u32) -> Res<Self> {
        PhoneBuckets::new(max_per_hour, "OTP_MAX_VERIFY_ATTEMPTS_PER_HOUR").map(Self)
    }

    pub fn check(&self, phone_number: &str) -> Res<()> {
        self.0.check(phone_number, "verification attempts")
    }

    pub fn shrink(&self) {
        self.0.shrink();
    }

    pub fn tracked_numbers(&self) -> usize {
        self.0.len()
    }
}
