// Cache module for API responses.
// Short-lived in-memory TTL cache plus the shared rate limit countdown.

pub mod rate_limit;
pub mod store;

pub use rate_limit::{DEFAULT_BACKOFF, RateLimit, RateLimitLatch};
pub use store::{CACHE_TTL, CacheEntry, RateLimitedCache};
