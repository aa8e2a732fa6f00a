//! Request admission controls applied before dispatch

pub mod rate_limit;

pub use rate_limit::RateLimiter;
