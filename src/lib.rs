#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod herdlock;
pub use herdlock::*;

mod cache;
pub use cache::*;

mod local;
pub use local::*;

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
mod redis;
#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
pub use redis::*;

mod lock;
pub use lock::*;

mod memo;
pub use memo::*;

mod ratelimit;
pub use ratelimit::*;

mod error;
pub use error::*;

mod common;
pub use common::SliceSeconds;

mod runtime;

#[cfg(test)]
mod tests;
