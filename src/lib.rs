#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod rate_limiter;
pub use rate_limiter::*;

pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod local;
pub use local::*;

mod error;
pub use error::*;

mod common;
pub use common::AllowResult;

#[cfg(test)]
mod tests;
