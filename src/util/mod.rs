//! Utilities shared by the rest of the crate: logging, options and test support.

pub mod logger;
pub mod options;
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::options::Options;
