//! Ambient stack shared by every twinstore crate: the error taxonomy,
//! tracing bootstrap, data-source configuration structs, the id-generator
//! interface the core consumes, and small hashing/time utilities.

pub mod config;
pub mod err;
pub mod hash;
pub mod id;
pub mod log;
pub mod option_cache;
pub mod time_util;

pub use err::{CoreError, CoreResult};
pub use option_cache::{CacheKeyed, OptionCache};
