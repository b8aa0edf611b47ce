//! High-level application primitives.
//!
//! This crate provides the primitives an embedding application needs before handing captured traffic and discovered
//! processes to the instrumentation core, such as initializing logging.
#![deny(missing_docs)]

#[cfg(feature = "logging")]
pub mod logging;

/// Common imports.
pub mod prelude {
    #[cfg(feature = "logging")]
    pub use super::logging::{fatal_and_exit, initialize_logging};
}
