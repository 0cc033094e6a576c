//! Resilience patterns for ideascore-runtime.
//!
//! This module provides:
//! - Ordered fallback across providers, with an optional overall deadline
//!
//! Providers themselves never retry; composition lives here and in the
//! [`Manager`](crate::manager::Manager).

mod fallback;

pub use fallback::{FallbackProvider, DEFAULT_FALLBACK_NAME};
