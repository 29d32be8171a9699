//! Fastly edge-cache integration for a content publishing pipeline.
//!
//! Two independent pipelines share one settings accessor:
//!
//! - **Purge on publish**: publish/unpublish batches are resolved to public
//!   URLs before the operation, then purged at the CDN once it completes.
//! - **Cache policy headers**: every rendered content response is stamped with
//!   `Surrogate-Control`/`Cache-Control` directives, or forced uncacheable.

pub mod application;
pub mod config;
pub mod domain;
pub mod fastly;
pub mod infra;
