//! Shared types for hookrelay.
//!
//! - [`signature`]: HMAC and shared-token verification for inbound webhooks.
//! - [`objects`]: the canonical [`NotificationEvent`](objects::NotificationEvent)
//!   and its ordered field bag.
//! - [`config`]: validated runtime configuration shared by the core and the
//!   server crates.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod objects;
pub mod signature;
