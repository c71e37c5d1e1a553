#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod events;
pub mod feed;
pub mod formatter;
pub mod http;
pub mod ingest;
pub mod normalizer;
pub mod processors;
pub mod utils;
