pub mod extractors;
pub mod webhooks;
