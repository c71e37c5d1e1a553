pub mod event;
pub mod fields;

pub use event::{NotificationEvent, SourcePlatform, UNKNOWN_KIND};
pub use fields::{FieldValue, Fields};
