//! Domain events and their in-process fan-out.

pub mod notification;
pub mod publisher;
pub mod types;

pub use notification::{notifications_for_event, NotificationObserver};
pub use publisher::{EventObserver, EventPublisher, PublishReport};
pub use types::{Event, EventType};
