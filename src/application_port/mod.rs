mod notification_dispatcher;
mod notification_service;
mod relationship_service;

pub use notification_dispatcher::*;
pub use notification_service::*;
pub use relationship_service::*;
