mod entity_cache;
mod notification_service_impl;
mod relationship_service_impl;

pub use entity_cache::*;
pub use notification_service_impl::*;
pub use relationship_service_impl::*;
