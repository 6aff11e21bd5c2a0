mod cache_store_memory;
mod connection_repo_memory;
mod notification_repo_memory;
mod user_repo_memory;

pub use cache_store_memory::*;
pub use connection_repo_memory::*;
pub use notification_repo_memory::*;
pub use user_repo_memory::*;
