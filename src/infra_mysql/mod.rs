mod connection_repo_mysql;
mod notification_repo_mysql;
mod user_repo_mysql;
mod util;

pub use connection_repo_mysql::*;
pub use notification_repo_mysql::*;
pub use user_repo_mysql::*;
pub use util::*;
