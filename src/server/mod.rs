mod notification_fanout;
mod port;
mod server;
mod session_hub;

pub use notification_fanout::*;
pub use port::*;
pub use server::*;
pub use session_hub::*;
