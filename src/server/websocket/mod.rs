mod connection;
mod handler;
mod messages;

pub use connection::ConnectionManager;
pub use handler::ws_handler;
pub use messages::{events, ServerMessage};
