//! Request handlers shared by the HTTP routes and the WebSocket.

mod markers;
mod websocket;

pub use markers::*;
pub use websocket::*;
