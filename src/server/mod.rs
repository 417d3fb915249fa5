//! Protocol bindings - HTTP interactions and the notification stream

pub mod http;
mod websocket;

pub use http::{bind, router, serve};
pub use websocket::NotificationServer;
