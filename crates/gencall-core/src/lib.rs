pub mod config;
pub mod logging;

pub mod client;
pub mod dispatch;
pub mod observe;
pub mod queue;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::Client;
pub use request::{Request, Response};
pub use retry::{CallError, ErrorKind};
