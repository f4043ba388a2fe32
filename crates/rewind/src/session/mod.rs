//! Client and server tick drivers. A session owns every per-object history
//! and hands the host's objects back by id each tick.

mod client;
mod report;
mod scene;
mod server;

pub use client::ClientSession;
pub use report::{SessionError, TickReport};
pub use scene::SceneHost;
pub use server::ServerSession;
