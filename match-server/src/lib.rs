//! 双人对局匹配与走子中继服务端
//!
//! 包含:
//! - 连接管理与广播分组
//! - 房间系统
//! - 房间生命周期（创建、加入、关闭）
//! - 走子转发
//! - 断线处理

pub mod config;
pub mod disconnect;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod outbox;
pub mod registry;
pub mod relay;
pub mod room;
pub mod server;

pub use config::ServerConfig;
pub use error::JoinError;
pub use network::{run, serve, SharedState};
pub use outbox::Outbox;
pub use registry::{ConnectionEntry, ConnectionRegistry};
pub use room::{Room, RoomState, RoomStore};
pub use server::{MessageHandler, ServerState};
