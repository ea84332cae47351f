//! 对局匹配共享协议库
//!
//! 包含:
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 房间与玩家的线上视图 (RoomRecord, Player)
//! - 传输层抽象 (Connection, Listener traits)
//! - 帧编解码 (FrameReader, FrameWriter)

mod constants;
mod error;
mod message;
mod transport;

pub use constants::*;
pub use error::{ProtocolError, Result};
pub use message::{
    ClientMessage, ServerMessage, ErrorCode, RoomRecord, Player, ConnectionId, RoomId,
};
pub use transport::{
    Connection, Listener,
    TcpConnection, TcpListener,
    FrameReader, FrameWriter,
};
