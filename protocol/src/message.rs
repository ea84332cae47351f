//! 消息类型定义
//!
//! 所有消息都以 `{"event": ..., "data": ...}` 的形式编码为 JSON。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 连接 ID（由服务端在连接建立时分配）
pub type ConnectionId = u64;

/// 房间 ID（UUID v4 字符串）
pub type RoomId = String;

/// 房间内的玩家
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    /// 未发送过 `username` 的连接没有昵称
    pub username: Option<String>,
}

/// 房间信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: RoomId,
    /// 按加入顺序排列，第一个是房主
    pub players: Vec<Player>,
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// 设置昵称
    Username(String),
    /// 创建房间
    CreateRoom,
    /// 加入房间
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// 走棋（内容由客户端解释，服务端原样转发）
    Move {
        room: RoomId,
        #[serde(rename = "move")]
        mv: Value,
    },
    /// 关闭房间
    CloseRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// 心跳请求
    Ping,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // === 请求响应 ===
    /// 房间创建成功
    RoomCreated(RoomId),
    /// 加入房间成功
    RoomJoined(RoomRecord),
    /// 错误消息
    Error { code: ErrorCode, message: String },

    // === 房间事件 ===
    /// 对手加入
    OpponentJoined(RoomRecord),
    /// 对手走棋
    Move(Value),
    /// 玩家断线
    PlayerDisconnected(Player),
    /// 房间被关闭
    CloseRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    // === 心跳 ===
    /// 心跳响应
    Pong,
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ErrorCode {
    /// 房间为空（包括从未创建过的房间）
    RoomEmpty = 100,
    /// 房间已满
    RoomFull = 101,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::RoomEmpty => write!(f, "ROOM_EMPTY"),
            ErrorCode::RoomFull => write!(f, "ROOM_FULL"),
        }
    }
}
