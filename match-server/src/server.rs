//! 服务器主逻辑

use tokio::sync::mpsc;
use tracing::{debug, info};

use protocol::{ClientMessage, ConnectionId, ServerMessage};

use crate::outbox::Outbox;
use crate::registry::ConnectionRegistry;
use crate::room::RoomStore;

/// 服务器状态
///
/// 所有处理器都在同一把锁下运行到结束，房间表不会被观察到中间状态。
pub struct ServerState {
    pub registry: ConnectionRegistry,
    pub rooms: RoomStore,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomStore::new(),
        }
    }

    /// 未达上限时登记新连接，检查与登记不可分割
    pub fn admit(
        &mut self,
        sender: mpsc::Sender<ServerMessage>,
        max_connections: usize,
    ) -> Option<ConnectionId> {
        if self.registry.count() >= max_connections {
            return None;
        }
        Some(self.registry.register(sender))
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息，返回给请求方的响应
    pub fn handle(
        state: &mut ServerState,
        outbox: &mut Outbox,
        conn: ConnectionId,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Username(username) => {
                info!("连接 {} 设置昵称 {}", conn, username);
                state.registry.set_username(conn, username);
                None
            }
            ClientMessage::CreateRoom => {
                let room_id = state.create_room(conn);
                Some(ServerMessage::RoomCreated(room_id))
            }
            ClientMessage::JoinRoom { room_id } => {
                match state.join_room(outbox, conn, &room_id) {
                    Ok(record) => Some(ServerMessage::RoomJoined(record)),
                    Err(err) => Some(ServerMessage::Error {
                        code: err.code(),
                        message: err.to_string(),
                    }),
                }
            }
            ClientMessage::Move { room, mv } => {
                state.relay_move(outbox, conn, &room, mv);
                None
            }
            ClientMessage::CloseRoom { room_id } => {
                state.close_room(outbox, conn, &room_id);
                None
            }
            ClientMessage::Ping => {
                debug!("连接 {} ping", conn);
                Some(ServerMessage::Pong)
            }
        }
    }
}
