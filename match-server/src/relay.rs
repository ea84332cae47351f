//! 走子转发
//!
//! 只按分组转发，不查房间表，也不检查走法、回合或内容格式。

use serde_json::Value;
use tracing::debug;

use protocol::{ConnectionId, ServerMessage};

use crate::outbox::Outbox;
use crate::server::ServerState;

impl ServerState {
    /// 把走法原样转发给分组内的其他连接，返回接收者数量
    pub fn relay_move(
        &self,
        outbox: &mut Outbox,
        conn: ConnectionId,
        room_id: &str,
        mv: Value,
    ) -> usize {
        let delivered = outbox.broadcast_except(&self.registry, room_id, conn, ServerMessage::Move(mv));
        debug!("连接 {} 在房间 {} 走棋，转发给 {} 个连接", conn, room_id, delivered);
        delivered
    }
}
