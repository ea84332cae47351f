//! 断线处理

use tracing::info;

use protocol::{ConnectionId, ServerMessage, ROOM_CAPACITY};

use crate::outbox::Outbox;
use crate::server::ServerState;

impl ServerState {
    /// 处理连接断开
    ///
    /// - 房间只有断线者一人：直接删除，不发通知
    /// - 双人房间：通知其他连接，成员记录保留，房间进入 `HalfOpen`
    /// - 双人房间里最后一个在线成员也断线：删除房间
    ///
    /// 最后注销连接，分组成员关系随之清除。
    pub fn handle_disconnect(&mut self, outbox: &mut Outbox, conn: ConnectionId) {
        info!("连接 {} 断开", conn);

        for room_id in self.rooms.rooms_of(conn) {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };

            if room.player_count() < ROOM_CAPACITY {
                self.rooms.remove(&room_id);
                info!("房间 {} 仅剩断线者，已删除", room_id);
                continue;
            }

            room.mark_disconnected(conn);
            if !room.has_connected_players() {
                self.rooms.remove(&room_id);
                info!("房间 {} 成员均已断线，已删除", room_id);
                continue;
            }

            if let Some(player) = room.get_player(conn).cloned() {
                outbox.broadcast_except(
                    &self.registry,
                    &room_id,
                    conn,
                    ServerMessage::PlayerDisconnected(player),
                );
            }
        }

        self.registry.unregister(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoinError;
    use crate::room::RoomState;
    use crate::server::testing::{connect, drain};
    use protocol::Player;

    #[test]
    fn test_sole_player_disconnect_deletes_room() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, Some("alice"));
        let (b, _rx_b) = connect(&mut state, Some("bob"));
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();

        state.handle_disconnect(&mut outbox, a);

        assert!(outbox.is_empty());
        assert!(state.rooms.get(&room_id).is_none());
        assert!(!state.registry.is_connected(a));
        assert_eq!(state.join_room(&mut outbox, b, &room_id), Err(JoinError::RoomEmpty));
    }

    #[tokio::test]
    async fn test_disconnect_notifies_opponent() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, Some("alice"));
        let (b, mut rx_b) = connect(&mut state, Some("bob"));
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();
        let before = state.join_room(&mut outbox, b, &room_id).unwrap();

        let mut outbox = Outbox::new();
        state.handle_disconnect(&mut outbox, a);
        outbox.flush().await;

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::PlayerDisconnected(Player {
                id: a,
                username: Some("alice".to_string()),
            })]
        );

        // 记录保留原有两名成员
        let room = state.rooms.get(&room_id).unwrap();
        assert_eq!(room.record(), before);
        assert_eq!(room.state(), RoomState::HalfOpen);
        assert_eq!(state.registry.group_members(&room_id), vec![b]);

        // 半开房间仍然不可加入
        let (c, _rx_c) = connect(&mut state, Some("carol"));
        let mut outbox = Outbox::new();
        assert_eq!(state.join_room(&mut outbox, c, &room_id), Err(JoinError::RoomFull));
    }

    #[tokio::test]
    async fn test_last_connected_player_disconnect_deletes_room() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, Some("alice"));
        let (b, _rx_b) = connect(&mut state, Some("bob"));
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();
        state.join_room(&mut outbox, b, &room_id).unwrap();

        state.handle_disconnect(&mut outbox, a);
        let mut outbox = Outbox::new();
        state.handle_disconnect(&mut outbox, b);

        assert!(outbox.is_empty());
        assert!(state.rooms.get(&room_id).is_none());
        assert_eq!(state.registry.count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_only_touches_own_rooms() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, Some("alice"));
        let (b, mut rx_b) = connect(&mut state, Some("bob"));
        let (c, _rx_c) = connect(&mut state, Some("carol"));
        let mine = state.create_room(a);
        let other = state.create_room(c);
        let mut outbox = Outbox::new();
        state.join_room(&mut outbox, b, &other).unwrap();

        let mut outbox = Outbox::new();
        state.handle_disconnect(&mut outbox, a);
        outbox.flush().await;

        assert!(state.rooms.get(&mine).is_none());
        assert_eq!(state.rooms.get(&other).unwrap().state(), RoomState::Active);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_disconnect_without_rooms() {
        let mut state = ServerState::new();
        let (a, _rx) = connect(&mut state, None);
        let mut outbox = Outbox::new();

        state.handle_disconnect(&mut outbox, a);

        assert!(outbox.is_empty());
        assert_eq!(state.registry.count(), 0);
    }
}
