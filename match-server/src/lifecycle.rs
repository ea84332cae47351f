//! 房间生命周期：创建、加入、关闭

use chrono::Utc;
use tracing::{debug, info, warn};

use protocol::{ConnectionId, RoomId, RoomRecord, ServerMessage, ROOM_CAPACITY};

use crate::error::JoinError;
use crate::outbox::Outbox;
use crate::server::ServerState;

impl ServerState {
    /// 同一连接同时在多个房间中并不被禁止，只记录一条警告
    fn warn_if_already_seated(&self, conn: ConnectionId) {
        let rooms = self.rooms.rooms_of(conn);
        if !rooms.is_empty() {
            warn!("连接 {} 已在房间 {:?} 中", conn, rooms);
        }
    }

    /// 创建房间，房主为唯一成员
    pub fn create_room(&mut self, conn: ConnectionId) -> RoomId {
        self.warn_if_already_seated(conn);

        let creator = self.registry.player(conn);
        let room_id = self.rooms.create(creator);
        self.registry.join_group(conn, &room_id);

        info!("连接 {} 创建房间 {}", conn, room_id);
        room_id
    }

    /// 加入房间
    ///
    /// 不存在的房间按空房间处理，返回 [`JoinError::RoomEmpty`]，
    /// 并且不会被写入房间表。
    pub fn join_room(
        &mut self,
        outbox: &mut Outbox,
        conn: ConnectionId,
        room_id: &str,
    ) -> Result<RoomRecord, JoinError> {
        info!("连接 {} 加入房间 {}", conn, room_id);

        let player_count = match self.rooms.get(room_id) {
            Some(room) => room.player_count(),
            None => {
                debug!("房间 {} 不存在", room_id);
                0
            }
        };

        if player_count == 0 {
            return Err(JoinError::RoomEmpty);
        }
        if player_count >= ROOM_CAPACITY {
            return Err(JoinError::RoomFull);
        }

        self.warn_if_already_seated(conn);

        let player = self.registry.player(conn);
        let room = self.rooms.get_mut(room_id).ok_or(JoinError::RoomEmpty)?;
        if !room.add_player(player) {
            return Err(JoinError::RoomFull);
        }
        let record = room.record();
        self.registry.join_group(conn, room_id);

        // 通知房间内其他人有对手加入
        outbox.broadcast_except(
            &self.registry,
            room_id,
            conn,
            ServerMessage::OpponentJoined(record.clone()),
        );

        Ok(record)
    }

    /// 关闭房间
    ///
    /// 通知分组内其他连接后解散整个分组（包括不在成员列表中的连接），
    /// 再删除房间记录。房间不存在时只做广播，对空分组广播没有效果。
    pub fn close_room(&mut self, outbox: &mut Outbox, conn: ConnectionId, room_id: &str) {
        outbox.broadcast_except(
            &self.registry,
            room_id,
            conn,
            ServerMessage::CloseRoom {
                room_id: room_id.to_string(),
            },
        );

        let evicted = self.registry.clear_group(room_id);

        match self.rooms.remove(room_id) {
            Some(room) => {
                let lifetime = Utc::now() - room.created_at;
                info!(
                    "连接 {} 关闭房间 {} (状态 {:?}, 存在 {} 秒, 移出 {} 个连接)",
                    conn,
                    room_id,
                    room.state(),
                    lifetime.num_seconds(),
                    evicted.len()
                );
            }
            None => debug!("连接 {} 关闭不存在的房间 {}", conn, room_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::room::RoomState;
    use crate::server::testing::{connect, drain};
    use protocol::Player;

    fn alice_and_bob(
        state: &mut ServerState,
    ) -> (
        (ConnectionId, tokio::sync::mpsc::Receiver<ServerMessage>),
        (ConnectionId, tokio::sync::mpsc::Receiver<ServerMessage>),
    ) {
        (connect(state, Some("alice")), connect(state, Some("bob")))
    }

    #[test]
    fn test_create_room_ids_distinct() {
        let mut state = ServerState::new();
        let (a, _rx) = connect(&mut state, Some("alice"));

        let ids: HashSet<RoomId> = (0..100).map(|_| state.create_room(a)).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(state.rooms.count(), 100);
    }

    #[test]
    fn test_create_room_joins_group() {
        let mut state = ServerState::new();
        let (a, _rx) = connect(&mut state, Some("alice"));

        let room_id = state.create_room(a);

        assert_eq!(state.registry.group_members(&room_id), vec![a]);
        assert_eq!(state.rooms.get(&room_id).unwrap().state(), RoomState::Created);
    }

    #[test]
    fn test_join_missing_room() {
        let mut state = ServerState::new();
        let (b, _rx) = connect(&mut state, Some("bob"));
        let mut outbox = Outbox::new();

        let result = state.join_room(&mut outbox, b, "never-created");

        assert_eq!(result, Err(JoinError::RoomEmpty));
        assert!(state.rooms.get("never-created").is_none());
        assert!(state.registry.group_members("never-created").is_empty());
        assert!(outbox.is_empty());
    }

    #[tokio::test]
    async fn test_join_room() {
        let mut state = ServerState::new();
        let ((a, mut rx_a), (b, mut rx_b)) = alice_and_bob(&mut state);
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();

        let record = state.join_room(&mut outbox, b, &room_id).unwrap();
        outbox.flush().await;

        let expected = RoomRecord {
            room_id: room_id.clone(),
            players: vec![
                Player { id: a, username: Some("alice".to_string()) },
                Player { id: b, username: Some("bob".to_string()) },
            ],
        };
        assert_eq!(record, expected);
        assert_eq!(drain(&mut rx_a), vec![ServerMessage::OpponentJoined(expected)]);
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(state.rooms.get(&room_id).unwrap().state(), RoomState::Active);
        assert_eq!(state.registry.group_members(&room_id), vec![a, b]);
    }

    #[tokio::test]
    async fn test_join_full_room() {
        let mut state = ServerState::new();
        let ((a, mut rx_a), (b, _rx_b)) = alice_and_bob(&mut state);
        let (c, mut rx_c) = connect(&mut state, Some("carol"));
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();
        let before = state.join_room(&mut outbox, b, &room_id).unwrap();
        outbox.flush().await;
        drain(&mut rx_a);

        let mut outbox = Outbox::new();
        let result = state.join_room(&mut outbox, c, &room_id);
        outbox.flush().await;

        assert_eq!(result, Err(JoinError::RoomFull));
        assert_eq!(state.rooms.get(&room_id).unwrap().record(), before);
        assert_eq!(state.registry.group_members(&room_id), vec![a, b]);
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_c).is_empty());
    }

    #[test]
    fn test_join_without_username() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, None);
        let (b, _rx_b) = connect(&mut state, None);
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();

        let record = state.join_room(&mut outbox, b, &room_id).unwrap();

        assert!(record.players.iter().all(|p| p.username.is_none()));
    }

    #[tokio::test]
    async fn test_close_room() {
        let mut state = ServerState::new();
        let ((a, mut rx_a), (b, mut rx_b)) = alice_and_bob(&mut state);
        let room_id = state.create_room(a);
        let mut outbox = Outbox::new();
        state.join_room(&mut outbox, b, &room_id).unwrap();
        outbox.flush().await;
        drain(&mut rx_a);

        let mut outbox = Outbox::new();
        state.close_room(&mut outbox, a, &room_id);
        outbox.flush().await;

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::CloseRoom { room_id: room_id.clone() }]
        );
        assert!(drain(&mut rx_a).is_empty());
        assert!(state.rooms.get(&room_id).is_none());
        assert!(state.registry.group_members(&room_id).is_empty());

        // 关闭后再加入视为空房间
        let mut outbox = Outbox::new();
        assert_eq!(state.join_room(&mut outbox, b, &room_id), Err(JoinError::RoomEmpty));
    }

    #[tokio::test]
    async fn test_close_room_evicts_non_members() {
        let mut state = ServerState::new();
        let (a, _rx_a) = connect(&mut state, Some("alice"));
        let (watcher, mut rx_watcher) = connect(&mut state, None);
        let room_id = state.create_room(a);
        // 只在分组中，不在成员列表中
        state.registry.join_group(watcher, &room_id);

        let mut outbox = Outbox::new();
        state.close_room(&mut outbox, a, &room_id);
        outbox.flush().await;

        assert_eq!(
            drain(&mut rx_watcher),
            vec![ServerMessage::CloseRoom { room_id: room_id.clone() }]
        );
        assert!(state.registry.group_members(&room_id).is_empty());
    }

    #[test]
    fn test_close_missing_room() {
        let mut state = ServerState::new();
        let (a, _rx) = connect(&mut state, Some("alice"));
        let mut outbox = Outbox::new();

        state.close_room(&mut outbox, a, "missing");
        state.close_room(&mut outbox, a, "missing");

        assert!(outbox.is_empty());
        assert_eq!(state.rooms.count(), 0);
    }
}
