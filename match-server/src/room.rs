//! 房间系统

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use protocol::{ConnectionId, Player, RoomId, RoomRecord, ROOM_CAPACITY};

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// 房主等待对手
    Created,
    /// 双方在线
    Active,
    /// 有一方断线，记录保留，等待关闭
    HalfOpen,
}

/// 房间
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    /// 按加入顺序排列，第一个是房主
    pub players: Vec<Player>,
    /// 已断线的成员（仍保留在 `players` 中）
    disconnected: Vec<ConnectionId>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// 创建新房间，房主为唯一成员
    pub fn new(id: RoomId, creator: Player) -> Self {
        Self {
            id,
            players: vec![creator],
            disconnected: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// 线上视图
    pub fn record(&self) -> RoomRecord {
        RoomRecord {
            room_id: self.id.clone(),
            players: self.players.clone(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// 检查房间是否已满
    pub fn is_full(&self) -> bool {
        self.players.len() >= ROOM_CAPACITY
    }

    /// 检查连接是否为房间成员
    pub fn has_player(&self, id: ConnectionId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// 获取成员记录
    pub fn get_player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// 添加成员，房间已满时返回 false
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.is_full() {
            return false;
        }
        self.players.push(player);
        true
    }

    /// 标记成员断线
    pub fn mark_disconnected(&mut self, id: ConnectionId) {
        if self.has_player(id) && !self.disconnected.contains(&id) {
            self.disconnected.push(id);
        }
    }

    /// 是否还有在线成员
    pub fn has_connected_players(&self) -> bool {
        self.players.iter().any(|p| !self.disconnected.contains(&p.id))
    }

    pub fn state(&self) -> RoomState {
        if !self.disconnected.is_empty() {
            RoomState::HalfOpen
        } else if self.is_full() {
            RoomState::Active
        } else {
            RoomState::Created
        }
    }
}

/// 房间存储
pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// 生成新的房间 ID
    fn generate_id() -> RoomId {
        Uuid::new_v4().to_string()
    }

    /// 创建房间
    pub fn create(&mut self, creator: Player) -> RoomId {
        let id = Self::generate_id();
        let room = Room::new(id.clone(), creator);
        self.rooms.insert(id.clone(), room);
        id
    }

    /// 获取房间
    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// 获取房间（可变）
    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// 移除房间
    pub fn remove(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    /// 查找连接所在的所有房间
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|r| r.has_player(id))
            .map(|r| r.id.clone())
            .collect()
    }

    /// 获取房间数量
    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}
