//! 连接管理
//!
//! 记录每条在线连接的发送通道和昵称，并提供按房间分组广播所需的分组表。
//! 分组只反映"谁会收到这个房间的广播"，与房间成员列表相互独立。

use std::collections::{BTreeSet, HashMap};

use tokio::sync::mpsc;

use protocol::{ConnectionId, Player, RoomId, ServerMessage};

/// 单条连接
#[derive(Debug)]
pub struct ConnectionEntry {
    /// 发往该连接的消息通道
    pub sender: mpsc::Sender<ServerMessage>,
    /// 昵称（可覆盖，不校验）
    pub username: Option<String>,
}

/// 连接注册表
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// 房间 ID -> 分组内的连接
    groups: HashMap<RoomId, BTreeSet<ConnectionId>>,
    next_id: ConnectionId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            groups: HashMap::new(),
            next_id: 1,
        }
    }

    /// 生成新的连接 ID
    fn generate_id(&mut self) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// 登记新连接
    pub fn register(&mut self, sender: mpsc::Sender<ServerMessage>) -> ConnectionId {
        let id = self.generate_id();
        self.connections.insert(
            id,
            ConnectionEntry {
                sender,
                username: None,
            },
        );
        id
    }

    /// 注销连接，同时退出所有分组
    pub fn unregister(&mut self, id: ConnectionId) -> Option<ConnectionEntry> {
        self.groups.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        self.connections.remove(&id)
    }

    /// 设置昵称（覆盖旧值）
    pub fn set_username(&mut self, id: ConnectionId, username: String) {
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.username = Some(username);
        }
    }

    /// 获取昵称
    pub fn username(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id)?.username.as_deref()
    }

    /// 以当前昵称生成房间成员记录
    pub fn player(&self, id: ConnectionId) -> Player {
        Player {
            id,
            username: self.username(id).map(str::to_string),
        }
    }

    /// 获取发送通道
    pub fn sender(&self, id: ConnectionId) -> Option<&mpsc::Sender<ServerMessage>> {
        self.connections.get(&id).map(|entry| &entry.sender)
    }

    /// 检查连接是否在线
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// 在线连接数量
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// 加入分组
    pub fn join_group(&mut self, id: ConnectionId, room_id: &str) {
        self.groups.entry(room_id.to_string()).or_default().insert(id);
    }

    /// 解散分组，返回被移出的连接
    pub fn clear_group(&mut self, room_id: &str) -> Vec<ConnectionId> {
        self.groups
            .remove(room_id)
            .map(|members| members.into_iter().collect())
            .unwrap_or_default()
    }

    /// 分组内的所有连接
    pub fn group_members(&self, room_id: &str) -> Vec<ConnectionId> {
        self.groups
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
