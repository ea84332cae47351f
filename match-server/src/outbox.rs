//! 待发送消息
//!
//! 处理器在持有 `ServerState` 锁时只把消息放进发件箱，
//! 释放锁之后再统一投递，状态修改过程中不会等待网络。

use tokio::sync::mpsc;
use tracing::debug;

use protocol::{ConnectionId, ServerMessage};

use crate::registry::ConnectionRegistry;

/// 发件箱
#[derive(Default)]
pub struct Outbox {
    deliveries: Vec<(ConnectionId, mpsc::Sender<ServerMessage>, ServerMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发送给单个连接，连接不存在时忽略
    pub fn send(&mut self, registry: &ConnectionRegistry, to: ConnectionId, msg: ServerMessage) {
        if let Some(sender) = registry.sender(to) {
            self.deliveries.push((to, sender.clone(), msg));
        }
    }

    /// 广播给分组内除 `except` 以外的所有连接，返回接收者数量
    pub fn broadcast_except(
        &mut self,
        registry: &ConnectionRegistry,
        room_id: &str,
        except: ConnectionId,
        msg: ServerMessage,
    ) -> usize {
        let mut count = 0;
        for member in registry.group_members(room_id) {
            if member == except {
                continue;
            }
            if let Some(sender) = registry.sender(member) {
                self.deliveries.push((member, sender.clone(), msg.clone()));
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// 按入队顺序投递
    pub async fn flush(self) {
        for (to, sender, msg) in self.deliveries {
            if sender.send(msg).await.is_err() {
                debug!("连接 {} 已关闭，丢弃消息", to);
            }
        }
    }
}
