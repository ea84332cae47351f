//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 房间容量（双人对局）
pub const ROOM_CAPACITY: usize = 2;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 服务端默认端口
pub const DEFAULT_PORT: u16 = 8080;

/// 建议的服务端心跳超时（秒），服务端默认不启用
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 30;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 单个连接的发送队列长度
pub const OUTBOUND_QUEUE_SIZE: usize = 64;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
