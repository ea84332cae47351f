//! 错误类型定义

use thiserror::Error;

use protocol::ErrorCode;

/// 加入房间失败
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// 房间没有成员（包括不存在的房间）
    #[error("room is empty")]
    RoomEmpty,

    /// 房间已满
    #[error("room is full")]
    RoomFull,
}

impl JoinError {
    /// 对应的协议错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            JoinError::RoomEmpty => ErrorCode::RoomEmpty,
            JoinError::RoomFull => ErrorCode::RoomFull,
        }
    }
}
