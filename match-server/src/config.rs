//! 服务端配置
//!
//! 默认值可被环境变量覆盖：`HOST`、`PORT`、`MAX_CONNECTIONS`、
//! `HEARTBEAT_TIMEOUT_SECS`。默认不检测心跳，等待对手或长考时连接可以长时间静默；
//! 设置 `HEARTBEAT_TIMEOUT_SECS` 为正数后才会断开空闲连接（0 等同于不设置）。

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use protocol::{DEFAULT_PORT, MAX_CONNECTIONS};

/// 服务端配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 同时在线连接上限
    pub max_connections: usize,
    /// 超过此时间没有收到任何消息即视为断线，`None` 表示不检测
    pub heartbeat_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: MAX_CONNECTIONS,
            heartbeat_timeout: None,
        }
    }
}

impl ServerConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取，未设置的项使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(max) = parse_var(&lookup, "MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "HEARTBEAT_TIMEOUT_SECS")? {
            config.heartbeat_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// 监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("环境变量 {} 无效: {:?}", key, raw))
        })
        .transpose()
}
