//! 网络层
//!
//! 每条连接一个读任务和一个写任务。读任务逐条处理消息，
//! 每条消息在 `ServerState` 锁内处理完毕后再投递发件箱。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connection, ConnectionId, Listener, ProtocolError, ServerMessage,
    TcpConnection, TcpListener, OUTBOUND_QUEUE_SIZE,
};

use crate::config::ServerConfig;
use crate::outbox::Outbox;
use crate::server::{MessageHandler, ServerState};

/// 共享的服务器状态
pub type SharedState = Arc<Mutex<ServerState>>;

/// 按配置绑定地址并运行服务
pub async fn run(config: ServerConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    serve(listener, config).await
}

/// 在已绑定的监听器上运行服务
pub async fn serve(mut listener: TcpListener, config: ServerConfig) -> Result<()> {
    info!(
        "listening on {}",
        listener.local_addr().unwrap_or_else(|| config.addr())
    );

    let state: SharedState = Arc::new(Mutex::new(ServerState::new()));

    loop {
        let mut conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("接受连接失败: {}", e);
                continue;
            }
        };

        // 检查上限与登记在同一把锁内完成
        let (tx, rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_SIZE);
        let conn_id = state.lock().await.admit(tx, config.max_connections);

        let Some(conn_id) = conn_id else {
            warn!(
                "连接数已达上限 {}，拒绝 {:?}",
                config.max_connections,
                conn.peer_addr()
            );
            let _ = conn.close().await;
            continue;
        };

        tokio::spawn(handle_connection(
            state.clone(),
            conn,
            conn_id,
            rx,
            config.heartbeat_timeout,
        ));
    }
}

/// 处理单条已登记的连接直到断开
async fn handle_connection(
    state: SharedState,
    conn: TcpConnection,
    conn_id: ConnectionId,
    mut rx: mpsc::Receiver<ServerMessage>,
    heartbeat_timeout: Option<Duration>,
) {
    let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
    info!("连接 {} 已建立 ({})", conn_id, peer);

    let (mut reader, mut writer) = conn.split();

    // 所有发送端释放后（连接注销）写任务结束并关闭写端
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.write_frame(&msg).await {
                debug!("连接 {} 写入失败: {}", conn_id, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    loop {
        let frame = match heartbeat_timeout {
            Some(limit) => match timeout(limit, reader.read_frame::<ClientMessage>()).await {
                Ok(frame) => frame,
                Err(_) => {
                    info!("连接 {} 心跳超时", conn_id);
                    break;
                }
            },
            None => reader.read_frame::<ClientMessage>().await,
        };

        match frame {
            Ok(msg) => dispatch(&state, conn_id, msg).await,
            Err(e) if e.is_recoverable() => {
                warn!("连接 {} 发送了无法解析的消息: {}", conn_id, e);
            }
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                warn!("连接 {} 读取失败: {}", conn_id, e);
                break;
            }
        }
    }

    let mut outbox = Outbox::new();
    state.lock().await.handle_disconnect(&mut outbox, conn_id);
    outbox.flush().await;
}

/// 处理一条客户端消息，响应排在该消息产生的其他投递之后
async fn dispatch(state: &Mutex<ServerState>, conn_id: ConnectionId, msg: ClientMessage) {
    let mut outbox = Outbox::new();
    {
        let mut state = state.lock().await;
        if let Some(reply) = MessageHandler::handle(&mut state, &mut outbox, conn_id, msg) {
            outbox.send(&state.registry, conn_id, reply);
        }
    }
    outbox.flush().await;
}
