use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("match_server=debug".parse()?))
        .init();

    info!("对局匹配服务端启动中...");

    let config = ServerConfig::from_env();
    let result = match config {
        Ok(config) => {
            info!("配置: {:?}", config);
            match_server::run(config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        error!("服务端异常退出: {:#}", e);
    }
    result
}
