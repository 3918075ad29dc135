//! MEG病例管理服务主程序

mod config;

use clap::Parser;
use config::MegConfig;
use meg_database::{DatabasePool, DatabaseQueries};
use meg_masking::{MaskingConfig, PatientMaskingService, TracingAccessLog};
use tracing::{error, info};

/// MEG服务命令行参数
#[derive(Parser, Debug)]
#[command(name = "meg-server")]
#[command(about = "脑磁图(MEG)病例管理系统服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别（覆盖配置文件）
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match MegConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {:#}", e);
            std::process::exit(1);
        }
    };

    // 初始化日志
    let log_level = args.log_level.unwrap_or_else(|| config.server.log_level.clone());
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    info!("启动MEG病例管理服务...");
    info!("  服务名称: {}", config.server.name);
    info!("  存储目录: {}", config.storage.base_path);
    info!("  脱敏启用: {}", config.masking.enabled);

    // 数据库连接与建表
    let pool = match DatabasePool::connect(&config.database.url, config.database.max_connections).await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("数据库连接失败: {}", e);
            return Err(e.into());
        }
    };
    DatabaseQueries::new(&pool).create_tables().await?;

    // 脱敏服务（进程级全局开关在此定型）
    let _masking = PatientMaskingService::new(
        MaskingConfig { enabled: config.masking.enabled },
        Box::new(TracingAccessLog),
    );

    let _storage = meg_storage::DocumentStorage::new(&config.storage.base_path);

    info!("MEG病例管理服务就绪");

    // 上层HTTP/控制器由外部框架承载，这里保持进程存活
    tokio::signal::ctrl_c().await?;
    info!("收到退出信号，服务关闭");
    Ok(())
}
