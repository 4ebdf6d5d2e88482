//! 日志工具模块
//!
//! 初始化控制台 + 按天滚动的文件日志，并提供日志格式化和输出的辅助函数

use std::path::Path;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::orchestrator::{RunReport, RunState};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认为 info。
/// 返回的 guard 必须持有到程序结束，否则文件日志可能丢失。
pub fn init(log_dir: &str, file_name: &str, verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .build(Path::new(log_dir));

    let console = fmt::layer().with_target(false);
    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            warn!("⚠️ 无法创建日志文件 ({}): {}，仅输出到控制台", log_dir, e);
            None
        }
    }
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - LeetCode 自动解题");
    info!("🌐 站点: {}", config.base_url);
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "💻 期望语言: {} ({:?})",
        config.preferred_language, config.language_policy
    );
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已提交: {}/{}", report.solved, report.target);
    info!("📝 已尝试: {}", report.attempted);
    info!("⏱️ 总耗时: {:.1} 秒", report.elapsed.as_secs_f64());
    match &report.state {
        RunState::Done => info!("🏁 状态: 完成"),
        RunState::Aborted { reason } => info!("🛑 状态: 中止 ({})", reason),
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
