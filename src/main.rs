use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use leetcode_solver::browser::launch_browser;
use leetcode_solver::config::{Config, Credentials, ProblemCount};
use leetcode_solver::orchestrator::{Orchestrator, RunState};
use leetcode_solver::services::LlmService;
use leetcode_solver::utils::logging;

#[derive(Debug, Parser)]
#[command(name = "leetcode_solver")]
#[command(about = "登录 LeetCode，随机选题，调用 LLM 生成解答并提交", long_about = None)]
struct Args {
    /// 本次要解答的题目数量（缺省时在 1..=11 中随机）
    #[arg(value_name = "COUNT", allow_hyphen_values = true)]
    count: Option<String>,

    /// 无头模式运行浏览器
    #[arg(long)]
    headless: bool,

    /// 期望使用的编程语言（编辑器下拉框中的名称，如 Python3、C++）
    #[arg(long, value_name = "LABEL")]
    language: Option<String>,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // 加载配置（命令行参数优先）
    let mut config = match Config::from_sources() {
        Ok(config) => config,
        Err(e) => {
            // 配置不可用时按默认位置记录日志
            let defaults = Config::default();
            let _log_guard =
                logging::init(&defaults.log_dir, &defaults.log_file_name, args.verbose);
            error!("❌ 配置错误: {}", e);
            return Err(e.into());
        }
    };
    if args.headless {
        config.headless = true;
    }
    if args.verbose {
        config.verbose_logging = true;
    }
    if let Some(language) = args.language {
        config.preferred_language = language;
    }

    // 初始化日志
    let _log_guard = logging::init(
        &config.log_dir,
        &config.log_file_name,
        config.verbose_logging,
    );

    if let Err(e) = config.validate() {
        error!("❌ 配置错误: {}", e);
        return Err(e.into());
    }
    let credentials = Credentials::load(&config).map_err(|e| {
        error!("❌ 配置错误: {}", e);
        e
    })?;
    let count = ProblemCount::from_arg(args.count.as_deref()).map_err(|e| {
        error!("❌ {}", e);
        e
    })?;

    logging::log_startup(&config);
    info!("📋 本次题目数量: {}", count);

    let orchestrator = Orchestrator::new(&config, LlmService::new(&config));
    let session = launch_browser(&config).await.map_err(|e| {
        error!("❌ 浏览器启动失败: {}", e);
        e
    })?;

    let report = orchestrator.run(session, &credentials, count).await;
    match report.state {
        RunState::Done => Ok(()),
        RunState::Aborted { reason } => Err(anyhow::anyhow!("运行中止: {reason}")),
    }
}
