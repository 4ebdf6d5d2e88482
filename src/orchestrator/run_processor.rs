//! 运行处理器 - 编排层
//!
//! 状态流转：
//!
//! ```text
//! Init → (LoggedIn | LoggingIn) → SolvingLoop { Selecting → Solving → Submitting } → Done | Aborted
//! ```

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::browser::BrowserSession;
use crate::config::{Config, Credentials, LanguagePolicy, ProblemCount};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, SelectorRegistry, SessionStore};
use crate::models::Language;
use crate::services::{
    Authenticator, CompletionClient, EditorInjector, ProblemSelector, SolutionFormatter,
    SolutionGenerator,
};
use crate::utils::logging::print_final_stats;
use crate::workflow::{ProblemCtx, ProblemFlow, RunContext};

/// 运行结束时的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// 完成了全部 N 次尝试
    Done,
    /// 中途中止
    Aborted { reason: String },
}

/// 运行报告
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target: usize,
    pub attempted: usize,
    pub solved: usize,
    pub elapsed: Duration,
    pub state: RunState,
}

impl RunReport {
    fn new(target: usize) -> Self {
        Self {
            target,
            attempted: 0,
            solved: 0,
            elapsed: Duration::ZERO,
            state: RunState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }
}

/// 一次运行的编排器
pub struct Orchestrator<C> {
    store: SessionStore,
    authenticator: Authenticator,
    flow: ProblemFlow<C>,
    base_url: String,
    navigation_timeout: Duration,
    between_problems_delay: Duration,
    preferred_language: Language,
    language_policy: LanguagePolicy,
}

impl<C: CompletionClient> Orchestrator<C> {
    /// 由配置组装各项服务，补全客户端由调用方注入
    pub fn new(config: &Config, client: C) -> Self {
        let registry = SelectorRegistry::with_overrides(config.selector_overrides.clone());
        let store = SessionStore::new(config.session_state_path.clone());

        let flow = ProblemFlow::new(
            ProblemSelector::new(config, registry.clone()),
            SolutionGenerator::new(
                client,
                SolutionFormatter::new(config),
                config,
                registry.clone(),
            ),
            EditorInjector::new(config, registry.clone()),
        );

        Self {
            authenticator: Authenticator::new(config, registry, store.clone()),
            store,
            flow,
            base_url: config.base_url.clone(),
            navigation_timeout: config.navigation_timeout,
            between_problems_delay: config.between_problems_delay,
            preferred_language: Language::from_label(&config.preferred_language),
            language_policy: config.language_policy,
        }
    }

    /// 执行一次完整运行，结束时关闭浏览器会话
    pub async fn run<S>(&self, session: S, credentials: &Credentials, count: ProblemCount) -> RunReport
    where
        S: BrowserSession,
    {
        let started = Instant::now();
        let mut report = RunReport::new(count.get());

        info!("{}", "=".repeat(60));
        info!("🚀 本次运行计划解答 {} 道题", count);
        info!("{}", "=".repeat(60));

        if let Err(e) = self.drive(session.driver(), credentials, &mut report).await {
            error!("❌ 运行中止: {}", e);
            match self.store.delete().await {
                Ok(true) => warn!("已删除会话文件，下次运行将重新登录"),
                Ok(false) => {}
                Err(delete_err) => error!("❌ 删除会话文件失败: {}", delete_err),
            }
            report.state = RunState::Aborted {
                reason: e.to_string(),
            };
        }

        if let Err(e) = session.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }

        report.elapsed = started.elapsed();
        print_final_stats(&report);
        report
    }

    async fn drive<D>(
        &self,
        driver: &D,
        credentials: &Credentials,
        report: &mut RunReport,
    ) -> AppResult<()>
    where
        D: PageDriver + ?Sized,
    {
        self.establish_session(driver, credentials).await?;

        info!("🏠 打开首页: {}", self.base_url);
        match driver.goto(&self.base_url).await {
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!("⚠️ 打开首页失败，继续执行: {}", e),
            Ok(()) => {}
        }
        match driver.wait_until_ready(self.navigation_timeout).await {
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!("⚠️ 首页未完全加载，继续执行: {}", e),
            Ok(()) => {}
        }

        let mut run_ctx = RunContext::new(self.preferred_language.clone(), self.language_policy);
        let total = report.target;

        for index in 1..=total {
            let ctx = ProblemCtx::new(index, total);
            info!("\n{}", "─".repeat(60));
            info!("{} 开始处理", ctx);
            report.attempted += 1;

            let result = self.flow.run(driver, &mut run_ctx, &ctx).await?;
            if result.is_submitted() {
                report.solved += 1;
            } else {
                info!("{} 本题未解答 ({:?})", ctx, result);
            }
            info!("📊 进度: 已提交 {}/{}", report.solved, total);

            if !ctx.is_last() {
                driver.pause(self.between_problems_delay).await;
            }
        }
        Ok(())
    }

    /// 恢复已保存的会话，没有可用会话时登录
    async fn establish_session<D>(&self, driver: &D, credentials: &Credentials) -> AppResult<()>
    where
        D: PageDriver + ?Sized,
    {
        if self.store.exists() {
            match self.store.load().await {
                Ok(state) => {
                    info!("🔑 使用已保存的会话: {}", self.store.path().display());
                    driver.restore_state(&state).await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!("⚠️ 会话文件无法解析，删除后重新登录: {}", e);
                    self.store.delete().await?;
                }
            }
        } else {
            info!("未找到会话文件，开始登录");
        }

        self.authenticator
            .authenticate(driver, credentials)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
