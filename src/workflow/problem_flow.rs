//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 随机选题
//! 2. 读取题目 → 协商语言 → LLM 生成解答
//! 3. 写入编辑器 → 提交
//!
//! 每个阶段的失败都在这里转换为 [`ProcessResult`]，只有浏览器断连
//! 这类无法在单题范围内恢复的错误才向上返回。

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::infrastructure::PageDriver;
use crate::services::{CompletionClient, EditorInjector, ProblemSelector, SolutionGenerator};
use crate::workflow::problem_ctx::ProblemCtx;
use crate::workflow::run_ctx::RunContext;

/// 题目处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 解答已提交
    Submitted,
    /// 选题失败
    SelectionFailed,
    /// 未能生成解答
    SolveFailed,
    /// 写入或提交失败
    SubmitFailed,
}

impl ProcessResult {
    pub fn is_submitted(self) -> bool {
        self == ProcessResult::Submitted
    }
}

/// 题目处理流程
///
/// - 编排选题 → 解题 → 提交
/// - 不持有任何资源（page）
/// - 只依赖业务能力（services）
pub struct ProblemFlow<C> {
    selector: ProblemSelector,
    generator: SolutionGenerator<C>,
    injector: EditorInjector,
}

impl<C: CompletionClient> ProblemFlow<C> {
    pub fn new(
        selector: ProblemSelector,
        generator: SolutionGenerator<C>,
        injector: EditorInjector,
    ) -> Self {
        Self {
            selector,
            generator,
            injector,
        }
    }

    pub async fn run<D>(
        &self,
        driver: &D,
        run_ctx: &mut RunContext,
        ctx: &ProblemCtx,
    ) -> Result<ProcessResult, AppError>
    where
        D: PageDriver + ?Sized,
    {
        // ========== 阶段 1: 选题 ==========
        if let Err(e) = self.selector.select_random_problem(driver).await {
            if e.is_fatal() {
                error!("{} ❌ 选题时浏览器出错: {}", ctx, e);
                return Err(AppError::Unknown(e.to_string()));
            }
            warn!("{} ⚠️ 选题失败，本题未解答: {}", ctx, e);
            return Ok(ProcessResult::SelectionFailed);
        }

        // ========== 阶段 2: 生成解答 ==========
        let artifact = match self.generator.generate(driver, run_ctx).await {
            Ok(artifact) => artifact,
            Err(e) if e.is_fatal() => {
                error!("{} ❌ 解题时浏览器出错: {}", ctx, e);
                return Err(AppError::Unknown(e.to_string()));
            }
            Err(e) => {
                warn!("{} ⚠️ 未能生成解答，本题未解答: {}", ctx, e);
                return Ok(ProcessResult::SolveFailed);
            }
        };

        // ========== 阶段 3: 写入并提交 ==========
        match self.injector.inject_and_submit(driver, &artifact).await {
            Ok(()) => {
                info!("{} ✅ 解答已提交", ctx);
                Ok(ProcessResult::Submitted)
            }
            Err(e) if e.is_fatal() => {
                error!("{} ❌ 提交时浏览器出错: {}", ctx, e);
                Err(AppError::Unknown(e.to_string()))
            }
            Err(e) => {
                warn!("{} ⚠️ 提交失败，本题未解答: {}", ctx, e);
                Ok(ProcessResult::SubmitFailed)
            }
        }
    }
}
