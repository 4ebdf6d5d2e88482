//! # LeetCode Solver
//!
//! 登录 LeetCode，随机选题，调用 LLM 生成解答，写入编辑器并提交。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、会话文件），只暴露能力
//! - `PageDriver` - 页面操作抽象，`ChromePage` 为 chromiumoxide 实现
//! - `query` - 声明式页面查询（字段 → 候选选择器）
//! - `SessionStore` - 会话状态的读写
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理当前这一道题
//! - `Authenticator` - 登录并保存会话
//! - `ProblemSelector` - 随机选题
//! - `SolutionGenerator` - 读题、协商语言、调用 LLM、整理代码
//! - `EditorInjector` - 写入编辑器并提交
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整处理流程
//! - `RunContext` - 一次运行内共享的语言确认状态
//! - `ProblemFlow` - 流程编排（选题 → 解题 → 提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_processor` - 会话恢复 / 登录、N 道题循环、收尾
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{launch_browser, BrowserSession, ChromeSession};
pub use config::{Config, Credentials, ProblemCount};
pub use error::{AppError, AppResult};
pub use infrastructure::{ChromePage, PageDriver};
pub use orchestrator::{Orchestrator, RunReport, RunState};
pub use services::{CompletionClient, LlmService};
pub use workflow::{ProblemFlow, ProcessResult, RunContext};
