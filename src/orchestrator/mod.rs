//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的调度，是整个系统的"指挥中心"。
//!
//! - 恢复会话或登录
//! - 按题目数量循环调用 `ProblemFlow`
//! - 出现无法恢复的错误时删除会话文件
//! - 无论成功与否都只关闭一次浏览器
//! - 输出统计信息
//!
//! ## 层次关系
//!
//! ```text
//! run_processor (处理 N 道题)
//!     ↓
//! workflow::ProblemFlow (处理单道题)
//!     ↓
//! services (能力层：auth / selector / solution / editor / llm)
//!     ↓
//! infrastructure (基础设施：PageDriver / SessionStore)
//! ```

pub mod run_processor;

pub use run_processor::{Orchestrator, RunReport, RunState};
