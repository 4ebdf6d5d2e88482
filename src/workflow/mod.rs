//! 流程层：定义"一道题"的完整处理流程以及一次运行内共享的上下文

pub mod problem_ctx;
pub mod problem_flow;
pub mod run_ctx;

pub use problem_ctx::ProblemCtx;
pub use problem_flow::{ProblemFlow, ProcessResult};
pub use run_ctx::RunContext;
