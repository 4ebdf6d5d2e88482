//! 题目处理上下文
//!
//! 封装"我正在处理本次运行的第几题"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone, Copy)]
pub struct ProblemCtx {
    /// 题目序号（从1开始）
    pub index: usize,

    /// 本次运行的题目总数
    pub total: usize,
}

impl ProblemCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    pub fn is_last(&self) -> bool {
        self.index >= self.total
    }
}

impl Display for ProblemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[题目 {}/{}]", self.index, self.total)
    }
}
