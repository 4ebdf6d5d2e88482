//! 运行上下文
//!
//! 一次运行内跨题目共享的状态，每次运行重新创建。

use crate::config::LanguagePolicy;
use crate::models::Language;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// 期望使用的编程语言
    pub preferred_language: Language,
    pub policy: LanguagePolicy,
    /// 编辑器语言已确认为期望语言
    pub language_confirmed: bool,
}

impl RunContext {
    pub fn new(preferred_language: Language, policy: LanguagePolicy) -> Self {
        Self {
            preferred_language,
            policy,
            language_confirmed: false,
        }
    }

    /// 本题是否需要协商编辑器语言
    pub fn should_negotiate_language(&self) -> bool {
        match self.policy {
            LanguagePolicy::ConfirmOnce => !self.language_confirmed,
            LanguagePolicy::EveryProblem => true,
        }
    }
}
