//! 业务能力层
//!
//! 每个服务描述"我能做什么"，只处理当前打开的这一道题，不关心流程顺序。

pub mod auth_service;
pub mod editor_service;
pub mod formatter;
pub mod llm_service;
pub mod problem_selector;
pub mod solution_service;

pub use auth_service::{Authenticator, LoginElements};
pub use editor_service::{EditorElements, EditorInjector};
pub use formatter::{strip_code_fences, SolutionFormatter};
pub use llm_service::{ChatMessage, CompletionClient, LlmService};
pub use problem_selector::{ProblemSelector, RandomProblemElements};
pub use solution_service::{build_prompt, ProblemElements, SolutionGenerator};
