//! 错误类型定义
//!
//! 按关注点划分：配置 / 浏览器驱动 / 登录 / 选题 / 解题 / 提交 / 会话存储 / LLM。
//! 单题阶段的错误在流程层被转换为 `ProcessResult`，只有配置、登录以及
//! 浏览器断连会中止整个运行。

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 配置错误（启动前即失败，不会启动浏览器）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必需的环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 没有可用的登录凭据
    #[error("缺少登录凭据: 请设置 LEETCODE_USERNAME / LEETCODE_PASSWORD 或提供 {credentials_file}")]
    MissingCredentials { credentials_file: String },
    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无效: {message}")]
    ConfigFileFailed { path: String, message: String },
    /// 题目数量参数无效
    #[error("题目数量无效: '{value}'（需要正整数）")]
    InvalidProblemCount { value: String },
    /// 不支持的取值
    #[error("{field} 不支持的取值: '{value}'")]
    UnsupportedValue { field: String, value: String },
}

/// 浏览器驱动错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 页面上找不到元素
    #[error("找不到元素: {selector}")]
    ElementNotFound { selector: String },
    /// 等待超时
    #[error("{action} 超时 ({after:?})")]
    Timeout { action: String, after: Duration },
    /// 操作执行失败
    #[error("{action} 失败: {message}")]
    ActionFailed { action: String, message: String },
    /// 与浏览器的连接已断开
    #[error("浏览器连接已断开: {0}")]
    Disconnected(String),
    /// 其他 CDP 错误
    #[error("CDP 错误: {0}")]
    Cdp(String),
}

impl DriverError {
    /// 是否为无法在单题范围内恢复的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Disconnected(_))
    }

    pub fn action_failed(action: impl Into<String>, message: impl ToString) -> Self {
        DriverError::ActionFailed {
            action: action.into(),
            message: message.to_string(),
        }
    }
}

/// chromiumoxide 单个 CDP 请求的默认超时
const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                DriverError::Disconnected(err.to_string())
            }
            CdpError::Timeout => DriverError::Timeout {
                action: "CDP 请求".to_string(),
                after: CDP_REQUEST_TIMEOUT,
            },
            other => DriverError::Cdp(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::action_failed("解析脚本返回值", err)
    }
}

/// 声明式页面查询错误
#[derive(Debug, Error)]
pub enum QueryError {
    /// 查询文本语法错误
    #[error("查询语法错误 (位置 {position}): {message}")]
    Parse { position: usize, message: String },
    /// 字段没有任何候选选择器
    #[error("字段 {field} 没有配置选择器")]
    UnknownField { field: String },
    /// 必需字段未在页面上找到
    #[error("页面上缺少字段: {field}")]
    MissingField { field: String },
    /// 查询中没有任何字段匹配
    #[error("查询没有匹配到任何元素")]
    NothingMatched,
    /// 解析过程中驱动出错
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl QueryError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueryError::Driver(e) if e.is_fatal())
    }
}

/// 会话存储错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("读写会话文件失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("会话文件格式无效 ({path}): {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 登录错误（整个运行中止）
#[derive(Debug, Error)]
pub enum AuthError {
    /// 打开登录页失败
    #[error("打开登录页失败 ({url}): {message}")]
    Navigation { url: String, message: String },
    /// 登录表单元素缺失
    #[error("登录页缺少元素: {field}")]
    ElementNotFound { field: String },
    /// 提交后未检测到登录状态
    #[error("提交登录后未检测到已登录标记")]
    LoginNotConfirmed,
    /// 会话文件未能写入磁盘
    #[error("会话状态未能保存到 {path}")]
    PersistFailed { path: PathBuf },
    /// 其他未预期的错误
    #[error("登录失败: {0}")]
    Unknown(String),
}

/// 选题错误（单题，非致命）
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("打开题库页失败: {0}")]
    Navigation(DriverError),
    #[error("找不到随机选题按钮: {0}")]
    ControlNotFound(QueryError),
    #[error("点击随机选题按钮失败: {0}")]
    ClickFailed(DriverError),
}

impl SelectionError {
    pub fn is_fatal(&self) -> bool {
        match self {
            SelectionError::Navigation(e) | SelectionError::ClickFailed(e) => e.is_fatal(),
            SelectionError::ControlNotFound(e) => e.is_fatal(),
        }
    }
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {0}")]
    RequestBuild(String),
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 解题错误（单题，非致命）
#[derive(Debug, Error)]
pub enum SolveError {
    /// 题目信息提取失败
    #[error("提取题目信息失败: {0}")]
    Extraction(QueryError),
    /// 读取元素文本失败
    #[error("读取题目内容失败: {0}")]
    Read(DriverError),
    /// 调用补全接口失败
    #[error(transparent)]
    Completion(#[from] LlmError),
    /// 模型输出为空
    #[error("模型输出为空")]
    EmptyCompletion,
}

impl SolveError {
    pub fn is_fatal(&self) -> bool {
        match self {
            SolveError::Extraction(e) => e.is_fatal(),
            SolveError::Read(e) => e.is_fatal(),
            SolveError::Completion(_) | SolveError::EmptyCompletion => false,
        }
    }
}

/// 提交错误（单题，非致命）
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("找不到代码编辑器: {0}")]
    EditorNotFound(QueryError),
    #[error("清空编辑器失败: {0}")]
    ClearFailed(DriverError),
    #[error("写入代码失败: {0}")]
    InsertFailed(DriverError),
    #[error("找不到提交按钮: {0}")]
    SubmitNotFound(QueryError),
    #[error("点击提交按钮失败: {0}")]
    ClickFailed(DriverError),
}

impl SubmitError {
    pub fn is_fatal(&self) -> bool {
        match self {
            SubmitError::EditorNotFound(e) | SubmitError::SubmitNotFound(e) => e.is_fatal(),
            SubmitError::ClearFailed(e)
            | SubmitError::InsertFailed(e)
            | SubmitError::ClickFailed(e) => e.is_fatal(),
        }
    }
}

/// 应用程序顶层错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),
    #[error("浏览器错误: {0}")]
    Browser(#[from] DriverError),
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 逃逸出单题边界的错误
    #[error("未处理的错误: {0}")]
    Unknown(String),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
