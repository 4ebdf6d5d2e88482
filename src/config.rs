//! 程序配置
//!
//! 配置按以下顺序叠加：默认值 ← TOML 配置文件（可选）← 环境变量 ← 命令行参数。

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "solver.toml";

/// 随机题目数量的上限（含）
pub const MAX_RANDOM_PROBLEMS: usize = 11;

/// 语言偏好的确认策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguagePolicy {
    /// 确认过一次之后，本次运行不再尝试切换语言
    ConfirmOnce,
    /// 每道题都重新协商语言
    EveryProblem,
}

impl FromStr for LanguagePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirm-once" | "once" => Ok(LanguagePolicy::ConfirmOnce),
            "every-problem" | "always" => Ok(LanguagePolicy::EveryProblem),
            _ => Err(ConfigError::UnsupportedValue {
                field: "LANGUAGE_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// 代码写入编辑器的方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// 分块模拟键入
    Typed,
    /// 一次性粘贴
    Paste,
}

impl FromStr for InputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typed" | "type" => Ok(InputMode::Typed),
            "paste" => Ok(InputMode::Paste),
            _ => Err(ConfigError::UnsupportedValue {
                field: "INPUT_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 站点 ---
    pub base_url: String,
    pub login_url: String,
    pub problemset_url: String,
    /// 会话状态文件（相对工作目录）
    pub session_state_path: PathBuf,
    /// 旧版凭据文件
    pub credentials_file: String,

    // --- 日志 ---
    pub log_dir: String,
    pub log_file_name: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 浏览器 ---
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub window_width: u32,
    pub window_height: u32,

    // --- 等待与节奏 ---
    pub navigation_timeout: Duration,
    /// 每次按键之间的间隔（模拟人工输入）
    pub keystroke_delay: Duration,
    /// 提交登录前留给人工完成验证码的时间
    pub human_verification_wait: Duration,
    pub problem_load_wait: Duration,
    pub dropdown_wait: Duration,
    pub clear_wait: Duration,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub between_problems_delay: Duration,

    // --- 解题 ---
    pub preferred_language: String,
    pub language_policy: LanguagePolicy,
    pub input_mode: InputMode,
    /// 提交前是否触发编辑器自带的格式化快捷键
    pub auto_format: bool,
    /// 外部格式化命令，从 stdin 读源码、向 stdout 输出结果
    pub formatter_command: Option<String>,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,

    /// 页面查询字段的选择器覆盖（字段路径 → 候选选择器）
    pub selector_overrides: HashMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://leetcode.com".to_string(),
            login_url: "https://leetcode.com/accounts/login/".to_string(),
            problemset_url: "https://leetcode.com/problemset/".to_string(),
            session_state_path: PathBuf::from("leetcode_login.json"),
            credentials_file: "credentials.txt".to_string(),
            log_dir: "logs".to_string(),
            log_file_name: "leetcode_solver.log".to_string(),
            verbose_logging: false,
            headless: false,
            chrome_executable: None,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout: Duration::from_secs(30),
            keystroke_delay: Duration::from_millis(200),
            human_verification_wait: Duration::from_secs(10),
            problem_load_wait: Duration::from_secs(2),
            dropdown_wait: Duration::from_secs(1),
            clear_wait: Duration::from_millis(500),
            chunk_size: 100,
            chunk_delay: Duration::from_millis(100),
            between_problems_delay: Duration::from_secs(2),
            preferred_language: "Python3".to_string(),
            language_policy: LanguagePolicy::ConfirmOnce,
            input_mode: InputMode::Typed,
            auto_format: true,
            formatter_command: None,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4".to_string(),
            llm_temperature: 0.2,
            llm_max_tokens: 2048,
            selector_overrides: HashMap::new(),
        }
    }
}

/// TOML 配置文件结构，所有字段均可省略
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    base_url: Option<String>,
    login_url: Option<String>,
    problemset_url: Option<String>,
    session_state_path: Option<PathBuf>,
    credentials_file: Option<String>,
    log_dir: Option<String>,
    headless: Option<bool>,
    chrome_executable: Option<String>,
    navigation_timeout_ms: Option<u64>,
    keystroke_delay_ms: Option<u64>,
    human_verification_wait_ms: Option<u64>,
    chunk_size: Option<usize>,
    chunk_delay_ms: Option<u64>,
    between_problems_delay_ms: Option<u64>,
    preferred_language: Option<String>,
    language_policy: Option<LanguagePolicy>,
    input_mode: Option<InputMode>,
    auto_format: Option<bool>,
    formatter_command: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    llm_temperature: Option<f32>,
    llm_max_tokens: Option<u32>,
    selectors: HashMap<String, Vec<String>>,
}

impl Config {
    /// 叠加配置文件和环境变量，不做校验（命令行参数还要再覆盖一层）
    pub fn from_sources() -> Result<Self, ConfigError> {
        let env = |name: &str| std::env::var(name).ok();

        let mut config = Self::default();
        match env("CONFIG_FILE") {
            Some(path) => config.merge_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                config.merge_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {}
        }
        config.apply_env(env)?;
        Ok(config)
    }

    /// 读取 TOML 配置文件并覆盖对应字段
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFileFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.merge_toml(&content)
            .map_err(|message| ConfigError::ConfigFileFailed {
                path: path.display().to_string(),
                message,
            })
    }

    fn merge_toml(&mut self, content: &str) -> Result<(), String> {
        let file: FileConfig = toml::from_str(content).map_err(|e| e.to_string())?;

        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = file.$field { self.$field = v; })*
            };
        }
        take!(
            base_url,
            login_url,
            problemset_url,
            session_state_path,
            credentials_file,
            log_dir,
            headless,
            chunk_size,
            preferred_language,
            language_policy,
            input_mode,
            auto_format,
            llm_api_base_url,
            llm_model_name,
            llm_temperature,
            llm_max_tokens,
        );

        if file.chrome_executable.is_some() {
            self.chrome_executable = file.chrome_executable;
        }
        if file.formatter_command.is_some() {
            self.formatter_command = file.formatter_command;
        }

        let millis = [
            (file.navigation_timeout_ms, &mut self.navigation_timeout),
            (file.keystroke_delay_ms, &mut self.keystroke_delay),
            (file.human_verification_wait_ms, &mut self.human_verification_wait),
            (file.chunk_delay_ms, &mut self.chunk_delay),
            (file.between_problems_delay_ms, &mut self.between_problems_delay),
        ];
        for (value, slot) in millis {
            if let Some(ms) = value {
                *slot = Duration::from_millis(ms);
            }
        }

        self.selector_overrides.extend(file.selectors);
        Ok(())
    }

    /// 用环境变量覆盖配置
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |name: &str, slot: &mut String| {
            if let Some(v) = env(name) {
                *slot = v;
            }
        };
        string("LEETCODE_BASE_URL", &mut self.base_url);
        string("LEETCODE_LOGIN_URL", &mut self.login_url);
        string("LEETCODE_PROBLEMSET_URL", &mut self.problemset_url);
        string("CREDENTIALS_FILE", &mut self.credentials_file);
        string("LOG_DIR", &mut self.log_dir);
        string("PREFERRED_LANGUAGE", &mut self.preferred_language);
        string("OPENAI_API_KEY", &mut self.llm_api_key);
        string("OPENAI_BASE_URL", &mut self.llm_api_base_url);
        string("LLM_MODEL_NAME", &mut self.llm_model_name);

        if let Some(path) = env("SESSION_STATE_PATH") {
            self.session_state_path = PathBuf::from(path);
        }
        if let Some(path) = env("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(path);
        }
        if let Some(cmd) = env("FORMATTER_COMMAND") {
            self.formatter_command = Some(cmd).filter(|c| !c.trim().is_empty());
        }

        if let Some(v) = parse_env(&env, "HEADLESS", "bool")? {
            self.headless = v;
        }
        if let Some(v) = parse_env(&env, "VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = parse_env(&env, "AUTO_FORMAT", "bool")? {
            self.auto_format = v;
        }
        if let Some(v) = parse_env(&env, "CHUNK_SIZE", "usize")? {
            self.chunk_size = v;
        }
        if let Some(v) = parse_env(&env, "LLM_TEMPERATURE", "f32")? {
            self.llm_temperature = v;
        }
        if let Some(v) = parse_env(&env, "LLM_MAX_TOKENS", "u32")? {
            self.llm_max_tokens = v;
        }
        if let Some(v) = env("LANGUAGE_POLICY") {
            self.language_policy = v.parse()?;
        }
        if let Some(v) = env("INPUT_MODE") {
            self.input_mode = v.parse()?;
        }

        let millis = [
            ("NAVIGATION_TIMEOUT_MS", &mut self.navigation_timeout),
            ("KEYSTROKE_DELAY_MS", &mut self.keystroke_delay),
            ("HUMAN_VERIFICATION_WAIT_MS", &mut self.human_verification_wait),
            ("CHUNK_DELAY_MS", &mut self.chunk_delay),
            ("BETWEEN_PROBLEMS_DELAY_MS", &mut self.between_problems_delay),
        ];
        for (name, slot) in millis {
            if let Some(ms) = parse_env::<u64, _>(&env, name, "毫秒数(u64)")? {
                *slot = Duration::from_millis(ms);
            }
        }

        Ok(())
    }

    /// 检查启动所必需的配置项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::UnsupportedValue {
                field: "CHUNK_SIZE".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T, F>(env: &F, var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match env(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

/// 登录凭据
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// 读取凭据：优先环境变量，其次旧版凭据文件
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        Self::load_with(config, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(config: &Config, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = env("LEETCODE_USERNAME").filter(|v| !v.trim().is_empty());
        let password = env("LEETCODE_PASSWORD").filter(|v| !v.is_empty());
        if let (Some(username), Some(password)) = (username, password) {
            return Ok(Self { username, password });
        }

        std::fs::read_to_string(&config.credentials_file)
            .ok()
            .and_then(|content| Self::parse_file(&content))
            .ok_or_else(|| ConfigError::MissingCredentials {
                credentials_file: config.credentials_file.clone(),
            })
    }

    /// 解析凭据文件：含 `#` 的行视为注释，前两行有效内容依次为用户名和密码
    pub fn parse_file(content: &str) -> Option<Self> {
        let mut lines = content
            .lines()
            .filter(|line| !line.contains('#'))
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let username = lines.next()?.to_string();
        let password = lines.next()?.to_string();
        Some(Self { username, password })
    }
}

/// 本次运行要解的题目数量
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProblemCount(usize);

impl ProblemCount {
    /// 解析命令行参数；缺省时在 [1, 11] 中随机取值
    pub fn from_arg(arg: Option<&str>) -> Result<Self, ConfigError> {
        match arg {
            None => Ok(Self::random()),
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n >= 1 => Ok(Self(n as usize)),
                _ => Err(ConfigError::InvalidProblemCount {
                    value: raw.to_string(),
                }),
            },
        }
    }

    pub fn random() -> Self {
        Self(rand::rng().random_range(1..=MAX_RANDOM_PROBLEMS))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProblemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
