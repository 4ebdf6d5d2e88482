//! 集成测试共用的内存实现：页面驱动、浏览器会话、补全客户端

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;

use leetcode_solver::browser::BrowserSession;
use leetcode_solver::config::{Config, Credentials};
use leetcode_solver::error::{DriverError, LlmError};
use leetcode_solver::infrastructure::{
    ElementRef, PageDriver, SessionState, Shortcut, StoredCookie,
};
use leetcode_solver::services::{ChatMessage, CompletionClient};

// 各字段的首选选择器
pub const USERNAME: &str = "#id_login";
pub const PASSWORD: &str = "#id_password";
pub const SIGNIN: &str = "#signin_btn";
pub const SITE_HEADER: &str = "#navbar_user_avatar";
pub const CHALLENGE_FRAME: &str = "iframe[src*=\"challenges.cloudflare.com\"]";
pub const PICKONE: &str = "a[aria-label=\"Pick One\"]";
pub const TITLE: &str = "div.text-title-large a";
pub const CONTENT: &str = "[data-track-load=\"description_content\"]";
pub const EDITOR: &str = "#editor";
pub const LANGUAGE: &str = "#editor button[aria-haspopup=\"dialog\"]";
pub const EDITOR_CONTENT: &str = ".monaco-editor .view-lines";
pub const SUBMIT: &str = "[data-e2e-locator=\"console-submit-button\"]";

pub const PYTHON_REPLY: &str = "```python\nclass Solution:\n    def twoSum(self, nums, target):\n        seen = {}\n        for i, n in enumerate(nums):\n            if target - n in seen:\n                return [seen[target - n], i]\n            seen[n] = i\n```";

/// 内存中的页面状态
#[derive(Debug, Default)]
pub struct PageState {
    pub present: HashSet<String>,
    pub texts: HashMap<String, String>,
    pub url: String,
    pub visits: Vec<String>,
    /// 被点击的字段路径
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub inserted: Vec<String>,
    pub keys: Vec<String>,
    pub shortcuts: Vec<Shortcut>,
    pub text_clicks: Vec<String>,
    /// 语言下拉框中可选的语言
    pub language_options: Vec<String>,
    /// 每次随机选题后编辑器的默认语言
    pub default_language: String,
    pub restored: Vec<SessionState>,
    /// 点击该字段时模拟浏览器断连
    pub disconnect_on_click: Option<String>,
    /// 打开这些地址时页面加载超时
    pub slow_urls: HashSet<String>,
    /// 按坐标点击过的 iframe
    pub frame_clicks: Vec<String>,
    pub pauses: Vec<Duration>,
}

#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<PageState>>,
}

impl FakeDriver {
    /// 模拟一个所有元素都能找到的站点
    pub fn leetcode() -> Self {
        let driver = Self::default();
        {
            let mut state = driver.state();
            for selector in [
                USERNAME,
                PASSWORD,
                SIGNIN,
                SITE_HEADER,
                PICKONE,
                TITLE,
                CONTENT,
                EDITOR,
                LANGUAGE,
                EDITOR_CONTENT,
                SUBMIT,
            ] {
                state.present.insert(selector.to_string());
            }
            state.texts.insert(TITLE.to_string(), "1. Two Sum".to_string());
            state.texts.insert(
                CONTENT.to_string(),
                "Given an array of integers nums and an integer target...".to_string(),
            );
            state.texts.insert(
                EDITOR_CONTENT.to_string(),
                "class Solution {\npublic:\n    vector<int> twoSum(vector<int>& nums, int target) {\n\n    }\n};"
                    .to_string(),
            );
            state.default_language = "C++".to_string();
            state.texts.insert(LANGUAGE.to_string(), "C++".to_string());
            state.language_options = vec![
                "C++".to_string(),
                "Java".to_string(),
                "Python3".to_string(),
            ];
        }
        driver
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    pub fn remove(&self, selector: &str) {
        self.state().present.remove(selector);
    }

    pub fn set_default_language(&self, label: &str) {
        let mut state = self.state();
        state.default_language = label.to_string();
        state.texts.insert(LANGUAGE.to_string(), label.to_string());
    }

    pub fn slow_down(&self, url: &str) {
        self.state().slow_urls.insert(url.to_string());
    }

    pub fn clicks_on(&self, field: &str) -> usize {
        self.state().clicks.iter().filter(|f| *f == field).count()
    }

    pub fn visits_to(&self, url: &str) -> usize {
        self.state().visits.iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.visits.push(url.to_string());
        state.url = url.to_string();
        if state.slow_urls.contains(url) {
            return Err(DriverError::from(CdpError::Timeout));
        }
        Ok(())
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let state = self.state();
        if selector.split(", ").any(|s| state.present.contains(s)) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                action: format!("等待元素 {selector}"),
                after: timeout,
            })
        }
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state().url.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        Ok(self.state().present.contains(selector))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.state();
        state.clicks.push(element.field.clone());
        if state.disconnect_on_click.as_deref() == Some(element.field.as_str()) {
            return Err(DriverError::Disconnected("websocket closed".to_string()));
        }
        if element.field == "pickone_button" {
            state.url = "https://leetcode.com/problems/two-sum/description/".to_string();
            let language = state.default_language.clone();
            state.texts.insert(LANGUAGE.to_string(), language);
        }
        Ok(())
    }

    async fn click_text(&self, text: &str) -> Result<bool, DriverError> {
        let mut state = self.state();
        state.text_clicks.push(text.to_string());
        if state.language_options.iter().any(|o| o == text) {
            state.texts.insert(LANGUAGE.to_string(), text.to_string());
            return Ok(true);
        }
        Ok(false)
    }

    async fn click_frame(&self, frame_selector: &str) -> Result<bool, DriverError> {
        let mut state = self.state();
        if !state.present.contains(frame_selector) {
            return Ok(false);
        }
        state.frame_clicks.push(frame_selector.to_string());
        Ok(true)
    }

    async fn click_in_frames(&self, _selector: &str) -> Result<bool, DriverError> {
        Ok(false)
    }

    async fn text_of(&self, element: &ElementRef) -> Result<String, DriverError> {
        Ok(self
            .state()
            .texts
            .get(&element.selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn type_text(
        &self,
        element: &ElementRef,
        text: &str,
        _delay: Duration,
    ) -> Result<(), DriverError> {
        self.state()
            .typed
            .push((element.field.clone(), text.to_string()));
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), DriverError> {
        self.state().inserted.push(text.to_string());
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.state().keys.push(key.to_string());
        Ok(())
    }

    async fn press_shortcut(&self, shortcut: Shortcut) -> Result<(), DriverError> {
        self.state().shortcuts.push(shortcut);
        Ok(())
    }

    async fn save_state(&self) -> Result<SessionState, DriverError> {
        Ok(SessionState {
            saved_at: "2026-10-18T08:00:00+08:00".to_string(),
            cookies: vec![StoredCookie {
                name: "LEETCODE_SESSION".to_string(),
                value: "token".to_string(),
                domain: ".leetcode.com".to_string(),
                path: "/".to_string(),
                expires: -1.0,
                http_only: true,
                secure: true,
            }],
            origins: Vec::new(),
        })
    }

    async fn restore_state(&self, state: &SessionState) -> Result<(), DriverError> {
        self.state().restored.push(state.clone());
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        self.state().pauses.push(duration);
    }
}

/// 记录关闭次数的浏览器会话
pub struct FakeSession {
    driver: FakeDriver,
    closes: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(driver: FakeDriver) -> (Self, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            Self {
                driver,
                closes: closes.clone(),
            },
            closes,
        )
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Driver = FakeDriver;

    fn driver(&self) -> &FakeDriver {
        &self.driver
    }

    async fn close(self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 按脚本返回结果的补全客户端，脚本用完后返回默认解答
#[derive(Clone, Default)]
pub struct FakeLlm {
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl FakeLlm {
    pub fn scripted(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(replies.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PYTHON_REPLY.to_string()))
    }
}

pub fn api_error() -> LlmError {
    LlmError::ApiCallFailed {
        model: "fake-model".to_string(),
        message: "503 Service Unavailable".to_string(),
    }
}

/// 测试配置：会话文件放在临时目录
pub fn test_config(dir: &Path) -> Config {
    Config {
        session_state_path: dir.join("leetcode_login.json"),
        llm_api_key: "sk-test".to_string(),
        keystroke_delay: Duration::ZERO,
        human_verification_wait: Duration::ZERO,
        chunk_delay: Duration::ZERO,
        ..Config::default()
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "alice".to_string(),
        password: "secret".to_string(),
    }
}
