//! 基于 chromiumoxide 的页面驱动
//!
//! 持有唯一的 Page 资源，对上只暴露 [`PageDriver`] 能力。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams, TimeSinceEpoch};
use chromiumoxide::element::Element;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::DriverError;
use crate::infrastructure::page_driver::{PageDriver, Shortcut};
use crate::infrastructure::query::ElementRef;
use crate::infrastructure::session_store::{OriginStorage, SessionState, StoredCookie};

/// CDP 按键修饰位
const MODIFIER_ALT: i64 = 1;
const MODIFIER_CTRL: i64 = 2;
const MODIFIER_SHIFT: i64 = 8;

/// 挑战框中复选框中心距 iframe 左边缘的距离
const CHALLENGE_CHECKBOX_OFFSET: f64 = 30.0;

/// Chrome 页面
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, DriverError> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, DriverError> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    async fn find(&self, element: &ElementRef) -> Result<Element, DriverError> {
        self.page
            .find_element(element.selector.as_str())
            .await
            .map_err(|e| match DriverError::from(e) {
                fatal @ DriverError::Disconnected(_) => fatal,
                _ => DriverError::ElementNotFound {
                    selector: element.selector.clone(),
                },
            })
    }

    /// 轮询直到条件满足；非致命的脚本错误（如页面正在跳转）视为尚未满足
    async fn poll_until<F, Fut>(
        &self,
        action: &str,
        timeout: Duration,
        interval: Duration,
        mut check: F,
    ) -> Result<(), DriverError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool, DriverError>>,
    {
        let polling = async {
            loop {
                match check().await {
                    Ok(true) => return Ok(()),
                    Ok(false) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => debug!("{} 轮询出错，继续等待: {}", action, e),
                }
                sleep(interval).await;
            }
        };
        match tokio::time::timeout(timeout, polling).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout {
                action: action.to_string(),
                after: timeout,
            }),
        }
    }

    async fn dispatch_key(
        &self,
        key: &str,
        code: &str,
        key_code: i64,
        modifiers: i64,
        commands: &[&str],
    ) -> Result<(), DriverError> {
        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key(key)
            .code(code)
            .windows_virtual_key_code(key_code)
            .native_virtual_key_code(key_code)
            .modifiers(modifiers);
        if !commands.is_empty() {
            down = down.commands(commands.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        }
        let down = down
            .build()
            .map_err(|e| DriverError::action_failed("构建按键事件", e))?;
        self.page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .code(code)
            .windows_virtual_key_code(key_code)
            .native_virtual_key_code(key_code)
            .modifiers(modifiers)
            .build()
            .map_err(|e| DriverError::action_failed("构建按键事件", e))?;
        self.page.execute(up).await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        debug!("打开页面: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), DriverError> {
        // DOMContentLoaded + load
        self.poll_until("等待文档加载", timeout, Duration::from_millis(200), || async {
            let state: String = self.eval_as("document.readyState").await?;
            Ok::<_, DriverError>(state == "complete")
        })
        .await?;

        // 资源请求数在一个轮询间隔内不再增长视为网络空闲
        let idle = async {
            let mut last_count: i64 = -1;
            loop {
                match self
                    .eval_as::<i64>("performance.getEntriesByType('resource').length")
                    .await
                {
                    Ok(count) if count == last_count => return Ok(()),
                    Ok(count) => last_count = count,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => debug!("等待网络空闲出错，继续等待: {}", e),
                }
                sleep(Duration::from_millis(500)).await;
            }
        };
        match tokio::time::timeout(timeout, idle).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout {
                action: "等待网络空闲".to_string(),
                after: timeout,
            }),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let action = format!("等待元素 {selector}");
        self.poll_until(&action, timeout, Duration::from_millis(250), || {
            self.exists(selector)
        })
        .await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(!elements.is_empty()),
            Err(e) => {
                let err = DriverError::from(e);
                if err.is_fatal() {
                    Err(err)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let el = self.find(element).await?;
        el.click()
            .await
            .map_err(|e| match DriverError::from(e) {
                fatal @ DriverError::Disconnected(_) => fatal,
                other => DriverError::action_failed(format!("点击 {}", element.field), other),
            })?;
        Ok(())
    }

    async fn click_text(&self, text: &str) -> Result<bool, DriverError> {
        let target = serde_json::to_string(text)?;
        let js = format!(
            r#"
            (() => {{
                const target = {target};
                const nodes = document.querySelectorAll(
                    '[role="option"], [role="menuitem"], li, button, div, span'
                );
                for (const el of nodes) {{
                    if (el.offsetParent === null) continue;
                    if ((el.innerText || '').trim() !== target) continue;
                    el.click();
                    return true;
                }}
                return false;
            }})()
            "#
        );
        self.eval_as(js).await
    }

    async fn click_frame(&self, frame_selector: &str) -> Result<bool, DriverError> {
        let frames = match self.page.find_elements(frame_selector).await {
            Ok(frames) => frames,
            Err(e) => {
                let err = DriverError::from(e);
                return if err.is_fatal() { Err(err) } else { Ok(false) };
            }
        };

        for frame in frames {
            if let Err(e) = frame.scroll_into_view().await {
                debug!("滚动到 iframe 失败: {}", e);
            }
            let bbox = match frame.bounding_box().await {
                Ok(bbox) if bbox.width > 0.0 && bbox.height > 0.0 => bbox,
                Ok(_) => continue,
                Err(e) => {
                    debug!("读取 iframe 位置失败: {}", e);
                    continue;
                }
            };
            let point = Point {
                x: bbox.x + (bbox.width / 2.0).min(CHALLENGE_CHECKBOX_OFFSET),
                y: bbox.y + bbox.height / 2.0,
            };
            debug!("点击 {} 内坐标 ({:.0}, {:.0})", frame_selector, point.x, point.y);
            self.page.click(point).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn click_in_frames(&self, selector: &str) -> Result<bool, DriverError> {
        let selector = serde_json::to_string(selector)?;
        let js = format!(
            r#"
            (() => {{
                const selector = {selector};
                const search = (doc) => {{
                    for (const frame of doc.querySelectorAll('iframe')) {{
                        let inner = null;
                        try {{ inner = frame.contentDocument; }} catch (e) {{ inner = null; }}
                        if (!inner) continue;
                        const el = inner.querySelector(selector);
                        if (el) {{ el.click(); return true; }}
                        if (search(inner)) return true;
                    }}
                    return false;
                }};
                return search(document);
            }})()
            "#
        );
        self.eval_as(js).await
    }

    async fn text_of(&self, element: &ElementRef) -> Result<String, DriverError> {
        let el = self.find(element).await?;
        Ok(el.inner_text().await?.unwrap_or_default())
    }

    async fn type_text(
        &self,
        element: &ElementRef,
        text: &str,
        delay: Duration,
    ) -> Result<(), DriverError> {
        let el = self.find(element).await?;
        el.click().await?;
        for ch in text.chars() {
            let key = ch.to_string();
            if let Err(e) = el.type_str(key.as_str()).await {
                // 键盘布局里没有的字符直接插入
                let err = DriverError::from(e);
                if err.is_fatal() {
                    return Err(err);
                }
                self.page.execute(InsertTextParams::new(key)).await?;
            }
            sleep(delay).await;
        }
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), DriverError> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let (code, key_code) = match key {
            "Delete" => ("Delete", 46),
            "Backspace" => ("Backspace", 8),
            "Enter" => ("Enter", 13),
            "Escape" => ("Escape", 27),
            "Tab" => ("Tab", 9),
            other => {
                return Err(DriverError::action_failed(
                    "按键",
                    format!("不支持的按键 {other}"),
                ))
            }
        };
        self.dispatch_key(key, code, key_code, 0, &[]).await
    }

    async fn press_shortcut(&self, shortcut: Shortcut) -> Result<(), DriverError> {
        match shortcut {
            Shortcut::SelectAll => {
                self.dispatch_key("a", "KeyA", 65, MODIFIER_CTRL, &["selectAll"])
                    .await
            }
            Shortcut::FormatDocument => {
                self.dispatch_key("F", "KeyF", 70, MODIFIER_SHIFT | MODIFIER_ALT, &[])
                    .await
            }
        }
    }

    async fn save_state(&self) -> Result<SessionState, DriverError> {
        let cookies = self
            .page
            .get_cookies()
            .await?
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: c.expires,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let origin: String = self.eval_as("window.location.origin").await?;
        let local_storage: Vec<(String, String)> = self
            .eval_as("Object.entries(window.localStorage)")
            .await?;

        Ok(SessionState {
            saved_at: chrono::Local::now().to_rfc3339(),
            cookies,
            origins: vec![OriginStorage {
                origin,
                local_storage,
            }],
        })
    }

    async fn restore_state(&self, state: &SessionState) -> Result<(), DriverError> {
        let params = state
            .cookies
            .iter()
            .map(|c| {
                let mut builder = CookieParam::builder()
                    .name(c.name.as_str())
                    .value(c.value.as_str())
                    .domain(c.domain.as_str())
                    .path(c.path.as_str())
                    .secure(c.secure)
                    .http_only(c.http_only);
                if c.expires > 0.0 {
                    builder = builder.expires(TimeSinceEpoch::new(c.expires));
                }
                builder
                    .build()
                    .map_err(|e| DriverError::action_failed("构建 cookie", e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !params.is_empty() {
            debug!("写回 {} 个 cookie", params.len());
            self.page.execute(SetCookiesParams::new(params)).await?;
        }

        for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
            self.goto(&origin.origin).await?;
            let entries = serde_json::to_string(&origin.local_storage)?;
            let js = format!(
                "(() => {{ for (const [k, v] of {entries}) window.localStorage.setItem(k, v); return true; }})()"
            );
            if let Err(e) = self.eval(js).await {
                warn!("写回 {} 的 localStorage 失败: {}", origin.origin, e);
            }
        }
        Ok(())
    }
}
