//! 页面驱动抽象
//!
//! 业务层只通过这个 trait 操作页面，生产环境由 [`ChromePage`] 实现，
//! 测试中可以替换为内存实现。
//!
//! [`ChromePage`]: crate::infrastructure::ChromePage

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::infrastructure::query::ElementRef;
use crate::infrastructure::session_store::SessionState;

/// 编辑器快捷键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Ctrl+A
    SelectAll,
    /// Shift+Alt+F，编辑器自带的格式化
    FormatDocument,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 打开地址
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// 等待文档加载完成并且网络空闲，超时返回 [`DriverError::Timeout`]
    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), DriverError>;

    /// 等待选择器出现
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// 选择器在页面上是否存在
    async fn exists(&self, selector: &str) -> Result<bool, DriverError>;

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// 点击可见文本完全等于 `text` 的元素，返回是否找到
    async fn click_text(&self, text: &str) -> Result<bool, DriverError>;

    /// 用真实鼠标事件点击 iframe 内左侧的复选框位置，返回是否找到 iframe
    ///
    /// 跨域 frame 的文档无法通过脚本访问，只能按坐标点击。
    async fn click_frame(&self, frame_selector: &str) -> Result<bool, DriverError>;

    /// 在同源的嵌套 frame 中查找并点击元素，返回是否找到
    async fn click_in_frames(&self, selector: &str) -> Result<bool, DriverError>;

    async fn text_of(&self, element: &ElementRef) -> Result<String, DriverError>;

    /// 逐字键入，每个字符之间间隔 `delay`
    async fn type_text(
        &self,
        element: &ElementRef,
        text: &str,
        delay: Duration,
    ) -> Result<(), DriverError>;

    /// 在当前焦点处插入文本
    async fn insert_text(&self, text: &str) -> Result<(), DriverError>;

    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    async fn press_shortcut(&self, shortcut: Shortcut) -> Result<(), DriverError>;

    /// 导出当前会话（cookie + localStorage）
    async fn save_state(&self) -> Result<SessionState, DriverError>;

    /// 将保存的会话写回浏览器
    async fn restore_state(&self, state: &SessionState) -> Result<(), DriverError>;

    /// 固定等待
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
