//! 浏览器会话
//!
//! 启动浏览器并把页面包装成 [`PageDriver`]，会话关闭只能发生一次。

pub mod launch;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::infrastructure::PageDriver;

pub use launch::{launch_browser, ChromeSession};

/// 一次运行所使用的浏览器会话
///
/// `close` 消费会话本身，关闭之后无法再次使用或重复关闭。
#[async_trait]
pub trait BrowserSession: Send + Sync + Sized {
    type Driver: PageDriver;

    fn driver(&self) -> &Self::Driver;

    async fn close(self) -> Result<(), DriverError>;
}
