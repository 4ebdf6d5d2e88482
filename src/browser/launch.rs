use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::DriverError;
use crate::infrastructure::ChromePage;

/// chromiumoxide 浏览器会话
pub struct ChromeSession {
    browser: Browser,
    driver: ChromePage,
    handler: JoinHandle<()>,
}

/// 按配置启动浏览器并打开一个空白页面
pub async fn launch_browser(config: &Config) -> Result<ChromeSession, DriverError> {
    info!(
        "🚀 启动浏览器 ({})...",
        if config.headless { "无头模式" } else { "有界面" }
    );

    let mut builder = BrowserConfig::builder()
        .window_size(config.window_width, config.window_height)
        .viewport(Viewport {
            width: config.window_width,
            height: config.window_height,
            ..Viewport::default()
        })
        .args(vec![
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--disable-blink-features=AutomationControlled",
        ]);
    if !config.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &config.chrome_executable {
        debug!("使用浏览器: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        DriverError::action_failed("配置浏览器", e)
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        DriverError::action_failed("启动浏览器", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            handler.abort();
            return Err(e.into());
        }
    };

    info!("✅ 浏览器已就绪");
    Ok(ChromeSession {
        browser,
        driver: ChromePage::new(page),
        handler,
    })
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Driver = ChromePage;

    fn driver(&self) -> &ChromePage {
        &self.driver
    }

    async fn close(mut self) -> Result<(), DriverError> {
        debug!("正在关闭浏览器...");
        drop(self.driver);
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler.abort();

        closed?;
        info!("👋 浏览器已关闭");
        Ok(())
    }
}
