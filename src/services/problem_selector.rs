//! 选题服务 - 业务能力层
//!
//! 打开题库页并点击随机选题按钮。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DriverError, QueryError, SelectionError};
use crate::infrastructure::{query, ElementRef, PageDriver, QueryResult, QueryTarget, SelectorRegistry};

/// 随机选题按钮
#[derive(Debug, Clone)]
pub struct RandomProblemElements {
    pub pickone_button: ElementRef,
}

impl QueryTarget for RandomProblemElements {
    const QUERY: &'static str = "{ pickone_button }";

    fn bind(result: &QueryResult) -> Result<Self, QueryError> {
        Ok(Self {
            pickone_button: result.get("pickone_button")?,
        })
    }
}

pub struct ProblemSelector {
    problemset_url: String,
    navigation_timeout: Duration,
    problem_load_wait: Duration,
    registry: SelectorRegistry,
}

impl ProblemSelector {
    pub fn new(config: &Config, registry: SelectorRegistry) -> Self {
        Self {
            problemset_url: config.problemset_url.clone(),
            navigation_timeout: config.navigation_timeout,
            problem_load_wait: config.problem_load_wait,
            registry,
        }
    }

    /// 打开一道随机题目
    pub async fn select_random_problem<D>(&self, driver: &D) -> Result<(), SelectionError>
    where
        D: PageDriver + ?Sized,
    {
        debug!("打开题库: {}", self.problemset_url);
        match driver.goto(&self.problemset_url).await {
            Err(DriverError::Timeout { after, .. }) => {
                warn!("⚠️ 打开题库页超时 ({:?})，继续执行", after);
            }
            other => other.map_err(SelectionError::Navigation)?,
        }
        self.wait_ready(driver).await.map_err(SelectionError::Navigation)?;

        let controls: RandomProblemElements = query(driver, &self.registry)
            .await
            .map_err(SelectionError::ControlNotFound)?;

        info!("🎲 点击随机选题");
        driver
            .click(&controls.pickone_button)
            .await
            .map_err(SelectionError::ClickFailed)?;

        driver.pause(self.problem_load_wait).await;
        self.wait_ready(driver).await.map_err(SelectionError::Navigation)?;

        if let Ok(url) = driver.current_url().await {
            info!("✓ 已打开题目: {}", url);
        }
        Ok(())
    }

    /// 超时和非致命错误只记录
    async fn wait_ready<D>(&self, driver: &D) -> Result<(), DriverError>
    where
        D: PageDriver + ?Sized,
    {
        match driver.wait_until_ready(self.navigation_timeout).await {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("⚠️ 题库页未完全加载，继续执行: {}", e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}
