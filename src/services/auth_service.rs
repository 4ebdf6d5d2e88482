//! 登录服务 - 业务能力层
//!
//! 打开登录页，处理人机验证复选框，逐字输入凭据，提交后把会话写入磁盘。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, Credentials};
use crate::error::{AuthError, DriverError, QueryError};
use crate::infrastructure::{
    query, ElementRef, PageDriver, QueryResult, QueryTarget, SelectorRegistry, SessionState,
    SessionStore,
};

/// 登录表单
#[derive(Debug, Clone)]
pub struct LoginElements {
    pub username_field: ElementRef,
    pub password_field: ElementRef,
    pub signin_button: ElementRef,
}

impl QueryTarget for LoginElements {
    const QUERY: &'static str = "{ username_field password_field signin_button }";

    fn bind(result: &QueryResult) -> Result<Self, QueryError> {
        Ok(Self {
            username_field: result.get("username_field")?,
            password_field: result.get("password_field")?,
            signin_button: result.get("signin_button")?,
        })
    }
}

/// 登录服务
pub struct Authenticator {
    login_url: String,
    navigation_timeout: Duration,
    keystroke_delay: Duration,
    human_verification_wait: Duration,
    registry: SelectorRegistry,
    store: SessionStore,
}

impl Authenticator {
    pub fn new(config: &Config, registry: SelectorRegistry, store: SessionStore) -> Self {
        Self {
            login_url: config.login_url.clone(),
            navigation_timeout: config.navigation_timeout,
            keystroke_delay: config.keystroke_delay,
            human_verification_wait: config.human_verification_wait,
            registry,
            store,
        }
    }

    /// 登录并保存会话，返回保存的会话状态
    pub async fn authenticate<D>(
        &self,
        driver: &D,
        credentials: &Credentials,
    ) -> Result<SessionState, AuthError>
    where
        D: PageDriver + ?Sized,
    {
        info!("🔐 打开登录页: {}", self.login_url);
        match driver.goto(&self.login_url).await {
            Ok(()) => {}
            Err(DriverError::Timeout { after, .. }) => {
                warn!("⚠️ 打开登录页超时 ({:?})，继续执行", after);
            }
            Err(e) => {
                return Err(AuthError::Navigation {
                    url: self.login_url.clone(),
                    message: e.to_string(),
                })
            }
        }
        self.wait_ready(driver, "登录页").await?;

        self.try_challenge_checkbox(driver).await;

        let form: LoginElements = query(driver, &self.registry).await.map_err(|e| match e {
            QueryError::MissingField { field } => AuthError::ElementNotFound { field },
            QueryError::NothingMatched => AuthError::ElementNotFound {
                field: "username_field".to_string(),
            },
            other => AuthError::Unknown(other.to_string()),
        })?;

        debug!("输入用户名: {}", credentials.username);
        driver
            .type_text(&form.username_field, &credentials.username, self.keystroke_delay)
            .await
            .map_err(unknown)?;
        driver
            .type_text(&form.password_field, &credentials.password, self.keystroke_delay)
            .await
            .map_err(unknown)?;

        info!(
            "⏳ 等待 {} 秒，如出现验证码请手动完成...",
            self.human_verification_wait.as_secs()
        );
        driver.pause(self.human_verification_wait).await;

        driver.click(&form.signin_button).await.map_err(unknown)?;
        self.wait_ready(driver, "登录跳转").await?;
        self.confirm_logged_in(driver).await?;

        let state = driver.save_state().await.map_err(unknown)?;
        if let Err(e) = self.store.save(&state).await {
            warn!("❌ 保存会话失败: {}", e);
            return Err(AuthError::PersistFailed {
                path: self.store.path().to_path_buf(),
            });
        }
        if !self.store.exists() {
            return Err(AuthError::PersistFailed {
                path: self.store.path().to_path_buf(),
            });
        }

        info!("✅ 登录成功");
        Ok(state)
    }

    /// 等待页面就绪；超时只记录，继续后续步骤
    async fn wait_ready<D>(&self, driver: &D, what: &str) -> Result<(), AuthError>
    where
        D: PageDriver + ?Sized,
    {
        match driver.wait_until_ready(self.navigation_timeout).await {
            Ok(()) => Ok(()),
            Err(DriverError::Timeout { after, .. }) => {
                warn!("⚠️ {} 加载超时 ({:?})，继续执行", what, after);
                Ok(())
            }
            Err(e) => Err(AuthError::Navigation {
                url: self.login_url.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// 尝试点击人机验证复选框，失败不影响登录
    ///
    /// 先按坐标点击挑战 iframe（通常跨域），再在同源 frame 中查找复选框。
    async fn try_challenge_checkbox<D>(&self, driver: &D)
    where
        D: PageDriver + ?Sized,
    {
        let frames = self.registry.candidates("challenge_frame").unwrap_or_default();
        for selector in frames {
            match driver.click_frame(&selector).await {
                Ok(true) => {
                    info!("✓ 已点击人机验证框: {}", selector);
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("⚠️ 点击人机验证框失败: {}", e);
                    return;
                }
            }
        }

        let checkboxes = self
            .registry
            .candidates("challenge_checkbox")
            .unwrap_or_default();
        for selector in checkboxes {
            match driver.click_in_frames(&selector).await {
                Ok(true) => {
                    info!("✓ 已点击人机验证复选框");
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("⚠️ 点击人机验证复选框失败: {}", e);
                    return;
                }
            }
        }
        debug!("未发现人机验证复选框");
    }

    /// 等待已登录标记出现
    async fn confirm_logged_in<D>(&self, driver: &D) -> Result<(), AuthError>
    where
        D: PageDriver + ?Sized,
    {
        let Some(candidates) = self.registry.candidates("site_header") else {
            return Ok(());
        };
        match driver
            .wait_for(&candidates.join(", "), self.navigation_timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(DriverError::Timeout { .. }) => Err(AuthError::LoginNotConfirmed),
            Err(e) => Err(unknown(e)),
        }
    }
}

fn unknown(err: DriverError) -> AuthError {
    AuthError::Unknown(err.to_string())
}
