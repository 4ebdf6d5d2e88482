//! 会话存储
//!
//! 登录成功后把浏览器的 cookie 和 localStorage 序列化到磁盘，
//! 文件存在即表示可以跳过登录。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::SessionError;

/// 浏览器会话快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// 保存时间（RFC 3339）
    pub saved_at: String,
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// 过期时间（秒级时间戳），会话 cookie 为 -1
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
}

/// 某个源下的 localStorage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginStorage {
    pub origin: String,
    pub local_storage: Vec<(String, String)>,
}

/// 会话文件存储
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 会话文件是否存在
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn load(&self) -> Result<SessionState, SessionError> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        let state = serde_json::from_str(&content).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })?;
        debug!("已读取会话文件: {}", self.path.display());
        Ok(state)
    }

    /// 写入会话文件（先写临时文件再改名）
    pub async fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let json = serde_json::to_string_pretty(state).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        info!("💾 会话已保存: {} ({} 个 cookie)", self.path.display(), state.cookies.len());
        Ok(())
    }

    /// 删除会话文件，返回删除前是否存在
    pub async fn delete(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("🗑️ 已删除会话文件: {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
