//! 编辑器写入与提交 - 业务能力层

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, InputMode};
use crate::error::{QueryError, SubmitError};
use crate::infrastructure::{
    query, ElementRef, PageDriver, QueryResult, QueryTarget, SelectorRegistry, Shortcut,
};
use crate::models::SolutionArtifact;

/// 编辑器与提交按钮
#[derive(Debug, Clone)]
pub struct EditorElements {
    pub editor_content: ElementRef,
    /// 提交按钮缺失时在写入之后才报错
    pub submit_button: Option<ElementRef>,
}

impl QueryTarget for EditorElements {
    const QUERY: &'static str = "{ code_editor { editor_content } submit_button }";

    fn bind(result: &QueryResult) -> Result<Self, QueryError> {
        Ok(Self {
            editor_content: result.get("code_editor.editor_content")?,
            submit_button: result.optional("submit_button"),
        })
    }
}

/// 按字符切分，每块最多 `size` 个字符
pub fn chunk_chars(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (i, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

pub struct EditorInjector {
    registry: SelectorRegistry,
    input_mode: InputMode,
    chunk_size: usize,
    chunk_delay: Duration,
    clear_wait: Duration,
    auto_format: bool,
}

impl EditorInjector {
    pub fn new(config: &Config, registry: SelectorRegistry) -> Self {
        Self {
            registry,
            input_mode: config.input_mode,
            chunk_size: config.chunk_size,
            chunk_delay: config.chunk_delay,
            clear_wait: config.clear_wait,
            auto_format: config.auto_format,
        }
    }

    /// 清空编辑器，写入解答并点击提交
    pub async fn inject_and_submit<D>(
        &self,
        driver: &D,
        artifact: &SolutionArtifact,
    ) -> Result<(), SubmitError>
    where
        D: PageDriver + ?Sized,
    {
        let elements: EditorElements = query(driver, &self.registry)
            .await
            .map_err(SubmitError::EditorNotFound)?;

        // 聚焦 → 全选 → 删除
        driver
            .click(&elements.editor_content)
            .await
            .map_err(SubmitError::ClearFailed)?;
        driver
            .press_shortcut(Shortcut::SelectAll)
            .await
            .map_err(SubmitError::ClearFailed)?;
        driver
            .press_key("Delete")
            .await
            .map_err(SubmitError::ClearFailed)?;
        driver.pause(self.clear_wait).await;

        info!(
            "⌨️ 写入 {} 解答 ({} 行)",
            artifact.language,
            artifact.source.lines().count()
        );
        match self.input_mode {
            InputMode::Typed => {
                let chunks = chunk_chars(&artifact.source, self.chunk_size);
                debug!("分 {} 块写入", chunks.len());
                for chunk in chunks {
                    driver
                        .insert_text(chunk)
                        .await
                        .map_err(SubmitError::InsertFailed)?;
                    driver.pause(self.chunk_delay).await;
                }
            }
            InputMode::Paste => driver
                .insert_text(&artifact.source)
                .await
                .map_err(SubmitError::InsertFailed)?,
        }

        if self.auto_format {
            if let Err(e) = driver.press_shortcut(Shortcut::FormatDocument).await {
                if e.is_fatal() {
                    return Err(SubmitError::InsertFailed(e));
                }
                warn!("⚠️ 编辑器格式化失败，直接提交: {}", e);
            }
        }

        let submit = elements
            .submit_button
            .ok_or_else(|| {
                SubmitError::SubmitNotFound(QueryError::MissingField {
                    field: "submit_button".to_string(),
                })
            })?;
        driver
            .click(&submit)
            .await
            .map_err(SubmitError::ClickFailed)?;

        info!("📤 已点击提交");
        Ok(())
    }
}
