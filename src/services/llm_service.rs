//! LLM 服务 - 业务能力层
//!
//! 只负责"向模型要一段补全"能力，不关心题目和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 一条对话消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    User(String),
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User(content.into())
    }
}

/// 补全接口
///
/// 生产环境由 [`LlmService`] 实现，测试中可替换为脚本化的假实现。
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model_name(&self) -> &str;

    /// 发送消息并返回第一条候选的文本内容
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// LLM 服务
///
/// 职责：
/// - 持有 OpenAI 兼容客户端
/// - 把消息列表转换为 chat completion 请求
/// - 不认识题目 / 编辑器
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 构建请求
    pub fn build_request(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let build_err = |e: async_openai::error::OpenAIError| LlmError::RequestBuild(e.to_string());

        let mut request_messages = Vec::with_capacity(messages.len());
        for message in messages {
            let converted = match message {
                ChatMessage::User(content) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(content.as_str())
                        .build()
                        .map_err(build_err)?,
                ),
            };
            request_messages.push(converted);
        }

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(request_messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_err)
    }
}

#[async_trait]
impl CompletionClient for LlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!(
            "消息总长度: {} 字符",
            messages
                .iter()
                .map(|m| match m {
                    ChatMessage::User(c) => c.chars().count(),
                })
                .sum::<usize>()
        );

        let request = self.build_request(messages)?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> LlmService {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_model_name: "gpt-4".to_string(),
            ..Config::default()
        };
        LlmService::new(&config)
    }

    #[test]
    fn test_build_request_single_user_message() {
        let request = service()
            .build_request(&[ChatMessage::user("solve it")])
            .unwrap();
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.messages.len(), 1);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::User(_)
        ));
    }

    #[test]
    fn test_build_request_uses_configured_sampling() {
        let request = service()
            .build_request(&[ChatMessage::user("first"), ChatMessage::user("second")])
            .unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(Config::default().llm_temperature));
    }

    /// 需要真实 API，默认跳过
    #[tokio::test]
    #[ignore]
    async fn test_live_completion() {
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config
            .apply_env(|name| std::env::var(name).ok())
            .unwrap();
        let service = LlmService::new(&config);
        let reply = service
            .complete(&[ChatMessage::user("Reply with the single word: pong")])
            .await
            .unwrap();
        assert!(!reply.trim().is_empty());
    }
}
