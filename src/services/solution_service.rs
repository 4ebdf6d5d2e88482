//! 解题服务 - 业务能力层
//!
//! 读取题目和编辑器信息，协商编辑器语言，构造提示词并调用一次补全，
//! 把模型输出整理成可直接写入编辑器的源码。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DriverError, LlmError, QueryError, SolveError};
use crate::infrastructure::{query, ElementRef, PageDriver, QueryResult, QueryTarget, SelectorRegistry};
use crate::models::{canonical_problem_url, Language, ProblemContext, SolutionArtifact};
use crate::services::formatter::{strip_code_fences, SolutionFormatter};
use crate::services::llm_service::{ChatMessage, CompletionClient};
use crate::utils::logging::truncate_text;
use crate::workflow::RunContext;

/// 题目页面元素
#[derive(Debug, Clone)]
pub struct ProblemElements {
    pub problem_title: ElementRef,
    pub problem_content: ElementRef,
    pub language_select: Option<ElementRef>,
    pub current_language: Option<ElementRef>,
    pub editor_content: ElementRef,
}

impl QueryTarget for ProblemElements {
    const QUERY: &'static str = r#"
    {
        problem_title
        problem_content
        code_editor {
            language_select
            current_language
            editor_content
        }
    }
    "#;

    fn bind(result: &QueryResult) -> Result<Self, QueryError> {
        Ok(Self {
            problem_title: result.get("problem_title")?,
            problem_content: result.get("problem_content")?,
            language_select: result.optional("code_editor.language_select"),
            current_language: result.optional("code_editor.current_language"),
            editor_content: result.get("code_editor.editor_content")?,
        })
    }
}

/// 构造提示词
///
/// 编辑器语言未知时不指定语言，要求沿用代码框架的语言。
pub fn build_prompt(problem: &ProblemContext, base_url: &str) -> String {
    let language = match &problem.language {
        Language::Unknown => "the language of the starter code".to_string(),
        known => known.label().to_string(),
    };
    let shape = if problem.language.is_query_language() {
        format!(
            "- Answer with a single {language} query/program that produces the required output. Do not wrap it in a class."
        )
    } else if problem.language == Language::Unknown {
        "- Keep the class and the exact signature from the starter code and write the complete implementation in the same language.".to_string()
    } else {
        format!(
            "- Keep the `Solution` class and the exact method signature from the starter code and put the complete {language} implementation inside it."
        )
    };
    let scaffold = if problem.scaffold.trim().is_empty() {
        "(none)"
    } else {
        problem.scaffold.as_str()
    };

    format!(
        "Solve the following LeetCode problem in {language}.\n\
         \n\
         Problem: {title}\n\
         URL: {url}\n\
         Language: {language}\n\
         \n\
         Description:\n\
         {statement}\n\
         \n\
         Starter code:\n\
         {scaffold}\n\
         \n\
         Rules:\n\
         - Reply with ONLY the source code. No explanations, no prose, no markdown code fences.\n\
         - Do not mention yourself, the model or any assistant name anywhere in the code.\n\
         {shape}\n\
         - Handle all edge cases and aim for optimal time and space complexity.\n",
        title = problem.title,
        url = canonical_problem_url(base_url, &problem.url, &problem.title),
        statement = problem.statement.trim(),
    )
}

/// 解题服务
pub struct SolutionGenerator<C> {
    client: C,
    formatter: SolutionFormatter,
    registry: SelectorRegistry,
    base_url: String,
    dropdown_wait: Duration,
    verbose_logging: bool,
}

impl<C: CompletionClient> SolutionGenerator<C> {
    pub fn new(
        client: C,
        formatter: SolutionFormatter,
        config: &Config,
        registry: SelectorRegistry,
    ) -> Self {
        Self {
            client,
            formatter,
            registry,
            base_url: config.base_url.clone(),
            dropdown_wait: config.dropdown_wait,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 为当前打开的题目生成解答
    pub async fn generate<D>(
        &self,
        driver: &D,
        run_ctx: &mut RunContext,
    ) -> Result<SolutionArtifact, SolveError>
    where
        D: PageDriver + ?Sized,
    {
        let elements: ProblemElements = query(driver, &self.registry)
            .await
            .map_err(SolveError::Extraction)?;

        let url = driver.current_url().await.map_err(SolveError::Read)?;
        let title = read_text(driver, &elements.problem_title).await?;
        let statement = read_text(driver, &elements.problem_content).await?;
        info!("📖 题目: {} ({})", title, url);

        let language = self.negotiate_language(driver, &elements, run_ctx).await?;

        // 语言切换后编辑器内容会变化，最后再读取代码框架
        let scaffold = read_text(driver, &elements.editor_content)
            .await?
            .replace('\u{a0}', " ");

        let problem = ProblemContext {
            url,
            title,
            statement,
            language,
            scaffold,
        };
        let prompt = build_prompt(&problem, &self.base_url);
        if self.verbose_logging {
            debug!("提示词: {}", truncate_text(&prompt, 300));
        }

        info!(
            "🤖 请求 {} 生成 {} 解答...",
            self.client.model_name(),
            problem.language
        );
        let raw = match self.client.complete(&[ChatMessage::user(prompt)]).await {
            Ok(raw) => raw,
            Err(LlmError::EmptyContent { .. }) => return Err(SolveError::EmptyCompletion),
            Err(e) => return Err(SolveError::Completion(e)),
        };

        let stripped = strip_code_fences(&raw);
        if stripped.trim().is_empty() {
            return Err(SolveError::EmptyCompletion);
        }
        let source = self.formatter.format(&stripped, &problem.language).await;
        if source.trim().is_empty() {
            return Err(SolveError::EmptyCompletion);
        }

        debug!("解答共 {} 行", source.lines().count());
        Ok(SolutionArtifact {
            language: problem.language,
            source,
        })
    }

    /// 尝试把编辑器切换到期望语言，返回最终生效的语言
    ///
    /// 协商失败不会让本题失败，只有浏览器断连会向上传递。
    async fn negotiate_language<D>(
        &self,
        driver: &D,
        elements: &ProblemElements,
        run_ctx: &mut RunContext,
    ) -> Result<Language, SolveError>
    where
        D: PageDriver + ?Sized,
    {
        let preferred = run_ctx.preferred_language.clone();

        let Some(current_el) = &elements.current_language else {
            warn!("⚠️ 无法确定编辑器当前语言，沿用代码框架的语言");
            return Ok(Language::Unknown);
        };
        let current = read_language(driver, current_el).await?;
        debug!("编辑器当前语言: {}", current);

        if !run_ctx.should_negotiate_language() {
            debug!("语言已确认，跳过切换");
            return Ok(current);
        }
        if current == preferred {
            run_ctx.language_confirmed = true;
            return Ok(current);
        }
        if current.is_query_language() {
            info!("本题为 {} 题，保持当前语言", current);
            return Ok(current);
        }

        let Some(select) = &elements.language_select else {
            warn!("⚠️ 找不到语言下拉框，继续使用 {}", current);
            return Ok(current);
        };

        if let Err(e) = driver.click(select).await {
            return tolerate(e, current, "打开语言下拉框");
        }
        driver.pause(self.dropdown_wait).await;

        match driver.click_text(preferred.label()).await {
            Ok(true) => {
                info!("✓ 已选择语言 {}", preferred);
                // 等编辑器换上新语言的代码框架
                driver.pause(self.dropdown_wait).await;
            }
            Ok(false) => {
                info!("{} 不可用，继续使用 {}", preferred, current);
                return Ok(current);
            }
            Err(e) => return tolerate(e, current, "选择语言"),
        }

        let active = read_language(driver, current_el).await?;
        if active == preferred {
            run_ctx.language_confirmed = true;
            info!("✓ 编辑器语言已确认为 {}", active);
        } else {
            warn!("⚠️ 切换后编辑器语言为 {}，与期望的 {} 不符", active, preferred);
        }
        Ok(active)
    }
}

async fn read_text<D>(driver: &D, element: &ElementRef) -> Result<String, SolveError>
where
    D: PageDriver + ?Sized,
{
    driver
        .text_of(element)
        .await
        .map(|t| t.trim().to_string())
        .map_err(SolveError::Read)
}

async fn read_language<D>(driver: &D, element: &ElementRef) -> Result<Language, SolveError>
where
    D: PageDriver + ?Sized,
{
    read_text(driver, element)
        .await
        .map(|label| Language::from_label(&label))
}

fn tolerate(err: DriverError, current: Language, action: &str) -> Result<Language, SolveError> {
    if err.is_fatal() {
        return Err(SolveError::Read(err));
    }
    warn!("⚠️ {}失败，继续使用 {}: {}", action, current, err);
    Ok(current)
}
