//! 声明式页面查询
//!
//! 查询文本形如 `{ problem_title code_editor { current_language } }`，
//! 解析为字段路径（`code_editor.current_language`），每个路径按顺序尝试
//! 若干候选 CSS 选择器，第一个在页面上存在的即为该字段的元素。
//!
//! 调用方通过实现 [`QueryTarget`] 的结构体取用结果，必需字段缺失时在
//! 绑定阶段就以 [`QueryError::MissingField`] 报错。

use std::collections::HashMap;

use phf::phf_map;
use tracing::debug;

use crate::error::QueryError;
use crate::infrastructure::page_driver::PageDriver;

/// 查询中的一个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    /// 以 `.` 连接的字段路径
    pub path: String,
    /// 是否为包含子字段的容器
    pub is_container: bool,
}

/// 解析后的查询结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySchema {
    fields: Vec<QueryField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Ident(String),
}

impl QuerySchema {
    /// 解析查询文本
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(text)?;
        let mut iter = tokens.into_iter().peekable();

        match iter.next() {
            Some((_, Token::Open)) => {}
            Some((position, _)) => return Err(parse_error(position, "查询必须以 '{' 开头")),
            None => return Err(parse_error(0, "查询为空")),
        }

        let mut fields: Vec<QueryField> = Vec::new();
        // (容器路径, 打开时已有的字段数)
        let mut open: Vec<(String, usize)> = Vec::new();
        let mut closed = false;

        while let Some((position, token)) = iter.next() {
            if closed {
                return Err(parse_error(position, "查询结束后仍有多余内容"));
            }
            match token {
                Token::Ident(name) => {
                    let path = match open.last() {
                        Some((parent, _)) => format!("{parent}.{name}"),
                        None => name,
                    };
                    if fields.iter().any(|f| f.path == path) {
                        return Err(parse_error(position, format!("重复的字段 {path}")));
                    }
                    let is_container = matches!(iter.peek(), Some((_, Token::Open)));
                    fields.push(QueryField {
                        path: path.clone(),
                        is_container,
                    });
                    if is_container {
                        iter.next();
                        open.push((path, fields.len()));
                    }
                }
                Token::Open => return Err(parse_error(position, "'{' 前缺少字段名")),
                Token::Close => match open.pop() {
                    Some((path, count)) => {
                        if fields.len() == count {
                            return Err(parse_error(position, format!("容器 {path} 没有子字段")));
                        }
                    }
                    None => closed = true,
                },
            }
        }

        if !closed {
            return Err(parse_error(text.len(), "缺少 '}'"));
        }
        if fields.is_empty() {
            return Err(parse_error(0, "查询没有任何字段"));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    /// 所有叶子字段的路径
    pub fn leaves(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !f.is_container)
            .map(|f| f.path.as_str())
    }
}

fn parse_error(position: usize, message: impl Into<String>) -> QueryError {
    QueryError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' => tokens.push((i, Token::Open)),
            '}' => tokens.push((i, Token::Close)),
            c if c.is_whitespace() || c == ',' => {}
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((i, Token::Ident(ident)));
            }
            other => return Err(parse_error(i, format!("无法识别的字符 '{other}'"))),
        }
    }
    Ok(tokens)
}

// ========== 字段 → 候选选择器 ==========

const USERNAME_FIELD: &[&str] = &["#id_login", "input[name=\"login\"]", "#username"];
const PASSWORD_FIELD: &[&str] = &["#id_password", "input[name=\"password\"]", "#password"];
const SIGNIN_BUTTON: &[&str] = &["#signin_btn", "button[type=\"submit\"]", "#login"];
const CHALLENGE_CHECKBOX: &[&str] = &[
    "input[type=\"checkbox\"]",
    ".ctp-checkbox-label",
    "#challenge-stage",
];
const CHALLENGE_FRAME: &[&str] = &[
    "iframe[src*=\"challenges.cloudflare.com\"]",
    "iframe[title*=\"challenge\"]",
    "iframe[src*=\"hcaptcha.com\"]",
    "iframe[src*=\"recaptcha\"]",
];
const SITE_HEADER: &[&str] = &["#navbar_user_avatar", "#navbar-root", ".site-header"];
const PICKONE_BUTTON: &[&str] = &[
    "a[aria-label=\"Pick One\"]",
    "button[aria-label=\"Pick One\"]",
    "[data-icon=\"shuffle\"]",
];
const PROBLEM_TITLE: &[&str] = &[
    "div.text-title-large a",
    "div.text-title-large",
    "[data-cy=\"question-title\"]",
];
const PROBLEM_CONTENT: &[&str] = &[
    "[data-track-load=\"description_content\"]",
    "[data-key=\"description-content\"]",
    "div.question-content",
];
const CODE_EDITOR: &[&str] = &["#editor", "[data-track-load=\"code_editor\"]", ".monaco-editor"];
const LANGUAGE_SELECT: &[&str] = &[
    "#editor button[aria-haspopup=\"dialog\"]",
    "button[id^=\"headlessui-popover-button\"]",
    "[data-cy=\"lang-select\"]",
];
const CURRENT_LANGUAGE: &[&str] = &[
    "#editor button[aria-haspopup=\"dialog\"]",
    "button[id^=\"headlessui-popover-button\"]",
    "[data-cy=\"lang-select\"] .ant-select-selection-selected-value",
];
const EDITOR_CONTENT: &[&str] = &[".monaco-editor .view-lines", ".view-lines", ".CodeMirror-code"];
const SUBMIT_BUTTON: &[&str] = &[
    "[data-e2e-locator=\"console-submit-button\"]",
    "button[data-cy=\"submit-code-btn\"]",
];

static DEFAULT_SELECTORS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "username_field" => USERNAME_FIELD,
    "password_field" => PASSWORD_FIELD,
    "signin_button" => SIGNIN_BUTTON,
    "challenge_frame" => CHALLENGE_FRAME,
    "challenge_checkbox" => CHALLENGE_CHECKBOX,
    "site_header" => SITE_HEADER,
    "pickone_button" => PICKONE_BUTTON,
    "problem_title" => PROBLEM_TITLE,
    "problem_content" => PROBLEM_CONTENT,
    "code_editor" => CODE_EDITOR,
    "code_editor.language_select" => LANGUAGE_SELECT,
    "code_editor.current_language" => CURRENT_LANGUAGE,
    "code_editor.editor_content" => EDITOR_CONTENT,
    "submit_button" => SUBMIT_BUTTON,
};

/// 字段选择器表：内置默认值，可由配置文件覆盖
#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    overrides: HashMap<String, Vec<String>>,
}

impl SelectorRegistry {
    pub fn with_overrides(overrides: HashMap<String, Vec<String>>) -> Self {
        Self { overrides }
    }

    /// 字段的候选选择器，按优先级排列
    pub fn candidates(&self, path: &str) -> Option<Vec<String>> {
        if let Some(list) = self.overrides.get(path).filter(|l| !l.is_empty()) {
            return Some(list.clone());
        }
        DEFAULT_SELECTORS
            .get(path)
            .map(|list| list.iter().map(|s| s.to_string()).collect())
    }
}

// ========== 查询结果 ==========

/// 已定位的页面元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub field: String,
    pub selector: String,
}

/// 查询结果：字段路径 → 元素
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    elements: HashMap<String, ElementRef>,
}

impl QueryResult {
    /// 取必需字段
    pub fn get(&self, path: &str) -> Result<ElementRef, QueryError> {
        self.elements
            .get(path)
            .cloned()
            .ok_or_else(|| QueryError::MissingField {
                field: path.to_string(),
            })
    }

    /// 取可选字段
    pub fn optional(&self, path: &str) -> Option<ElementRef> {
        self.elements.get(path).cloned()
    }
}

/// 由查询结果绑定出的强类型元素集合
pub trait QueryTarget: Sized {
    /// 查询文本
    const QUERY: &'static str;

    fn bind(result: &QueryResult) -> Result<Self, QueryError>;
}

/// 在页面上解析查询
pub async fn query_elements<D>(
    driver: &D,
    schema: &QuerySchema,
    registry: &SelectorRegistry,
) -> Result<QueryResult, QueryError>
where
    D: PageDriver + ?Sized,
{
    let mut elements = HashMap::new();

    for field in schema.fields() {
        let candidates = registry
            .candidates(&field.path)
            .ok_or_else(|| QueryError::UnknownField {
                field: field.path.clone(),
            })?;

        for selector in candidates {
            match driver.exists(&selector).await {
                Ok(true) => {
                    debug!("字段 {} 命中选择器 {}", field.path, selector);
                    elements.insert(
                        field.path.clone(),
                        ElementRef {
                            field: field.path.clone(),
                            selector,
                        },
                    );
                    break;
                }
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => debug!("选择器 {} 检查失败: {}", selector, e),
            }
        }
    }

    if elements.is_empty() {
        return Err(QueryError::NothingMatched);
    }
    Ok(QueryResult { elements })
}

/// 解析查询并绑定为强类型结构
pub async fn query<T, D>(driver: &D, registry: &SelectorRegistry) -> Result<T, QueryError>
where
    T: QueryTarget,
    D: PageDriver + ?Sized,
{
    let schema = QuerySchema::parse(T::QUERY)?;
    let result = query_elements(driver, &schema, registry).await?;
    T::bind(&result)
}
