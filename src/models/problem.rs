use crate::models::language::Language;

/// 当前题目的上下文，每道题重新提取，不跨题缓存
#[derive(Debug, Clone)]
pub struct ProblemContext {
    /// 页面地址
    pub url: String,
    /// 题目标题（如 "1. Two Sum"）
    pub title: String,
    /// 题目描述全文
    pub statement: String,
    /// 编辑器当前语言
    pub language: Language,
    /// 编辑器中的初始代码框架
    pub scaffold: String,
}

/// 待写入编辑器的解答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionArtifact {
    pub language: Language,
    /// 已去除代码块标记并格式化的源码
    pub source: String,
}

/// 由标题生成题目的 slug：去掉 "<编号>. " 前缀，小写，删除标点，空白和 '-' 折叠为单个 '-'
pub fn slugify_title(title: &str) -> String {
    let title = title.trim();
    let without_index = match title.split_once(". ") {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => title,
    };

    let mut slug = String::with_capacity(without_index.len());
    for c in without_index.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// 从题目页地址中取出 `/problems/<slug>/` 段
pub fn slug_from_url(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/problems/")?;
    let slug = rest.split(['/', '?', '#']).next()?;
    (!slug.is_empty()).then_some(slug)
}

/// 题目的规范地址，优先使用页面地址中的 slug
pub fn canonical_problem_url(base_url: &str, page_url: &str, title: &str) -> String {
    let slug = match slug_from_url(page_url) {
        Some(slug) => slug.to_string(),
        None => slugify_title(title),
    };
    format!("{}/problems/{}/", base_url.trim_end_matches('/'), slug)
}
