//! 解答后处理
//!
//! 去掉模型输出外层的 Markdown 代码块标记，再按目标语言整理缩进。
//! 输出总是以且仅以一个换行结尾，对同一输入重复格式化结果不变。

use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{IndentStyle, Language};

/// 外部格式化命令的最长执行时间
const EXTERNAL_FORMATTER_TIMEOUT: Duration = Duration::from_secs(10);

/// 去掉开头的 ```lang 和结尾的 ```
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Ok(re) = Regex::new(r"^```[A-Za-z0-9_+#.\-]*[ \t]*(\r?\n|$)") {
        text = re.replace(&text, "").into_owned();
    }
    if let Ok(re) = Regex::new(r"(\r?\n|^)[ \t]*```[ \t]*$") {
        text = re.replace(&text, "").into_owned();
    }
    text
}

/// 行尾空白去掉，首尾空行去掉，结尾保留一个换行；内容为空时返回空串
pub fn normalize_whitespace(source: &str) -> String {
    let lines: Vec<&str> = source.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => {
            let mut out = lines[start..=end].join("\n");
            out.push('\n');
            out
        }
        _ => String::new(),
    }
}

/// 按缩进风格整理源码
pub fn reindent(source: &str, style: IndentStyle) -> String {
    let normalized = normalize_whitespace(source);
    match style {
        IndentStyle::Offside => normalize_whitespace(&reindent_offside(&normalized)),
        IndentStyle::Braces => normalize_whitespace(&reindent_braces(&normalized)),
        IndentStyle::Preserve => normalized,
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// 缩进敏感的语言：展开 tab，去掉公共缩进，缩进单位统一为 4 个空格
fn reindent_offside(source: &str) -> String {
    let expanded: Vec<String> = source
        .lines()
        .map(|line| {
            let body = line.trim_start_matches([' ', '\t']);
            let prefix = &line[..line.len() - body.len()];
            let width: usize = prefix.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum();
            format!("{}{}", " ".repeat(width), body)
        })
        .collect();

    let code_lines = || expanded.iter().filter(|l| !l.trim().is_empty());
    let common = code_lines().map(|l| leading_spaces(l)).min().unwrap_or(0);
    let unit = code_lines()
        .map(|l| leading_spaces(l) - common)
        .filter(|&n| n > 0)
        .fold(0, gcd);

    // 续行对齐等不规则缩进保持原样
    let rescale = matches!(unit, 2 | 3 | 8);

    expanded
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                return String::new();
            }
            let indent = leading_spaces(line) - common;
            let indent = if rescale { indent / unit * 4 } else { indent };
            format!("{}{}", " ".repeat(indent), line.trim_start())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 括号语言：按花括号深度重新缩进
fn reindent_braces(source: &str) -> String {
    let mut depth: usize = 0;
    let mut in_block_comment = false;
    let mut out = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }

        let leading_closers = if in_block_comment {
            0
        } else {
            trimmed.chars().take_while(|&c| c == '}').count()
        };
        let mut level = depth.saturating_sub(leading_closers);
        if is_access_label(trimmed) {
            level = level.saturating_sub(1);
        }

        let indent = "    ".repeat(level);
        if in_block_comment && trimmed.starts_with('*') {
            out.push(format!("{indent} {trimmed}"));
        } else {
            out.push(format!("{indent}{trimmed}"));
        }

        let (opens, closes) = count_braces(trimmed, &mut in_block_comment);
        depth = (depth + opens).saturating_sub(closes);
    }

    out.join("\n")
}

fn is_access_label(line: &str) -> bool {
    matches!(line, "public:" | "private:" | "protected:")
}

/// 统计一行中代码部分的花括号数量，跳过字符串、字符字面量和注释
fn count_braces(line: &str, in_block_comment: &mut bool) -> (usize, usize) {
    let chars: Vec<char> = line.chars().collect();
    let (mut opens, mut closes) = (0, 0);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if *in_block_comment {
            if c == '*' && next == Some('/') {
                *in_block_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        match c {
            '/' if next == Some('/') => break,
            '#' if i == 0 => break,
            '/' if next == Some('*') => {
                *in_block_comment = true;
                i += 2;
            }
            '"' | '`' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            '\'' => {
                // 'x' 或 '\n' 为字符字面量，其余（如 Rust 生命周期）忽略
                if next == Some('\\') {
                    i += 2;
                    while i < chars.len() && chars[i] != '\'' {
                        i += 1;
                    }
                    i += 1;
                } else if chars.get(i + 2) == Some(&'\'') {
                    i += 3;
                } else {
                    i += 1;
                }
            }
            '{' => {
                opens += 1;
                i += 1;
            }
            '}' => {
                closes += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    (opens, closes)
}

/// 解答格式化器
#[derive(Debug, Clone, Default)]
pub struct SolutionFormatter {
    /// 外部格式化命令（程序 + 参数），从 stdin 读源码
    external: Option<Vec<String>>,
}

impl SolutionFormatter {
    pub fn new(config: &Config) -> Self {
        let external = config
            .formatter_command
            .as_deref()
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        Self { external }
    }

    /// 格式化已去掉代码块标记的源码
    pub async fn format(&self, source: &str, language: &Language) -> String {
        if let Some(command) = &self.external {
            return match run_external(command, source).await {
                Ok(formatted) if !formatted.trim().is_empty() => normalize_whitespace(&formatted),
                Ok(_) => {
                    warn!("⚠️ 外部格式化命令没有输出，使用原始代码");
                    normalize_whitespace(source)
                }
                Err(e) => {
                    warn!("⚠️ 外部格式化失败，使用原始代码: {}", e);
                    normalize_whitespace(source)
                }
            };
        }

        let style = language.indent_style();
        debug!("按 {:?} 风格整理 {} 代码缩进", style, language);
        reindent(source, style)
    }
}

async fn run_external(command: &[String], source: &str) -> Result<String, String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| "格式化命令为空".to_string())?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("无法启动 {program}: {e}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(source.as_bytes())
            .await
            .map_err(|e| format!("写入 stdin 失败: {e}"))?;
    }

    let output = tokio::time::timeout(EXTERNAL_FORMATTER_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("{program} 执行超时"))?
        .map_err(|e| format!("等待 {program} 失败: {e}"))?;

    if !output.status.success() {
        return Err(format!("{program} 退出码 {}", output.status));
    }
    String::from_utf8(output.stdout).map_err(|e| format!("输出不是 UTF-8: {e}"))
}
