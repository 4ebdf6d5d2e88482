/// 编辑器语言
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Python3,
    Python,
    Cpp,
    C,
    Java,
    CSharp,
    JavaScript,
    TypeScript,
    Php,
    Swift,
    Kotlin,
    Dart,
    Go,
    Ruby,
    Scala,
    Rust,
    Racket,
    Erlang,
    Elixir,
    MySql,
    MsSqlServer,
    OracleSql,
    PostgreSql,
    Pandas,
    Bash,
    /// 未识别的语言，保留页面上的原始标签
    Other(String),
    /// 无法读取编辑器当前语言
    Unknown,
}

/// 源码缩进风格，决定格式化时采用的启发式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    /// 以缩进表示代码块（Python）
    Offside,
    /// 以花括号表示代码块
    Braces,
    /// 保持原样
    Preserve,
}

impl Language {
    /// 从编辑器显示的标签解析语言
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Language::Unknown;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "python3" => Language::Python3,
            "python" => Language::Python,
            "c++" | "cpp" => Language::Cpp,
            "c" => Language::C,
            "java" => Language::Java,
            "c#" | "csharp" => Language::CSharp,
            "javascript" => Language::JavaScript,
            "typescript" => Language::TypeScript,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kotlin" => Language::Kotlin,
            "dart" => Language::Dart,
            "go" | "golang" => Language::Go,
            "ruby" => Language::Ruby,
            "scala" => Language::Scala,
            "rust" => Language::Rust,
            "racket" => Language::Racket,
            "erlang" => Language::Erlang,
            "elixir" => Language::Elixir,
            "mysql" => Language::MySql,
            "ms sql server" | "mssql" => Language::MsSqlServer,
            "oracle" => Language::OracleSql,
            "postgresql" => Language::PostgreSql,
            "pandas" => Language::Pandas,
            "bash" => Language::Bash,
            _ => Language::Other(trimmed.to_string()),
        }
    }

    /// 编辑器语言下拉框中显示的标签
    pub fn label(&self) -> &str {
        match self {
            Language::Python3 => "Python3",
            Language::Python => "Python",
            Language::Cpp => "C++",
            Language::C => "C",
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Php => "PHP",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Dart => "Dart",
            Language::Go => "Go",
            Language::Ruby => "Ruby",
            Language::Scala => "Scala",
            Language::Rust => "Rust",
            Language::Racket => "Racket",
            Language::Erlang => "Erlang",
            Language::Elixir => "Elixir",
            Language::MySql => "MySQL",
            Language::MsSqlServer => "MS SQL Server",
            Language::OracleSql => "Oracle",
            Language::PostgreSql => "PostgreSQL",
            Language::Pandas => "Pandas",
            Language::Bash => "Bash",
            Language::Other(label) => label,
            Language::Unknown => "Unknown",
        }
    }

    /// 固定模式的查询类语言（数据库题 / shell 题），这类题目不切换语言
    pub fn is_query_language(&self) -> bool {
        matches!(
            self,
            Language::MySql
                | Language::MsSqlServer
                | Language::OracleSql
                | Language::PostgreSql
                | Language::Pandas
                | Language::Bash
        )
    }

    pub fn indent_style(&self) -> IndentStyle {
        match self {
            Language::Python3 | Language::Python | Language::Pandas => IndentStyle::Offside,
            Language::Cpp
            | Language::C
            | Language::Java
            | Language::CSharp
            | Language::JavaScript
            | Language::TypeScript
            | Language::Php
            | Language::Swift
            | Language::Kotlin
            | Language::Dart
            | Language::Go
            | Language::Scala
            | Language::Rust => IndentStyle::Braces,
            _ => IndentStyle::Preserve,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
