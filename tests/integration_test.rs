use std::process::Command;

use leetcode_solver::browser::{launch_browser, BrowserSession};
use leetcode_solver::config::Config;
use leetcode_solver::infrastructure::PageDriver;

fn solver(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_leetcode_solver"));
    cmd.current_dir(dir)
        .env("OPENAI_API_KEY", "sk-test")
        .env("LEETCODE_USERNAME", "alice")
        .env("LEETCODE_PASSWORD", "secret")
        .env("LOG_DIR", dir.join("logs"))
        .env_remove("CONFIG_FILE");
    cmd
}

/// 运行程序，返回是否成功以及标准输出 + 标准错误
fn run(mut cmd: Command) -> (bool, String) {
    let output = cmd.output().expect("启动程序失败");
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    (output.status.success(), text)
}

#[test]
fn test_invalid_count_exits_before_browser() {
    let dir = tempfile::tempdir().unwrap();
    for bad in ["0", "-3", "many"] {
        let mut cmd = solver(dir.path());
        cmd.arg(bad);
        let (ok, output) = run(cmd);
        assert!(!ok, "题目数量 {bad} 应当失败");
        assert!(output.contains("题目数量无效"), "输出: {output}");
        assert!(!output.contains("浏览器启动失败"), "输出: {output}");
    }
    assert!(!dir.path().join("leetcode_login.json").exists());
}

#[test]
fn test_valid_count_reaches_browser_launch() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = solver(dir.path());
    cmd.env("CHROME_EXECUTABLE", dir.path().join("no-such-chrome"))
        .env("HEADLESS", "true")
        .arg("1");
    let (ok, output) = run(cmd);
    assert!(!ok);
    assert!(!output.contains("题目数量无效"), "输出: {output}");
    assert!(output.contains("浏览器启动失败"), "输出: {output}");
}

#[test]
fn test_missing_api_key_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = solver(dir.path());
    cmd.env_remove("OPENAI_API_KEY").arg("1");
    let (ok, output) = run(cmd);
    assert!(!ok);
    assert!(!output.contains("浏览器启动失败"), "输出: {output}");
}

#[test]
fn test_bad_env_value_is_logged_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = solver(dir.path());
    cmd.env_remove("LOG_DIR")
        .env("NAVIGATION_TIMEOUT_MS", "soon")
        .arg("1");
    let (ok, output) = run(cmd);
    assert!(!ok);
    assert!(output.contains("NAVIGATION_TIMEOUT_MS"), "输出: {output}");

    let logged: String = std::fs::read_dir(dir.path().join("logs"))
        .expect("应当创建日志目录")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| std::fs::read_to_string(entry.path()).ok())
        .collect();
    assert!(logged.contains("配置错误"), "日志: {logged}");
    assert!(logged.contains("NAVIGATION_TIMEOUT_MS"), "日志: {logged}");
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome：cargo test -- --ignored
async fn test_browser_launch_and_close() {
    let config = Config {
        headless: true,
        ..Config::default()
    };

    let session = launch_browser(&config).await.expect("启动浏览器失败");
    session
        .driver()
        .goto("https://leetcode.com/problemset/")
        .await
        .expect("打开题库失败");
    let url = session.driver().current_url().await.expect("读取地址失败");
    assert!(url.contains("leetcode"));

    assert!(session.close().await.is_ok(), "应该能够关闭浏览器");
}

#[tokio::test]
#[ignore]
async fn test_session_round_trip_in_browser() {
    let config = Config {
        headless: true,
        ..Config::default()
    };

    let session = launch_browser(&config).await.expect("启动浏览器失败");
    let driver = session.driver();
    driver.goto(&config.base_url).await.expect("打开首页失败");
    let state = driver.save_state().await.expect("导出会话失败");
    driver.restore_state(&state).await.expect("写回会话失败");

    session.close().await.expect("关闭浏览器失败");
}
