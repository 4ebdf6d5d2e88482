mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use common::*;
use leetcode_solver::config::{Config, LanguagePolicy, ProblemCount};
use leetcode_solver::error::AuthError;
use leetcode_solver::infrastructure::{PageDriver, SelectorRegistry, SessionStore, Shortcut};
use leetcode_solver::orchestrator::{Orchestrator, RunState};
use leetcode_solver::services::{Authenticator, ChatMessage};

fn count(n: &str) -> ProblemCount {
    ProblemCount::from_arg(Some(n)).unwrap()
}

#[tokio::test]
async fn test_runs_exactly_n_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let llm = FakeLlm::default();
    let (session, closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, llm.clone())
        .run(session, &credentials(), count("3"))
        .await;

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.target, 3);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.solved, 3);
    assert_eq!(driver.visits_to(&config.problemset_url), 3);
    assert_eq!(driver.clicks_on("submit_button"), 3);
    assert_eq!(llm.calls().len(), 3);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_existing_session_skips_login() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let store = SessionStore::new(config.session_state_path.clone());
    let saved = assert_ok!(driver.save_state().await);
    assert_ok!(store.save(&saved).await);

    let (session, _closes) = FakeSession::new(driver.clone());
    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("1"))
        .await;

    assert!(report.is_done());
    assert_eq!(driver.visits_to(&config.login_url), 0);
    assert!(driver.state().typed.is_empty());
    assert_eq!(driver.state().restored, vec![saved]);
}

#[tokio::test]
async fn test_login_persists_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let store = SessionStore::new(config.session_state_path.clone());
    let authenticator = Authenticator::new(&config, SelectorRegistry::default(), store.clone());

    assert!(!store.exists());
    assert_ok!(authenticator.authenticate(&driver, &credentials()).await);
    assert!(store.exists());

    let state = driver.state();
    assert_eq!(state.visits, vec![config.login_url.clone()]);
    assert_eq!(
        state.typed,
        vec![
            ("username_field".to_string(), "alice".to_string()),
            ("password_field".to_string(), "secret".to_string()),
        ]
    );
    assert_eq!(state.clicks, vec!["signin_button".to_string()]);
}

#[tokio::test]
async fn test_challenge_frame_is_clicked_during_login() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.state().present.insert(CHALLENGE_FRAME.to_string());
    let store = SessionStore::new(config.session_state_path.clone());
    let authenticator = Authenticator::new(&config, SelectorRegistry::default(), store.clone());

    assert_ok!(authenticator.authenticate(&driver, &credentials()).await);
    assert_eq!(driver.state().frame_clicks, vec![CHALLENGE_FRAME.to_string()]);
    assert!(store.exists());
}

#[tokio::test]
async fn test_slow_login_page_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.slow_down(&config.login_url);
    let (session, closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("1"))
        .await;

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.solved, 1);
    assert!(config.session_state_path.exists());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_home_page_keeps_saved_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let store = SessionStore::new(config.session_state_path.clone());
    assert_ok!(store.save(&assert_ok!(driver.save_state().await)).await);
    driver.slow_down(&config.base_url);
    driver.slow_down(&config.problemset_url);
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("2"))
        .await;

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.solved, 2);
    assert!(store.exists());
}

#[tokio::test]
async fn test_login_not_confirmed_without_header() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.remove(SITE_HEADER);
    let store = SessionStore::new(config.session_state_path.clone());
    let authenticator = Authenticator::new(&config, SelectorRegistry::default(), store.clone());

    let err = assert_err!(authenticator.authenticate(&driver, &credentials()).await);
    assert!(matches!(err, AuthError::LoginNotConfirmed));
    assert!(!store.exists());
}

#[tokio::test]
async fn test_auth_failure_aborts_before_any_problem() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.remove(PASSWORD);
    let (session, closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("2"))
        .await;

    assert!(matches!(report.state, RunState::Aborted { .. }));
    assert_eq!(report.attempted, 0);
    assert_eq!(driver.visits_to(&config.problemset_url), 0);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_corrupt_session_file_triggers_login() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(&config.session_state_path, "{ not json").unwrap();
    let driver = FakeDriver::leetcode();
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("1"))
        .await;

    assert!(report.is_done());
    assert_eq!(driver.visits_to(&config.login_url), 1);
    let store = SessionStore::new(config.session_state_path.clone());
    assert_ok!(store.load().await);
}

#[tokio::test]
async fn test_language_dropdown_used_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("3"))
        .await;

    assert_eq!(report.solved, 3);
    assert_eq!(driver.clicks_on("code_editor.language_select"), 1);
    assert_eq!(driver.state().text_clicks, vec!["Python3".to_string()]);
}

#[tokio::test]
async fn test_language_switch_waits_before_rereading() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        dropdown_wait: Duration::from_millis(777),
        ..test_config(dir.path())
    };
    let driver = FakeDriver::leetcode();
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("1"))
        .await;

    assert_eq!(report.solved, 1);
    let waits = driver
        .state()
        .pauses
        .iter()
        .filter(|d| **d == config.dropdown_wait)
        .count();
    assert_eq!(waits, 2);
}

#[tokio::test]
async fn test_unreadable_language_keeps_editor_language() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.remove(LANGUAGE);
    let llm = FakeLlm::default();
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, llm.clone())
        .run(session, &credentials(), count("1"))
        .await;

    assert_eq!(report.solved, 1);
    assert!(driver.state().text_clicks.is_empty());
    match llm.calls()[0].as_slice() {
        [ChatMessage::User(prompt)] => {
            assert!(prompt.contains("Language: the language of the starter code"));
            assert!(!prompt.contains("Python3"));
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}

#[tokio::test]
async fn test_every_problem_policy_negotiates_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.language_policy = LanguagePolicy::EveryProblem;
    let driver = FakeDriver::leetcode();
    let (session, _closes) = FakeSession::new(driver.clone());

    Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("3"))
        .await;

    assert_eq!(driver.clicks_on("code_editor.language_select"), 3);
}

#[tokio::test]
async fn test_query_language_is_not_switched() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.set_default_language("MySQL");
    let llm = FakeLlm::scripted(vec![Ok("```sql\nSELECT name FROM Employee;\n```".to_string())]);
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, llm.clone())
        .run(session, &credentials(), count("1"))
        .await;

    assert_eq!(report.solved, 1);
    assert_eq!(driver.clicks_on("code_editor.language_select"), 0);
    assert_eq!(
        driver.state().inserted.concat(),
        "SELECT name FROM Employee;\n"
    );
    match &llm.calls()[0][..] {
        [ChatMessage::User(prompt)] => assert!(prompt.contains("Language: MySQL")),
        other => panic!("意外的消息: {other:?}"),
    }
}

#[tokio::test]
async fn test_completion_error_continues_with_next_problem() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    let llm = FakeLlm::scripted(vec![Err(api_error()), Ok("   ".to_string())]);
    let (session, closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, llm.clone())
        .run(session, &credentials(), count("3"))
        .await;

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.solved, 1);
    assert_eq!(llm.calls().len(), 3);
    assert_eq!(driver.clicks_on("submit_button"), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_pickone_button_skips_problem() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.remove(PICKONE);
    let llm = FakeLlm::default();
    let (session, _closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, llm.clone())
        .run(session, &credentials(), count("2"))
        .await;

    assert!(report.is_done());
    assert_eq!(report.attempted, 2);
    assert_eq!(report.solved, 0);
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn test_fatal_error_deletes_session_and_closes_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let driver = FakeDriver::leetcode();
    driver.state().disconnect_on_click = Some("submit_button".to_string());
    let (session, closes) = FakeSession::new(driver.clone());

    let report = Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("3"))
        .await;

    assert!(matches!(report.state, RunState::Aborted { .. }));
    assert_eq!(report.attempted, 1);
    assert!(!config.session_state_path.exists());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_editor_receives_formatted_solution() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.chunk_size = 40;
    let driver = FakeDriver::leetcode();
    let (session, _closes) = FakeSession::new(driver.clone());

    Orchestrator::new(&config, FakeLlm::default())
        .run(session, &credentials(), count("1"))
        .await;

    let state = driver.state();
    let source = state.inserted.concat();
    assert!(!source.contains("```"));
    assert!(source.starts_with("class Solution:\n    def twoSum"));
    assert!(source.ends_with("seen[n] = i\n"));
    assert!(state.inserted.iter().all(|chunk| chunk.chars().count() <= 40));
    assert_eq!(state.keys, vec!["Delete".to_string()]);
    assert_eq!(
        state.shortcuts,
        vec![Shortcut::SelectAll, Shortcut::FormatDocument]
    );
}
