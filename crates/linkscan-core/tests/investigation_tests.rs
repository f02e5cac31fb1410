//! Investigation loop integration tests
//!
//! Drives the loop with scripted backends and local tools only.

mod common;

use common::{
    BrokenTool, EchoTool, ScriptedBackend, SlowBackend, UnreachableBackend, COMPLETED_SAFE,
    ONGOING_ECHO,
};
use linkscan_core::contract::{OutcomeEntry, ToolCall, TOOL_RESULTS_PREFIX};
use linkscan_core::session::{InvestigationDriver, Role, SessionStore, MAX_ITERATIONS};
use linkscan_core::tools::{LexicalAnalysis, ToolRegistry};
use linkscan_core::{format_report, investigation_id, Error, ScanStatus, VerdictCategory};
use std::sync::Arc;
use std::time::Duration;

fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(LexicalAnalysis::new()));
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(BrokenTool));
    registry
}

fn driver_with(backend: Arc<ScriptedBackend>) -> (InvestigationDriver, Arc<SessionStore>) {
    let store = Arc::new(SessionStore::new("system instruction"));
    let driver = InvestigationDriver::new(backend, store.clone(), test_registry());
    (driver, store)
}

mod end_to_end_tests {
    use super::*;

    #[tokio::test]
    async fn test_lexical_then_safe_verdict() {
        let backend = Arc::new(ScriptedBackend::new(&[
            r#"{"status":"ONGOING","tool_calls":[{"tool_name":"lexical_analysis","arguments":{"url":"http://example.com"}}]}"#,
            r#"{"status":"COMPLETED","final_verdict":{"category":"SAFE","explanation":"...","confidence_score":0.9}}"#,
        ]));
        let (driver, _store) = driver_with(backend.clone());

        let subject = "http://example.com";
        let id = investigation_id(subject);
        let result = driver
            .run(
                subject,
                &id,
                &format!("Start the investigation for the URL: {} with ID: {}", subject, id),
            )
            .await
            .unwrap();

        assert_eq!(result.status, ScanStatus::Completed);
        let verdict = result.final_verdict.as_ref().unwrap();
        assert_eq!(verdict.category, VerdictCategory::Safe);

        let report = format_report(&result);
        assert!(report.contains("█████████░"));
        assert!(report.contains("SAFE"));

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].message.starts_with(TOOL_RESULTS_PREFIX));
        assert!(requests[1].message.contains("lexical_analysis"));
        assert!(requests[1].message.contains("suspicion_score"));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", COMPLETED_SAFE);
        let backend = Arc::new(ScriptedBackend::always(&fenced));
        let (driver, _store) = driver_with(backend);

        let result = driver.run("http://example.com", "id", "start").await.unwrap();
        assert_eq!(result.final_verdict.unwrap().category, VerdictCategory::Safe);
    }

    #[tokio::test]
    async fn test_error_status_is_terminal() {
        let backend = Arc::new(ScriptedBackend::always(
            r#"{"status":"ERROR","final_verdict":{"category":"SUSPICIOUS","explanation":"Do not send this.","confidence_score":1.0}}"#,
        ));
        let (driver, _store) = driver_with(backend.clone());

        let result = driver.run("http://x", "id", "start").await.unwrap();
        assert_eq!(result.status, ScanStatus::Error);
        assert_eq!(result.final_verdict.unwrap().category, VerdictCategory::Suspicious);
        assert_eq!(backend.send_count(), 1);
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_iteration_limit_after_exactly_five_sends() {
        let backend = Arc::new(ScriptedBackend::always(ONGOING_ECHO));
        let (driver, store) = driver_with(backend.clone());

        let err = driver.run("http://example.com", "loop", "start").await.unwrap_err();
        assert!(matches!(err, Error::IterationLimit(5)));
        assert_eq!(backend.send_count(), MAX_ITERATIONS);

        let handle = store.get_or_create("loop");
        assert_eq!(handle.lock().await.turns().len(), MAX_ITERATIONS * 2);
    }

    #[tokio::test]
    async fn test_custom_iteration_limit() {
        let backend = Arc::new(ScriptedBackend::always(ONGOING_ECHO));
        let (driver, _store) = driver_with(backend.clone());
        let driver = driver.with_max_iterations(2);

        let err = driver.run("http://example.com", "loop", "start").await.unwrap_err();
        assert!(matches!(err, Error::IterationLimit(2)));
        assert_eq!(backend.send_count(), 2);
    }

    #[tokio::test]
    async fn test_ongoing_without_tools_is_contract_error() {
        let reply = r#"{"status":"ONGOING","reasoning":"thinking","tool_calls":[]}"#;
        let backend = Arc::new(ScriptedBackend::always(reply));
        let (driver, _store) = driver_with(backend.clone());

        let err = driver.run("http://example.com", "id", "start").await.unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
        assert_eq!(err.raw_payload(), Some(reply));
        assert_eq!(backend.send_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal_and_not_journaled() {
        let store = Arc::new(SessionStore::new("system"));
        let driver =
            InvestigationDriver::new(Arc::new(UnreachableBackend), store.clone(), test_registry());

        let err = driver.run("http://example.com", "id", "start").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        let handle = store.get_or_create("id");
        assert!(handle.lock().await.turns().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_reply_is_still_journaled() {
        let backend = Arc::new(ScriptedBackend::always("I cannot help with that."));
        let (driver, store) = driver_with(backend);

        let err = driver.run("http://example.com", "id", "start").await.unwrap_err();
        assert_eq!(err.raw_payload(), Some("I cannot help with that."));

        let handle = store.get_or_create("id");
        let session = handle.lock().await;
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[0].text, "start");
        assert_eq!(session.turns()[1].role, Role::Model);
        assert_eq!(session.turns()[1].text, "I cannot help with that.");
    }

    #[tokio::test]
    async fn test_completed_without_verdict_is_contract_error() {
        let backend = Arc::new(ScriptedBackend::always(r#"{"status":"COMPLETED"}"#));
        let (driver, _store) = driver_with(backend);

        let err = driver.run("http://example.com", "id", "start").await.unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
    }

    #[tokio::test]
    async fn test_tool_failures_are_fed_back() {
        let backend = Arc::new(ScriptedBackend::new(&[
            r#"{"status":"ONGOING","tool_calls":[{"tool_name":"broken"},{"tool_name":"missing"}]}"#,
            COMPLETED_SAFE,
        ]));
        let (driver, _store) = driver_with(backend.clone());

        driver.run("http://example.com", "id", "start").await.unwrap();

        let feedback = &backend.requests()[1].message;
        assert!(feedback.contains("upstream unavailable"));
        assert!(feedback.contains("unknown tool: missing"));
    }
}

mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_tool_does_not_affect_valid_call() {
        let registry = test_registry();
        let calls = vec![
            ToolCall::new("no_such_tool").with_argument("url", "http://example.com"),
            ToolCall::new("echo").with_argument("url", "http://example.com"),
        ];

        let outcome = registry.dispatch(&calls).await;
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.failure_count(), 1);

        match outcome.get("no_such_tool") {
            Some(OutcomeEntry::Failure(msg)) => assert_eq!(msg, "unknown tool: no_such_tool"),
            other => panic!("expected failure, got {:?}", other),
        }
        match outcome.get("echo") {
            Some(OutcomeEntry::Success(payload)) => assert!(payload.contains("http://example.com")),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_argument_is_recorded_as_failure() {
        let registry = test_registry();
        let outcome = registry.dispatch(&[ToolCall::new("echo")]).await;

        match outcome.get("echo") {
            Some(OutcomeEntry::Failure(msg)) => assert!(msg.contains("url is required")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_last_entry() {
        let registry = test_registry();
        let calls = vec![
            ToolCall::new("echo").with_argument("url", "http://first.example"),
            ToolCall::new("echo").with_argument("url", "http://second.example"),
        ];

        let outcome = registry.dispatch(&calls).await;
        assert_eq!(outcome.len(), 1);
        match outcome.get("echo") {
            Some(OutcomeEntry::Success(payload)) => assert!(payload.contains("second.example")),
            other => panic!("expected success, got {:?}", other),
        }
    }
}

mod session_reuse_tests {
    use super::*;

    #[tokio::test]
    async fn test_same_id_accumulates_both_runs() {
        let backend = Arc::new(ScriptedBackend::always(COMPLETED_SAFE));
        let (driver, store) = driver_with(backend.clone());

        driver.run("http://example.com", "same", "first run").await.unwrap();
        driver.run("http://example.com", "same", "second run").await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].history_len, 0);
        assert_eq!(requests[1].history_len, 2);

        let handle = store.get_or_create("same");
        let session = handle.lock().await;
        let texts: Vec<&str> = session.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first run", COMPLETED_SAFE, "second run", COMPLETED_SAFE]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_different_ids_never_share_turns() {
        let backend = Arc::new(ScriptedBackend::always(COMPLETED_SAFE));
        let (driver, store) = driver_with(backend);

        driver.run("http://a.example", "a", "prompt a").await.unwrap();
        driver.run("http://b.example", "b", "prompt b").await.unwrap();

        let a = store.get_or_create("a");
        let b = store.get_or_create("b");
        let a = a.lock().await;
        let b = b.lock().await;
        assert_eq!(a.turns().len(), 2);
        assert_eq!(b.turns().len(), 2);
        assert_eq!(a.turns()[0].text, "prompt a");
        assert_eq!(b.turns()[0].text, "prompt b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_for_one_id_are_serialized() {
        let backend = Arc::new(ScriptedBackend::always(COMPLETED_SAFE));
        let (driver, store) = driver_with(backend);
        let driver = Arc::new(driver);

        let d1 = driver.clone();
        let d2 = driver.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { d1.run("http://example.com", "shared", "one").await }),
            tokio::spawn(async move { d2.run("http://example.com", "shared", "two").await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        let handle = store.get_or_create("shared");
        let session = handle.lock().await;
        let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_id_never_has_two_sends_in_flight() {
        let backend = Arc::new(SlowBackend::new(Duration::from_millis(300)));
        let store = Arc::new(SessionStore::new("system"));
        let driver = Arc::new(InvestigationDriver::new(backend.clone(), store, test_registry()));

        let d1 = driver.clone();
        let d2 = driver.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { d1.run("http://example.com", "shared", "one").await }),
            tokio::spawn(async move { d2.run("http://example.com", "shared", "two").await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        assert_eq!(backend.max_in_flight(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_ids_run_concurrently() {
        let backend = Arc::new(SlowBackend::new(Duration::from_millis(300)));
        let store = Arc::new(SessionStore::new("system"));
        let driver = Arc::new(InvestigationDriver::new(backend.clone(), store, test_registry()));

        let d1 = driver.clone();
        let d2 = driver.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { d1.run("http://a.example", "a", "one").await }),
            tokio::spawn(async move { d2.run("http://b.example", "b", "two").await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        assert_eq!(backend.max_in_flight(), 2);
    }
}
