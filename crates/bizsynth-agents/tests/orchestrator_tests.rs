mod common;

use bizsynth_agents::{Orchestrator, OrchestratorConfig, SynthesisMode};
use bizsynth_llm_api::{GatewayError, ModelGateway};
use bizsynth_types::{ExecutionType, FailureKind, OrchestratorError, OrchestratorState, ProgressEvent};
use common::*;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn collect_events(
    orchestrator: &Orchestrator,
    message: &str,
    context: Option<serde_json::Value>,
) -> (Vec<ProgressEvent>, bool) {
    let (tx, mut rx) = mpsc::channel(64);
    let result = orchestrator
        .process_request_with_events(message, context, tx, CancellationToken::new())
        .await;
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (events, result.is_ok())
}

#[tokio::test]
async fn test_saas_market_scenario() {
    let backend = Arc::new(ScriptedBackend::saas());
    let orchestrator = orchestrator(&backend, fast_config());

    let synthesis = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap();

    assert!(!synthesis.text.is_empty());
    assert!(!synthesis.fallback);
    assert_eq!(synthesis.execution_type, ExecutionType::Parallel);
    assert_eq!(synthesis.source_outputs.len(), 2);
    assert_eq!(synthesis.successful_outputs().count(), 2);

    let prompt = backend.prompt_matching(SYNTHESIS).unwrap();
    assert!(prompt.contains("### Result from market_analyst"));
    assert!(prompt.contains("### Result from customer_profiler"));
    assert!(prompt.contains("TAM for SMB SaaS"));
    assert!(prompt.contains("Persona: owner-operator"));
    // sorted by agent id, not by arrival
    assert!(prompt.find("customer_profiler").unwrap() < prompt.find("market_analyst").unwrap());

    assert_eq!(backend.calls_matching(FINANCE), 0);
    assert_eq!(backend.calls_matching(GTM), 0);
}

#[tokio::test]
async fn test_no_backend_is_configuration_error_before_any_task() {
    let orchestrator = Orchestrator::new(
        fast_config(),
        registry(),
        Arc::new(ModelGateway::new(None, None)),
    )
    .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let failure = orchestrator
        .process_request_with_events(SAAS_REQUEST, None, tx, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, OrchestratorError::Configuration(_)));
    assert_eq!(failure.code(), "CONFIGURATION_ERROR");
    assert_eq!(failure.metadata.tasks_total, 0);
    assert_eq!(failure.metadata.final_state, OrchestratorState::Error);

    let event = rx.recv().await.unwrap();
    assert!(matches!(event, ProgressEvent::Error { ref code, .. } if code == "CONFIGURATION_ERROR"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_one_of_two_tasks_times_out() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis", "entities": {}, "confidence": 0.8}"#))
            .on(SYNTHESIS, text("Report based on the market analysis only."))
            .on(MARKET, text("TAM for SMB SaaS in the US is roughly $60B."))
            .on(CUSTOMER, Reply::Delayed(Duration::from_secs(2), "too late".to_string())),
    );
    let config = OrchestratorConfig {
        task_timeout: Duration::from_millis(150),
        ..fast_config()
    };
    let orchestrator = orchestrator(&backend, config);

    let synthesis = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap();

    assert_eq!(synthesis.source_outputs.len(), 2);
    let failed: Vec<_> = synthesis.source_outputs.iter().filter(|o| !o.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].agent_id, "customer_profiler");
    assert_eq!(failed[0].error_kind, Some(FailureKind::BackendTimeout));

    let prompt = backend.prompt_matching(SYNTHESIS).unwrap();
    assert!(prompt.contains("### Result from market_analyst"));
    assert!(!prompt.contains("### Result from customer_profiler"));
    assert_eq!(synthesis.text, "Report based on the market analysis only.");
}

#[tokio::test]
async fn test_all_tasks_failing_is_plan_exhausted_without_synthesis() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis", "confidence": 0.8}"#))
            .on(SYNTHESIS, text("should never be produced"))
            .otherwise(Reply::Error(GatewayError::Unavailable("connection refused".to_string()))),
    );
    let orchestrator = orchestrator(&backend, fast_config());

    let failure = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap_err();

    match &failure.error {
        OrchestratorError::PlanExhausted { outputs } => {
            assert_eq!(outputs.len(), 2);
            assert!(outputs.iter().all(|o| o.error_kind == Some(FailureKind::BackendUnavailable)));
        }
        other => panic!("expected PlanExhausted, got {:?}", other),
    }
    assert_eq!(failure.code(), "PLAN_EXHAUSTED");
    assert_eq!(failure.metadata.tasks_total, 2);
    assert_eq!(failure.metadata.tasks_succeeded, 0);
    assert_eq!(backend.calls_matching(SYNTHESIS), 0);
}

#[tokio::test]
async fn test_validation_errors_make_no_backend_calls() {
    let backend = Arc::new(ScriptedBackend::saas());
    let config = OrchestratorConfig {
        max_message_chars: 20,
        ..fast_config()
    };
    let orchestrator = orchestrator(&backend, config);

    for (message, context) in [
        ("   ", None),
        ("this message is far too long to accept", None),
        ("short", Some(serde_json::json!(["not", "an", "object"]))),
    ] {
        let failure = orchestrator.process_request(message, context).await.unwrap_err();
        assert_eq!(failure.code(), "VALIDATION_ERROR");
        assert!(failure.error.is_caller_error());
    }
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_event_sequence() {
    let backend = Arc::new(ScriptedBackend::saas());
    let orchestrator = orchestrator(&backend, fast_config());

    let (events, ok) = collect_events(&orchestrator, SAAS_REQUEST, None).await;
    assert!(ok);

    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "analyzing_intent",
            "intent_analyzed",
            "plan_created",
            "executing_agents",
            "agent_completed",
            "agent_completed",
            "execution_complete",
            "synthesizing",
            "complete",
        ]
    );

    match events.last() {
        Some(ProgressEvent::Complete { metadata, .. }) => {
            assert_eq!(metadata.final_state, OrchestratorState::Complete);
            assert_eq!(metadata.tasks_total, 2);
            assert_eq!(metadata.tasks_succeeded, 2);
            assert!(metadata.tokens_used > 0);
            assert!(metadata.phase_timings_ms.contains_key("executing"));
        }
        other => panic!("expected complete event, got {:?}", other),
    }
    match &events[3] {
        ProgressEvent::ExecutingAgents { agents } => {
            assert_eq!(agents, &vec!["market_analyst".to_string(), "customer_profiler".to_string()]);
        }
        other => panic!("expected executing_agents, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_request_ends_with_terminal_event() {
    let backend = Arc::new(ScriptedBackend::saas());
    let orchestrator = Arc::new(orchestrator(&backend, fast_config()));

    let events: Vec<ProgressEvent> = orchestrator
        .stream_request(SAAS_REQUEST.to_string(), None, CancellationToken::new())
        .collect()
        .await;

    assert_eq!(events.first().map(|e| e.name()), Some("analyzing_intent"));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
}

#[tokio::test]
async fn test_request_deadline_maps_to_backend_timeout() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis"}"#))
            .otherwise(Reply::Delayed(Duration::from_secs(5), "slow".to_string())),
    );
    let config = OrchestratorConfig {
        request_timeout: Duration::from_millis(200),
        ..fast_config()
    };
    let orchestrator = orchestrator(&backend, config);

    let failure = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap_err();
    assert_eq!(failure.code(), "BACKEND_TIMEOUT");
    assert_eq!(failure.metadata.final_state, OrchestratorState::Error);
}

#[tokio::test]
async fn test_cancellation_stops_the_run() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis"}"#))
            .otherwise(Reply::Delayed(Duration::from_secs(5), "slow".to_string())),
    );
    let orchestrator = orchestrator(&backend, fast_config());
    let cancel = CancellationToken::new();
    let (tx, _rx) = mpsc::channel(64);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let failure = orchestrator
        .process_request_with_events(SAAS_REQUEST, None, tx, cancel)
        .await
        .unwrap_err();
    assert_eq!(failure.code(), "CANCELLED");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_dropped_receiver_cancels_the_run() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis"}"#))
            .otherwise(Reply::Delayed(Duration::from_secs(5), "slow".to_string())),
    );
    let orchestrator = orchestrator(&backend, fast_config());
    let (tx, rx) = mpsc::channel(64);
    drop(rx);

    let failure = orchestrator
        .process_request_with_events(SAAS_REQUEST, None, tx, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(failure.code(), "CANCELLED");
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_unparseable_intent_falls_back_to_generalist() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text("I cannot classify this."))
            .on(SYNTHESIS, text("General advice."))
            .on(GENERALIST, text("Start with a pilot.")),
    );
    let orchestrator = orchestrator(&backend, fast_config());

    let (events, ok) = collect_events(&orchestrator, "Help me with my shop", None).await;
    assert!(ok);

    match &events[1] {
        ProgressEvent::IntentAnalyzed { intent } => assert!(intent.is_fallback()),
        other => panic!("expected intent_analyzed, got {:?}", other),
    }
    match &events[2] {
        ProgressEvent::PlanCreated { plan } => assert_eq!(plan.agent_ids(), vec!["generalist".to_string()]),
        other => panic!("expected plan_created, got {:?}", other),
    }
    // first attempt plus one corrective retry
    assert_eq!(backend.calls_matching(INTENT), 2);
}

#[tokio::test]
async fn test_merge_mode_skips_synthesis_call() {
    let backend = Arc::new(ScriptedBackend::saas());
    let config = OrchestratorConfig {
        synthesis_mode: SynthesisMode::Merge,
        ..fast_config()
    };
    let orchestrator = orchestrator(&backend, config);

    let synthesis = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap();
    assert!(synthesis.text.starts_with("### Result from customer_profiler"));
    assert!(synthesis.text.contains("### Result from market_analyst"));
    assert_eq!(backend.calls_matching(SYNTHESIS), 0);
}

#[tokio::test]
async fn test_synthesis_failure_surfaces_as_synthesis_failed() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .on(INTENT, text(r#"{"category": "market_analysis"}"#))
            .on(SYNTHESIS, Reply::Error(GatewayError::RateLimited("429".to_string())))
            .otherwise(text("analysis")),
    );
    let orchestrator = orchestrator(&backend, fast_config());

    let failure = orchestrator.process_request(SAAS_REQUEST, None).await.unwrap_err();
    assert_eq!(failure.code(), "SYNTHESIS_FAILED");
    assert_eq!(failure.metadata.tasks_succeeded, 2);
}

#[tokio::test]
async fn test_plan_cache_returns_identical_plan() {
    let backend = Arc::new(ScriptedBackend::saas());
    let config = OrchestratorConfig {
        plan_cache: true,
        ..fast_config()
    };
    let orchestrator = orchestrator(&backend, config);

    let intent = orchestrator.parse_intent(SAAS_REQUEST, None).await.unwrap();
    let first = orchestrator.create_plan(&intent).unwrap();
    let second = orchestrator.create_plan(&intent).unwrap();
    assert_eq!(first, second);
}
