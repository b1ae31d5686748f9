//! End-to-end chat turns against an in-memory model and controller

mod common;

use std::time::Duration;

use avi_chat::{ChatSubmission, DispatchEngine, DispatchPhase, InvocationOutcome};
use avi_core::{CallContext, ConversationTurn, Error, Role};
use avi_gateway::ResourceKind;
use avi_tools::ToolCatalog;
use serde_json::json;

use common::{invocation, orchestrator, reply, FakeController, FakeModel, Script};

#[tokio::test]
async fn test_list_results_are_folded_into_reply() {
    let model = FakeModel::replying(reply(
        "Here are your virtual services.",
        vec![invocation("list_virtual_services", json!({}))],
    ));
    let controller =
        FakeController::new().with_page(ResourceKind::VirtualService, &["web-app-vs", "api-vs"]);
    let (orchestrator, _, controller) = orchestrator(model, controller);

    let ctx = CallContext::new();
    let reply = orchestrator
        .handle(&ctx, ChatSubmission::new("List all virtual services"))
        .await
        .unwrap();

    assert!(reply.message.starts_with("Here are your virtual services."));
    assert!(reply.message.contains("API Result (list_virtual_services)"));
    assert!(reply.message.contains("web-app-vs"));
    assert!(reply.message.contains("api-vs"));
    assert!(reply.message.contains("Found 2 virtual services"));
    assert_eq!(reply.tool_calls, vec!["list_virtual_services"]);
    assert_eq!(reply.model, common::MODEL);
    assert_eq!(reply.usage.total_tokens, 150);
    assert_eq!(controller.calls(), vec!["list:/virtualservice"]);
}

#[tokio::test]
async fn test_gateway_failure_leaves_narrative_unchanged() {
    let narrative = "Scaling out pool-1 now.";
    let model = FakeModel::replying(reply(
        narrative,
        vec![invocation("scale_out_pool", json!({"uuid": "pool-1"}))],
    ));
    let controller =
        FakeController::new().failing("scale:/pool/pool-1/scaleout", 500, "internal error");
    let (orchestrator, _, controller) = orchestrator(model, controller);

    let reply = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("Scale out pool-1"))
        .await
        .unwrap();

    assert_eq!(reply.message, narrative);
    assert_eq!(reply.tool_calls, vec!["scale_out_pool"]);
    assert_eq!(controller.calls(), vec!["scale:/pool/pool-1/scaleout"]);
}

#[tokio::test]
async fn test_gateway_failure_recorded_in_executing_phase() {
    let catalog = ToolCatalog::standard();
    let controller =
        FakeController::new().failing("scale:/pool/pool-1/scaleout", 500, "internal error");
    let narrative = "Scaling out pool-1 now.";

    let outcome = DispatchEngine::new(&catalog, &controller)
        .run(
            &CallContext::new(),
            reply(
                narrative,
                vec![invocation("scale_out_pool", json!({"uuid": "pool-1"}))],
            ),
        )
        .await;

    assert_eq!(outcome.narrative, narrative);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.failed(), 1);
    assert!(matches!(
        &outcome.records[0].outcome,
        InvocationOutcome::Failed {
            phase: DispatchPhase::Executing,
            error: Error::GatewayServer { status: 500, .. },
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_fails_the_request() {
    let model = FakeModel::new(vec![Script::Hang]);
    let (orchestrator, model, controller) = orchestrator(model, FakeController::new());

    let ctx = CallContext::with_timeout(Duration::from_millis(100));
    let err = orchestrator
        .handle(&ctx, ChatSubmission::new("List pools"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ModelTimeout(_)), "got {:?}", err);
    assert_eq!(model.query_count(), 1);
    assert!(controller.calls().is_empty());
}

#[tokio::test]
async fn test_upstream_model_error_propagates() {
    let model = FakeModel::new(vec![Script::Fail(503, "model loading")]);
    let (orchestrator, _, _) = orchestrator(model, FakeController::new());

    let err = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("List pools"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamModel { status: Some(503), .. }));
}

#[tokio::test(start_paused = true)]
async fn test_results_fold_in_proposal_order() {
    let model = FakeModel::replying(reply(
        "Fetching both pools.",
        vec![
            invocation("get_pool", json!({"uuid": "pool-a"})),
            invocation("get_pool", json!({"uuid": "pool-b"})),
        ],
    ));
    let controller = FakeController::new().delayed("get:/pool/pool-a", Duration::from_millis(500));
    let (orchestrator, _, controller) = orchestrator(model, controller);

    let reply = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("Show pool-a and pool-b"))
        .await
        .unwrap();

    // Sequential: the slow call still completes first
    assert_eq!(controller.completed(), vec!["get:/pool/pool-a", "get:/pool/pool-b"]);
    let a = reply.message.find("\"pool-a\"").unwrap();
    let b = reply.message.find("\"pool-b\"").unwrap();
    assert!(a < b);
}

#[tokio::test]
async fn test_text_only_reply_passes_through() {
    let narrative = "Which pool do you mean?";
    let model = FakeModel::replying(reply(narrative, Vec::new()));
    let (orchestrator, _, controller) = orchestrator(model, FakeController::new());

    let reply = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("Scale it out"))
        .await
        .unwrap();

    assert_eq!(reply.message, narrative);
    assert!(reply.tool_calls.is_empty());
    assert!(controller.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_is_skipped_and_rest_continue() {
    let model = FakeModel::replying(reply(
        "Working on it.",
        vec![
            invocation("reboot_controller", json!({})),
            invocation("list_pools", json!({})),
        ],
    ));
    let controller = FakeController::new().with_page(ResourceKind::Pool, &["web-pool"]);
    let (orchestrator, _, controller) = orchestrator(model, controller);

    let reply = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("Reboot and list pools"))
        .await
        .unwrap();

    assert_eq!(reply.tool_calls, vec!["reboot_controller", "list_pools"]);
    assert!(!reply.message.contains("reboot_controller"));
    assert!(reply.message.contains("Found 1 pool: web-pool."));
    assert_eq!(controller.calls(), vec!["list:/pool"]);
}

#[tokio::test]
async fn test_unknown_model_rejected_before_query() {
    let (orchestrator, model, _) = orchestrator(FakeModel::new(Vec::new()), FakeController::new());

    let err = orchestrator
        .handle(
            &CallContext::new(),
            ChatSubmission::new("List pools").with_model("gpt-4"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownModel(_)));
    assert_eq!(model.query_count(), 0);
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let (orchestrator, model, _) = orchestrator(FakeModel::new(Vec::new()), FakeController::new());

    let err = orchestrator
        .handle(&CallContext::new(), ChatSubmission::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(model.query_count(), 0);
}

#[tokio::test]
async fn test_history_sits_between_system_and_message() {
    let (orchestrator, model, _) = orchestrator(FakeModel::new(Vec::new()), FakeController::new());
    let history = vec![
        ConversationTurn::user("List pools"),
        ConversationTurn::assistant("There are 3 pools."),
    ];

    orchestrator
        .handle_with_history(
            &CallContext::new(),
            ChatSubmission::new("Scale out the first one").with_model("mistral"),
            &history,
        )
        .await
        .unwrap();

    let conversations = model.conversations.lock().unwrap();
    let turns = conversations[0].turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::System);
    assert!(turns[0].content.contains("Available tools:"));
    assert!(turns[0].content.contains("- scale_out_pool:"));
    assert_eq!(turns[1].content, "List pools");
    assert_eq!(turns[3].role, Role::User);
    assert_eq!(turns[3].content, "Scale out the first one");
}

// =============================================================================
// ENGINE
// =============================================================================

#[tokio::test]
async fn test_engine_records_failure_phase() {
    let catalog = ToolCatalog::standard();
    let controller = FakeController::new().failing("delete:/virtualservice/vs-9", 404, "not found");
    let response = reply(
        "Done.",
        vec![
            invocation("no_such_tool", json!({})),
            invocation("get_pool", json!({})),
            invocation("get_analytics", json!({"resource_type": "tenant", "uuid": "t-1"})),
            invocation("delete_virtual_service", json!({"uuid": "vs-9"})),
            invocation("get_analytics", json!({"resource_type": "Pool", "uuid": "pool-1"})),
        ],
    );

    let engine = DispatchEngine::new(&catalog, &controller);
    assert_eq!(engine.phase(), DispatchPhase::Received);
    let outcome = engine.run(&CallContext::new(), response).await;

    assert_eq!(outcome.records.len(), 5);
    assert_eq!(outcome.succeeded(), 1);
    assert_eq!(outcome.failed(), 4);

    let phases: Vec<_> = outcome
        .records
        .iter()
        .map(|r| match &r.outcome {
            InvocationOutcome::Failed { phase, .. } => Some(*phase),
            InvocationOutcome::Succeeded(_) => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            Some(DispatchPhase::Validating),
            Some(DispatchPhase::Shaping),
            Some(DispatchPhase::Shaping),
            Some(DispatchPhase::Executing),
            None,
        ]
    );

    assert!(matches!(outcome.records[0].error(), Some(Error::UnknownTool(_))));
    assert!(matches!(
        outcome.records[1].error(),
        Some(Error::MissingArgument { argument, .. }) if argument == "uuid"
    ));
    assert!(matches!(outcome.records[2].error(), Some(Error::InvalidArgument { .. })));
    assert!(matches!(outcome.records[3].error(), Some(Error::GatewayNotFound(_))));

    // Only shaped calls reach the controller
    assert_eq!(
        controller.calls(),
        vec!["delete:/virtualservice/vs-9", "metrics:/analytics/pool/pool-1"]
    );
    assert!(outcome.narrative.contains("API Result (get_analytics)"));
}

#[tokio::test]
async fn test_cancelled_context_skips_execution() {
    let catalog = ToolCatalog::standard();
    let controller = FakeController::new();
    let ctx = CallContext::new();
    ctx.cancel();

    let outcome = DispatchEngine::new(&catalog, &controller)
        .run(&ctx, reply("Listing.", vec![invocation("list_pools", json!({}))]))
        .await;

    assert_eq!(outcome.narrative, "Listing.");
    assert!(matches!(outcome.records[0].error(), Some(Error::Cancelled(_))));
    assert!(controller.calls().is_empty());
}

#[tokio::test]
async fn test_generic_operation_and_completion_lines() {
    let catalog = ToolCatalog::standard();
    let controller = FakeController::new();
    let response = reply(
        "Applying changes.",
        vec![
            invocation(
                "execute_generic_operation",
                json!({"method": "post", "endpoint": "tenant", "body": {"name": "blue"}}),
            ),
            invocation("delete_virtual_service", json!({"uuid": "vs-2"})),
            invocation("scale_in_pool", json!({"uuid": "pool-3"})),
        ],
    );

    let outcome = DispatchEngine::new(&catalog, &controller)
        .run(&CallContext::new(), response)
        .await;

    assert_eq!(outcome.failed(), 0);
    assert_eq!(
        controller.calls(),
        vec![
            "POST:/tenant",
            "delete:/virtualservice/vs-2",
            "scale:/pool/pool-3/scalein"
        ]
    );
    assert!(outcome.narrative.contains("\"name\": \"blue\""));
    assert!(outcome.narrative.contains("Deleted virtual service vs-2."));
    assert!(outcome.narrative.contains("Scale-in requested for pool pool-3."));
}
