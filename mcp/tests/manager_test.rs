//! Integration tests for `McpManager` driven through in-process servers.

mod common;

use std::{sync::Arc, time::Duration};

use common::{
    counting, init_test_logging, prompts_server, slow_server, text_result, tools_server,
    CountingProvider,
};
use futures::future::join_all;
use mcp_client::{
    core::tool_id, CallToolRequest, FilterConfig, McpConfig, McpError, McpFilters, McpManager,
    McpServerConfig, ServerEvent, ServerStatus,
};

fn tool_names(tools: &[mcp_client::AggregatedTool]) -> Vec<String> {
    tools.iter().map(|t| t.name().to_string()).collect()
}

fn service_names(services: &[McpServerConfig]) -> Vec<String> {
    services.iter().map(|s| s.name.clone()).collect()
}

// ============================================================================
// Initialization
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_init_connects_each_server_once() {
    init_test_logging();

    let providers: Vec<Arc<CountingProvider>> = (0..3)
        .map(|i| {
            Arc::new(
                CountingProvider::new(tools_server(&format!("server-{}", i), &["t"]))
                    .with_connect_delay(Duration::from_millis(50)),
            )
        })
        .collect();
    let configs = providers
        .iter()
        .enumerate()
        .map(|(i, p)| McpServerConfig::builtin(format!("server-{}", i), p.clone()))
        .collect();
    let manager = Arc::new(McpManager::with_servers(configs).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.init().await })
        })
        .collect();
    for handle in join_all(handles).await {
        handle.unwrap();
    }

    for provider in &providers {
        assert_eq!(provider.connects(), 1);
    }
    assert_eq!(manager.list_tools(None).await.len(), 3);

    manager.init().await;
    let total: usize = providers.iter().map(|p| p.connects()).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_init_tolerates_partial_failure() {
    init_test_logging();

    let good = counting(tools_server("good", &["ok"]));
    let bad = Arc::new(CountingProvider::new(tools_server("bad", &["never"])).failing());
    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("bad", bad.clone()),
        McpServerConfig::builtin("good", good.clone()),
    ])
    .unwrap();
    let mut events = manager.subscribe();

    manager.init().await;

    assert_eq!(tool_names(&manager.list_tools(None).await), vec!["ok"]);
    assert_eq!(
        manager.get_server("bad").await.unwrap().status,
        ServerStatus::Error
    );
    assert_eq!(
        manager.get_server("good").await.unwrap().status,
        ServerStatus::Activate
    );
    assert_eq!(manager.metrics().connection_errors, 1);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&ServerEvent::Started {
        name: "good".to_string()
    }));
    assert!(seen
        .iter()
        .any(|e| matches!(e, ServerEvent::Error { name, .. } if name == "bad")));
}

#[tokio::test]
async fn test_disabled_servers_are_not_connected() {
    let provider = counting(tools_server("off", &["t"]));
    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("off", provider.clone()).with_status(ServerStatus::Disabled)
    ])
    .unwrap();

    manager.init().await;
    assert_eq!(provider.connects(), 0);
    assert_eq!(manager.list_available_services().await.len(), 1);
    assert!(manager.list_tools(None).await.is_empty());
}

// ============================================================================
// Registry mutations
// ============================================================================

#[tokio::test]
async fn test_add_duplicate_server_fails_without_mutation() {
    let manager = McpManager::with_servers(vec![McpServerConfig::builtin(
        "dup",
        Arc::new(tools_server("dup", &["original"])),
    )
    .with_description("original")])
    .unwrap();

    let replacement = counting(tools_server("dup", &["replacement"]));
    let err = manager
        .add_server(
            McpServerConfig::builtin("dup", replacement.clone()).with_description("replacement"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, McpError::DuplicateServer(ref name) if name == "dup"));
    assert_eq!(err.to_string(), "Server with name dup already exists");
    assert_eq!(replacement.connects(), 0);

    let services = manager.list_available_services().await;
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].description.as_deref(), Some("original"));
    assert_eq!(tool_names(&manager.list_tools(None).await), vec!["original"]);
}

#[tokio::test]
async fn test_builtin_handle_registered_under_one_name() {
    let shared = counting(tools_server("shared", &["t"]));
    let err = McpManager::with_servers(vec![
        McpServerConfig::builtin("a", shared.clone()),
        McpServerConfig::builtin("b", shared.clone()),
    ])
    .err()
    .unwrap();
    assert!(matches!(err, McpError::Config(_)));

    let manager =
        McpManager::with_servers(vec![McpServerConfig::builtin("a", shared.clone())]).unwrap();
    manager.init().await;

    let err = manager
        .add_server(McpServerConfig::builtin("b", shared.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Config(ref msg) if msg.contains("'a'")));
    assert!(manager.get_server("b").await.is_none());
    assert_eq!(shared.connects(), 1);

    // Pointing another entry at the handle through an update is refused too.
    manager
        .add_server(McpServerConfig::builtin(
            "c",
            Arc::new(tools_server("c", &["other"])),
        ))
        .await
        .unwrap();
    let err = manager
        .update_server(McpServerConfig::builtin("c", shared.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Config(_)));
    assert_eq!(tool_names(&manager.list_tools(Some("c")).await), vec!["other"]);

    // The owner keeps serving.
    assert_eq!(shared.closes(), 0);
    assert_eq!(tool_names(&manager.list_tools(Some("a")).await), vec!["t"]);
    manager
        .call_tool(CallToolRequest::new("a", "t"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_server_emits_started() {
    let manager = McpManager::with_servers(vec![]).unwrap();
    manager.init().await;
    let mut events = manager.subscribe();

    manager
        .add_server(McpServerConfig::builtin(
            "fresh",
            Arc::new(tools_server("fresh", &["a"])),
        ))
        .await
        .unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        ServerEvent::Started {
            name: "fresh".to_string()
        }
    );
    assert_eq!(manager.list_tools(Some("fresh")).await.len(), 1);
}

#[tokio::test]
async fn test_failed_add_emits_error_and_registers_nothing() {
    init_test_logging();
    let manager = McpManager::with_servers(vec![]).unwrap();
    let mut events = manager.subscribe();

    let result = manager
        .add_server(McpServerConfig::stdio(
            "bad-server",
            "non-existent-command-for-test",
            Vec::<String>::new(),
        ))
        .await;

    assert!(result.is_err());
    match events.recv().await.unwrap() {
        ServerEvent::Error { name, error } => {
            assert_eq!(name, "bad-server");
            assert!(!error.is_empty());
        }
        other => panic!("Expected server-error, got {:?}", other),
    }
    assert!(manager.get_server("bad-server").await.is_none());
    assert!(manager.list_available_services().await.is_empty());

    // A second attempt is allowed.
    let retry = counting(tools_server("bad-server", &["t"]));
    manager
        .add_server(McpServerConfig::builtin("bad-server", retry.clone()))
        .await
        .unwrap();
    assert_eq!(retry.connects(), 1);
}

#[tokio::test]
async fn test_delete_server_closes_once() {
    let provider = counting(tools_server("delete-server", &["t"]));
    let manager =
        McpManager::with_servers(vec![McpServerConfig::builtin("delete-server", provider.clone())])
            .unwrap();
    manager.init().await;
    let mut events = manager.subscribe();

    manager.delete_server("delete-server").await.unwrap();

    assert_eq!(provider.closes(), 1);
    assert!(manager.list_available_services().await.is_empty());
    assert!(manager.list_tools(None).await.is_empty());
    assert_eq!(
        events.recv().await.unwrap(),
        ServerEvent::Stopped {
            name: "delete-server".to_string()
        }
    );

    let err = manager.delete_server("delete-server").await.unwrap_err();
    assert!(matches!(err, McpError::ServerNotFound(_)));
    assert_eq!(provider.closes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_activate_racing_delete_leaves_nothing_connected() {
    init_test_logging();
    for _ in 0..50 {
        let provider = counting(tools_server("x", &["t"]));
        let manager = Arc::new(
            McpManager::with_servers(vec![McpServerConfig::builtin("x", provider.clone())
                .with_status(ServerStatus::Disabled)])
            .unwrap(),
        );
        manager.init().await;

        let activate = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.set_server_active("x", true).await }
        });
        let delete = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.delete_server("x").await }
        });

        let (activated, deleted) = (activate.await.unwrap(), delete.await.unwrap());
        deleted.unwrap();
        if let Err(e) = activated {
            assert!(e.is_not_found(), "unexpected activation error: {}", e);
        }

        assert!(manager.list_available_services().await.is_empty());
        assert!(manager.list_tools(None).await.is_empty());
        assert_eq!(provider.connects(), provider.closes());
        assert_eq!(manager.metrics().active_connections, 0);
    }
}

#[tokio::test]
async fn test_set_server_active_round_trip() {
    let provider = counting(tools_server("status-server", &["tool-a", "tool-b"]));
    let manager =
        McpManager::with_servers(vec![McpServerConfig::builtin("status-server", provider.clone())])
            .unwrap();
    assert_eq!(manager.list_tools(None).await.len(), 2);

    manager
        .set_server_active("status-server", false)
        .await
        .unwrap();
    assert_eq!(
        manager.get_server("status-server").await.unwrap().status,
        ServerStatus::Error
    );
    assert!(manager.list_tools(None).await.is_empty());
    assert_eq!(provider.closes(), 1);

    manager
        .set_server_active("status-server", true)
        .await
        .unwrap();
    assert_eq!(
        manager.get_server("status-server").await.unwrap().status,
        ServerStatus::Activate
    );
    assert_eq!(
        tool_names(&manager.list_tools(None).await),
        vec!["tool-a", "tool-b"]
    );
    assert_eq!(provider.connects(), 2);

    // Repeating a transition is a no-op.
    manager
        .set_server_active("status-server", true)
        .await
        .unwrap();
    assert_eq!(provider.connects(), 2);

    manager.deactivate("status-server").await.unwrap();
    manager.deactivate("status-server").await.unwrap();
    assert_eq!(provider.closes(), 2);

    let err = manager.set_server_active("missing", true).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_failed_reactivation_keeps_error_status() {
    let provider = Arc::new(CountingProvider::new(tools_server("flaky", &["t"])).failing());
    let manager = McpManager::with_servers(vec![McpServerConfig::builtin(
        "flaky",
        provider.clone(),
    )
    .with_status(ServerStatus::Disabled)])
    .unwrap();

    assert!(manager.set_server_active("flaky", true).await.is_err());
    assert_eq!(
        manager.get_server("flaky").await.unwrap().status,
        ServerStatus::Error
    );
    assert_eq!(provider.connects(), 1);
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_list_tools_aggregates_in_registry_order() {
    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("second", Arc::new(tools_server("second", &["b1", "b2"]))),
        McpServerConfig::builtin("first", Arc::new(tools_server("first", &["a1"]))),
    ])
    .unwrap();

    let tools = manager.list_tools(None).await;
    assert_eq!(tool_names(&tools), vec!["b1", "b2", "a1"]);
    assert_eq!(tools[0].server_name, "second");
    assert_eq!(tools[2].server_name, "first");
    assert_eq!(tools[2].id, tool_id("first", "a1"));

    let only_first = manager.list_tools(Some("first")).await;
    assert_eq!(tool_names(&only_first), vec!["a1"]);
    assert!(manager.list_tools(Some("missing")).await.is_empty());

    // Ids are stable across listings and manager instances.
    let again = manager.list_tools(None).await;
    assert_eq!(tools[0].id, again[0].id);
}

#[tokio::test]
async fn test_tool_filters() {
    let filters = McpFilters {
        tools: Some(FilterConfig::allow(["a*"]).with_block(["ab"])),
        prompts: None,
    };
    let manager = McpManager::with_servers(vec![McpServerConfig::builtin(
        "filtered",
        Arc::new(tools_server("filtered", &["a1", "ab", "b1"])),
    )
    .with_filters(filters)])
    .unwrap();

    assert_eq!(tool_names(&manager.list_tools(None).await), vec!["a1"]);
}

#[tokio::test]
async fn test_mixed_pattern_filters() {
    let filters = McpFilters {
        tools: Some(
            FilterConfig::allow(["allowed-tool", "pattern-*"]).with_block(["blocked-tool"]),
        ),
        prompts: None,
    };
    let manager = McpManager::with_servers(vec![McpServerConfig::builtin(
        "patterns",
        Arc::new(tools_server(
            "patterns",
            &["allowed-tool", "blocked-tool", "pattern-tool-test", "other"],
        )),
    )
    .with_filters(filters)])
    .unwrap();

    assert_eq!(
        tool_names(&manager.list_tools(None).await),
        vec!["allowed-tool", "pattern-tool-test"]
    );
}

#[tokio::test]
async fn test_list_prompts_uses_prompt_filters() {
    let filters = McpFilters {
        tools: Some(FilterConfig::block(["*"])),
        prompts: Some(FilterConfig::block(["secret-*"])),
    };
    let manager = McpManager::with_servers(vec![McpServerConfig::builtin(
        "prompts-server",
        Arc::new(prompts_server(
            "prompts-server",
            &["test-prompt-1", "secret-prompt"],
        )),
    )
    .with_filters(filters)])
    .unwrap();

    let prompts = manager.list_prompts(None).await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].name(), "test-prompt-1");
    assert_eq!(prompts[0].server_name, "prompts-server");
    assert!(prompts[0].id.starts_with('p'));
    assert!(manager.list_prompts(Some("nowhere")).await.is_empty());
}

#[tokio::test]
async fn test_hanging_listing_does_not_block_others() {
    struct Hanging;

    #[async_trait::async_trait]
    impl mcp_client::McpProvider for Hanging {
        async fn connect(&self) -> mcp_client::McpResult<()> {
            Ok(())
        }
        async fn list_tools(&self) -> mcp_client::McpResult<Vec<mcp_client::Tool>> {
            std::future::pending().await
        }
        async fn list_prompts(&self) -> mcp_client::McpResult<Vec<mcp_client::Prompt>> {
            Err(McpError::Transport("prompts unsupported".to_string()))
        }
        async fn call_tool(
            &self,
            name: &str,
            _arguments: Option<mcp_client::JsonObject>,
        ) -> mcp_client::McpResult<mcp_client::CallToolResult> {
            Err(McpError::ToolNotFound(name.to_string()))
        }
        async fn close(&self) -> mcp_client::McpResult<()> {
            Ok(())
        }
    }

    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("hanging", Arc::new(Hanging)).with_timeout(0.1),
        McpServerConfig::builtin("healthy", Arc::new(tools_server("healthy", &["ok"]))),
    ])
    .unwrap();

    assert_eq!(tool_names(&manager.list_tools(None).await), vec!["ok"]);
    assert!(manager.list_prompts(Some("hanging")).await.is_empty());
}

// ============================================================================
// Tool calls
// ============================================================================

#[tokio::test]
async fn test_server_timeout_overrides_default() {
    init_test_logging();
    let config = McpConfig::new(vec![
        McpServerConfig::builtin(
            "short-timeout-server",
            Arc::new(slow_server(
                "short-timeout-server",
                "slow-tool",
                Duration::from_millis(150),
            )),
        )
        .with_timeout(0.1),
        McpServerConfig::builtin(
            "long-timeout-server",
            Arc::new(slow_server(
                "long-timeout-server",
                "slow-tool",
                Duration::from_millis(150),
            )),
        )
        .with_timeout(0.3),
    ])
    .with_default_timeout(1.0);
    let manager = McpManager::new(config).unwrap();
    manager.init().await;

    let err = manager
        .call_tool(CallToolRequest::new("short-timeout-server", "slow-tool"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    match err {
        McpError::Timeout {
            server, timeout, ..
        } => {
            assert_eq!(server, "short-timeout-server");
            assert!((timeout.as_secs_f64() - 0.1).abs() < 1e-6);
        }
        other => panic!("Expected timeout, got {:?}", other),
    }

    let result = manager
        .call_tool(CallToolRequest::new("long-timeout-server", "slow-tool"))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::to_value(text_result("Slow tool result")).unwrap()
    );

    let metrics = manager.metrics();
    assert_eq!(metrics.total_calls, 2);
    assert_eq!(metrics.successful_calls, 1);
    assert_eq!(metrics.timed_out_calls, 1);
    assert_eq!(metrics.active_executions, 0);
}

#[tokio::test]
async fn test_default_timeout_applies_without_override() {
    let config = McpConfig::new(vec![McpServerConfig::builtin(
        "slow",
        Arc::new(slow_server("slow", "slow-tool", Duration::from_millis(150))),
    )])
    .with_default_timeout(0.05);
    let manager = McpManager::new(config).unwrap();

    let err = manager
        .call_tool(CallToolRequest::new("slow", "slow-tool"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_oversized_timeouts_are_rejected() {
    let manager = McpManager::with_servers(vec![]).unwrap();
    let provider = counting(tools_server("huge", &["t"]));

    let err = manager
        .add_server(McpServerConfig::builtin("huge", provider.clone()).with_timeout(1e20))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Config(_)));
    assert_eq!(provider.connects(), 0);
    assert!(manager.list_available_services().await.is_empty());

    let health = manager
        .check_server_status(&McpServerConfig::builtin("huge", provider).with_timeout(1e20))
        .await;
    assert!(!health.reachable);

    let result = McpManager::new(McpConfig::default().with_default_timeout(1e20));
    assert!(matches!(result, Err(McpError::Config(_))));
}

#[tokio::test]
async fn test_call_errors_are_distinguishable() {
    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("tools", Arc::new(tools_server("tools", &["echo"]))),
        McpServerConfig::builtin("off", Arc::new(tools_server("off", &["echo"])))
            .with_status(ServerStatus::Disabled),
    ])
    .unwrap();

    let missing_server = manager
        .call_tool(CallToolRequest::new("nowhere", "echo"))
        .await
        .unwrap_err();
    assert!(matches!(missing_server, McpError::ServerNotFound(_)));
    assert_eq!(missing_server.to_string(), "MCP Client nowhere not found");

    let inactive = manager
        .call_tool(CallToolRequest::new("off", "echo"))
        .await
        .unwrap_err();
    assert!(matches!(inactive, McpError::ServerNotFound(_)));

    let missing_tool = manager
        .call_tool(CallToolRequest::new("tools", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(missing_tool, McpError::ToolNotFound(_)));

    let ok = manager
        .call_tool(CallToolRequest::new("tools", "echo"))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        serde_json::to_value(text_result("echo")).unwrap()
    );
}

#[tokio::test]
async fn test_tool_execution_error_propagates() {
    let server = mcp_client::BuiltinServer::new("failing").with_tool(
        mcp_client::core::tool_descriptor("explode", "Always fails", serde_json::json!({})),
        |_| async {
            Err::<mcp_client::CallToolResult, _>(McpError::ToolExecution("kaboom".to_string()))
        },
    );
    let manager =
        McpManager::with_servers(vec![McpServerConfig::builtin("failing", Arc::new(server))])
            .unwrap();

    let err = manager
        .call_tool(CallToolRequest::new("failing", "explode"))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::ToolExecution(ref msg) if msg == "kaboom"));
    assert_eq!(manager.metrics().failed_calls, 1);
}

// ============================================================================
// Diagnostics and teardown
// ============================================================================

#[tokio::test]
async fn test_check_server_status_resolves_for_registered_server() {
    let provider = counting(tools_server("status", &["a", "b"]));
    let config = McpServerConfig::builtin("status", provider.clone());
    let manager = McpManager::with_servers(vec![config.clone()]).unwrap();
    manager.init().await;

    let health = manager.check_server_status(&config).await;
    assert!(health.reachable);
    assert_eq!(health.tool_count, Some(2));
    // The live provider is reused.
    assert_eq!(provider.connects(), 1);
    assert_eq!(manager.list_available_services().await.len(), 1);
}

#[tokio::test]
async fn test_check_server_status_closes_unserved_builtin() {
    let manager = McpManager::with_servers(vec![]).unwrap();
    let loose = counting(tools_server("loose", &["t"]));
    let health = manager
        .check_server_status(&McpServerConfig::builtin("loose", loose.clone()))
        .await;
    assert!(health.reachable);
    assert_eq!((loose.connects(), loose.closes()), (1, 1));

    let parked = counting(tools_server("parked", &["t"]));
    let config =
        McpServerConfig::builtin("parked", parked.clone()).with_status(ServerStatus::Disabled);
    manager.add_server(config.clone()).await.unwrap();

    let health = manager.check_server_status(&config).await;
    assert!(health.reachable);
    assert_eq!((parked.connects(), parked.closes()), (1, 1));

    // Nothing is left open for the delete to close.
    manager.delete_server("parked").await.unwrap();
    assert_eq!(parked.closes(), 1);
}

#[tokio::test]
async fn test_check_server_status_reports_failure() {
    let manager = McpManager::with_servers(vec![]).unwrap();
    let provider = Arc::new(CountingProvider::new(tools_server("down", &[])).failing());

    let health = manager
        .check_server_status(&McpServerConfig::builtin("down", provider))
        .await;
    assert!(!health.reachable);
    assert!(health.error.unwrap().contains("refused"));
}

#[tokio::test]
async fn test_cleanup_closes_everything() {
    let a = counting(tools_server("cleanup-a", &["t"]));
    let b = counting(tools_server("cleanup-b", &["t"]));
    let manager = McpManager::with_servers(vec![
        McpServerConfig::builtin("cleanup-a", a.clone()),
        McpServerConfig::builtin("cleanup-b", b.clone()),
        McpServerConfig::builtin("cleanup-off", Arc::new(tools_server("cleanup-off", &["t"])))
            .with_status(ServerStatus::Disabled),
    ])
    .unwrap();
    manager.init().await;
    assert_eq!(manager.list_available_services().await.len(), 3);

    manager.cleanup().await;

    assert_eq!(a.closes(), 1);
    assert_eq!(b.closes(), 1);
    assert!(manager.list_tools(None).await.is_empty());
    assert!(manager.list_prompts(None).await.is_empty());
    assert!(manager.list_available_services().await.is_empty());
    assert!(manager
        .call_tool(CallToolRequest::new("cleanup-a", "t"))
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(manager.metrics().active_connections, 0);

    // Cleanup does not re-run initialization.
    manager.init().await;
    assert_eq!(a.connects(), 1);
    assert!(service_names(&manager.list_available_services().await).is_empty());
}

#[tokio::test]
async fn test_managers_do_not_share_state() {
    let first = McpManager::with_servers(vec![McpServerConfig::builtin(
        "shared-name",
        Arc::new(tools_server("shared-name", &["x"])),
    )])
    .unwrap();
    let second = McpManager::with_servers(vec![]).unwrap();

    assert_eq!(first.list_tools(None).await.len(), 1);
    assert!(second.list_tools(None).await.is_empty());
    second
        .add_server(McpServerConfig::builtin(
            "shared-name",
            Arc::new(tools_server("shared-name", &["y"])),
        ))
        .await
        .unwrap();
    assert_eq!(tool_names(&first.list_tools(None).await), vec!["x"]);
}
