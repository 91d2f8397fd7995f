use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use norm_agent::config::{AgentSettings, NormApiConfig, ReportMode};
use norm_agent::domain::model::{ChatMessage, Role};
use norm_agent::domain::ports::LanguageModel;
use norm_agent::{AgentError, NormClient, ReActAgent, ToolRegistry};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// 依序回放預先寫好的回覆，並記錄每次收到的對話
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> (Self, Arc<Mutex<Vec<Vec<ChatMessage>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Arc::clone(&seen),
        };
        (model, seen)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> norm_agent::Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::ModelError {
                message: "script exhausted".to_string(),
            })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

const INFO_CALL: &str = r#"Thought: I need the device information.
Action:
<tool_call>
{"name": "get_device_info", "arguments": {"hostname": "SRMECH01"}, "id": 1}
</tool_call>"#;

const REPORT_CALL: &str = r#"Thought: The user confirmed.
Action:
<tool_call>
{"name": "get_device_report", "arguments": {"hostname": "SRMECH01", "tags": ["TIMOS", "CORE", "SR", "HE_MECH"]}}
</tool_call>"#;

async fn norm_server() -> MockServer {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/norm_services/v1/search/super_search")
                .query_param("search_term", "SRMECH01");
            then.status(200).json_body(json!({
                "meta": {"query_duration": "0.1s", "object_count": 3},
                "data": [
                    {"classname": "NormDevice", "identifier": "SRMECH01",
                     "additional_info": ["SRMECH01", "TIMOS", "CORE", "SR", "HE_MECH"]},
                    {"classname": "TimosChassis", "identifier": "c1", "additional_info": ["7750 SR-12"]},
                    {"classname": "TimosSap", "identifier": "1/1/1:100", "origin": "AGG01"}
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/norm_services/v1/view/timos/SRMECH01/detail");
            then.status(200).json_body(json!({
                "system_info": {"model": "Nokia 7750 SR-12", "version": "TiMOS-B-20.10.R1", "uptime": "10 days"},
                "interfaces": [{"status": "up"}],
                "services": {"vprn": [1]},
                "alarms": []
            }));
        })
        .await;
    server
}

fn agent_with(server: &MockServer, model: ScriptedModel) -> Result<ReActAgent> {
    let config = NormApiConfig {
        base_url: server.base_url(),
        api_key: "test-key".to_string(),
        ..NormApiConfig::default()
    };
    let tools = ToolRegistry::with_defaults(NormClient::new(&config)?, ReportMode::Detail);
    Ok(ReActAgent::new(
        Box::new(model),
        tools,
        AgentSettings::default(),
        20,
    ))
}

fn last_user_turn(conversation: &[ChatMessage]) -> &str {
    conversation
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

#[tokio::test]
async fn test_device_info_then_confirmed_report() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        INFO_CALL,
        "Final Answer: SRMECH01 is a 7750 SR-12 core router.\nWould you like me to show you the detailed report of this device?",
        REPORT_CALL,
        "Final Answer: SRMECH01 runs TiMOS-B-20.10.R1 with 1 interface up.",
    ]);
    let mut agent = agent_with(&server, model)?;

    let first = agent.process_query("show me SRMECH01").await?;
    assert!(first.starts_with("SRMECH01 is a 7750 SR-12 core router."));
    assert_eq!(agent.last_tool_calls(), 1);

    let device = agent.last_device().expect("device remembered");
    assert_eq!(device.hostname, "SRMECH01");
    assert_eq!(device.tags, vec!["TIMOS", "CORE", "SR", "HE_MECH"]);

    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0][0].role, Role::System);
        let observation = last_user_turn(&seen[1]);
        assert!(observation.starts_with("Observation: 🖥️ SRMECH01 - 7750 SR-12 (TIMOS Service Router)"));
        assert!(observation.contains("Device tags: [\"TIMOS\",\"CORE\",\"SR\",\"HE_MECH\"]"));
        assert!(observation.contains("ask if the user wants a detailed report"));
    }

    let second = agent.process_query("yes").await?;
    assert_eq!(second, "SRMECH01 runs TiMOS-B-20.10.R1 with 1 interface up.");

    {
        let seen = seen.lock().unwrap();
        let guidance = last_user_turn(&seen[2]);
        assert!(guidance.starts_with("yes - User confirmed they want the detailed report for SRMECH01."));
        assert!(guidance.contains("tags=[\"TIMOS\",\"CORE\",\"SR\",\"HE_MECH\"]"));

        let report = last_user_turn(&seen[3]);
        assert!(report.starts_with("Observation: SRMECH01 - Nokia 7750 SR-12"));
        assert!(report.contains("Do NOT ask any more questions"));
    }

    let history = agent.conversation_history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[2].content, "yes");
    Ok(())
}

#[tokio::test]
async fn test_confirmation_without_offer_gets_no_guidance() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&["Final Answer: What would you like to see?"]);
    let mut agent = agent_with(&server, model)?;

    agent.process_query("ok").await?;

    let seen = seen.lock().unwrap();
    assert_eq!(last_user_turn(&seen[0]), "ok");
    Ok(())
}

#[tokio::test]
async fn test_repeated_tool_call_is_not_executed_twice() -> Result<()> {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path("/norm_services/v1/search/super_search");
            then.status(200).json_body(json!({"data": [
                {"classname": "NormDevice", "identifier": "SRMECH01", "additional_info": ["TIMOS", "CORE"]}
            ]}));
        })
        .await;

    let repeat = format!("Thought: let me check again.\n{}", INFO_CALL);
    let (model, seen) = ScriptedModel::new(&[
        INFO_CALL,
        &repeat,
        "Final Answer: SRMECH01 found. Would you like me to show you the detailed report of this device?",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("info SRMECH01").await?;

    assert!(answer.starts_with("SRMECH01 found."));
    search.assert_hits_async(1).await;
    assert_eq!(agent.last_tool_calls(), 1);
    let seen = seen.lock().unwrap();
    assert!(last_user_turn(&seen[2]).starts_with("You already executed get_device_info."));
    Ok(())
}

#[tokio::test]
async fn test_unknown_tool_becomes_failed_observation() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        r#"Thought: reboot it.
<tool_call>{"name": "reboot_device", "arguments": {"hostname": "SRMECH01"}}</tool_call>"#,
        "Final Answer: I cannot reboot devices.",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("reboot SRMECH01").await?;

    assert_eq!(answer, "I cannot reboot devices.");
    let seen = seen.lock().unwrap();
    assert_eq!(
        last_user_turn(&seen[1]),
        "Observation: Tool execution failed: Unknown tool: reboot_device. Available tools: [\"get_device_info\", \"get_device_report\"]"
    );
    Ok(())
}

#[tokio::test]
async fn test_identical_responses_stop_the_loop() -> Result<()> {
    let server = norm_server().await;
    let (model, _) = ScriptedModel::new(&["Thought: hmm", "Thought: hmm", "Thought: hmm"]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("what now").await?;

    assert_eq!(
        answer,
        "The agent got stuck in a reasoning loop. Here's the context gathered:\nThought: hmm\nThought: hmm\n"
    );
    assert_eq!(agent.conversation_history().last().unwrap().content, answer);
    Ok(())
}

#[tokio::test]
async fn test_max_iterations_returns_gathered_context() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        "Thought: step 1",
        "Thought: step 2",
        "Thought: step 3",
        "Thought: step 4",
        "Thought: step 5",
        "Final Answer: too late",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("think hard").await?;

    assert!(answer.starts_with(
        "I've reached the maximum number of reasoning steps. Based on what I've gathered so far, here's what I found:\nThought: step 1\n"
    ));
    assert!(answer.contains("Thought: step 5"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert_eq!(
        last_user_turn(&seen[1]),
        "Please continue with the next action or provide your Final Answer based on the information gathered."
    );
    Ok(())
}

#[tokio::test]
async fn test_model_failure_propagates() -> Result<()> {
    let server = norm_server().await;
    let (model, _) = ScriptedModel::new(&[]);
    let mut agent = agent_with(&server, model)?;

    let err = agent.process_query("hello").await.unwrap_err();

    assert!(matches!(err, AgentError::ModelError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_history_window_limits_context() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        "Final Answer: one",
        "Final Answer: two",
        "Final Answer: three",
    ]);
    let config = NormApiConfig {
        base_url: server.base_url(),
        api_key: "test-key".to_string(),
        ..NormApiConfig::default()
    };
    let tools = ToolRegistry::with_defaults(NormClient::new(&config)?, ReportMode::Detail);
    let mut agent = ReActAgent::new(Box::new(model), tools, AgentSettings::default(), 3);

    agent.process_query("first").await?;
    agent.process_query("second").await?;
    agent.process_query("third").await?;

    let seen = seen.lock().unwrap();
    let last = &seen[2];
    // system + 3 則最近的紀錄
    assert_eq!(last.len(), 4);
    assert_eq!(last[1].content, "second");
    assert_eq!(last[3].content, "third");
    Ok(())
}

#[tokio::test]
async fn test_repeated_identical_tool_call_gets_loop_intervention() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        INFO_CALL,
        INFO_CALL,
        INFO_CALL,
        "Final Answer: SRMECH01 is a 7750 SR-12. Would you like me to show you the detailed report of this device?",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("show me SRMECH01").await?;

    assert!(answer.starts_with("SRMECH01 is a 7750 SR-12."));
    assert_eq!(agent.last_tool_calls(), 1);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(last_user_turn(&seen[2]).starts_with("You already executed get_device_info."));
    assert_eq!(
        last_user_turn(&seen[3]),
        "You already executed this tool. Please provide your Final Answer based on the observation you received."
    );
    Ok(())
}

#[tokio::test]
async fn test_invented_observation_is_sent_back() -> Result<()> {
    let server = norm_server().await;
    let (model, seen) = ScriptedModel::new(&[
        INFO_CALL,
        r#"Thought: Let me also check the neighbour.
<tool_call>{"name": "get_device_info", "arguments": {"hostname": "AGG01"}}</tool_call>
Observation: AGG01 is an aggregation switch."#,
        "Final Answer: SRMECH01 is a core router.",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("show me SRMECH01").await?;

    assert_eq!(answer, "SRMECH01 is a core router.");
    assert_eq!(agent.last_tool_calls(), 1);
    let seen = seen.lock().unwrap();
    assert_eq!(
        last_user_turn(&seen[2]),
        "I see you've planned the actions. Now execute the first tool call to get real observations."
    );
    Ok(())
}

#[tokio::test]
async fn test_no_tool_runs_after_device_report() -> Result<()> {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path("/norm_services/v1/search/super_search");
            then.status(200).json_body(json!({"data": []}));
        })
        .await;
    let detail = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/norm_services/v1/view/timos/SRMECH01/detail");
            then.status(200).json_body(json!({
                "system_info": {"model": "Nokia 7750 SR-12", "version": "TiMOS-B-20.10.R1"}
            }));
        })
        .await;

    let (model, seen) = ScriptedModel::new(&[
        REPORT_CALL,
        INFO_CALL,
        "Final Answer: SRMECH01 runs TiMOS-B-20.10.R1.",
    ]);
    let mut agent = agent_with(&server, model)?;

    let answer = agent.process_query("detailed report for SRMECH01").await?;

    assert_eq!(answer, "SRMECH01 runs TiMOS-B-20.10.R1.");
    detail.assert_hits_async(1).await;
    search.assert_hits_async(0).await;
    assert_eq!(agent.last_tool_calls(), 1);
    let seen = seen.lock().unwrap();
    assert!(last_user_turn(&seen[2]).starts_with("You already have the detailed report."));
    Ok(())
}
