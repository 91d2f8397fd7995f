use crate::config::AgentSettings;
use crate::core::prompt;
use crate::core::tool_call::{find_all_tool_calls, tool_id};
use crate::domain::model::{ChatMessage, DeviceContext, Role, ToolCall, ToolOutput};
use crate::domain::ports::LanguageModel;
use crate::tools::{device_info, device_report, ToolRegistry};
use crate::utils::error::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const DEVICE_INFO: &str = device_info::TOOL_NAME;
const DEVICE_REPORT: &str = device_report::TOOL_NAME;

fn final_answer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)Final Answer:\s*(.*)")
            .unwrap_or_else(|e| unreachable!("invalid final answer pattern: {e}"))
    })
}

/// 單次查詢內的執行狀態
#[derive(Default)]
struct LoopState {
    context: String,
    executed: HashSet<String>,
    last_response: String,
    identical_count: usize,
    device_info_executed: bool,
    device_report_executed: bool,
    tool_calls: usize,
}

impl LoopState {
    fn all_executed(&self, calls: &[ToolCall]) -> bool {
        !calls.is_empty() && calls.iter().all(|c| self.executed.contains(&tool_id(c)))
    }

    fn is_runnable(&self, call: &ToolCall) -> bool {
        if self.executed.contains(&tool_id(call)) {
            return false;
        }
        if self.device_info_executed && call.name == DEVICE_INFO {
            tracing::info!("Skipping duplicate get_device_info call");
            return false;
        }
        if self.device_report_executed {
            tracing::info!("Device report already executed - no more tools allowed");
            return false;
        }
        true
    }
}

/// Thought → Action → Observation → Final Answer 迴圈
pub struct ReActAgent {
    model: Box<dyn LanguageModel>,
    tools: ToolRegistry,
    settings: AgentSettings,
    history_limit: usize,
    system_prompt: String,
    conversation_history: Vec<ChatMessage>,
    last_device: Option<DeviceContext>,
    last_tool_calls: usize,
}

impl ReActAgent {
    pub fn new(
        model: Box<dyn LanguageModel>,
        tools: ToolRegistry,
        settings: AgentSettings,
        history_limit: usize,
    ) -> Self {
        let system_prompt = prompt::system_prompt(&tools);
        Self {
            model,
            tools,
            settings,
            history_limit: history_limit.max(1),
            system_prompt,
            conversation_history: Vec::new(),
            last_device: None,
            last_tool_calls: 0,
        }
    }

    pub fn conversation_history(&self) -> &[ChatMessage] {
        &self.conversation_history
    }

    /// 最近一次 get_device_info 查到的裝置
    pub fn last_device(&self) -> Option<&DeviceContext> {
        self.last_device.as_ref()
    }

    /// 上一次查詢實際執行的工具數
    pub fn last_tool_calls(&self) -> usize {
        self.last_tool_calls
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_description(&self) -> String {
        self.model.describe()
    }

    pub async fn process_query(&mut self, query: &str) -> Result<String> {
        self.conversation_history.push(ChatMessage::user(query));

        let mut messages = self.initial_messages();
        if let Some(guidance) = self.confirmation_guidance(query) {
            messages.push(ChatMessage::user(guidance));
        }

        let mut state = LoopState::default();
        let result = self.run_loop(&mut messages, &mut state).await;
        self.last_tool_calls = state.tool_calls;
        let answer = result?;

        self.conversation_history.push(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }

    fn initial_messages(&self) -> Vec<ChatMessage> {
        let skip = self
            .conversation_history
            .len()
            .saturating_sub(self.history_limit);

        std::iter::once(ChatMessage::system(self.system_prompt.clone()))
            .chain(self.conversation_history[skip..].iter().cloned())
            .collect()
    }

    fn is_confirmation(&self, query: &str) -> bool {
        let normalized = query.trim().to_lowercase();
        self.settings
            .confirmation_words
            .iter()
            .any(|word| word.eq_ignore_ascii_case(&normalized))
    }

    /// 使用者回覆 yes 時，補上要求呼叫 get_device_report 的指引
    fn confirmation_guidance(&self, query: &str) -> Option<String> {
        if !self.is_confirmation(query) {
            return None;
        }

        let offered_report = self.conversation_history.iter().rev().any(|msg| {
            msg.role == Role::Assistant
                && msg.content.to_lowercase().contains("detailed report")
                && msg.content.contains('?')
        });
        if !offered_report {
            return None;
        }

        let guidance = match &self.last_device {
            Some(device) if !device.tags.is_empty() => format!(
                "{} - User confirmed they want the detailed report for {}. Call get_device_report with hostname='{}' and tags={}.",
                query,
                device.hostname,
                device.hostname,
                tags_json(&device.tags)
            ),
            Some(device) => format!(
                "{} - User confirmed they want the detailed report for {}. Extract the device tags from the conversation history and call get_device_report with hostname='{}' and the appropriate tags.",
                query, device.hostname, device.hostname
            ),
            None => format!(
                "{} - User confirmed they want the detailed report. Look at the conversation history to find the device hostname and tags from the most recent device info query, then call get_device_report with those exact details.",
                query
            ),
        };
        tracing::debug!("Confirmation guidance: {}", guidance);
        Some(guidance)
    }

    async fn run_loop(
        &mut self,
        messages: &mut Vec<ChatMessage>,
        state: &mut LoopState,
    ) -> Result<String> {
        for iteration in 1..=self.settings.max_iterations {
            tracing::info!(
                "🤖 Messages sent to LLM (iteration {}): {} messages",
                iteration,
                messages.len()
            );
            let response = self.model.complete(messages).await?;
            tracing::debug!("LLM response (iteration {}):\n{}", iteration, response);

            let tool_calls = find_all_tool_calls(&response);

            if response.trim() == state.last_response.trim() {
                state.identical_count += 1;
                if state.identical_count >= 2 {
                    tracing::warn!(
                        "⚠️ Detected loop - identical response {} times",
                        state.identical_count
                    );
                    if tool_calls.iter().any(|c| state.executed.contains(&tool_id(c))) {
                        messages.push(ChatMessage::user(
                            "You already executed this tool. Please provide your Final Answer based on the observation you received.",
                        ));
                        continue;
                    }
                    return Ok(format!(
                        "The agent got stuck in a reasoning loop. Here's the context gathered:\n{}",
                        state.context
                    ));
                }
            } else {
                state.identical_count = 0;
            }

            state.last_response = response.clone();
            state.context.push_str(&response);
            state.context.push('\n');

            tracing::info!("Found {} tool calls in response", tool_calls.len());

            if let Some(call) = tool_calls.iter().find(|c| state.is_runnable(c)) {
                let observation = self.run_tool(call, state).await;
                messages.push(ChatMessage::assistant(response));
                messages.push(ChatMessage::user(observation_turn(&call.name, &observation)));
                continue;
            }

            if state.all_executed(&tool_calls) {
                messages.push(ChatMessage::user(already_executed_nudge(state)));
                continue;
            }

            if let Some(answer) = final_answer_pattern()
                .captures(&response)
                .and_then(|caps| caps.get(1))
            {
                return Ok(answer.as_str().trim().to_string());
            }

            let nudge = if response.contains("Observation:") && !tool_calls.is_empty() {
                "I see you've planned the actions. Now execute the first tool call to get real observations."
            } else {
                continue_nudge(state)
            };
            messages.push(ChatMessage::assistant(response));
            messages.push(ChatMessage::user(nudge));
        }

        tracing::warn!(
            "⚠️ Reached max iterations ({}) without a final answer",
            self.settings.max_iterations
        );
        Ok(format!(
            "I've reached the maximum number of reasoning steps. Based on what I've gathered so far, here's what I found:\n{}",
            state.context
        ))
    }

    /// 執行工具並回傳 Observation 文字；失敗也轉成 Observation
    async fn run_tool(&mut self, call: &ToolCall, state: &mut LoopState) -> String {
        let observation = match self.tools.execute(call).await {
            Ok(output) => {
                if output.tool == DEVICE_INFO {
                    self.remember_device(&output);
                }
                observation_text(&output)
            }
            Err(e) => {
                tracing::error!("❌ Tool {} failed: {}", call.name, e);
                format!("Tool execution failed: {}", e)
            }
        };

        state.executed.insert(tool_id(call));
        state.tool_calls += 1;
        if call.name == DEVICE_INFO {
            state.device_info_executed = true;
        } else if call.name == DEVICE_REPORT {
            state.device_report_executed = true;
        }

        let observation = format!("Observation: {}", observation);
        state.context.push('\n');
        state.context.push_str(&observation);
        state.context.push('\n');
        tracing::info!("✅ Tool executed: {}", call.name);
        observation
    }

    fn remember_device(&mut self, output: &ToolOutput) {
        tracing::debug!(
            "Remembering device {} with tags {:?}",
            output.hostname,
            output.tags
        );
        self.last_device = Some(DeviceContext {
            hostname: output.hostname.clone(),
            tags: output.tags.clone(),
        });
    }
}

fn tags_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| format!("{:?}", tags))
}

fn observation_text(output: &ToolOutput) -> String {
    if output.tool == DEVICE_INFO && !output.tags.is_empty() {
        format!(
            "{}\n\nDevice tags: {}",
            output.interpretation,
            tags_json(&output.tags)
        )
    } else {
        output.interpretation.clone()
    }
}

fn observation_turn(tool: &str, observation: &str) -> String {
    match tool {
        DEVICE_INFO => format!(
            "{}\n\nBased on this observation, provide your Final Answer with the device information and ask if the user wants a detailed report. Do NOT call any more tools. Start your response with 'Final Answer:'",
            observation
        ),
        DEVICE_REPORT => format!(
            "{}\n\nYou have successfully retrieved the detailed report. Now provide your Final Answer summarizing the key information from this report in a user-friendly format. Do NOT call any additional tools. Do NOT ask any more questions. STOP after providing the Final Answer. Start your response with 'Final Answer:'",
            observation
        ),
        _ => observation.to_string(),
    }
}

fn already_executed_nudge(state: &LoopState) -> &'static str {
    if state.device_report_executed {
        "You already executed get_device_report. Please provide your Final Answer with the detailed report information. Do NOT call any more tools. Start with 'Final Answer:'"
    } else if state.device_info_executed {
        "You already executed get_device_info. Please provide your Final Answer with the device information and ask if the user wants a detailed report. Start with 'Final Answer:'"
    } else {
        "All tools have been executed. Please provide your Final Answer based on the observations received."
    }
}

fn continue_nudge(state: &LoopState) -> &'static str {
    if state.device_report_executed {
        "You already have the detailed report. Please provide your Final Answer summarizing the report information. Do NOT call any more tools. Start with 'Final Answer:'"
    } else if state.device_info_executed {
        "You already have the device information. Please provide your Final Answer and ask if the user wants a detailed report. Start with 'Final Answer:'"
    } else {
        "Please continue with the next action or provide your Final Answer based on the information gathered."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_info_observation_carries_tags() {
        let output = ToolOutput {
            tool: DEVICE_INFO.to_string(),
            hostname: "SRMECH01".to_string(),
            data: json!({}),
            tags: vec!["TIMOS".to_string(), "CORE".to_string()],
            interpretation: "🖥️ SRMECH01".to_string(),
        };
        assert_eq!(
            observation_text(&output),
            "🖥️ SRMECH01\n\nDevice tags: [\"TIMOS\",\"CORE\"]"
        );
    }

    #[test]
    fn test_report_observation_is_interpretation_only() {
        let output = ToolOutput {
            tool: DEVICE_REPORT.to_string(),
            hostname: "SRMECH01".to_string(),
            data: json!({}),
            tags: vec!["TIMOS".to_string()],
            interpretation: "report".to_string(),
        };
        assert_eq!(observation_text(&output), "report");
    }

    #[test]
    fn test_runnable_rules() {
        let mut state = LoopState::default();
        let info = ToolCall::new(DEVICE_INFO, json!({"hostname": "A"}));
        let other_info = ToolCall::new(DEVICE_INFO, json!({"hostname": "B"}));
        let report = ToolCall::new(DEVICE_REPORT, json!({"hostname": "A", "tags": ["TIMOS", "CORE"]}));

        assert!(state.is_runnable(&info));
        state.executed.insert(tool_id(&info));
        state.device_info_executed = true;

        assert!(!state.is_runnable(&info));
        assert!(!state.is_runnable(&other_info));
        assert!(state.is_runnable(&report));

        state.device_report_executed = true;
        assert!(!state.is_runnable(&report));
        assert!(state.all_executed(std::slice::from_ref(&info)));
        assert!(!state.all_executed(&[info, report]));
    }

    #[test]
    fn test_final_answer_pattern_spans_lines() {
        let caps = final_answer_pattern()
            .captures("Thought: done\nFinal Answer:\n  line one\nline two  ")
            .unwrap();
        assert_eq!(caps[1].trim(), "line one\nline two");
    }
}
