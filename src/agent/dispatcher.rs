//! Plan execution.
//!
//! Steps run strictly in order; a step may consume the output of an earlier
//! step it depends on. Step failures are absorbed into the result list and
//! execution continues, unless the plan has a single step. One synthesis LLM
//! call merges the successful outputs into the final answer.

use super::planner::{match_primary_tool, Complexity, Plan};
use super::suggest::suggest;
use super::tools::{Tool, ToolInput, ToolRegistry};
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{CompletionOptions, LlmClient};
use crate::memory::{SessionContext, Turn};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Maximum characters of conversation context passed to tools.
const CONTEXT_CHARS: usize = 2000;

/// Outcome of one tool invocation. Every step yields exactly one result;
/// failed steps carry their error instead of being dropped.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool: Tool,
    pub output: String,
    pub success: bool,
    pub error: Option<String>,
}

/// The user-visible outcome of a dispatched request.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The synthesized answer.
    pub answer: String,
    /// Proactive follow-up suggestion.
    pub suggestion: String,
    /// Per-step results, in plan order.
    pub results: Vec<ToolResult>,
}

/// Executes plans against the tool registry.
pub struct Dispatcher {
    registry: ToolRegistry,
    llm: Arc<dyn LlmClient>,
    prompts: Prompts,
    options: CompletionOptions,
    top_k: usize,
    max_top_k: usize,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        llm: Arc<dyn LlmClient>,
        prompts: Prompts,
        options: CompletionOptions,
    ) -> Self {
        Self {
            registry,
            llm,
            prompts,
            options,
            top_k: 3,
            max_top_k: 5,
        }
    }

    /// Set retrieval depth for normal and complex requests.
    pub fn with_top_k(mut self, top_k: usize, max_top_k: usize) -> Self {
        self.top_k = top_k;
        self.max_top_k = max_top_k;
        self
    }

    /// Execute a plan and update the session.
    ///
    /// Tool invocations are counted in the session stats even when they fail.
    /// A single-step plan whose step fails surfaces that error to the caller
    /// and makes no synthesis call.
    #[instrument(skip_all, fields(steps = plan.steps.len(), complexity = %plan.complexity))]
    pub async fn run(
        &self,
        plan: &Plan,
        user_text: &str,
        session: &mut SessionContext,
    ) -> Result<AgentOutcome> {
        // The planner always emits at least one step; an empty plan here is a
        // programming defect, not a user-facing condition.
        if plan.steps.is_empty() {
            return Err(crate::error::PuggError::Planning(
                "plan has no steps".to_string(),
            ));
        }

        let context = session.memory.context(CONTEXT_CHARS);
        let top_k = if plan.complexity == Complexity::Complex {
            self.max_top_k
        } else {
            self.top_k
        };

        let mut results: Vec<ToolResult> = Vec::with_capacity(plan.steps.len());

        for (index, step) in plan.steps.iter().enumerate() {
            let material = step
                .depends_on
                .and_then(|dep| results.get(dep))
                .filter(|r| r.success)
                .map(|r| r.output.clone())
                .unwrap_or_default();

            session.stats.record_tool(step.tool.name());

            let input = ToolInput {
                query: &step.input,
                context: &context,
                material: &material,
                top_k,
            };

            match self.registry.invoke(step.tool, &input).await {
                Ok(output) => {
                    debug!("Step {} ({}) succeeded", index + 1, step.tool);
                    results.push(ToolResult {
                        tool: step.tool,
                        output,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    if plan.steps.len() == 1 {
                        return Err(e);
                    }
                    warn!("Step {} ({}) failed: {}", index + 1, step.tool, e);
                    results.push(ToolResult {
                        tool: step.tool,
                        output: String::new(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let answer = self.synthesize(user_text, &results).await?;
        let suggestion = suggest(plan, &session.stats);

        self.remember(session, user_text, &answer, plan.primary_tool());

        Ok(AgentOutcome {
            answer,
            suggestion,
            results,
        })
    }

    /// Answer with a single keyword-matched tool, for agent-mode-off
    /// operation. No synthesis pass and no suggestion.
    #[instrument(skip_all)]
    pub async fn run_direct(
        &self,
        user_text: &str,
        session: &mut SessionContext,
    ) -> Result<AgentOutcome> {
        let tool = match_primary_tool(user_text);
        let context = session.memory.context(CONTEXT_CHARS);

        session.stats.record_tool(tool.name());

        let input = ToolInput {
            query: user_text,
            context: &context,
            material: "",
            top_k: self.top_k,
        };

        let answer = self.registry.invoke(tool, &input).await?;

        self.remember(session, user_text, &answer, Some(tool));

        Ok(AgentOutcome {
            answer: answer.clone(),
            suggestion: String::new(),
            results: vec![ToolResult {
                tool,
                output: answer,
                success: true,
                error: None,
            }],
        })
    }

    /// One LLM call over the successful outputs plus the original request.
    async fn synthesize(&self, user_text: &str, results: &[ToolResult]) -> Result<String> {
        let gathered = results
            .iter()
            .filter(|r| r.success && !r.output.is_empty())
            .map(|r| format!("[{}]\n{}", r.tool, r.output))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), user_text.to_string());
        vars.insert("results".to_string(), gathered);

        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.synthesis.user, &vars);

        self.llm.complete(&prompt, &self.options).await
    }

    fn remember(
        &self,
        session: &mut SessionContext,
        user_text: &str,
        answer: &str,
        primary: Option<Tool>,
    ) {
        session.stats.interaction_count += 1;
        session.stats.record_topics(user_text);
        session.memory.record(Turn::user(user_text));
        session
            .memory
            .record(Turn::agent(answer, primary.map(|t| t.name().to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::planner::Planner;
    use crate::error::PuggError;
    use crate::retrieval::{Retriever, ScoredChunk};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// LLM stub: deterministic output, records prompts, optionally fails on
    /// prompts containing a marker.
    struct ScriptedLlm {
        calls: AtomicUsize,
        prompts: std::sync::Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl ScriptedLlm {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                prompts: std::sync::Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(marker: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                prompts: std::sync::Mutex::new(Vec::new()),
                fail_on: Some(marker.to_string()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(marker) = &self.fail_on {
                if prompt.contains(marker) {
                    return Err(PuggError::Provider("simulated outage".to_string()));
                }
            }
            Ok(format!("answer({})", prompt.len()))
        }
    }

    struct EmptyRetriever;

    #[async_trait]
    impl Retriever for EmptyRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>> {
            Ok(Vec::new())
        }
    }

    fn dispatcher(llm: Arc<ScriptedLlm>) -> Dispatcher {
        let registry = ToolRegistry::new(
            llm.clone(),
            Arc::new(EmptyRetriever),
            Prompts::default(),
            CompletionOptions::default(),
        );
        Dispatcher::new(
            registry,
            llm,
            Prompts::default(),
            CompletionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_single_step_failure_fails_request_without_synthesis() {
        // Every LLM call fails; the single-step plan must surface the error
        let llm = Arc::new(ScriptedLlm::failing_on(""));
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let plan = Planner::new().plan("explain recursion", &session.memory, false);
        assert_eq!(plan.steps.len(), 1);

        let err = dispatcher
            .run(&plan, "explain recursion", &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, PuggError::Provider(_)));

        // Only the failed tool call, no synthesis call
        assert_eq!(llm.call_count(), 1);
        // The failed invocation is still counted
        assert_eq!(session.stats.tool_usage.get("explain"), Some(&1));
        assert_eq!(session.stats.interaction_count, 0);
    }

    #[tokio::test]
    async fn test_multi_step_failure_is_absorbed() {
        // The summarizer prompt fails, the quiz prompt succeeds
        let llm = Arc::new(ScriptedLlm::failing_on("exam-ready summary"));
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let plan = Planner::new().plan("Summarize chapter 3 and quiz me", &session.memory, true);
        assert_eq!(plan.steps.len(), 3);

        let outcome = dispatcher
            .run(&plan, "Summarize chapter 3 and quiz me", &mut session)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results[0].success); // retrieval (empty store -> empty output)
        assert!(!outcome.results[1].success);
        assert!(outcome.results[1].error.is_some());
        assert!(outcome.results[2].success);
        assert!(!outcome.answer.is_empty());

        // Failed summarize is still in the histogram
        assert_eq!(session.stats.tool_usage.get("summarize"), Some(&1));
        assert_eq!(session.stats.tool_usage.get("generate-quiz"), Some(&1));
        assert_eq!(session.stats.interaction_count, 1);

        // The synthesis prompt carries only the successful outputs
        let prompts = llm.prompts();
        let synthesis_prompt = prompts.last().unwrap();
        assert!(synthesis_prompt.contains("[generate-quiz]"));
        assert!(!synthesis_prompt.contains("[summarize]"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_does_not_block_downstream_steps() {
        let llm = Arc::new(ScriptedLlm::ok());
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let plan = Planner::new().plan("summarize my notes", &session.memory, true);
        assert_eq!(plan.steps[0].tool, Tool::RetrieveContext);

        let outcome = dispatcher
            .run(&plan, "summarize my notes", &mut session)
            .await
            .unwrap();

        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[0].output, "");
        assert!(outcome.results[1].success);
    }

    #[tokio::test]
    async fn test_quiz_scenario_answer_and_suggestion() {
        let llm = Arc::new(ScriptedLlm::ok());
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let plan = Planner::new().plan("Quiz me on binary search", &session.memory, false);
        let outcome = dispatcher
            .run(&plan, "Quiz me on binary search", &mut session)
            .await
            .unwrap();

        assert!(!outcome.answer.is_empty());
        assert!(outcome.suggestion.contains("quiz") || outcome.suggestion.contains("explain"));

        // Quiz call plus exactly one synthesis call
        assert_eq!(llm.call_count(), 2);

        // The interaction landed in memory, tagged with the tool
        let last = session.memory.last_agent_turn().unwrap();
        assert_eq!(last.tool_used.as_deref(), Some("generate-quiz"));
    }

    #[tokio::test]
    async fn test_dependency_feeds_prior_output() {
        let llm = Arc::new(ScriptedLlm::ok());
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let plan = Planner::new().plan(
            "summarize it and quiz me on the key points",
            &session.memory,
            true,
        );
        assert_eq!(plan.complexity, Complexity::Complex);

        dispatcher
            .run(&plan, "summarize it and quiz me on the key points", &mut session)
            .await
            .unwrap();

        // Call order: summarize, quiz, synthesis. The quiz prompt must embed
        // the summarizer's output, which the length-echoing stub makes exact.
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        let summary_output = format!("answer({})", prompts[0].len());
        assert!(prompts[1].contains(&summary_output));
    }

    #[tokio::test]
    async fn test_direct_mode_skips_synthesis() {
        let llm = Arc::new(ScriptedLlm::ok());
        let dispatcher = dispatcher(llm.clone());
        let mut session = SessionContext::new();

        let outcome = dispatcher
            .run_direct("quiz me on graphs", &mut session)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].tool, Tool::GenerateQuiz);
        assert!(outcome.suggestion.is_empty());
        assert_eq!(llm.call_count(), 1);
        assert_eq!(session.stats.interaction_count, 1);
    }
}
