//! The fixed tool set and its invocation registry.
//!
//! Five tools format a prompt template and make one blocking LLM call;
//! `retrieve-context` calls the retriever instead. The closed enum gives a
//! compile-time guarantee that no unregistered tool can be referenced.

use crate::config::Prompts;
use crate::error::{PuggError, Result};
use crate::llm::{CompletionOptions, LlmClient};
use crate::retrieval::{format_chunks_for_prompt, Retriever};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The tools available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Explain a concept in simple terms.
    Explain,
    /// Summarize document material into key points.
    Summarize,
    /// Create a practice quiz with an answer key.
    GenerateQuiz,
    /// Solve exam-style questions.
    SolveQuestion,
    /// Grade the user's answers with feedback.
    EvaluateAnswer,
    /// Fetch relevant chunks from indexed documents.
    RetrieveContext,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Explain,
        Tool::Summarize,
        Tool::GenerateQuiz,
        Tool::SolveQuestion,
        Tool::EvaluateAnswer,
        Tool::RetrieveContext,
    ];

    /// Stable name used for stats keys and display.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Explain => "explain",
            Tool::Summarize => "summarize",
            Tool::GenerateQuiz => "generate-quiz",
            Tool::SolveQuestion => "solve-question",
            Tool::EvaluateAnswer => "evaluate-answer",
            Tool::RetrieveContext => "retrieve-context",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "explain" => Ok(Tool::Explain),
            "summarize" => Ok(Tool::Summarize),
            "generate-quiz" => Ok(Tool::GenerateQuiz),
            "solve-question" => Ok(Tool::SolveQuestion),
            "evaluate-answer" => Ok(Tool::EvaluateAnswer),
            "retrieve-context" => Ok(Tool::RetrieveContext),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

/// Input to a single tool invocation.
#[derive(Debug, Clone, Copy)]
pub struct ToolInput<'a> {
    /// The query for this step.
    pub query: &'a str,
    /// Recent conversation context.
    pub context: &'a str,
    /// Material fed into the tool: retrieved chunks or a prior step's output.
    pub material: &'a str,
    /// Number of chunks to retrieve (retrieve-context only).
    pub top_k: usize,
}

/// Registry binding each tool to its prompt template and collaborator.
pub struct ToolRegistry {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    prompts: Prompts,
    options: CompletionOptions,
}

impl ToolRegistry {
    /// Create a registry. All six tools are available from construction;
    /// there is no runtime registration.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        prompts: Prompts,
        options: CompletionOptions,
    ) -> Self {
        Self {
            llm,
            retriever,
            prompts,
            options,
        }
    }

    /// Invoke a tool and return its raw text output.
    #[instrument(skip(self, input), fields(tool = %tool))]
    pub async fn invoke(&self, tool: Tool, input: &ToolInput<'_>) -> Result<String> {
        match tool {
            Tool::RetrieveContext => self.invoke_retrieve(input).await,
            Tool::Explain
            | Tool::Summarize
            | Tool::GenerateQuiz
            | Tool::SolveQuestion
            | Tool::EvaluateAnswer => self.invoke_llm_tool(tool, input).await,
        }
    }

    async fn invoke_llm_tool(&self, tool: Tool, input: &ToolInput<'_>) -> Result<String> {
        let template = match tool {
            Tool::Explain => &self.prompts.tools.explain,
            Tool::Summarize => &self.prompts.tools.summarize,
            Tool::GenerateQuiz => &self.prompts.tools.generate_quiz,
            Tool::SolveQuestion => &self.prompts.tools.solve_question,
            Tool::EvaluateAnswer => &self.prompts.tools.evaluate_answer,
            Tool::RetrieveContext => {
                return Err(PuggError::Agent(
                    "retrieve-context is not an LLM tool".to_string(),
                ))
            }
        };

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), input.query.to_string());
        vars.insert("context".to_string(), input.context.to_string());
        vars.insert("retrieved".to_string(), input.material.to_string());

        let prompt = self.prompts.render_with_custom(template, &vars);

        debug!("Invoking {} ({} char prompt)", tool, prompt.len());
        self.llm.complete(&prompt, &self.options).await
    }

    /// Retrieval failures and zero hits both yield an empty-context result so
    /// downstream steps still execute.
    async fn invoke_retrieve(&self, input: &ToolInput<'_>) -> Result<String> {
        match self.retriever.search(input.query, input.top_k).await {
            Ok(chunks) if chunks.is_empty() => Ok(String::new()),
            Ok(chunks) => Ok(format_chunks_for_prompt(&chunks)),
            Err(PuggError::Retrieval(msg)) => {
                warn!("Retrieval unavailable, continuing without context: {}", msg);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }
}
