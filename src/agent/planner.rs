//! Request planning: complexity classification and step templates.
//!
//! Classification is a cheap heuristic over the utterance (length, intent
//! keywords, conjunctions, document availability). The resulting plan is one
//! of three fixed templates; there is no search over a plan space.

use super::tools::Tool;
use crate::memory::MemoryStore;
use serde::{Deserialize, Serialize};

/// Intent keyword table. On multiple matches, the first entry in declaration
/// order wins.
const INTENT_TABLE: &[(Tool, &[&str])] = &[
    (
        Tool::Explain,
        &["explain", "what is", "how does", "help me understand", "clarify"],
    ),
    (
        Tool::Summarize,
        &["summarize", "summary", "tldr", "main points", "key points", "condense"],
    ),
    (
        Tool::GenerateQuiz,
        &["quiz", "test me", "practice questions", "mcq", "exam questions"],
    ),
    (
        Tool::SolveQuestion,
        &["solve", "solution", "work out", "calculate"],
    ),
    (
        Tool::EvaluateAnswer,
        &["check my", "evaluate", "grade", "feedback on", "review my"],
    ),
];

/// Conjunctions signalling a multi-intent request.
const MULTI_INTENT_WORDS: &[&str] = &["and", "then", "also"];

/// Markers for requests that warrant the full study pipeline.
const COMPLEX_MARKERS: &[&str] = &[
    "exam",
    "prepare for",
    "study plan",
    "comprehensive",
    "everything about",
    "master",
];

/// Cues that a short utterance continues the previous request.
const FOLLOW_UP_CUES: &[&str] = &["again", "another", "more", "one more"];

/// Utterances longer than this are treated as at least moderate.
const LONG_UTTERANCE_CHARS: usize = 200;

/// Request complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Moderate => write!(f, "moderate"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// A single planned tool invocation.
#[derive(Debug, Clone)]
pub struct Step {
    /// The tool to invoke.
    pub tool: Tool,
    /// Query for this step.
    pub input: String,
    /// Index of a prior step whose output feeds this step's material.
    pub depends_on: Option<usize>,
}

impl Step {
    fn new(tool: Tool, input: &str) -> Self {
        Self {
            tool,
            input: input.to_string(),
            depends_on: None,
        }
    }

    fn after(tool: Tool, input: &str, dep: usize) -> Self {
        Self {
            tool,
            input: input.to_string(),
            depends_on: Some(dep),
        }
    }
}

/// An ordered plan for one user request. Never empty.
#[derive(Debug, Clone)]
pub struct Plan {
    pub complexity: Complexity,
    pub steps: Vec<Step>,
}

impl Plan {
    /// The primary (non-retrieval) tool of this plan, if any.
    pub fn primary_tool(&self) -> Option<Tool> {
        self.steps
            .iter()
            .rev()
            .map(|s| s.tool)
            .find(|t| *t != Tool::RetrieveContext)
    }

    /// Human-readable trace of the plan for thinking-process display.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![format!("Complexity: {}", self.complexity)];
        for (i, step) in self.steps.iter().enumerate() {
            let dep = match step.depends_on {
                Some(d) => format!(" (uses output of step {})", d + 1),
                None => String::new(),
            };
            lines.push(format!("Step {}: {}{}", i + 1, step.tool, dep));
        }
        lines
    }
}

/// The request planner.
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Produce a plan for a user request.
    ///
    /// Always returns at least one step; when no intent keyword matches and
    /// no follow-up applies, the explainer is the default.
    pub fn plan(&self, user_text: &str, memory: &MemoryStore, has_document: bool) -> Plan {
        let text = user_text.to_lowercase();

        let matched = match_intents(&text);
        let primary = matched
            .first()
            .copied()
            .or_else(|| follow_up_tool(&text, &matched, memory))
            .unwrap_or(Tool::Explain);

        let complexity = classify(&text, &matched, has_document);

        let steps = match complexity {
            Complexity::Complex => vec![
                Step::new(Tool::RetrieveContext, user_text),
                Step::after(Tool::Summarize, user_text, 0),
                Step::after(Tool::GenerateQuiz, user_text, 1),
            ],
            Complexity::Moderate if has_document => vec![
                Step::new(Tool::RetrieveContext, user_text),
                Step::after(primary, user_text, 0),
            ],
            Complexity::Moderate | Complexity::Simple => vec![Step::new(primary, user_text)],
        };

        Plan { complexity, steps }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

/// The single keyword-matched tool for a request, for direct (non-agent) mode.
pub fn match_primary_tool(user_text: &str) -> Tool {
    let text = user_text.to_lowercase();
    match_intents(&text).first().copied().unwrap_or(Tool::Explain)
}

/// All intents matched by the utterance, in table-declaration order.
fn match_intents(text: &str) -> Vec<Tool> {
    INTENT_TABLE
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| matches_keyword(text, k)))
        .map(|(tool, _)| *tool)
        .collect()
}

/// Match a keyword: phrases by substring, single words at word boundaries.
fn matches_keyword(text: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        words(text).any(|w| w == keyword)
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn classify(text: &str, matched: &[Tool], has_document: bool) -> Complexity {
    let multi_intent = MULTI_INTENT_WORDS
        .iter()
        .any(|w| words(text).any(|word| word == *w));
    let complex_marker = COMPLEX_MARKERS.iter().any(|m| matches_keyword(text, m));

    if complex_marker || (multi_intent && matched.len() >= 2) {
        Complexity::Complex
    } else if has_document || multi_intent || text.len() > LONG_UTTERANCE_CHARS {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

/// Reuse the previous turn's tool for short follow-ups ("another one").
fn follow_up_tool(text: &str, matched: &[Tool], memory: &MemoryStore) -> Option<Tool> {
    if !matched.is_empty() {
        return None;
    }
    let is_follow_up = FOLLOW_UP_CUES.iter().any(|c| matches_keyword(text, c));
    if !is_follow_up {
        return None;
    }

    memory
        .last_agent_turn()
        .and_then(|turn| turn.tool_used.as_deref())
        .and_then(|name| name.parse::<Tool>().ok())
        .filter(|t| *t != Tool::RetrieveContext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Turn;

    fn empty_memory() -> MemoryStore {
        MemoryStore::new()
    }

    #[test]
    fn test_default_is_explainer() {
        let plan = Planner::new().plan("photosynthesis", &empty_memory(), false);
        assert_eq!(plan.complexity, Complexity::Simple);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, Tool::Explain);
    }

    #[test]
    fn test_plan_never_empty() {
        for text in ["?", "hmm", "x", "tell me something interesting"] {
            let plan = Planner::new().plan(text, &empty_memory(), false);
            assert!(!plan.steps.is_empty(), "empty plan for {:?}", text);
        }
    }

    #[test]
    fn test_quiz_request_is_single_step() {
        let plan = Planner::new().plan("Quiz me on binary search", &empty_memory(), false);
        assert_eq!(plan.complexity, Complexity::Simple);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, Tool::GenerateQuiz);
    }

    #[test]
    fn test_multi_intent_with_document_is_complex() {
        let plan = Planner::new().plan("Summarize Chapter 3 and quiz me", &empty_memory(), true);
        assert_eq!(plan.complexity, Complexity::Complex);

        let tools: Vec<Tool> = plan.steps.iter().map(|s| s.tool).collect();
        assert_eq!(
            tools,
            vec![Tool::RetrieveContext, Tool::Summarize, Tool::GenerateQuiz]
        );
        assert_eq!(plan.steps[1].depends_on, Some(0));
        assert_eq!(plan.steps[2].depends_on, Some(1));
    }

    #[test]
    fn test_document_active_prepends_retrieval() {
        let plan = Planner::new().plan("explain heap sort", &empty_memory(), true);
        assert_eq!(plan.complexity, Complexity::Moderate);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool, Tool::RetrieveContext);
        assert_eq!(plan.steps[1].tool, Tool::Explain);
        assert_eq!(plan.steps[1].depends_on, Some(0));
    }

    #[test]
    fn test_exam_marker_is_complex() {
        let plan = Planner::new().plan("help me prepare for my exam", &empty_memory(), false);
        assert_eq!(plan.complexity, Complexity::Complex);
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn test_tie_break_uses_declaration_order() {
        // Matches both the summarizer and the quiz table; summarize is
        // declared first.
        let plan = Planner::new().plan("summarize the quiz", &empty_memory(), false);
        assert_eq!(plan.steps[0].tool, Tool::Summarize);
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        // "demand" contains "and" as a substring but is not a conjunction
        let plan = Planner::new().plan("explain supply versus demand", &empty_memory(), false);
        assert_eq!(plan.complexity, Complexity::Simple);
    }

    #[test]
    fn test_follow_up_reuses_previous_tool() {
        let mut memory = MemoryStore::new();
        memory.record(Turn::user("quiz me on sorting"));
        memory.record(Turn::agent("Q1 ...", Some("generate-quiz".to_string())));

        let plan = Planner::new().plan("another one", &memory, false);
        assert_eq!(plan.steps[0].tool, Tool::GenerateQuiz);
    }

    #[test]
    fn test_follow_up_without_history_falls_back_to_explainer() {
        let plan = Planner::new().plan("another one", &empty_memory(), false);
        assert_eq!(plan.steps[0].tool, Tool::Explain);
    }

    #[test]
    fn test_primary_tool_skips_retrieval() {
        let plan = Planner::new().plan("summarize my notes", &empty_memory(), true);
        assert_eq!(plan.primary_tool(), Some(Tool::Summarize));
    }

    #[test]
    fn test_trace_lists_steps() {
        let plan = Planner::new().plan("Summarize Chapter 3 and quiz me", &empty_memory(), true);
        let trace = plan.trace();
        assert_eq!(trace[0], "Complexity: complex");
        assert!(trace[1].contains("retrieve-context"));
        assert!(trace[3].contains("uses output of step 2"));
    }
}
