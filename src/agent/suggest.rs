//! Proactive suggestion heuristics.
//!
//! A fixed pattern table keyed on the plan's primary tool, with a session
//! milestone appended once the conversation has some history. No LLM call.

use super::planner::Plan;
use super::tools::Tool;
use crate::memory::SessionStats;

/// Produce the suggestion text shown after an answer.
pub fn suggest(plan: &Plan, stats: &SessionStats) -> String {
    let mut suggestion = match plan.primary_tool() {
        Some(Tool::GenerateQuiz) => {
            "After attempting the quiz, I can evaluate your answers or explain any \
             concept you missed."
        }
        Some(Tool::Summarize) => {
            "Want a quiz based on this summary, or a deeper explanation of any point?"
        }
        Some(Tool::SolveQuestion) => {
            "I can explain the underlying concepts, or generate practice questions \
             like these."
        }
        Some(Tool::EvaluateAnswer) => {
            "Want me to explain the topics where marks were lost?"
        }
        Some(Tool::Explain) | Some(Tool::RetrieveContext) | None => {
            "Would you like a quiz to test your understanding of this topic?"
        }
    }
    .to_string();

    if stats.interaction_count >= 5 {
        suggestion.push_str(
            " We have covered a few topics this session - I can also summarize them \
             or build a combined quiz.",
        );
    }

    suggestion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::planner::Planner;
    use crate::memory::MemoryStore;

    #[test]
    fn test_quiz_suggestion_mentions_next_steps() {
        let plan = Planner::new().plan("quiz me on graphs", &MemoryStore::new(), false);
        let suggestion = suggest(&plan, &SessionStats::new());
        assert!(suggestion.contains("quiz") || suggestion.contains("explain"));
    }

    #[test]
    fn test_long_session_adds_milestone() {
        let plan = Planner::new().plan("explain graphs", &MemoryStore::new(), false);
        let mut stats = SessionStats::new();
        stats.interaction_count = 6;

        let suggestion = suggest(&plan, &stats);
        assert!(suggestion.contains("session"));
    }
}
