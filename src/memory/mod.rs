//! Session memory for the agent.
//!
//! Short-term memory is a bounded buffer of recent conversation turns.
//! Long-term memory is an append-only log for the session plus aggregate
//! statistics, persisted across sessions by the vector store backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use uuid::Uuid;

/// Maximum turns kept in short-term memory.
pub const SHORT_TERM_CAPACITY: usize = 10;

/// Words too common to count as topics.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "another", "answer", "because", "before", "chapter",
    "check", "could", "evaluate", "explain", "give", "grade", "have", "help", "know", "like",
    "main", "make", "more", "please", "points", "practice", "question", "questions", "quiz",
    "should", "solve", "some", "summarize", "summary", "test", "that", "their", "them", "then",
    "there", "these", "they", "this", "understand", "want", "what", "when", "where", "which",
    "with", "would", "your",
];

/// Speaker role for a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A single conversation turn. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Name of the primary tool that produced an agent turn.
    pub tool_used: Option<String>,
}

impl Turn {
    /// Create a user turn.
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            text: text.to_string(),
            timestamp: Utc::now(),
            tool_used: None,
        }
    }

    /// Create an agent turn, optionally tagged with the tool that produced it.
    pub fn agent(text: &str, tool_used: Option<String>) -> Self {
        Self {
            role: Role::Agent,
            text: text.to_string(),
            timestamp: Utc::now(),
            tool_used,
        }
    }
}

/// Per-session counters, mutated by the dispatcher after every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub interaction_count: u32,
    /// Tool name -> number of invocations (failed invocations included).
    pub tool_usage: HashMap<String, u32>,
    /// Topic keyword -> number of sightings in user requests.
    pub topic_counts: HashMap<String, u32>,
    pub session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            interaction_count: 0,
            tool_usage: HashMap::new(),
            topic_counts: HashMap::new(),
            session_start: Utc::now(),
        }
    }

    /// Count a tool invocation.
    pub fn record_tool(&mut self, tool_name: &str) {
        *self.tool_usage.entry(tool_name.to_string()).or_insert(0) += 1;
    }

    /// Count topic keywords from a user request.
    pub fn record_topics(&mut self, text: &str) {
        for topic in extract_topics(text) {
            *self.topic_counts.entry(topic).or_insert(0) += 1;
        }
    }

    /// All distinct topics seen this session.
    pub fn topics_seen(&self) -> BTreeSet<&str> {
        self.topic_counts.keys().map(|s| s.as_str()).collect()
    }

    /// The most frequently used tool, if any. Ties resolve alphabetically.
    pub fn most_used_tool(&self) -> Option<(&str, u32)> {
        let mut best: Option<(&str, u32)> = None;
        for (name, &count) in &self.tool_usage {
            match best {
                None => best = Some((name, count)),
                Some((best_name, best_count)) => {
                    if count > best_count || (count == best_count && name.as_str() < best_name) {
                        best = Some((name, count));
                    }
                }
            }
        }
        best
    }

    /// Up to `n` most frequent topics, ties broken alphabetically.
    pub fn top_topics(&self, n: usize) -> Vec<&str> {
        let mut topics: Vec<(&str, u32)> = self
            .topic_counts
            .iter()
            .map(|(t, c)| (t.as_str(), *c))
            .collect();
        topics.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        topics.into_iter().take(n).map(|(t, _)| t).collect()
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation memory with a bounded recent-turns buffer and an append-only
/// session log.
pub struct MemoryStore {
    capacity: usize,
    short_term: VecDeque<Turn>,
    long_term: Vec<Turn>,
}

impl MemoryStore {
    /// Create a memory store with the default short-term capacity.
    pub fn new() -> Self {
        Self::with_capacity(SHORT_TERM_CAPACITY)
    }

    /// Create a memory store with a custom short-term capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            short_term: VecDeque::new(),
            long_term: Vec::new(),
        }
    }

    /// Record a turn. The oldest short-term entry is evicted once the buffer
    /// is at capacity; the session log keeps everything.
    pub fn record(&mut self, turn: Turn) {
        self.long_term.push(turn.clone());
        self.short_term.push_back(turn);
        while self.short_term.len() > self.capacity {
            self.short_term.pop_front();
        }
    }

    /// At most `min(n, capacity)` most recent turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&Turn> {
        let n = n.min(self.short_term.len());
        self.short_term.iter().skip(self.short_term.len() - n).collect()
    }

    /// The last agent turn, if any.
    pub fn last_agent_turn(&self) -> Option<&Turn> {
        self.short_term.iter().rev().find(|t| t.role == Role::Agent)
    }

    /// Format the most recent turns as prompt context, newest last.
    pub fn context(&self, max_chars: usize) -> String {
        let turns = self.recent(5);
        let mut parts = Vec::with_capacity(turns.len());

        for turn in turns {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Agent => "Assistant",
            };
            let mut text = turn.text.replace('\n', " ");
            if text.len() > 300 {
                let mut end = 300;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
                text.push_str("...");
            }
            parts.push(format!("{}: {}", speaker, text));
        }

        let mut context = parts.join("\n");
        if context.len() > max_chars {
            let mut start = context.len() - max_chars;
            while !context.is_char_boundary(start) {
                start += 1;
            }
            context = context[start..].to_string();
        }
        context
    }

    /// Number of turns in the session log.
    pub fn session_len(&self) -> usize {
        self.long_term.len()
    }

    /// Clear all memory (start fresh).
    pub fn clear(&mut self) {
        self.short_term.clear();
        self.long_term.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned session state threaded through planner and dispatcher calls.
pub struct SessionContext {
    pub memory: MemoryStore,
    pub stats: SessionStats,
    session_id: String,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            memory: MemoryStore::new(),
            stats: SessionStats::new(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a session with a custom short-term capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            memory: MemoryStore::with_capacity(capacity),
            stats: SessionStats::new(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Heuristic description of the session so far, derived purely from the
    /// session statistics.
    pub fn summary(&self) -> String {
        if self.stats.interaction_count == 0 {
            return "This is the start of the session.".to_string();
        }

        let mut summary = format!(
            "{} interaction(s) this session.",
            self.stats.interaction_count
        );

        if let Some((tool, count)) = self.stats.most_used_tool() {
            summary.push_str(&format!(" Most used tool: {} ({}x).", tool, count));
        }

        let topics = self.stats.top_topics(3);
        if !topics.is_empty() {
            summary.push_str(&format!(" Frequent topics: {}.", topics.join(", ")));
        }

        summary
    }

    /// Snapshot for persistence at session end.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.session_id.clone(),
            started_at: self.stats.session_start,
            ended_at: Utc::now(),
            interaction_count: self.stats.interaction_count,
            tool_usage: self.stats.tool_usage.clone(),
            topics: self
                .stats
                .top_topics(20)
                .into_iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a completed session, stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub interaction_count: u32,
    pub tool_usage: HashMap<String, u32>,
    pub topics: Vec<String>,
}

/// Extract candidate topic keywords from a user request.
fn extract_topics(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 4 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_bound_and_order() {
        let mut memory = MemoryStore::new();
        for i in 0..15 {
            memory.record(Turn::user(&format!("message {}", i)));
        }

        // Capacity caps at 10 even when more is requested
        let recent = memory.recent(100);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().text, "message 5");
        assert_eq!(recent.last().unwrap().text, "message 14");

        let recent = memory.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].text, "message 12");
        assert_eq!(recent[2].text, "message 14");
    }

    #[test]
    fn test_fifo_eviction_keeps_session_log() {
        let mut memory = MemoryStore::with_capacity(2);
        memory.record(Turn::user("one"));
        memory.record(Turn::user("two"));
        memory.record(Turn::user("three"));

        assert_eq!(memory.recent(10).len(), 2);
        assert_eq!(memory.recent(10)[0].text, "two");
        assert_eq!(memory.session_len(), 3);
    }

    #[test]
    fn test_last_agent_turn() {
        let mut memory = MemoryStore::new();
        assert!(memory.last_agent_turn().is_none());

        memory.record(Turn::user("quiz me"));
        memory.record(Turn::agent("Q1...", Some("generate-quiz".to_string())));
        memory.record(Turn::user("thanks"));

        let last = memory.last_agent_turn().unwrap();
        assert_eq!(last.tool_used.as_deref(), Some("generate-quiz"));
    }

    #[test]
    fn test_stats_counting() {
        let mut stats = SessionStats::new();
        stats.record_tool("explain");
        stats.record_tool("generate-quiz");
        stats.record_tool("generate-quiz");
        stats.record_topics("quiz me on binary search");
        stats.record_topics("binary trees");

        assert_eq!(stats.most_used_tool(), Some(("generate-quiz", 2)));
        assert!(stats.topics_seen().contains("binary"));
        assert_eq!(stats.top_topics(1), vec!["binary"]);
    }

    #[test]
    fn test_session_summary() {
        let mut session = SessionContext::new();
        assert!(session.summary().contains("start of the session"));

        session.stats.interaction_count = 2;
        session.stats.record_tool("summarize");
        session.stats.record_topics("photosynthesis basics");

        let summary = session.summary();
        assert!(summary.contains("summarize"));
        assert!(summary.contains("photosynthesis"));
    }

    #[test]
    fn test_context_formatting() {
        let mut memory = MemoryStore::new();
        memory.record(Turn::user("explain recursion"));
        memory.record(Turn::agent("Recursion is...", Some("explain".to_string())));

        let context = memory.context(2000);
        assert!(context.starts_with("User: explain recursion"));
        assert!(context.contains("Assistant: Recursion is..."));
    }
}
