//! Stats command - study session history.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::collections::HashMap;

/// Run the stats command.
pub fn run_stats(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let sessions = orchestrator.sqlite_store().list_sessions()?;

    if sessions.is_empty() {
        Output::info("No completed sessions yet. Finish a 'pugg chat' session to record one.");
        return Ok(());
    }

    Output::header(&format!("Study History ({} sessions)", sessions.len()));
    println!();

    let total_interactions: u32 = sessions.iter().map(|s| s.interaction_count).sum();

    let mut tool_totals: HashMap<&str, u32> = HashMap::new();
    for session in &sessions {
        for (tool, count) in &session.tool_usage {
            *tool_totals.entry(tool.as_str()).or_insert(0) += count;
        }
    }

    let mut tools: Vec<(&str, u32)> = tool_totals.into_iter().collect();
    tools.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    Output::kv("Total interactions", &total_interactions.to_string());
    if let Some((tool, count)) = tools.first() {
        Output::kv("Most used tool", &format!("{} ({}x)", tool, count));
    }

    println!();
    for session in sessions.iter().take(10) {
        let topics = if session.topics.is_empty() {
            "-".to_string()
        } else {
            session.topics.iter().take(4).cloned().collect::<Vec<_>>().join(", ")
        };
        println!(
            "  {} | {} interaction(s) | topics: {}",
            session.ended_at.format("%Y-%m-%d %H:%M"),
            session.interaction_count,
            topics
        );
    }

    Ok(())
}
