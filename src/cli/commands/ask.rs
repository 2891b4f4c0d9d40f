//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    thinking: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pugg doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }
    let show_thinking = thinking || settings.agent.show_thinking;
    let agent_enabled = settings.agent.enabled;

    let orchestrator = Orchestrator::new(settings)?;
    let dispatcher = orchestrator.dispatcher();
    let mut session = orchestrator.session();

    let has_documents = orchestrator.has_documents().await.unwrap_or(false);

    let spinner = Output::spinner("Working on it...");

    let outcome = if agent_enabled {
        let plan = orchestrator
            .planner()
            .plan(question, &session.memory, has_documents);

        if show_thinking {
            spinner.suspend(|| {
                println!("{}", style("Plan").bold());
                for line in plan.trace() {
                    Output::trace_line(&line);
                }
            });
        }

        dispatcher.run(&plan, question, &mut session).await
    } else {
        dispatcher.run_direct(question, &mut session).await
    };

    match outcome {
        Ok(outcome) => {
            spinner.finish_and_clear();

            println!("\n{}\n", outcome.answer);

            if !outcome.suggestion.is_empty() {
                println!("{} {}\n", style("Next:").cyan().bold(), outcome.suggestion);
            }

            let failed: Vec<_> = outcome.results.iter().filter(|r| !r.success).collect();
            for result in failed {
                Output::warning(&format!(
                    "Step '{}' failed: {}",
                    result.tool,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }

            orchestrator.end_session(&session)?;
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
