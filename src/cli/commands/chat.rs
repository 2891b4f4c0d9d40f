//! Interactive study session command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, thinking: bool, mut settings: Settings) -> Result<()> {
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
    let planner = orchestrator.planner();
    let dispatcher = orchestrator.dispatcher();
    let mut session = orchestrator.session();

    println!("\n{}", style("Pugg Study Session").bold().cyan());
    println!(
        "{}\n",
        style("Ask for explanations, summaries, or quizzes. 'exit' to quit, 'clear' to reset memory, 'summary' for session stats.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.memory.clear();
            Output::info("Conversation memory cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("summary") {
            Output::info(&session.summary());
            continue;
        }

        let has_documents = orchestrator.has_documents().await.unwrap_or(false);

        let outcome = if agent_enabled {
            let plan = planner.plan(input, &session.memory, has_documents);

            if show_thinking {
                println!("{}", style("Plan").bold());
                for line in plan.trace() {
                    Output::trace_line(&line);
                }
            }

            dispatcher.run(&plan, input, &mut session).await
        } else {
            dispatcher.run_direct(input, &mut session).await
        };

        match outcome {
            Ok(outcome) => {
                println!("\n{} {}\n", style("Pugg:").cyan().bold(), outcome.answer);

                if !outcome.suggestion.is_empty() {
                    println!(
                        "{} {}\n",
                        style("Next:").cyan().bold(),
                        style(&outcome.suggestion).dim()
                    );
                }

                for result in outcome.results.iter().filter(|r| !r.success) {
                    Output::warning(&format!(
                        "Step '{}' failed: {}",
                        result.tool,
                        result.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    orchestrator.end_session(&session)?;
    if session.stats.interaction_count > 0 {
        Output::info(&session.summary());
    }
    Output::info("Goodbye!");

    Ok(())
}
