//! The intent-routing agent: planner, dispatcher, and the fixed tool set.
//!
//! A request is classified by cheap heuristics into a fixed plan template,
//! each planned step invokes one tool in order, and a final synthesis call
//! merges the outputs into the answer.

mod dispatcher;
mod planner;
mod suggest;
mod tools;

pub use dispatcher::{AgentOutcome, Dispatcher, ToolResult};
pub use planner::{match_primary_tool, Complexity, Plan, Planner, Step};
pub use suggest::suggest;
pub use tools::{Tool, ToolInput, ToolRegistry};
