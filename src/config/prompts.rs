//! Prompt templates for Pugg.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub identity: IdentityPrompt,
    pub tools: ToolPrompts,
    pub synthesis: SynthesisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// System identity sent with every completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPrompt {
    pub system: String,
}

impl Default for IdentityPrompt {
    fn default() -> Self {
        Self {
            system: "You are Pugg, a study assistant. Provide clear, accurate, \
                     well-structured educational responses in Markdown."
                .to_string(),
        }
    }
}

/// User-prompt templates for the five LLM-backed tools.
///
/// Each template may reference {{query}} (the user's request), {{context}}
/// (recent conversation), and {{retrieved}} (material from indexed documents,
/// possibly empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPrompts {
    pub explain: String,
    pub summarize: String,
    pub generate_quiz: String,
    pub solve_question: String,
    pub evaluate_answer: String,
}

impl Default for ToolPrompts {
    fn default() -> Self {
        Self {
            explain: r#"Recent conversation:
{{context}}

Relevant material from the user's documents (may be empty):
{{retrieved}}

Topic or question:
{{query}}

Instructions:
- If relevant document material is provided above, treat it as the primary source.
- For a topic, start with a simple definition or a real-life analogy, then a
  step-by-step breakdown in bullet points, common misconceptions if any, and
  finish with 2-3 key takeaways for revision.
- Use the recent conversation for follow-up or clarifying answers.
- Keep language concise and avoid jargon unless needed."#
                .to_string(),

            summarize: r#"Recent conversation:
{{context}}

Content to summarize:
{{retrieved}}

The user asked:
{{query}}

Instructions:
- Create a compact, exam-ready summary in clear bullet-point sections:
  core definitions, most important points, key formulas if present,
  application scenarios or examples.
- Close with 2-3 practice questions based on the content.
- If the user gave a specific focus, adapt the summary accordingly.
- If the content above is empty, summarize whatever the request itself describes
  and say that no document material was available."#
                .to_string(),

            generate_quiz: r#"Recent conversation:
{{context}}

Content or topic for the quiz:
{{retrieved}}

The user asked:
{{query}}

Instructions:
- Create a mix of question types: multiple choice (options A-D on separate
  lines), true/false, fill in the blank, and short descriptive.
- Number every question. Do NOT show the correct answer after each question.
- After ALL questions, provide a numbered "Answer Key" section.
- Format so the student can attempt first, then check answers."#
                .to_string(),

            solve_question: r#"Questions to solve:
{{query}}

Relevant material from the user's documents (may be empty):
{{retrieved}}

Recent conversation:
{{context}}

Instructions:
- Use the document material above if relevant to answer the questions.
- Adapt answer length to question type: objective questions in 1-2 sentences,
  short-answer questions in about 100 words, long-form questions with a
  stepwise breakdown in about 200 words.
- If the user gives a word limit or mark value, follow it.
- Number all answers and use Markdown formatting."#
                .to_string(),

            evaluate_answer: r#"Answers to evaluate:
{{query}}

Reference material from the user's documents (may be empty):
{{retrieved}}

Recent conversation:
{{context}}

Instructions:
- Compare the user's answers against the reference material if available.
- For each answer, state whether it is correct or incorrect, give specific
  suggestions for improvement, and point out missing facts or examples.
- Assign a score out of the maximum possible per question.
- Summarize overall strengths and improvement areas in numbered feedback."#
                .to_string(),
        }
    }
}

/// Prompt for the final synthesis pass over tool outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisPrompts {
    pub user: String,
}

impl Default for SynthesisPrompts {
    fn default() -> Self {
        Self {
            user: r#"The user asked:
{{query}}

Results gathered while working on the request:

{{results}}

Combine the results into one natural, flowing response that directly addresses
the request. Integrate the results smoothly, use clear section headings when
multiple topics are covered, and keep an encouraging tone. Respond in Markdown,
not as a list of raw results."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let identity_path = custom_path.join("identity.toml");
            if identity_path.exists() {
                let content = std::fs::read_to_string(&identity_path)?;
                prompts.identity = toml::from_str(&content)?;
            }

            let tools_path = custom_path.join("tools.toml");
            if tools_path.exists() {
                let content = std::fs::read_to_string(&tools_path)?;
                prompts.tools = toml::from_str(&content)?;
            }

            let synthesis_path = custom_path.join("synthesis.toml");
            if synthesis_path.exists() {
                let content = std::fs::read_to_string(&synthesis_path)?;
                prompts.synthesis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.identity.system.is_empty());
        assert!(!prompts.tools.explain.is_empty());
        assert!(prompts.synthesis.user.contains("{{results}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_custom_variables_precedence() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("tone".to_string(), "formal".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("tone".to_string(), "casual".to_string());

        let result = prompts.render_with_custom("Be {{tone}}.", &vars);
        assert_eq!(result, "Be casual.");
    }
}
