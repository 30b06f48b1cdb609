//! Structured prompts.
//!
//! A [`StructuredPrompt`] keeps the pieces of a prompt apart (system
//! instruction, idea, context blocks, task, corrections) so that corrective
//! retries can append to a prompt instead of rebuilding it from strings.

/// A titled block of contextual data (template list, candidate texts, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub title: String,
    pub body: String,
}

/// Prompt handed to [`LlmClient::complete`](super::LlmClient::complete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPrompt {
    /// Role and ground rules for the model
    pub system: String,
    /// The user's meme idea, verbatim
    pub user_idea: String,
    /// What the model must do in this call
    pub task: String,
    /// Supporting data, rendered in order
    pub context: Vec<ContextBlock>,
    /// Notes added by corrective retries, oldest first
    pub corrections: Vec<String>,
}

impl StructuredPrompt {
    pub fn new(
        system: impl Into<String>,
        user_idea: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            user_idea: user_idea.into(),
            task: task.into(),
            context: Vec::new(),
            corrections: Vec::new(),
        }
    }

    pub fn with_context(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.context.push(ContextBlock {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    /// Return a copy of this prompt with one more correction note.
    pub fn corrected(&self, note: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.corrections.push(note.into());
        next
    }

    /// Render the user-turn text, ending with the response format section.
    pub fn render(&self, format_instructions: &str) -> String {
        let mut out = format!("Meme idea: \"{}\"\n", self.user_idea.trim());

        for block in &self.context {
            out.push_str(&format!("\n## {}\n{}\n", block.title, block.body.trim_end()));
        }

        out.push_str(&format!("\n## Task\n{}\n", self.task.trim_end()));

        if !self.corrections.is_empty() {
            out.push_str("\n## Your previous answer was rejected\n");
            for note in &self.corrections {
                out.push_str(&format!("- {note}\n"));
            }
        }

        out.push_str(&format!("\n## Response format\n{format_instructions}\n"));
        out
    }
}
