//! Prompt assembly for chat-model calls.
//!
//! A `PromptTemplate` is a pure function from variables to the turns sent to
//! the model. `ContextPromptTemplate` is the default: one system turn with
//! instructions and retrieved context in XML-tagged sections, followed by the
//! windowed history.
//!
//! Layout of the system turn:
//! ```text
//! {instructions, with {placeholders} substituted}
//! Always answer in {language}.
//!
//! <context>
//! [1] first retrieved record
//! [2] second retrieved record
//! </context>
//! ```

use std::collections::BTreeMap;

use recall_types::chat::{Role, Turn};
use recall_types::error::PromptError;
use recall_types::vector::ScoredRecord;

/// Inputs available to a template.
#[derive(Debug, Clone, Default)]
pub struct PromptVariables {
    /// Windowed history, oldest first; already includes the current input.
    pub history: Vec<Turn>,
    /// Retrieved records, best first.
    pub context: Vec<ScoredRecord>,
    /// Language the reply should be written in.
    pub language: String,
    /// Caller-defined placeholder values.
    pub extra: BTreeMap<String, String>,
}

/// Pure `(template, variables) -> turns` function.
pub trait PromptTemplate: Send + Sync {
    fn format(&self, vars: &PromptVariables) -> Result<Vec<Turn>, PromptError>;
}

/// Default template: system instructions + retrieved context + history.
#[derive(Debug, Clone)]
pub struct ContextPromptTemplate {
    instructions: String,
}

impl ContextPromptTemplate {
    /// `instructions` may reference `{language}` or any key of
    /// `PromptVariables::extra`; write `{{` / `}}` for literal braces.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    fn system_text(&self, vars: &PromptVariables) -> Result<String, PromptError> {
        let mut sections = Vec::with_capacity(2);

        let mut header = substitute(&self.instructions, vars)?.trim().to_string();
        if !vars.language.trim().is_empty() {
            if !header.is_empty() {
                header.push('\n');
            }
            header.push_str(&format!("Always answer in {}.", vars.language.trim()));
        }
        if !header.is_empty() {
            sections.push(header);
        }

        if !vars.context.is_empty() {
            let lines: Vec<String> = vars
                .context
                .iter()
                .enumerate()
                .map(|(i, scored)| format!("[{}] {}", i + 1, scored.record.content.trim()))
                .collect();
            sections.push(format!("<context>\n{}\n</context>", lines.join("\n")));
        }

        Ok(sections.join("\n\n"))
    }
}

impl Default for ContextPromptTemplate {
    fn default() -> Self {
        Self::new(
            "You are a helpful assistant. Use the context below when it is relevant \
             and say so when you do not know the answer.",
        )
    }
}

impl PromptTemplate for ContextPromptTemplate {
    fn format(&self, vars: &PromptVariables) -> Result<Vec<Turn>, PromptError> {
        let system = self.system_text(vars)?;

        let mut turns = Vec::with_capacity(vars.history.len() + 1);
        if !system.is_empty() {
            turns.push(Turn::new(Role::System, system));
        }
        turns.extend(vars.history.iter().cloned());
        Ok(turns)
    }
}

/// Replace `{name}` placeholders with values from `vars`.
fn substitute(template: &str, vars: &PromptVariables) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    // Unterminated brace: keep it verbatim.
                    out.push('{');
                    out.push_str(&name);
                    continue;
                }
                let name = name.trim();
                let value = match name {
                    "language" => Some(vars.language.as_str()),
                    other => vars.extra.get(other).map(String::as_str),
                };
                match value {
                    Some(v) => out.push_str(v),
                    None => return Err(PromptError::MissingVariable(name.to_string())),
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
