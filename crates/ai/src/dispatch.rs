//! Prompt dispatch.
//!
//! `Dispatcher` glues the pieces together: budget the table, build the
//! prompt for the chosen template, submit it and, for the JSON templates,
//! try to read the structured suggestion out of the reply.

use serde::Serialize;

use vizdash_config::{OversizePolicy, PromptSettings};
use vizdash_io::Table;

use crate::client::TextGenerator;
use crate::error::{DispatchError, PromptError};
use crate::prompt::{budget_table, build_prompt, PromptTemplate};
use crate::structured::Suggestion;

/// A prompt ready to submit.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub template: PromptTemplate,
    pub text: String,
    pub rows_sent: usize,
    pub total_rows: usize,
}

impl PreparedPrompt {
    pub fn truncated(&self) -> bool {
        self.rows_sent < self.total_rows
    }

    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Result of one analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    #[serde(serialize_with = "serialize_template")]
    pub template: PromptTemplate,
    pub model: String,
    pub prompt_chars: usize,
    pub truncated: bool,
    pub rows_sent: usize,
    pub total_rows: usize,
    /// Model reply, unmodified
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn serialize_template<S: serde::Serializer>(t: &PromptTemplate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(t.id())
}

pub struct Dispatcher<G: TextGenerator> {
    generator: G,
    max_table_chars: usize,
    oversize: OversizePolicy,
}

impl<G: TextGenerator> Dispatcher<G> {
    pub fn new(generator: G, settings: &PromptSettings) -> Self {
        Self {
            generator,
            max_table_chars: settings.max_table_chars,
            oversize: settings.oversize,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Build the prompt without sending it.
    pub fn prepare(
        &self,
        template: PromptTemplate,
        view_title: &str,
        instructions: &str,
        table: &Table,
    ) -> Result<PreparedPrompt, PromptError> {
        prepare(template, view_title, instructions, table, self.max_table_chars, self.oversize)
    }

    /// Budget, build, submit. Table data is never modified.
    pub fn analyze(
        &self,
        template: PromptTemplate,
        view_title: &str,
        instructions: &str,
        table: &Table,
    ) -> Result<Analysis, DispatchError> {
        let prepared = self.prepare(template, view_title, instructions, table)?;
        tracing::info!(
            template = template.id(),
            view = view_title,
            prompt_chars = prepared.chars(),
            truncated = prepared.truncated(),
            "submitting analysis"
        );

        let text = self.generator.submit(&prepared.text)?;
        let (suggestion, warnings) = Suggestion::parse(template, &text);
        for w in &warnings {
            tracing::warn!(template = template.id(), "{}", w);
        }

        Ok(Analysis {
            template,
            model: self.generator.model().to_string(),
            prompt_chars: prepared.chars(),
            truncated: prepared.truncated(),
            rows_sent: prepared.rows_sent,
            total_rows: prepared.total_rows,
            text,
            suggestion,
            warnings,
        })
    }
}

/// Prompt for `table` under an explicit budget. Used directly for dry runs
/// when no model is configured.
pub fn prepare(
    template: PromptTemplate,
    view_title: &str,
    instructions: &str,
    table: &Table,
    max_table_chars: usize,
    oversize: OversizePolicy,
) -> Result<PreparedPrompt, PromptError> {
    let budgeted = budget_table(table, max_table_chars, oversize)?;
    Ok(PreparedPrompt {
        template,
        text: build_prompt(template, view_title, instructions, &budgeted.text),
        rows_sent: budgeted.rows_shown,
        total_rows: budgeted.total_rows,
    })
}
