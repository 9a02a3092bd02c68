// Analysis prompt templates
//
// A prompt is the view title, the template's task, optional user
// instructions, an optional response schema and the view data as CSV.

use std::fmt;
use std::str::FromStr;

use vizdash_config::OversizePolicy;
use vizdash_io::Table;

use crate::error::PromptError;

/// The four analysis styles offered for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptTemplate {
    /// Slide-ready chart as JSON
    ChartSummary,
    /// Ideal graph design as JSON
    GraphDescription,
    /// Root cause analysis in prose
    RootCause,
    /// Trend insights and recommendations in prose
    Trend,
}

impl PromptTemplate {
    pub fn all() -> [PromptTemplate; 4] {
        [
            PromptTemplate::ChartSummary,
            PromptTemplate::GraphDescription,
            PromptTemplate::RootCause,
            PromptTemplate::Trend,
        ]
    }

    /// Short id used on the command line
    pub fn id(&self) -> &'static str {
        match self {
            PromptTemplate::ChartSummary => "ppt",
            PromptTemplate::GraphDescription => "graph",
            PromptTemplate::RootCause => "rca",
            PromptTemplate::Trend => "trend",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PromptTemplate::ChartSummary => "Presentation chart (JSON)",
            PromptTemplate::GraphDescription => "Graph design (JSON)",
            PromptTemplate::RootCause => "Root cause analysis",
            PromptTemplate::Trend => "Trend analysis",
        }
    }

    /// True when the model is asked for a JSON object only
    pub fn expects_json(&self) -> bool {
        matches!(self, PromptTemplate::ChartSummary | PromptTemplate::GraphDescription)
    }

    /// Accepts the id, case-insensitively, plus a few long spellings.
    pub fn parse(s: &str) -> Option<PromptTemplate> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ppt" | "chart" => Some(PromptTemplate::ChartSummary),
            "graph" => Some(PromptTemplate::GraphDescription),
            "rca" | "root-cause" | "root cause analysis" => Some(PromptTemplate::RootCause),
            "trend" => Some(PromptTemplate::Trend),
            _ => None,
        }
    }

    /// The next template, wrapping around
    pub fn next(&self) -> PromptTemplate {
        let all = Self::all();
        let i = all.iter().position(|t| t == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }

    fn task(&self) -> &'static str {
        match self {
            PromptTemplate::ChartSummary | PromptTemplate::GraphDescription => {
                "You are an expert data visualization and analysis assistant."
            }
            PromptTemplate::RootCause => {
                "You are a data analyst conducting a root cause analysis of the dataset below. \
                 Identify and clearly explain the most impactful changes contributing to the \
                 overall trend."
            }
            PromptTemplate::Trend => {
                "You are a data analyst conducting a trend analysis of the dataset below. \
                 Clearly explain the key insights from the trends and provide actionable \
                 recommendations."
            }
        }
    }

    fn response_format(&self) -> Option<&'static str> {
        match self {
            PromptTemplate::ChartSummary => Some(
                r#"Using the dataset below, respond in this format:
{"chart_type": "<chart type>", "categories": [<list of categories>], "series": [{"name": "<series name>", "values": [<values matching categories>]}], "title": "<chart title>", "caption": "<key insights or trends>"}
Only output the JSON object without any additional text."#,
            ),
            PromptTemplate::GraphDescription => Some(
                r#"Using the dataset below, describe the ideal graph visualization as a JSON object with the keys:
"graph_type" (e.g. line, bar, pie), "title" (suggested title), "x_axis_label", "y_axis_label", "series" (an array of objects with "name" and "values") and "image_suggestion" (a detailed description of the ideal graph design including color scheme and layout).
Only output the JSON object without any additional text."#,
            ),
            PromptTemplate::RootCause | PromptTemplate::Trend => None,
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PromptTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptTemplate::parse(s).ok_or_else(|| {
            let ids: Vec<&str> = PromptTemplate::all().iter().map(|t| t.id()).collect();
            format!("unknown prompt '{}' (expected one of: {})", s, ids.join(", "))
        })
    }
}

/// Build the full prompt text. Pure formatting.
pub fn build_prompt(
    template: PromptTemplate,
    view_title: &str,
    instructions: &str,
    table_text: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Read the title first: ");
    prompt.push_str(view_title);
    prompt.push_str("\n\n");

    prompt.push_str(template.task());
    prompt.push('\n');

    if !instructions.is_empty() {
        prompt.push_str("\nAdditional instructions:\n");
        prompt.push_str(instructions);
        prompt.push('\n');
    }

    if let Some(format) = template.response_format() {
        prompt.push('\n');
        prompt.push_str(format);
        prompt.push('\n');
    }

    prompt.push_str("\nAnalyze this data (CSV):\n");
    prompt.push_str(table_text);
    if !table_text.ends_with('\n') {
        prompt.push('\n');
    }

    prompt
}

// ── Table budget ────────────────────────────────────────────────────

/// Table text sized for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetedTable {
    pub text: String,
    pub rows_shown: usize,
    pub total_rows: usize,
}

impl BudgetedTable {
    pub fn truncated(&self) -> bool {
        self.rows_shown < self.total_rows
    }
}

/// Serialize `table` as CSV within `max_chars`.
///
/// Under `Truncate` the header is always kept, followed by as many whole
/// rows as fit, then a note saying how many rows were sent. Under
/// `Reject` an oversized table is an error.
pub fn budget_table(
    table: &Table,
    max_chars: usize,
    policy: OversizePolicy,
) -> Result<BudgetedTable, PromptError> {
    let lines = table.csv_lines();
    let total_rows = table.num_rows();
    let total_chars: usize = lines.iter().map(|l| l.chars().count() + 1).sum();

    if total_chars <= max_chars {
        let mut text = String::with_capacity(total_chars);
        for line in &lines {
            text.push_str(line);
            text.push('\n');
        }
        return Ok(BudgetedTable { text, rows_shown: total_rows, total_rows });
    }

    if policy == OversizePolicy::Reject {
        return Err(PromptError::TableTooLarge { chars: total_chars, limit: max_chars });
    }

    let mut text = String::new();
    let mut used = 0;
    let mut rows_shown = 0;
    for (i, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + 1;
        // Header always goes in
        if i > 0 && used + cost > max_chars {
            break;
        }
        text.push_str(line);
        text.push('\n');
        used += cost;
        if i > 0 {
            rows_shown += 1;
        }
    }
    text.push_str(&format!("[table truncated: {} of {} rows shown]\n", rows_shown, total_rows));

    tracing::warn!(rows_shown, total_rows, total_chars, max_chars, "table truncated for prompt");

    Ok(BudgetedTable { text, rows_shown, total_rows })
}
