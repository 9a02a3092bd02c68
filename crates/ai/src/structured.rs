// Structured responses for the JSON templates
//
// Models are asked for a bare JSON object but often wrap it in a markdown
// fence or a sentence. The object is recovered from the first '{' to the
// last '}' when the whole text does not parse.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::PromptTemplate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: String,
    /// Numbers or strings, as the model produced them
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Series {
    /// Values as numbers; non-numeric entries are None.
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(value_as_f64).collect()
    }
}

/// Response to the presentation chart template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSuggestion {
    pub chart_type: String,
    #[serde(default)]
    pub categories: Vec<Value>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
}

impl ChartSuggestion {
    pub fn category_labels(&self) -> Vec<String> {
        self.categories.iter().map(value_as_label).collect()
    }
}

/// Response to the graph design template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSuggestion {
    pub graph_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x_axis_label: String,
    #[serde(default)]
    pub y_axis_label: String,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub image_suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    Chart(ChartSuggestion),
    Graph(GraphSuggestion),
}

impl Suggestion {
    /// Parse the model text for a JSON template. Returns None for prose
    /// templates. Parse problems become warnings, never errors.
    pub fn parse(template: PromptTemplate, text: &str) -> (Option<Suggestion>, Vec<String>) {
        let mut warnings = Vec::new();
        let suggestion = match template {
            PromptTemplate::ChartSummary => {
                parse_json::<ChartSuggestion>(text, &mut warnings).map(Suggestion::Chart)
            }
            PromptTemplate::GraphDescription => {
                parse_json::<GraphSuggestion>(text, &mut warnings).map(Suggestion::Graph)
            }
            PromptTemplate::RootCause | PromptTemplate::Trend => None,
        };
        (suggestion, warnings)
    }

    /// Short multi-line rendering for terminals.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            Suggestion::Chart(c) => {
                lines.push(format!("Chart:    {} - {}", c.chart_type, c.title));
                let cats = c.category_labels();
                if !cats.is_empty() {
                    lines.push(format!("Categories: {}", cats.join(", ")));
                }
                push_series(&mut lines, &c.series);
                if !c.caption.is_empty() {
                    lines.push(format!("Caption:  {}", c.caption));
                }
            }
            Suggestion::Graph(g) => {
                lines.push(format!("Graph:    {} - {}", g.graph_type, g.title));
                lines.push(format!("Axes:     x = {}, y = {}", g.x_axis_label, g.y_axis_label));
                push_series(&mut lines, &g.series);
                if !g.image_suggestion.is_empty() {
                    lines.push(format!("Design:   {}", g.image_suggestion));
                }
            }
        }
        lines
    }
}

fn push_series(lines: &mut Vec<String>, series: &[Series]) {
    for s in series {
        let values: Vec<String> = s.values.iter().map(value_as_label).collect();
        lines.push(format!("Series:   {} [{}]", s.name, values.join(", ")));
    }
}

fn parse_json<T: DeserializeOwned>(content: &str, warnings: &mut Vec<String>) -> Option<T> {
    let first_err = match serde_json::from_str::<T>(content.trim()) {
        Ok(v) => return Some(v),
        Err(e) => e,
    };

    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        warnings.push(format!("Response is not JSON: {}", first_err));
        return None;
    };
    if end < start {
        warnings.push(format!("Response is not JSON: {}", first_err));
        return None;
    }

    match serde_json::from_str::<T>(&content[start..=end]) {
        Ok(v) => {
            warnings.push("Response contained extra text around JSON".to_string());
            Some(v)
        }
        Err(e) => {
            warnings.push(format!("Failed to parse JSON: {}", e));
            None
        }
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn value_as_label(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
