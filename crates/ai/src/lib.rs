// View analysis with a hosted language model
//
// prompt:     the four analysis templates and the table budget
// client:     Gemini generateContent over blocking HTTP
// dispatch:   template + table -> prompt -> model text
// structured: JSON suggestions returned by the chart/graph templates

pub mod client;
pub mod dispatch;
pub mod error;
pub mod prompt;
pub mod structured;

pub use client::{GeminiClient, TextGenerator};
pub use dispatch::{prepare, Analysis, Dispatcher, PreparedPrompt};
pub use error::{AnalysisError, DispatchError, PromptError};
pub use prompt::{budget_table, build_prompt, BudgetedTable, PromptTemplate};
pub use structured::{ChartSuggestion, GraphSuggestion, Series, Suggestion};
