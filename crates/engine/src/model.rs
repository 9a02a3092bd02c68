//! Catalog entities and selection labels.
//!
//! Users select workbooks and views by label. A label is the plain name
//! when that name is unique in the fetched list. Duplicates are qualified
//! with the project (workbooks only), then a short id, then the full id.

use std::collections::HashMap;

use serde::Serialize;

use vizdash_io::{Image, Table};
use vizdash_tableau_client::{ViewItem, WorkbookItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workbook {
    pub id: String,
    pub name: String,
    pub project_name: String,
    /// Unique within one catalog listing
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub id: String,
    pub name: String,
    /// Unique within its workbook
    pub label: String,
}

/// A successfully exported view.
#[derive(Debug, Clone)]
pub struct ViewExport {
    pub workbook: Workbook,
    pub view: View,
    pub image: Image,
    pub table: Table,
}

pub(crate) fn label_workbooks(items: Vec<WorkbookItem>) -> Vec<Workbook> {
    let keys: Vec<(&str, Option<String>, &str)> = items
        .iter()
        .map(|w| {
            let qualified = (!w.project_name.is_empty())
                .then(|| format!("{}/{}", w.project_name, w.name));
            (w.name.as_str(), qualified, w.id.as_str())
        })
        .collect();
    let labels = disambiguate(&keys);

    items
        .into_iter()
        .zip(labels)
        .map(|(w, label)| Workbook { id: w.id, name: w.name, project_name: w.project_name, label })
        .collect()
}

pub(crate) fn label_views(items: Vec<ViewItem>) -> Vec<View> {
    let keys: Vec<(&str, Option<String>, &str)> =
        items.iter().map(|v| (v.name.as_str(), None, v.id.as_str())).collect();
    let labels = disambiguate(&keys);

    items
        .into_iter()
        .zip(labels)
        .map(|(v, label)| View { id: v.id, name: v.name, label })
        .collect()
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

/// (name, qualified name, id) -> label, in input order.
fn disambiguate(keys: &[(&str, Option<String>, &str)]) -> Vec<String> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for (name, _, _) in keys {
        *name_counts.entry(*name).or_default() += 1;
    }

    let candidates: Vec<String> = keys
        .iter()
        .map(|(name, qualified, _)| {
            if name_counts[name] == 1 {
                name.to_string()
            } else {
                qualified.clone().unwrap_or_else(|| name.to_string())
            }
        })
        .collect();

    let mut candidate_counts: HashMap<&str, usize> = HashMap::new();
    for c in &candidates {
        *candidate_counts.entry(c.as_str()).or_default() += 1;
    }

    let short: Vec<String> = candidates
        .iter()
        .zip(keys)
        .map(|(candidate, (_, _, id))| {
            if candidate_counts[candidate.as_str()] == 1 {
                candidate.clone()
            } else {
                format!("{} [{}]", candidate, short_id(id))
            }
        })
        .collect();

    // Ids sharing a prefix: spell out the whole id
    let mut short_counts: HashMap<&str, usize> = HashMap::new();
    for label in &short {
        *short_counts.entry(label.as_str()).or_default() += 1;
    }

    short
        .iter()
        .zip(candidates.iter().zip(keys))
        .map(|(label, (candidate, (_, _, id)))| {
            if short_counts[label.as_str()] == 1 {
                label.clone()
            } else {
                format!("{} [{}]", candidate, id)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wb(id: &str, name: &str, project: &str) -> WorkbookItem {
        WorkbookItem { id: id.into(), name: name.into(), project_name: project.into() }
    }

    fn labels(items: Vec<WorkbookItem>) -> Vec<String> {
        label_workbooks(items).into_iter().map(|w| w.label).collect()
    }

    #[test]
    fn test_unique_names_are_labels() {
        assert_eq!(labels(vec![wb("1", "Sales", "Finance"), wb("2", "HR", "People")]), vec!["Sales", "HR"]);
    }

    #[test]
    fn test_duplicate_names_use_project() {
        assert_eq!(
            labels(vec![wb("1", "Sales", "Finance"), wb("2", "Sales", "Marketing"), wb("3", "HR", "")]),
            vec!["Finance/Sales", "Marketing/Sales", "HR"]
        );
    }

    #[test]
    fn test_same_project_duplicates_use_id() {
        assert_eq!(
            labels(vec![
                wb("aaaaaaaa-1111", "Sales", "Finance"),
                wb("bbbbbbbb-2222", "Sales", "Finance"),
                wb("c", "Sales", "Ops"),
            ]),
            vec!["Finance/Sales [aaaaaaaa]", "Finance/Sales [bbbbbbbb]", "Ops/Sales"]
        );
    }

    #[test]
    fn test_shared_id_prefix_uses_full_id() {
        assert_eq!(
            labels(vec![
                wb("1234567a-x", "Sales", "Finance"),
                wb("1234567a-y", "Sales", "Finance"),
                wb("9876", "Sales", "Finance"),
            ]),
            vec!["Finance/Sales [1234567a-x]", "Finance/Sales [1234567a-y]", "Finance/Sales [9876]"]
        );
    }

    #[test]
    fn test_duplicate_view_names() {
        let views = label_views(vec![
            ViewItem { id: "v-1".into(), name: "Overview".into() },
            ViewItem { id: "v-2".into(), name: "Overview".into() },
            ViewItem { id: "v-3".into(), name: "Detail".into() },
        ]);
        let labels: Vec<&str> = views.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["Overview [v-1]", "Overview [v-2]", "Detail"]);
    }
}
