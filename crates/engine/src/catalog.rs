//! Catalog access: workbook and view listing.

use std::sync::Arc;

use vizdash_tableau_client::{with_session, ServerApi};

use crate::dashboard::Dashboard;
use crate::error::{is_not_found, DashError};
use crate::model::{label_views, label_workbooks, View, Workbook};

impl<S: ServerApi> Dashboard<S> {
    /// Every workbook on the site. Empty is a valid answer.
    pub fn list_workbooks(&self) -> Result<Arc<Vec<Workbook>>, DashError> {
        self.workbooks.get_or_try_insert_with((), || {
            tracing::info!("fetching workbook catalog");
            let api = self.api.as_ref();
            let items = with_session(api, |s| api.workbooks(s))?;
            tracing::debug!(count = items.len(), "workbooks fetched");
            Ok(label_workbooks(items))
        })
    }

    /// Exact label match against the workbook catalog.
    pub fn find_workbook(&self, label: &str) -> Result<Option<Workbook>, DashError> {
        Ok(self.list_workbooks()?.iter().find(|w| w.label == label).cloned())
    }

    /// Views of the workbook with this label. Unknown workbooks and
    /// workbooks without views both give an empty list.
    pub fn list_views(&self, workbook_label: &str) -> Result<Arc<Vec<View>>, DashError> {
        self.views.get_or_try_insert_with(workbook_label.to_string(), || {
            let Some(workbook) = self.find_workbook(workbook_label)? else {
                tracing::info!(workbook = workbook_label, "workbook not found");
                return Ok(Vec::new());
            };

            tracing::info!(workbook = workbook_label, "fetching views");
            let api = self.api.as_ref();
            match with_session(api, |s| api.views(s, &workbook.id)) {
                Ok(items) => Ok(label_views(items)),
                Err(e) if is_not_found(&e) => {
                    tracing::info!(workbook = workbook_label, "workbook disappeared from server");
                    Ok(Vec::new())
                }
                Err(e) => Err(DashError::from(e)),
            }
        })
    }

    /// Just the view labels, in server order.
    pub fn view_names(&self, workbook_label: &str) -> Result<Vec<String>, DashError> {
        Ok(self.list_views(workbook_label)?.iter().map(|v| v.label.clone()).collect())
    }
}

