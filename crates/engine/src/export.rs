//! View export: rendered image plus CSV data for one view.

use std::sync::Arc;

use vizdash_io::{Image, Table};
use vizdash_tableau_client::{with_session, ServerApi, TableauError};

use crate::dashboard::Dashboard;
use crate::error::{is_not_found, DashError};
use crate::model::ViewExport;

impl<S: ServerApi> Dashboard<S> {
    /// Export the view `view_label` of workbook `workbook_label`.
    ///
    /// `None` when either label does not match (including a workbook or
    /// view deleted since it was listed). Absent results are cached like
    /// present ones.
    pub fn export_view(
        &self,
        workbook_label: &str,
        view_label: &str,
    ) -> Result<Option<Arc<ViewExport>>, DashError> {
        let key = (workbook_label.to_string(), view_label.to_string());
        let cached = self
            .exports
            .get_or_try_insert_with(key, || self.fetch_export(workbook_label, view_label))?;
        Ok(Option::clone(&cached))
    }

    /// Export the first view of a workbook; `None` if it has no views.
    pub fn first_view(&self, workbook_label: &str) -> Result<Option<Arc<ViewExport>>, DashError> {
        let views = self.list_views(workbook_label)?;
        match views.first() {
            Some(view) => self.export_view(workbook_label, &view.label),
            None => Ok(None),
        }
    }

    fn fetch_export(
        &self,
        workbook_label: &str,
        view_label: &str,
    ) -> Result<Option<Arc<ViewExport>>, DashError> {
        let Some(workbook) = self.find_workbook(workbook_label)? else {
            return Ok(None);
        };
        let views = self.list_views(workbook_label)?;
        let Some(view) = views.iter().find(|v| v.label == view_label).cloned() else {
            tracing::info!(workbook = workbook_label, view = view_label, "view not found");
            return Ok(None);
        };

        tracing::info!(workbook = workbook_label, view = view_label, "exporting view");
        let api = self.api.as_ref();
        let fetched = with_session(api, |s| -> Result<_, TableauError> {
            let image = api.view_image(s, &view.id)?;
            let data = api.view_data(s, &view.id)?;
            Ok((image, data))
        });
        let (image, data) = match fetched {
            Ok(pair) => pair,
            Err(e) if is_not_found(&e) => {
                tracing::info!(view = view_label, "view disappeared from server");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let table = Table::from_csv_bytes(&data)?;
        let image = Image::new(image);
        tracing::debug!(
            rows = table.num_rows(),
            cols = table.num_cols(),
            image = %image.summary(),
            "view exported"
        );

        Ok(Some(Arc::new(ViewExport { workbook, view, image, table })))
    }
}
