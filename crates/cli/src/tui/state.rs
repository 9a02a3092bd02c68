// Dashboard state and key handling
//
// Selection cascades workbook -> view -> table. Network calls happen
// synchronously in the key handler. A failed call leaves the previous
// selection and data on screen and sets a warning line.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use vizdash_ai::{Analysis, Dispatcher, PromptTemplate, TextGenerator};
use vizdash_engine::{DashError, Dashboard, ServerApi, View, ViewExport, Workbook};

pub const NO_VIEWS: &str = "No views found in this workbook";
pub const WORKBOOK_NOT_FOUND: &str = "Workbook not found";
pub const NO_DATA: &str = "No data";
pub const VIEW_NOT_FOUND: &str = "View not found";

/// Which list or grid has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Workbooks,
    Views,
    Table,
}

#[derive(Debug, Clone)]
pub enum AnalysisPane {
    Done(Analysis),
    Failed(String),
}

pub struct DashboardApp<S: ServerApi, G: TextGenerator> {
    dash: Dashboard<S>,
    dispatcher: Option<Dispatcher<G>>,
    /// Why analysis is unavailable, when `dispatcher` is None
    dispatcher_missing: String,

    pub level: Level,
    pub workbooks: Vec<Workbook>,
    pub workbook_cursor: usize,
    /// Label of the opened workbook
    pub workbook: Option<String>,
    pub views: Vec<View>,
    pub view_cursor: usize,
    pub export: Option<Arc<ViewExport>>,

    pub scroll_row: usize,
    pub scroll_col: usize,
    pub analysis_scroll: u16,

    pub template: PromptTemplate,
    pub instructions: String,
    pub editing_instructions: bool,
    pub analysis: Option<AnalysisPane>,

    /// Informational state ("No data", ...)
    pub info: Option<String>,
    /// Last failed network call; previous state is kept
    pub warning: Option<String>,

    pub show_help: bool,
    pub should_quit: bool,
}

impl<S: ServerApi, G: TextGenerator> DashboardApp<S, G> {
    pub fn new(dash: Dashboard<S>, dispatcher: Result<Dispatcher<G>, String>) -> Self {
        let (dispatcher, dispatcher_missing) = match dispatcher {
            Ok(d) => (Some(d), String::new()),
            Err(reason) => (None, reason),
        };
        Self {
            dash,
            dispatcher,
            dispatcher_missing,
            level: Level::Workbooks,
            workbooks: Vec::new(),
            workbook_cursor: 0,
            workbook: None,
            views: Vec::new(),
            view_cursor: 0,
            export: None,
            scroll_row: 0,
            scroll_col: 0,
            analysis_scroll: 0,
            template: PromptTemplate::ChartSummary,
            instructions: String::new(),
            editing_instructions: false,
            analysis: None,
            info: None,
            warning: None,
            show_help: false,
            should_quit: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard<S> {
        &self.dash
    }

    pub fn analysis_available(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn selected_view(&self) -> Option<&View> {
        self.views.get(self.view_cursor)
    }

    // ── Loading ─────────────────────────────────────────────────────

    fn warn(&mut self, err: DashError) {
        tracing::warn!(error = %err, "dashboard request failed");
        self.warning = Some(err.to_string());
    }

    /// Fetch the workbook list. On failure the old list stays.
    pub fn load_workbooks(&mut self) {
        match self.dash.list_workbooks() {
            Ok(list) => {
                self.workbooks = list.as_ref().clone();
                self.workbook_cursor = self.workbook_cursor.min(self.workbooks.len().saturating_sub(1));
                self.warning = None;
            }
            Err(e) => self.warn(e),
        }
    }

    fn open_workbook(&mut self) {
        let Some(label) = self.workbooks.get(self.workbook_cursor).map(|w| w.label.clone()) else {
            return;
        };

        let found = match self.dash.find_workbook(&label) {
            Ok(found) => found,
            Err(e) => return self.warn(e),
        };
        let views = match found {
            Some(_) => match self.dash.list_views(&label) {
                Ok(v) => v.as_ref().clone(),
                Err(e) => return self.warn(e),
            },
            None => Vec::new(),
        };

        self.warning = None;
        self.info = match (found.is_some(), views.is_empty()) {
            (false, _) => Some(WORKBOOK_NOT_FOUND.to_string()),
            (true, true) => Some(NO_VIEWS.to_string()),
            (true, false) => None,
        };
        self.workbook = Some(label);
        self.views = views;
        self.view_cursor = 0;
        self.level = Level::Views;
    }

    fn open_view(&mut self) {
        let (Some(workbook), Some(view)) = (self.workbook.clone(), self.selected_view().cloned()) else {
            return;
        };
        match self.dash.export_view(&workbook, &view.label) {
            Ok(export) => {
                self.warning = None;
                self.info = match &export {
                    Some(e) if !e.table.is_empty() => None,
                    _ => Some(NO_DATA.to_string()),
                };
                self.export = export;
                self.analysis = None;
                self.scroll_row = 0;
                self.scroll_col = 0;
                self.level = Level::Table;
            }
            Err(e) => self.warn(e),
        }
    }

    /// Clear caches and reload whatever is on screen.
    pub fn refresh(&mut self) {
        self.dash.refresh();
        self.load_workbooks();
        if self.warning.is_some() {
            return;
        }
        match self.level {
            Level::Workbooks => {}
            Level::Views => self.reload_views(),
            Level::Table => {
                self.reload_views();
                if self.warning.is_some() {
                    return;
                }
                let current = self.export.as_ref().map(|e| e.view.label.clone());
                let pos = current.and_then(|l| self.views.iter().position(|v| v.label == l));
                if let (Level::Table, Some(pos)) = (self.level, pos) {
                    self.view_cursor = pos;
                    let analysis = self.analysis.take();
                    self.open_view();
                    if self.analysis.is_none() {
                        self.analysis = analysis;
                    }
                    return;
                }
                // The open view is gone; never keep its export on screen
                if self.level == Level::Table {
                    self.info = Some(VIEW_NOT_FOUND.to_string());
                }
                self.level = Level::Views;
                self.export = None;
                self.analysis = None;
            }
        }
    }

    fn reload_views(&mut self) {
        let Some(label) = self.workbook.clone() else { return };
        if let Some(pos) = self.workbooks.iter().position(|w| w.label == label) {
            self.workbook_cursor = pos;
            let level = self.level;
            self.open_workbook();
            if level == Level::Table && !self.views.is_empty() {
                self.level = Level::Table;
            }
        } else {
            self.info = Some(WORKBOOK_NOT_FOUND.to_string());
            self.views.clear();
            self.export = None;
            self.level = Level::Views;
        }
    }

    // ── Analysis ────────────────────────────────────────────────────

    pub fn run_analysis(&mut self) {
        let Some(export) = self.export.clone() else {
            return;
        };
        let Some(dispatcher) = &self.dispatcher else {
            self.analysis = Some(AnalysisPane::Failed(self.dispatcher_missing.clone()));
            return;
        };

        self.analysis_scroll = 0;
        self.analysis = Some(
            match dispatcher.analyze(self.template, &export.view.name, &self.instructions, &export.table) {
                Ok(a) => AnalysisPane::Done(a),
                Err(e) => {
                    tracing::warn!(error = %e, template = self.template.id(), "analysis failed");
                    AnalysisPane::Failed(e.to_string())
                }
            },
        );
    }

    // ── Keys ────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        if self.editing_instructions {
            self.edit_instructions(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('p') => self.template = self.template.next(),
            KeyCode::Char('i') => self.editing_instructions = true,
            KeyCode::Char('a') if self.level == Level::Table => self.run_analysis(),
            KeyCode::Enter => match self.level {
                Level::Workbooks => self.open_workbook(),
                Level::Views => self.open_view(),
                Level::Table => {}
            },
            KeyCode::Esc | KeyCode::Backspace => self.back(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Left | KeyCode::Char('h') if self.level == Level::Table => {
                self.scroll_col = self.scroll_col.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') if self.level == Level::Table => {
                let cols = self.export.as_ref().map(|e| e.table.num_cols()).unwrap_or(0);
                if self.scroll_col + 1 < cols {
                    self.scroll_col += 1;
                }
            }
            KeyCode::PageUp => self.analysis_scroll = self.analysis_scroll.saturating_sub(10),
            KeyCode::PageDown => self.analysis_scroll = self.analysis_scroll.saturating_add(10),
            _ => {}
        }
    }

    fn edit_instructions(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.editing_instructions = false,
            KeyCode::Backspace => {
                self.instructions.pop();
            }
            KeyCode::Char(c) => self.instructions.push(c),
            _ => {}
        }
    }

    fn back(&mut self) {
        match self.level {
            Level::Workbooks => {}
            Level::Views => {
                self.level = Level::Workbooks;
                self.workbook = None;
                self.views.clear();
                self.info = None;
            }
            Level::Table => {
                self.level = Level::Views;
                self.export = None;
                self.analysis = None;
                self.info = if self.views.is_empty() { Some(NO_VIEWS.to_string()) } else { None };
            }
        }
    }

    fn move_cursor(&mut self, delta: i32) {
        fn step(pos: usize, len: usize, delta: i32) -> usize {
            if len == 0 {
                return 0;
            }
            (pos as i64 + delta as i64).clamp(0, len as i64 - 1) as usize
        }
        match self.level {
            Level::Workbooks => {
                self.workbook_cursor = step(self.workbook_cursor, self.workbooks.len(), delta)
            }
            Level::Views => self.view_cursor = step(self.view_cursor, self.views.len(), delta),
            Level::Table => {
                let rows = self.export.as_ref().map(|e| e.table.num_rows()).unwrap_or(0);
                self.scroll_row = step(self.scroll_row, rows, delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use crossterm::event::KeyModifiers;
    use vizdash_ai::AnalysisError;
    use vizdash_config::PromptSettings;
    use vizdash_tableau_client::{Session, TableauError, ViewItem, WorkbookItem};

    /// Sales {Q1} and HR with no views. `q1_removed` swaps Q1 for Q2.
    struct Site {
        offline: AtomicBool,
        exports: AtomicUsize,
        q1_removed: AtomicBool,
    }

    impl ServerApi for Site {
        fn sign_in(&self) -> Result<Session, TableauError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(TableauError::Network("connection refused".into()));
            }
            Ok(Session { token: "t".into(), site_id: "s".into(), user_id: "u".into() })
        }

        fn sign_out(&self, _: &Session) -> Result<(), TableauError> {
            Ok(())
        }

        fn workbooks(&self, _: &Session) -> Result<Vec<WorkbookItem>, TableauError> {
            let wb = |id: &str, name: &str| WorkbookItem {
                id: id.into(),
                name: name.into(),
                project_name: "Default".into(),
            };
            Ok(vec![wb("wb-sales", "Sales"), wb("wb-hr", "HR")])
        }

        fn views(&self, _: &Session, workbook_id: &str) -> Result<Vec<ViewItem>, TableauError> {
            Ok(match workbook_id {
                "wb-sales" if self.q1_removed.load(Ordering::SeqCst) => {
                    vec![ViewItem { id: "v-q2".into(), name: "Q2".into() }]
                }
                "wb-sales" => vec![ViewItem { id: "v-q1".into(), name: "Q1".into() }],
                _ => vec![],
            })
        }

        fn view_image(&self, _: &Session, _: &str) -> Result<Vec<u8>, TableauError> {
            self.exports.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0x89, b'P', b'N', b'G'])
        }

        fn view_data(&self, _: &Session, _: &str) -> Result<Vec<u8>, TableauError> {
            Ok(b"Region,Sales\nEast,100\nWest,250\n".to_vec())
        }
    }

    struct Model(Result<&'static str, AnalysisError>);

    impl TextGenerator for Model {
        fn submit(&self, _prompt: &str) -> Result<String, AnalysisError> {
            self.0.clone().map(String::from)
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn app(model: Result<Dispatcher<Model>, String>) -> DashboardApp<Site, Model> {
        let site = Site {
            offline: AtomicBool::new(false),
            exports: AtomicUsize::new(0),
            q1_removed: AtomicBool::new(false),
        };
        let mut app = DashboardApp::new(Dashboard::new(site, Duration::from_secs(600)), model);
        app.load_workbooks();
        app
    }

    fn model(reply: Result<&'static str, AnalysisError>) -> Result<Dispatcher<Model>, String> {
        Ok(Dispatcher::new(Model(reply), &PromptSettings::default()))
    }

    fn press(app: &mut DashboardApp<Site, Model>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_sales_q1_shows_table() {
        let mut a = app(model(Ok("ok")));
        assert_eq!(a.workbooks.len(), 2);

        press(&mut a, KeyCode::Enter);
        assert_eq!(a.level, Level::Views);
        assert_eq!(a.views[0].label, "Q1");

        press(&mut a, KeyCode::Enter);
        assert_eq!(a.level, Level::Table);
        let export = a.export.as_ref().unwrap();
        assert_eq!(export.table.columns, vec!["Region", "Sales"]);
        assert!(a.info.is_none());
    }

    #[test]
    fn test_zero_view_workbook_message() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.level, Level::Views);
        assert_eq!(a.info.as_deref(), Some(NO_VIEWS));
        // Nothing to open
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.level, Level::Views);
    }

    #[test]
    fn test_back_navigation() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Esc);
        assert_eq!(a.level, Level::Views);
        assert!(a.export.is_none());
        press(&mut a, KeyCode::Backspace);
        assert_eq!(a.level, Level::Workbooks);
        press(&mut a, KeyCode::Esc);
        assert_eq!(a.level, Level::Workbooks);
        assert!(!a.should_quit);
    }

    #[test]
    fn test_analysis_failure_keeps_table() {
        let mut a = app(model(Err(AnalysisError::Network("timed out".into()))));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        let before = a.export.clone().unwrap();

        press(&mut a, KeyCode::Char('a'));
        assert!(matches!(a.analysis, Some(AnalysisPane::Failed(ref m)) if m.contains("timed out")));
        assert_eq!(a.level, Level::Table);
        assert!(Arc::ptr_eq(a.export.as_ref().unwrap(), &before));
    }

    #[test]
    fn test_analysis_uses_template_and_instructions() {
        let mut a = app(model(Ok("West leads")));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Char('p'));
        assert_eq!(a.template, PromptTemplate::GraphDescription);

        press(&mut a, KeyCode::Char('i'));
        for c in "by region".chars() {
            press(&mut a, KeyCode::Char(c));
        }
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.instructions, "by region");
        assert!(!a.editing_instructions);

        press(&mut a, KeyCode::Char('a'));
        match &a.analysis {
            Some(AnalysisPane::Done(analysis)) => {
                assert_eq!(analysis.text, "West leads");
                assert_eq!(analysis.template, PromptTemplate::GraphDescription);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_is_inline_error() {
        let mut a = app(Err("no gemini API key found".to_string()));
        assert!(!a.analysis_available());
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Char('a'));
        assert!(matches!(a.analysis, Some(AnalysisPane::Failed(ref m)) if m.contains("API key")));
        assert!(a.export.is_some());
    }

    #[test]
    fn test_connectivity_failure_keeps_state() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Enter);
        a.dashboard().api().offline.store(true, Ordering::SeqCst);

        press(&mut a, KeyCode::Char('r'));
        assert!(a.warning.as_deref().unwrap_or("").contains("connection refused"));
        assert_eq!(a.workbooks.len(), 2);
        assert_eq!(a.level, Level::Views);
        assert_eq!(a.views.len(), 1);

        a.dashboard().api().offline.store(false, Ordering::SeqCst);
        press(&mut a, KeyCode::Char('r'));
        assert!(a.warning.is_none());
    }

    #[test]
    fn test_refresh_after_view_removed_leaves_table() {
        let mut a = app(model(Ok("Q1 was strong")));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Char('a'));
        assert!(a.analysis.is_some());

        a.dashboard().api().q1_removed.store(true, Ordering::SeqCst);
        press(&mut a, KeyCode::Char('r'));
        assert_eq!(a.level, Level::Views);
        assert!(a.export.is_none());
        assert!(a.analysis.is_none());
        assert_eq!(a.info.as_deref(), Some(VIEW_NOT_FOUND));
        assert_eq!(a.views[0].label, "Q2");
    }

    #[test]
    fn test_refresh_keeps_open_view() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Char('r'));
        assert_eq!(a.level, Level::Table);
        assert_eq!(a.export.as_ref().unwrap().view.label, "Q1");
        assert_eq!(a.dashboard().api().exports.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_export_on_reopen() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Esc);
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.dashboard().api().exports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_help_swallows_next_key() {
        let mut a = app(model(Ok("ok")));
        press(&mut a, KeyCode::Char('?'));
        assert!(a.show_help);
        press(&mut a, KeyCode::Char('q'));
        assert!(!a.show_help);
        assert!(!a.should_quit);
        press(&mut a, KeyCode::Char('q'));
        assert!(a.should_quit);
    }
}
