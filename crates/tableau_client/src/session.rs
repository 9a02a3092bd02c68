//! Session scoping.
//!
//! `with_session` signs in, hands the session to a closure, and signs out
//! when the closure finishes, however it finishes. Sign-out failure is
//! logged and never replaces the closure's result.

use crate::error::TableauError;
use crate::model::{Session, ViewItem, WorkbookItem};

/// The subset of the Tableau REST API the dashboard uses.
///
/// Implemented by [`crate::TableauClient`]; tests substitute in-memory fakes.
pub trait ServerApi: Send + Sync {
    fn sign_in(&self) -> Result<Session, TableauError>;
    fn sign_out(&self, session: &Session) -> Result<(), TableauError>;
    fn workbooks(&self, session: &Session) -> Result<Vec<WorkbookItem>, TableauError>;
    fn views(&self, session: &Session, workbook_id: &str) -> Result<Vec<ViewItem>, TableauError>;
    fn view_image(&self, session: &Session, view_id: &str) -> Result<Vec<u8>, TableauError>;
    fn view_data(&self, session: &Session, view_id: &str) -> Result<Vec<u8>, TableauError>;
}

/// Signs out on drop.
struct SessionGuard<'a, A: ServerApi + ?Sized> {
    api: &'a A,
    session: Session,
}

impl<A: ServerApi + ?Sized> Drop for SessionGuard<'_, A> {
    fn drop(&mut self) {
        match self.api.sign_out(&self.session) {
            Ok(()) => tracing::debug!("signed out"),
            Err(e) => tracing::warn!("sign-out failed: {}", e),
        }
    }
}

/// Run `f` inside a signed-in session.
///
/// Sign-in failures convert into `E`. The session is released on normal
/// return, on an early error return, and during unwinding.
pub fn with_session<A, T, E, F>(api: &A, f: F) -> Result<T, E>
where
    A: ServerApi + ?Sized,
    E: From<TableauError>,
    F: FnOnce(&Session) -> Result<T, E>,
{
    let session = api.sign_in()?;
    let guard = SessionGuard { api, session };
    f(&guard.session)
}
