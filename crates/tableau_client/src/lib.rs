//! Tableau Server REST client.
//!
//! This crate is the single source of truth for the Tableau wire contract:
//! personal-access-token sign-in/sign-out, version negotiation, workbook and
//! view listing, view image and CSV data export.
//!
//! Blocking reqwest, no retries. Sessions are scoped with [`with_session`]
//! so every sign-in is paired with a sign-out.

mod auth;
mod client;
mod error;
mod model;
mod session;

pub use auth::PatCredentials;
pub use client::{TableauClient, DEFAULT_PAGE_SIZE, NEGOTIATION_VERSION};
pub use error::TableauError;
pub use model::{Pagination, Session, ViewItem, WorkbookItem};
pub use session::{with_session, ServerApi};
