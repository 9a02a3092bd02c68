//! Dashboard engine.
//!
//! Catalog listing and view export over any [`ServerApi`], memoized in
//! per-operation freshness caches. Absent workbooks and views are values
//! (`None` / empty lists), not errors.

pub mod cache;
pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod model;

pub use cache::{CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use dashboard::{Dashboard, DashboardStats};
pub use error::DashError;
pub use model::{View, ViewExport, Workbook};
pub use vizdash_tableau_client::ServerApi;
