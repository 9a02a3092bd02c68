//! The `Dashboard` facade: one Tableau API plus the freshness caches for
//! each operation. Share it by reference (or `Arc`) across threads.

use std::sync::Arc;
use std::time::Duration;

use vizdash_tableau_client::ServerApi;

use crate::cache::{CacheStats, Clock, SystemClock, TtlCache};
use crate::model::{View, ViewExport, Workbook};

pub(crate) type ExportKey = (String, String);

pub struct Dashboard<S: ServerApi> {
    pub(crate) api: Arc<S>,
    pub(crate) workbooks: TtlCache<(), Vec<Workbook>>,
    pub(crate) views: TtlCache<String, Vec<View>>,
    pub(crate) exports: TtlCache<ExportKey, Option<Arc<ViewExport>>>,
}

/// Per-cache counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardStats {
    pub workbooks: CacheStats,
    pub views: CacheStats,
    pub exports: CacheStats,
}

impl<S: ServerApi> Dashboard<S> {
    pub fn new(api: S, ttl: Duration) -> Self {
        Self::with_clock(Arc::new(api), ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(api: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            workbooks: TtlCache::with_clock(ttl, Arc::clone(&clock)),
            views: TtlCache::with_clock(ttl, Arc::clone(&clock)),
            exports: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    pub fn ttl(&self) -> Duration {
        self.workbooks.ttl()
    }

    /// Forget every cached result; the next call goes to the server.
    pub fn refresh(&self) {
        tracing::info!("clearing catalog and export caches");
        self.workbooks.clear();
        self.views.clear();
        self.exports.clear();
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            workbooks: self.workbooks.stats(),
            views: self.views.stats(),
            exports: self.exports.stats(),
        }
    }
}
