//! Shared application state.

use checkout::CheckoutCoordinator;
use domain::{CartService, CatalogService, InventoryLedger, OrderService};
use record_store::{RecordStore, Records};

use crate::context::RequestContext;

/// State shared by every handler.
///
/// Services are built per request over a [`Records`] handle tagged with
/// the caller's origin; they all share one backend and one write lock.
pub struct AppState<S> {
    pub records: Records<S>,
    pub backend: &'static str,
}

impl<S: RecordStore> AppState<S> {
    pub fn new(records: Records<S>, backend: &'static str) -> Self {
        Self { records, backend }
    }

    /// The record facade scoped to the caller's origin.
    pub fn records_for(&self, context: &RequestContext) -> Records<S> {
        self.records.with_origin(&context.origin)
    }

    pub fn catalog(&self, context: &RequestContext) -> CatalogService<S> {
        CatalogService::new(self.records_for(context))
    }

    pub fn cart(&self, context: &RequestContext) -> CartService<S> {
        CartService::new(self.records_for(context))
    }

    pub fn ledger(&self, context: &RequestContext) -> InventoryLedger<S> {
        InventoryLedger::new(self.records_for(context))
    }

    pub fn orders(&self, context: &RequestContext) -> OrderService<S> {
        OrderService::new(self.records_for(context))
    }

    pub fn checkout(&self, context: &RequestContext) -> CheckoutCoordinator<S> {
        CheckoutCoordinator::new(self.records_for(context))
    }
}
