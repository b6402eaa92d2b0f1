use crate::{models::listing::Owner, services::storage::Storage};
use std::sync::Arc;

/// Shared state handed to every handler.
///
/// Holds the storage backend and the identity reported as owner in
/// listings. Nothing here is mutated by the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub owner: Owner,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, owner: Owner) -> Self {
        Self { storage, owner }
    }
}
