use crate::reconcile::Reconciler;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every read and write goes through the reconciler, which owns the
    /// store handle and the webhook verifier.
    pub reconciler: Reconciler,
}
