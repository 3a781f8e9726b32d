use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module implements this trait to register its endpoints.
/// The binary collects all modules and merges their routes at the root,
/// so a module owns its full paths (`/p/...`, `/admin/...`).
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes, already bound to their state.
    fn routes(&self) -> Router;
}
