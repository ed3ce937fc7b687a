use std::time::Duration;

/// Default pause between sequential page requests
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Decides how long the batch waits before issuing request number `iteration` (0-based).
///
/// The first request is never delayed; the batch only asks for `iteration >= 1`.
/// `iteration` counts issued requests, not pages: a page skipped for being too
/// short costs no pause.
pub trait Pacer: Send + Sync {
    fn delay(&self, iteration: usize) -> Duration;
}

/// Same pause before every request
#[derive(Debug, Clone, Copy)]
pub struct FixedPacer(pub Duration);

impl Default for FixedPacer {
    fn default() -> Self {
        Self(DEFAULT_PAGE_DELAY)
    }
}

impl Pacer for FixedPacer {
    fn delay(&self, _iteration: usize) -> Duration {
        self.0
    }
}

/// No pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn delay(&self, _iteration: usize) -> Duration {
        Duration::ZERO
    }
}
