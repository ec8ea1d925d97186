//! UI state: panel visibility, loading indicator, and the menu guide.
//!
//! The screen is either showing the control panel (nothing loaded, pick a
//! document) or the floating action button (a document is open, the menu
//! lives behind the button). [`VisibilityController`] is that two-state
//! machine and is the [`PanelControl`] the orchestrator drives.
//!
//! [`LoadingIndicator`] hands out scoped guards; the indicator is visible
//! while any guard is alive.
//!
//! [`MenuGuide`] is the one-time hint pointing at the floating button after
//! the first successful load.

use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{FlagStore, PanelControl};

/// Key of the persisted "user dismissed the menu guide" flag.
pub const MENU_GUIDE_DISMISSED_KEY: &str = "menu-guide-dismissed";

// ═══════════════════════════════════════════════════════════════════════
// Panel / floating button
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelView {
    ControlPanel,
    FloatingButton,
}

#[derive(Debug)]
struct PanelState {
    view: PanelView,
    last_alert: Option<String>,
    transitions: usize,
}

#[derive(Debug)]
pub struct VisibilityController {
    state: Mutex<PanelState>,
}

impl Default for VisibilityController {
    fn default() -> Self {
        Self {
            state: Mutex::new(PanelState {
                view: PanelView::ControlPanel,
                last_alert: None,
                transitions: 0,
            }),
        }
    }
}

impl VisibilityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PanelView {
        self.lock().view
    }

    pub fn last_alert(&self) -> Option<String> {
        self.lock().last_alert.clone()
    }

    /// Number of actual view changes so far.
    pub fn transitions(&self) -> usize {
        self.lock().transitions
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn switch_to(&self, view: PanelView) {
        let mut state = self.lock();
        if state.view != view {
            tracing::debug!(from = ?state.view, to = ?view, "panel view changed");
            state.view = view;
            state.transitions += 1;
        }
    }
}

impl PanelControl for VisibilityController {
    fn hide(&self) {
        self.switch_to(PanelView::FloatingButton);
    }

    fn show(&self) {
        self.switch_to(PanelView::ControlPanel);
    }

    fn alert(&self, message: &str) {
        tracing::warn!(message, "user alert");
        self.lock().last_alert = Some(message.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Loading indicator
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct LoadingCounters {
    active: AtomicUsize,
    shown: AtomicUsize,
    released: AtomicUsize,
}

/// Cheap to clone; all clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    counters: Arc<LoadingCounters>,
}

/// Keeps the loading indicator up until dropped.
#[derive(Debug)]
#[must_use = "the indicator is released as soon as the guard is dropped"]
pub struct LoadingGuard {
    counters: Arc<LoadingCounters>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self) -> LoadingGuard {
        self.counters.shown.fetch_add(1, Ordering::SeqCst);
        if self.counters.active.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::debug!("loading indicator shown");
        }
        LoadingGuard {
            counters: self.counters.clone(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.active() > 0
    }

    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> usize {
        self.counters.shown.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        if self.counters.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            tracing::debug!("loading indicator removed");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Menu guide
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct GuideState {
    showing: bool,
    shown_this_session: bool,
}

/// One-time hint shown after a document loads.
///
/// Never shown when the dismissed flag is persisted, never shown twice in
/// one session, and never stacked on top of itself.
pub struct MenuGuide {
    store: Arc<dyn FlagStore>,
    visible_for: Duration,
    state: Mutex<GuideState>,
}

impl MenuGuide {
    pub fn new(store: Arc<dyn FlagStore>, visible_for: Duration) -> Self {
        Self {
            store,
            visible_for,
            state: Mutex::new(GuideState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuideState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_showing(&self) -> bool {
        self.lock().showing
    }

    pub fn was_shown(&self) -> bool {
        self.lock().shown_this_session
    }

    pub fn is_dismissed(&self) -> bool {
        self.store.get_flag(MENU_GUIDE_DISMISSED_KEY)
    }

    /// Show the guide if allowed. Returns whether it is now showing because
    /// of this call.
    pub fn try_show(&self) -> bool {
        if self.is_dismissed() {
            tracing::debug!("menu guide previously dismissed");
            return false;
        }
        let mut state = self.lock();
        if state.showing || state.shown_this_session {
            return false;
        }
        state.showing = true;
        state.shown_this_session = true;
        tracing::info!("menu guide shown");
        true
    }

    /// Hide without remembering the dismissal (timeout, hover).
    pub fn auto_hide(&self) {
        let mut state = self.lock();
        if state.showing {
            state.showing = false;
            tracing::debug!("menu guide hidden");
        }
    }

    /// Explicit close by the user; remembered across sessions.
    pub fn dismiss(&self) -> Result<()> {
        self.store.set_flag(MENU_GUIDE_DISMISSED_KEY, true)?;
        self.lock().showing = false;
        tracing::info!("menu guide dismissed");
        Ok(())
    }

    /// Show the guide after `delay`, then hide it again after the visible
    /// period.
    pub fn schedule(self: &Arc<Self>, delay: Duration) {
        let guide = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if guide.try_show() {
                tokio::time::sleep(guide.visible_for).await;
                guide.auto_hide();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFlagStore;

    #[test]
    fn test_panel_transitions() {
        let ui = VisibilityController::new();
        assert_eq!(ui.view(), PanelView::ControlPanel);
        ui.hide();
        ui.hide();
        assert_eq!(ui.view(), PanelView::FloatingButton);
        ui.show();
        assert_eq!(ui.view(), PanelView::ControlPanel);
        assert_eq!(ui.transitions(), 2);
    }

    #[test]
    fn test_alert_is_recorded() {
        let ui = VisibilityController::new();
        ui.alert("Failed to open document: 404 Not Found");
        assert_eq!(
            ui.last_alert().as_deref(),
            Some("Failed to open document: 404 Not Found")
        );
    }

    #[test]
    fn test_loading_guard_releases_once() {
        let loading = LoadingIndicator::new();
        {
            let _outer = loading.show();
            let _inner = loading.show();
            assert_eq!(loading.active(), 2);
            assert!(loading.is_visible());
        }
        assert!(!loading.is_visible());
        assert_eq!(loading.shown(), 2);
        assert_eq!(loading.released(), 2);
    }

    #[test]
    fn test_guide_shows_once_per_session() {
        let guide = MenuGuide::new(Arc::new(MemoryFlagStore::new()), Duration::from_secs(5));
        assert!(guide.try_show());
        assert!(!guide.try_show(), "already showing");
        guide.auto_hide();
        assert!(!guide.try_show(), "already shown this session");
        assert!(guide.was_shown());
    }

    #[test]
    fn test_guide_respects_persisted_dismissal() {
        let store = Arc::new(MemoryFlagStore::with_flag(MENU_GUIDE_DISMISSED_KEY, true));
        let guide = MenuGuide::new(store, Duration::from_secs(5));
        assert!(!guide.try_show());
        assert!(!guide.was_shown());
    }

    #[test]
    fn test_dismiss_persists() {
        let store = Arc::new(MemoryFlagStore::new());
        let guide = MenuGuide::new(store.clone(), Duration::from_secs(5));
        assert!(guide.try_show());
        guide.dismiss().unwrap();
        assert!(!guide.is_showing());
        assert!(store.get_flag(MENU_GUIDE_DISMISSED_KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_guide_auto_hides() {
        let guide = Arc::new(MenuGuide::new(
            Arc::new(MemoryFlagStore::new()),
            Duration::from_millis(5000),
        ));
        guide.schedule(Duration::from_millis(1000));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(!guide.is_showing());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(guide.is_showing());
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(!guide.is_showing());
        assert!(guide.was_shown());
    }
}
