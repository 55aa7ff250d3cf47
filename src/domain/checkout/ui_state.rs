use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::aggregate::CheckoutAggregate;
use super::value_objects::ActiveContent;

// ============================================================================
// Session UI-State Registry
// ============================================================================
//
// Flags the page reads, one-shot effects it must perform (scrolling), and
// the timers that auto-dismiss transient UI. Carries no business rules.
//
// ============================================================================

/// Copy of the UI-facing flags of a checkout session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiFlags {
    pub active_content: ActiveContent,
    pub is_updating: bool,
    pub review_order_button_clicked: bool,
    pub guest_sign_in_username: String,
    pub success_dialog_open: bool,
    pub place_order_loading: bool,
}

impl From<&CheckoutAggregate> for UiFlags {
    fn from(aggregate: &CheckoutAggregate) -> Self {
        Self {
            active_content: aggregate.active_content,
            is_updating: aggregate.is_updating,
            review_order_button_clicked: aggregate.review_order_button_clicked,
            guest_sign_in_username: aggregate.guest_sign_in_username.clone(),
            success_dialog_open: aggregate.success_dialog_open,
            place_order_loading: aggregate.placing_order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    ShippingInformation,
    ShippingMethod,
}

/// Side effects the UI collaborator performs on request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEffect {
    ScrollToTop,
    ScrollIntoView(ScrollTarget),
}

pub struct UiEffects {
    sender: broadcast::Sender<UiEffect>,
}

impl UiEffects {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, effect: UiEffect) {
        // Nobody listening is fine: the page may not be mounted
        if self.sender.send(effect).is_err() {
            tracing::trace!(?effect, "No UI listener for effect");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEffect> {
        self.sender.subscribe()
    }
}

/// Pending auto-dismiss timers. Aborted together on session teardown.
#[derive(Default)]
pub struct DismissTimers {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DismissTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_elapsed` after `delay` unless cancelled first
    pub fn schedule<F>(&self, delay: Duration, on_elapsed: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_elapsed();
        });

        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    pub fn pending(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn cancel_all(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for DismissTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let timers = DismissTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        timers.schedule(Duration::from_secs(3), move || flag.store(true, Ordering::SeqCst));
        assert_eq!(timers.pending(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let timers = DismissTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        timers.schedule(Duration::from_secs(3), move || flag.store(true, Ordering::SeqCst));
        timers.cancel_all();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_effects_reach_subscribers() {
        let effects = UiEffects::new(8);
        let mut receiver = effects.subscribe();

        effects.emit(UiEffect::ScrollIntoView(ScrollTarget::ShippingMethod));
        assert_eq!(
            receiver.recv().await.unwrap(),
            UiEffect::ScrollIntoView(ScrollTarget::ShippingMethod)
        );
    }
}
