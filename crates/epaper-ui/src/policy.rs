//! Partial/full refresh cadence.
//!
//! Partial refreshes are fast but leave ghosting behind; after
//! `max_partial_updates` of them the next flush is upgraded to a full
//! refresh and the count starts over.

extern crate alloc;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::eink::RefreshMode;

/// Request flag for a full refresh, safe to set from interrupt context
#[derive(Debug, Default)]
pub struct FullRefreshRequest {
    pending: AtomicBool,
}

impl FullRefreshRequest {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Ask for the next flush to be a full refresh
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume a pending request
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Decides the refresh mode of every flush
#[derive(Debug)]
pub struct RefreshPolicy {
    max_partial_updates: u32,
    partial_count: u32,
    force_full: bool,
    request: Arc<FullRefreshRequest>,
}

impl RefreshPolicy {
    pub fn new(max_partial_updates: u32) -> Self {
        Self {
            max_partial_updates,
            partial_count: 0,
            force_full: false,
            request: Arc::new(FullRefreshRequest::new()),
        }
    }

    /// Mode for the flush about to happen
    ///
    /// Counts the flush: a partial increments the counter, a full resets it.
    pub fn next_mode(&mut self) -> RefreshMode {
        let requested = self.request.take();
        if self.force_full || requested {
            log::info!(
                "UI: full refresh forced after {} partials{}",
                self.partial_count,
                if requested { " (requested)" } else { "" }
            );
            self.note_full_refresh();
            return RefreshMode::Full;
        }

        if self.partial_count < self.max_partial_updates {
            self.partial_count += 1;
            RefreshMode::Partial
        } else {
            log::debug!("UI: partial budget of {} spent", self.max_partial_updates);
            self.note_full_refresh();
            RefreshMode::Full
        }
    }

    /// Make the next flush a full refresh; the counter resets now
    pub fn force_full_refresh(&mut self) {
        self.force_full = true;
        self.partial_count = 0;
    }

    /// Record a full refresh done outside [`Self::next_mode`]
    ///
    /// Clears the counter and any pending force or request.
    pub fn note_full_refresh(&mut self) {
        self.partial_count = 0;
        self.force_full = false;
        self.request.take();
    }

    /// Partial refreshes since the last full one
    pub fn partial_count(&self) -> u32 {
        self.partial_count
    }

    pub fn max_partial_updates(&self) -> u32 {
        self.max_partial_updates
    }

    /// Whether the next flush will be a full refresh
    pub fn is_full_pending(&self) -> bool {
        self.force_full
            || self.request.is_pending()
            || self.partial_count >= self.max_partial_updates
    }

    /// Shared flag that interrupt handlers can use to request a full refresh
    pub fn request_handle(&self) -> Arc<FullRefreshRequest> {
        Arc::clone(&self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn modes(policy: &mut RefreshPolicy, n: usize) -> Vec<RefreshMode> {
        (0..n).map(|_| policy.next_mode()).collect()
    }

    #[test]
    fn fifty_partials_then_full_then_partial() {
        let mut policy = RefreshPolicy::new(50);
        let modes = modes(&mut policy, 52);
        assert!(modes[..50].iter().all(|m| *m == RefreshMode::Partial));
        assert_eq!(modes[50], RefreshMode::Full);
        assert_eq!(modes[51], RefreshMode::Partial);
        assert_eq!(policy.partial_count(), 1);
    }

    #[test]
    fn full_refresh_count_is_floor_of_period() {
        for max in [0u32, 1, 3, 7] {
            for n in [0usize, 1, 5, 17, 40] {
                let mut policy = RefreshPolicy::new(max);
                let fulls = modes(&mut policy, n)
                    .into_iter()
                    .filter(|m| *m == RefreshMode::Full)
                    .count();
                assert_eq!(fulls, n / (max as usize + 1), "max={max} n={n}");
            }
        }
    }

    #[test]
    fn counter_never_exceeds_max() {
        let mut policy = RefreshPolicy::new(4);
        for _ in 0..30 {
            policy.next_mode();
            assert!(policy.partial_count() <= 4);
        }
    }

    #[test]
    fn force_makes_next_flush_full() {
        let mut policy = RefreshPolicy::new(50);
        modes(&mut policy, 3);
        policy.force_full_refresh();
        assert_eq!(policy.partial_count(), 0);
        assert!(policy.is_full_pending());
        assert_eq!(policy.next_mode(), RefreshMode::Full);
        assert_eq!(policy.next_mode(), RefreshMode::Partial);
    }

    #[test]
    fn zero_budget_always_full() {
        let mut policy = RefreshPolicy::new(0);
        assert!(modes(&mut policy, 5).iter().all(|m| *m == RefreshMode::Full));
    }

    #[test]
    fn request_flag_is_consumed_once() {
        let mut policy = RefreshPolicy::new(50);
        let handle = policy.request_handle();
        policy.next_mode();
        handle.request();
        assert!(policy.is_full_pending());
        assert_eq!(policy.next_mode(), RefreshMode::Full);
        assert!(!handle.is_pending());
        assert_eq!(policy.next_mode(), RefreshMode::Partial);
    }

    #[test]
    fn repeated_requests_collapse_into_one() {
        let request = FullRefreshRequest::new();
        assert!(!request.take());
        request.request();
        request.request();
        assert!(request.take());
        assert!(!request.take());
        assert!(!request.is_pending());
    }

    #[test]
    fn budget_is_reported() {
        let policy = RefreshPolicy::new(7);
        assert_eq!(policy.max_partial_updates(), 7);
        assert!(!policy.is_full_pending());
    }

    #[test]
    fn note_full_refresh_clears_pending_state() {
        let mut policy = RefreshPolicy::new(2);
        policy.force_full_refresh();
        policy.request_handle().request();
        policy.note_full_refresh();
        assert!(!policy.is_full_pending());
        assert_eq!(policy.next_mode(), RefreshMode::Partial);
    }
}
