//! Wizard state machine
//!
//! Owns `WizardState` for the lifetime of one import session. All mutation
//! of the accumulated `WizardData` goes through `merge_data` / `reset_from`,
//! and every mutating operation publishes the new snapshot to registered
//! observers.
//!
//! Out-of-range step indices are programming errors and panic.

use std::collections::HashSet;

use crate::models::{FileCategory, WizardDataPatch, WizardState, WizardStep};

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&WizardState) + Send + Sync>;

/// Wizard state machine
pub struct WizardStateMachine {
    state: WizardState,
    adaptive_categories: HashSet<FileCategory>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    finalized: bool,
}

impl WizardStateMachine {
    /// Create a wizard at the first step
    ///
    /// * `adaptive_categories` - categories whose files go through the
    ///   adaptive-options step
    pub fn new(adaptive_categories: impl IntoIterator<Item = FileCategory>) -> Self {
        Self {
            state: WizardState::new(),
            adaptive_categories: adaptive_categories.into_iter().collect(),
            observers: Vec::new(),
            next_subscription: 0,
            finalized: false,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn snapshot(&self) -> WizardState {
        self.state.clone()
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn step_count(&self) -> usize {
        self.state.steps.len()
    }

    pub fn is_reviewing(&self) -> bool {
        self.state.is_reviewing
    }

    /// Register an observer called with every new snapshot
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&WizardState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Unconditional jump used for forward progression
    pub fn set_step(&mut self, index: usize) {
        self.assert_in_range(index);
        self.state.current_step = index;
        tracing::debug!(step = self.state.current().id(), "Wizard step set");
        self.publish();
    }

    /// User-initiated navigation
    ///
    /// Moving backwards outside review mode records the current step so
    /// `return_to_original` can come back to it.
    pub fn navigate_to(&mut self, index: usize) {
        self.assert_in_range(index);
        if index < self.state.current_step && !self.state.is_reviewing {
            self.state.original_step = Some(self.state.current_step);
            self.state.is_reviewing = true;
            tracing::debug!(
                from = self.state.current_step,
                to = index,
                "Entering review mode"
            );
        }
        self.state.current_step = index;
        self.publish();
    }

    /// Leave review mode and restore the step review started from
    pub fn return_to_original(&mut self) {
        if let Some(original) = self.state.original_step.take() {
            self.state.current_step = original;
            self.state.is_reviewing = false;
            tracing::debug!(step = original, "Returned from review mode");
            self.publish();
        }
    }

    /// Shallow-merge `patch` into the wizard data
    ///
    /// Editing data while reviewing commits forward: review mode ends and
    /// the return breadcrumb is dropped.
    pub fn merge_data(&mut self, patch: WizardDataPatch) {
        self.state.data.apply(patch);
        if self.state.is_reviewing {
            self.state.is_reviewing = false;
            self.state.original_step = None;
            tracing::debug!("Data edited during review, review mode cleared");
        }
        self.publish();
    }

    /// Invalidate everything downstream of step `index`
    ///
    /// Clears the data produced by every later step and marks those steps
    /// incomplete. The data produced by step `index` itself is kept.
    pub fn reset_from(&mut self, index: usize) {
        self.assert_in_range(index);
        for i in (index + 1)..self.state.steps.len() {
            let step = self.state.steps[i].id;
            self.state.data.clear_owned_by(step);
            self.state.steps[i].completed = false;
        }
        tracing::debug!(from = index, "Downstream wizard state reset");
        self.publish();
    }

    pub fn set_step_completed(&mut self, index: usize, completed: bool) {
        self.assert_in_range(index);
        self.state.steps[index].completed = completed;
        self.publish();
    }

    /// Whether the selected category goes through the adaptive-options step
    pub fn requires_adaptive_options(&self) -> bool {
        self.state
            .data
            .category
            .map(|c| self.adaptive_categories.contains(&c))
            .unwrap_or(false)
    }

    /// Index of the step after the current one, skipping adaptive options
    /// when the category does not need it
    pub fn next_step(&self) -> Option<usize> {
        let mut index = self.state.current_step + 1;
        while index < self.state.steps.len() {
            if !self.is_skipped(self.state.steps[index].id) {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Index of the step before the current one, with the same skip rule
    pub fn previous_step(&self) -> Option<usize> {
        let mut index = self.state.current_step;
        while index > 0 {
            index -= 1;
            if !self.is_skipped(self.state.steps[index].id) {
                return Some(index);
            }
        }
        None
    }

    /// Complete the current step and move to the next one
    ///
    /// Returns the new step index, or `None` on the last step.
    pub fn advance(&mut self) -> Option<usize> {
        let current = self.state.current_step;
        let next = self.next_step()?;
        self.state.steps[current].completed = true;
        self.set_step(next);
        Some(next)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    fn is_skipped(&self, step: WizardStep) -> bool {
        step == WizardStep::AdaptiveOptions && !self.requires_adaptive_options()
    }

    fn assert_in_range(&self, index: usize) {
        assert!(
            index < self.state.steps.len(),
            "wizard step index {} out of range (0..{})",
            index,
            self.state.steps.len()
        );
    }

    fn publish(&self) {
        for (_, observer) in &self.observers {
            observer(&self.state);
        }
    }
}

impl std::fmt::Debug for WizardStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardStateMachine")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileEntry, ProcessingMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn machine() -> WizardStateMachine {
        WizardStateMachine::new([FileCategory::Documents])
    }

    #[test]
    fn test_navigate_back_then_return_restores_step() {
        let mut wizard = machine();
        wizard.set_step(4);

        wizard.navigate_to(1);
        assert!(wizard.is_reviewing());
        assert_eq!(wizard.state().original_step, Some(4));
        assert_eq!(wizard.current_step(), 1);

        wizard.return_to_original();
        assert_eq!(wizard.current_step(), 4);
        assert!(!wizard.is_reviewing());
        assert_eq!(wizard.state().original_step, None);
    }

    #[test]
    fn test_second_backward_navigation_keeps_first_breadcrumb() {
        let mut wizard = machine();
        wizard.set_step(5);
        wizard.navigate_to(3);
        wizard.navigate_to(1);

        assert_eq!(wizard.state().original_step, Some(5));
        wizard.return_to_original();
        assert_eq!(wizard.current_step(), 5);
    }

    #[test]
    fn test_forward_navigation_does_not_enter_review() {
        let mut wizard = machine();
        wizard.navigate_to(2);
        assert!(!wizard.is_reviewing());
        assert_eq!(wizard.state().original_step, None);
    }

    #[test]
    fn test_return_without_review_is_noop() {
        let mut wizard = machine();
        wizard.set_step(2);
        wizard.return_to_original();
        assert_eq!(wizard.current_step(), 2);
    }

    #[test]
    fn test_merge_while_reviewing_exits_review() {
        let mut wizard = machine();
        wizard.set_step(4);
        wizard.navigate_to(1);

        wizard.merge_data(WizardDataPatch {
            category: Some(FileCategory::Images),
            ..Default::default()
        });

        assert!(!wizard.is_reviewing());
        assert_eq!(wizard.state().original_step, None);
        assert_eq!(wizard.current_step(), 1);
        assert_eq!(wizard.state().data.category, Some(FileCategory::Images));
    }

    #[test]
    fn test_reset_from_clears_downstream_only() {
        let mut wizard = machine();
        wizard.merge_data(WizardDataPatch {
            category: Some(FileCategory::Documents),
            files: Some(vec![FileEntry::new("a.pdf", 10, "")]),
            processing_mode: Some(ProcessingMode::Automatic),
            ..Default::default()
        });
        for i in 0..5 {
            wizard.set_step_completed(i, true);
        }

        wizard.reset_from(1);

        let state = wizard.state();
        assert_eq!(state.data.category, Some(FileCategory::Documents));
        assert!(state.data.files.is_empty());
        assert_eq!(state.data.processing_mode, None);
        assert!(state.steps[0].completed);
        assert!(state.steps[1].completed);
        assert!(state.steps[2..].iter().all(|s| !s.completed));
    }

    #[test]
    fn test_next_step_skips_adaptive_options_for_plain_category() {
        let mut wizard = machine();
        wizard.merge_data(WizardDataPatch {
            category: Some(FileCategory::Images),
            ..Default::default()
        });
        wizard.set_step(WizardStep::Intake.index());

        assert_eq!(wizard.next_step(), Some(WizardStep::Scheduling.index()));

        wizard.set_step(WizardStep::Scheduling.index());
        assert_eq!(wizard.previous_step(), Some(WizardStep::Intake.index()));
    }

    #[test]
    fn test_next_step_keeps_adaptive_options_for_documents() {
        let mut wizard = machine();
        wizard.merge_data(WizardDataPatch {
            category: Some(FileCategory::Documents),
            ..Default::default()
        });
        wizard.set_step(WizardStep::Intake.index());

        assert_eq!(wizard.next_step(), Some(WizardStep::AdaptiveOptions.index()));
    }

    #[test]
    fn test_advance_marks_completed_and_stops_at_end() {
        let mut wizard = machine();
        assert_eq!(wizard.advance(), Some(1));
        assert!(wizard.state().steps[0].completed);

        wizard.set_step(wizard.step_count() - 1);
        assert_eq!(wizard.advance(), None);
    }

    #[test]
    fn test_observers_receive_snapshots_until_unsubscribed() {
        let mut wizard = machine();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = wizard.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        wizard.set_step(1);
        wizard.navigate_to(0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(wizard.unsubscribe(id));
        wizard.set_step(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_step_panics() {
        let mut wizard = machine();
        wizard.set_step(7);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_reset_panics() {
        let mut wizard = machine();
        wizard.reset_from(99);
    }
}
