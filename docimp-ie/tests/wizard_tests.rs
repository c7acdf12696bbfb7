//! Integration tests for the wizard state machine

use std::sync::{Arc, Mutex};

use docimp_ie::models::{
    FileCategory, FileEntry, ProcessingMode, SchedulingOptions, WizardDataPatch, WizardStep,
};
use docimp_ie::wizard::WizardStateMachine;

fn wizard() -> WizardStateMachine {
    WizardStateMachine::new([FileCategory::Documents])
}

fn select(wizard: &mut WizardStateMachine, category: FileCategory) {
    wizard.merge_data(WizardDataPatch {
        category: Some(category),
        ..Default::default()
    });
}

#[test]
fn test_navigate_then_return_restores_step() {
    let mut w = wizard();
    w.set_step(5);

    for target in 0..5 {
        w.navigate_to(target);
        assert!(w.is_reviewing());
        w.return_to_original();
        assert_eq!(w.current_step(), 5);
        assert!(!w.is_reviewing());
        assert_eq!(w.state().original_step, None);
    }
}

#[test]
fn test_nested_review_keeps_first_breadcrumb() {
    let mut w = wizard();
    w.set_step(6);
    w.navigate_to(4);
    w.navigate_to(1);
    w.navigate_to(3);

    assert_eq!(w.state().original_step, Some(6));
    w.return_to_original();
    assert_eq!(w.current_step(), 6);
}

#[test]
fn test_forward_navigation_does_not_enter_review() {
    let mut w = wizard();
    w.set_step(2);
    w.navigate_to(4);

    assert!(!w.is_reviewing());
    w.return_to_original();
    assert_eq!(w.current_step(), 4);
}

#[test]
fn test_any_merge_during_review_exits_review() {
    let mut w = wizard();
    w.set_step(5);
    w.navigate_to(4);

    w.merge_data(WizardDataPatch {
        scheduling: Some(SchedulingOptions {
            version_label: Some("v2".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    });

    assert!(!w.is_reviewing());
    assert_eq!(w.state().original_step, None);
    assert_eq!(w.current_step(), 4);
}

#[test]
fn test_reset_from_category_cascades() {
    let mut w = wizard();
    select(&mut w, FileCategory::Documents);
    w.merge_data(WizardDataPatch {
        files: Some(vec![FileEntry::new("a.pdf", 1, "")]),
        replace_tags: Some(vec!["a.pdf".to_string()]),
        processing_mode: Some(ProcessingMode::ForceText),
        ..Default::default()
    });
    for i in 0..5 {
        w.set_step_completed(i, true);
    }

    w.reset_from(WizardStep::Category.index());

    let state = w.state();
    assert_eq!(state.data.category, Some(FileCategory::Documents));
    assert!(state.data.files.is_empty());
    assert!(state.data.replace_tags.is_empty());
    assert_eq!(state.data.processing_mode, None);
    assert!(state.steps[0].completed);
    assert!(state.steps[1].completed);
    assert!(state.steps[2..].iter().all(|s| !s.completed));
}

#[test]
fn test_adaptive_step_skipped_for_plain_categories() {
    let mut w = wizard();
    select(&mut w, FileCategory::Spreadsheets);
    w.set_step(WizardStep::Intake.index());

    assert_eq!(w.advance(), Some(WizardStep::Scheduling.index()));
    assert_eq!(w.previous_step(), Some(WizardStep::Intake.index()));
    assert!(w.state().steps[WizardStep::Intake.index()].completed);
}

#[test]
fn test_adaptive_step_visited_for_documents() {
    let mut w = wizard();
    select(&mut w, FileCategory::Documents);
    w.set_step(WizardStep::Intake.index());

    assert_eq!(w.advance(), Some(WizardStep::AdaptiveOptions.index()));
}

#[test]
fn test_advance_stops_at_last_step() {
    let mut w = wizard();
    w.set_step(WizardStep::Routing.index());
    assert_eq!(w.advance(), None);
    assert_eq!(w.current_step(), WizardStep::Routing.index());
}

#[test]
fn test_observers_see_every_mutation() {
    let mut w = wizard();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = w.subscribe(move |state| sink.lock().unwrap().push(state.current_step));

    w.set_step(1);
    w.navigate_to(0);
    w.return_to_original();
    select(&mut w, FileCategory::Images);

    assert_eq!(*seen.lock().unwrap(), vec![1, 0, 1, 1]);

    assert!(w.unsubscribe(id));
    w.set_step(2);
    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_out_of_range_step_panics() {
    let mut w = wizard();
    w.navigate_to(7);
}
