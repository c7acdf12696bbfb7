//! Job assembly and hand-off
//!
//! Quick-finish skips everything after intake and publishes the files as
//! approved. Full-finish checks the configured disposition first and
//! reports the first violated rule.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use docimp_common::events::{EventBus, ImportEvent};

use crate::models::{
    AnalysisResult, ApprovalMode, DispositionKind, FinalizedJob, ReviewTarget, WizardData,
    WizardDataPatch, WizardStep,
};
use crate::wizard::WizardStateMachine;

/// Disposition rules, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DispositionViolation {
    #[error("No disposition selected")]
    DispositionMissing,

    #[error("Review by specific users requires at least one reviewer")]
    ReviewersRequired,

    #[error("Review by group requires a group")]
    ReviewGroupRequired,

    #[error("Single-approver mode requires exactly one approver")]
    SingleApproverRequired,

    #[error("Approval requires at least one approver")]
    ApproversRequired,

    #[error("Expiry date must be after the publication date")]
    ExpiryBeforePublication,
}

/// Submission errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Invalid disposition: {0}")]
    Invalid(#[from] DispositionViolation),

    #[error("No files to import")]
    NoFiles,

    #[error("Import session already finalized")]
    AlreadyFinalized,
}

/// First violated disposition rule, if any
pub fn validate_disposition(data: &WizardData) -> Result<(), DispositionViolation> {
    let kind = data
        .disposition
        .ok_or(DispositionViolation::DispositionMissing)?;
    let routing = data.routing.clone().unwrap_or_default();
    let named = |list: &[String]| list.iter().filter(|p| !p.trim().is_empty()).count();

    match kind {
        DispositionKind::Approved => {}
        DispositionKind::Review => match routing.review_target {
            ReviewTarget::Users if named(&routing.reviewers) == 0 => {
                return Err(DispositionViolation::ReviewersRequired);
            }
            ReviewTarget::Group
                if routing
                    .review_group
                    .as_deref()
                    .map(|g| g.trim().is_empty())
                    .unwrap_or(true) =>
            {
                return Err(DispositionViolation::ReviewGroupRequired);
            }
            _ => {}
        },
        DispositionKind::Approval => match routing.approval_mode {
            ApprovalMode::Single if named(&routing.approvers) != 1 => {
                return Err(DispositionViolation::SingleApproverRequired);
            }
            ApprovalMode::Any | ApprovalMode::All if named(&routing.approvers) == 0 => {
                return Err(DispositionViolation::ApproversRequired);
            }
            _ => {}
        },
    }

    if let (Some(publish), Some(expires)) = (data.scheduling.publish_at, data.scheduling.expires_at)
    {
        if expires <= publish {
            return Err(DispositionViolation::ExpiryBeforePublication);
        }
    }

    Ok(())
}

/// Builds finalized jobs and emits them on the event bus
#[derive(Clone)]
pub struct SubmissionAssembler {
    event_bus: EventBus,
}

impl SubmissionAssembler {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }

    /// Finish straight after intake with the default disposition
    pub fn quick_finish(
        &self,
        session_id: Uuid,
        wizard: &mut WizardStateMachine,
        target_location: &str,
    ) -> Result<FinalizedJob, SubmissionError> {
        self.check_ready(wizard)?;

        wizard.reset_from(WizardStep::Intake.index());
        wizard.merge_data(WizardDataPatch {
            disposition: Some(DispositionKind::Approved),
            ..Default::default()
        });

        let config = wizard.state().data.clone();
        Ok(self.finalize(session_id, wizard, config, target_location, true))
    }

    /// Finish after validating the configured disposition
    pub fn full_finish(
        &self,
        session_id: Uuid,
        wizard: &mut WizardStateMachine,
        target_location: &str,
        analysis: BTreeMap<String, AnalysisResult>,
    ) -> Result<FinalizedJob, SubmissionError> {
        self.check_ready(wizard)?;
        validate_disposition(&wizard.state().data)?;

        let mut config = wizard.state().data.clone();
        config.analysis = analysis;
        Ok(self.finalize(session_id, wizard, config, target_location, false))
    }

    fn check_ready(&self, wizard: &WizardStateMachine) -> Result<(), SubmissionError> {
        if wizard.is_finalized() {
            return Err(SubmissionError::AlreadyFinalized);
        }
        if wizard.state().data.files.is_empty() {
            return Err(SubmissionError::NoFiles);
        }
        Ok(())
    }

    fn finalize(
        &self,
        session_id: Uuid,
        wizard: &mut WizardStateMachine,
        config: WizardData,
        target_location: &str,
        quick_mode: bool,
    ) -> FinalizedJob {
        let job = FinalizedJob::new(session_id, config, target_location.to_string(), quick_mode);
        wizard.mark_finalized();

        let payload = match serde_json::to_value(&job) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to serialize job");
                serde_json::Value::Null
            }
        };
        self.event_bus.emit_lossy(ImportEvent::ImportJobFinalized {
            session_id,
            quick_mode,
            job: payload,
            timestamp: chrono::Utc::now(),
        });

        tracing::info!(
            session_id = %session_id,
            files = job.files().len(),
            quick_mode,
            target_location = %target_location,
            "Import job finalized"
        );

        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileCategory, FileEntry, RoutingSelection, SchedulingOptions};
    use chrono::{Duration, Utc};

    fn data(kind: DispositionKind, routing: RoutingSelection) -> WizardData {
        WizardData {
            disposition: Some(kind),
            routing: Some(routing),
            ..Default::default()
        }
    }

    fn wizard_with_files(n: usize) -> WizardStateMachine {
        let mut wizard = WizardStateMachine::new([FileCategory::Documents]);
        wizard.merge_data(WizardDataPatch {
            category: Some(FileCategory::Images),
            files: Some(
                (0..n)
                    .map(|i| FileEntry::new(format!("f{}.png", i), 10, ""))
                    .collect(),
            ),
            ..Default::default()
        });
        wizard
    }

    #[test]
    fn test_review_by_users_requires_reviewer() {
        let d = data(DispositionKind::Review, RoutingSelection::default());
        assert_eq!(validate_disposition(&d), Err(DispositionViolation::ReviewersRequired));

        let d = data(
            DispositionKind::Review,
            RoutingSelection {
                reviewers: vec!["  ".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(validate_disposition(&d), Err(DispositionViolation::ReviewersRequired));

        let d = data(
            DispositionKind::Review,
            RoutingSelection {
                reviewers: vec!["maria".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(validate_disposition(&d), Ok(()));
    }

    #[test]
    fn test_review_by_group_requires_group() {
        let mut routing = RoutingSelection {
            review_target: ReviewTarget::Group,
            ..Default::default()
        };
        let d = data(DispositionKind::Review, routing.clone());
        assert_eq!(validate_disposition(&d), Err(DispositionViolation::ReviewGroupRequired));

        routing.review_group = Some("legal".to_string());
        assert_eq!(validate_disposition(&data(DispositionKind::Review, routing)), Ok(()));
    }

    #[test]
    fn test_approval_modes() {
        let routing = |mode, approvers: &[&str]| RoutingSelection {
            approval_mode: mode,
            approvers: approvers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };

        let check = |r| validate_disposition(&data(DispositionKind::Approval, r));
        assert_eq!(
            check(routing(ApprovalMode::Single, &[])),
            Err(DispositionViolation::SingleApproverRequired)
        );
        assert_eq!(
            check(routing(ApprovalMode::Single, &["a", "b"])),
            Err(DispositionViolation::SingleApproverRequired)
        );
        assert_eq!(check(routing(ApprovalMode::Single, &["a"])), Ok(()));
        assert_eq!(
            check(routing(ApprovalMode::Any, &[])),
            Err(DispositionViolation::ApproversRequired)
        );
        assert_eq!(
            check(routing(ApprovalMode::All, &[])),
            Err(DispositionViolation::ApproversRequired)
        );
        assert_eq!(check(routing(ApprovalMode::All, &["a", "b"])), Ok(()));
    }

    #[test]
    fn test_missing_disposition_and_expiry_order() {
        assert_eq!(
            validate_disposition(&WizardData::default()),
            Err(DispositionViolation::DispositionMissing)
        );

        let now = Utc::now();
        let mut d = data(DispositionKind::Approved, RoutingSelection::default());
        d.scheduling = SchedulingOptions {
            publish_at: Some(now),
            expires_at: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert_eq!(
            validate_disposition(&d),
            Err(DispositionViolation::ExpiryBeforePublication)
        );

        // routing rules are reported before scheduling rules
        d.disposition = Some(DispositionKind::Review);
        assert_eq!(validate_disposition(&d), Err(DispositionViolation::ReviewersRequired));
    }

    #[test]
    fn test_quick_finish_emits_once_with_defaults() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let assembler = SubmissionAssembler::new(bus);
        let mut wizard = wizard_with_files(2);
        wizard.merge_data(WizardDataPatch {
            disposition: Some(DispositionKind::Review),
            routing: Some(RoutingSelection::default()),
            ..Default::default()
        });
        let session_id = Uuid::new_v4();

        let job = assembler
            .quick_finish(session_id, &mut wizard, "inbox")
            .unwrap();

        assert!(job.quick_mode());
        assert_eq!(job.files().len(), 2);
        assert_eq!(job.target_location(), "inbox");
        assert_eq!(job.config().disposition, Some(DispositionKind::Approved));
        assert_eq!(job.config().routing, None);

        let event = rx.try_recv().expect("job event");
        assert_eq!(event.event_type(), "ImportJobFinalized");
        assert_eq!(event.session_id(), session_id);

        assert_eq!(
            assembler.quick_finish(session_id, &mut wizard, "inbox").unwrap_err(),
            SubmissionError::AlreadyFinalized
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_finish_blocked_by_violation() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let assembler = SubmissionAssembler::new(bus);
        let mut wizard = wizard_with_files(1);
        wizard.merge_data(WizardDataPatch {
            disposition: Some(DispositionKind::Review),
            routing: Some(RoutingSelection {
                review_target: ReviewTarget::Users,
                ..Default::default()
            }),
            ..Default::default()
        });

        let err = assembler
            .full_finish(Uuid::new_v4(), &mut wizard, "inbox", BTreeMap::new())
            .unwrap_err();

        assert_eq!(
            err,
            SubmissionError::Invalid(DispositionViolation::ReviewersRequired)
        );
        assert!(!wizard.is_finalized());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_finish_attaches_analysis() {
        let assembler = SubmissionAssembler::new(EventBus::new(8));
        let mut wizard = wizard_with_files(1);
        wizard.merge_data(WizardDataPatch {
            disposition: Some(DispositionKind::Approved),
            ..Default::default()
        });
        let mut analysis = BTreeMap::new();
        analysis.insert("f0.png".to_string(), AnalysisResult::decided("f0.png", true));

        let job = assembler
            .full_finish(Uuid::new_v4(), &mut wizard, "inbox", analysis)
            .unwrap();

        assert!(!job.quick_mode());
        assert!(job.config().analysis["f0.png"].needs_ocr);
        assert!(wizard.state().data.analysis.is_empty());
    }

    #[test]
    fn test_finish_without_files_refused() {
        let assembler = SubmissionAssembler::new(EventBus::new(8));
        let mut wizard = WizardStateMachine::new([FileCategory::Documents]);

        assert_eq!(
            assembler
                .quick_finish(Uuid::new_v4(), &mut wizard, "inbox")
                .unwrap_err(),
            SubmissionError::NoFiles
        );
    }
}
