//! Import wizard state machine

mod state_machine;

pub use state_machine::{SubscriptionId, WizardStateMachine};
