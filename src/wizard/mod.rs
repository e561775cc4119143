//! Multi-step form state machines.
//!
//! [`Wizard`] drives a fixed sequence of steps `1..=F::STEPS`. `next` only
//! advances when the current step validates; `back` never validates. The
//! feedback survey has a branching question sequence and lives in
//! [`survey`].

pub mod poll_form;
pub mod profile;
pub mod survey;
pub mod validate;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use poll_form::PollForm;
pub use profile::ProfileForm;
pub use survey::Survey;

/// Error messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

pub trait WizardForm {
    const STEPS: u8;

    /// Errors for one step; empty when the step is valid.
    fn validate_step(&self, step: u8) -> FieldErrors;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wizard<F> {
    step: u8,
    pub form: F,
    errors: FieldErrors,
    last_saved: Option<DateTime<Utc>>,
}

impl<F: WizardForm + Default> Default for Wizard<F> {
    fn default() -> Self {
        Wizard::new(F::default())
    }
}

impl<F: WizardForm> Wizard<F> {
    pub fn new(form: F) -> Self {
        Wizard {
            step: 1,
            form,
            errors: FieldErrors::new(),
            last_saved: None,
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn is_last_step(&self) -> bool {
        self.step >= F::STEPS
    }

    /// Validate the current step. On failure the errors are kept and the step
    /// does not change; on success the step advances, stopping at the last.
    pub fn next(&mut self) -> bool {
        self.errors = self.form.validate_step(self.step);
        if !self.errors.is_empty() {
            return false;
        }
        if self.step < F::STEPS {
            self.step += 1;
        }
        true
    }

    pub fn back(&mut self) {
        self.errors.clear();
        self.step = self.step.saturating_sub(1).max(1);
    }

    /// Validate every step, jumping to the first invalid one.
    pub fn validate_all(&mut self) -> bool {
        for step in 1..=F::STEPS {
            let errors = self.form.validate_step(step);
            if !errors.is_empty() {
                self.step = step;
                self.errors = errors;
                return false;
            }
        }
        self.errors.clear();
        true
    }

    /// Replace the form contents without moving or validating.
    pub fn update(&mut self, form: F) {
        self.form = form;
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved = Some(at);
    }
}
