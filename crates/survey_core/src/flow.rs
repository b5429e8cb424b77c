//! Step navigation.
//!
//! ```text
//! single:        1 → 2 → 3 → 4
//! my floors:     1 → 2 → 2a → 3 → 4
//! full building: 1 → 2 → 2b → 4
//! ```
//!
//! [`FlowState`] is a plain value; every operation returns a new one and
//! leaves its input untouched. Backward moves mirror the forward path of
//! the chosen entry kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::catalog::Catalog;
use crate::error::FlowError;
use crate::form::{FormSnapshot, Review};
use crate::schema::EntryKind;
use crate::store::{KeyValueStore, SubmissionKey, SubmissionStore};
use crate::validate::validate;

/// Number of numbered steps shown in the progress bar.
pub const TOTAL_STEPS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Location,
    Building,
    MyFloors,
    FullBuilding,
    Contact,
    Review,
    Submitted,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Step::Location => "1",
            Step::Building => "2",
            Step::MyFloors => "2a",
            Step::FullBuilding => "2b",
            Step::Contact => "3",
            Step::Review => "4",
            Step::Submitted => "submitted",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    step: Step,
    variant: EntryKind,
    /// Set once the form has moved past step 2.
    variant_locked: bool,
}

impl FlowState {
    pub fn new() -> Self {
        Self {
            step: Step::Location,
            variant: EntryKind::Single,
            variant_locked: false,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn variant(&self) -> EntryKind {
        self.variant
    }

    pub fn is_variant_locked(&self) -> bool {
        self.variant_locked
    }

    fn at(self, step: Step) -> Self {
        Self { step, ..self }
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful forward move. `review` is filled whenever the
/// new step is the review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: FlowState,
    pub review: Option<Review>,
}

/// Outcome of a stored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub state: FlowState,
    pub key: SubmissionKey,
    /// False when the stored draft could not be removed.
    pub draft_cleared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub step: u8,
    pub total: u8,
    pub percent: u8,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} of {} ({}%)", self.step, self.total, self.percent)
    }
}

pub fn progress(state: &FlowState) -> Progress {
    let step = match state.step {
        Step::Location => 1,
        Step::Building | Step::MyFloors | Step::FullBuilding => 2,
        Step::Contact => 3,
        Step::Review | Step::Submitted => 4,
    };
    let percent = u16::from(step) * 100 / u16::from(TOTAL_STEPS);
    Progress {
        step,
        total: TOTAL_STEPS,
        percent: u8::try_from(percent).unwrap_or(100),
    }
}

pub struct StepFlowController<'a> {
    catalog: &'a Catalog,
}

impl<'a> StepFlowController<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Choose the entry kind. Allowed until the form first leaves step 2;
    /// afterwards only the kind already chosen is accepted.
    pub fn select_variant(
        &self,
        state: &FlowState,
        kind: EntryKind,
    ) -> Result<FlowState, FlowError> {
        if state.variant_locked && state.variant != kind {
            return Err(FlowError::VariantLocked);
        }
        Ok(FlowState {
            variant: kind,
            ..*state
        })
    }

    pub fn next(&self, state: &FlowState, form: &FormSnapshot) -> Result<Transition, FlowError> {
        let result = validate(state.step, form);
        if !result.is_ok() {
            return Err(FlowError::Invalid {
                step: state.step,
                result,
            });
        }

        let next = match state.step {
            Step::Location => state.at(Step::Building),
            Step::Building => {
                let locked = FlowState {
                    variant_locked: true,
                    ..*state
                };
                match state.variant {
                    EntryKind::Single => locked.at(Step::Contact),
                    EntryKind::MyFloors => locked.at(Step::MyFloors),
                    EntryKind::FullBuilding => locked.at(Step::FullBuilding),
                }
            }
            Step::MyFloors => state.at(Step::Contact),
            Step::FullBuilding | Step::Contact => state.at(Step::Review),
            Step::Review | Step::Submitted => {
                return Err(FlowError::WrongStep {
                    action: "advance",
                    step: state.step,
                });
            }
        };

        let review = if next.step == Step::Review {
            let review = Review::from_form(form, next.variant)
                .map_err(|(step, result)| FlowError::Invalid { step, result })?;
            Some(review)
        } else {
            None
        };

        tracing::debug!(from = %state.step, to = %next.step, variant = %next.variant, "step advanced");
        Ok(Transition {
            state: next,
            review,
        })
    }

    pub fn back(&self, state: &FlowState) -> Result<FlowState, FlowError> {
        let previous = match state.step {
            Step::Location | Step::Submitted => {
                return Err(FlowError::NoPreviousStep { step: state.step });
            }
            Step::Building => Step::Location,
            Step::MyFloors | Step::FullBuilding => Step::Building,
            Step::Contact if state.variant == EntryKind::MyFloors => Step::MyFloors,
            Step::Contact => Step::Building,
            Step::Review if state.variant == EntryKind::FullBuilding => Step::FullBuilding,
            Step::Review => Step::Contact,
        };
        tracing::debug!(from = %state.step, to = %previous, "step reverted");
        Ok(state.at(previous))
    }

    /// Confirm the review: check the location against the catalog, store the
    /// submission and drop the draft.
    ///
    /// Once the submission is stored the call succeeds; a draft that could
    /// not be removed is reported on the receipt instead.
    pub fn submit<S: KeyValueStore>(
        &self,
        state: &FlowState,
        review: Review,
        store: &mut SubmissionStore<S>,
    ) -> Result<Receipt, FlowError> {
        if state.step != Step::Review {
            return Err(FlowError::WrongStep {
                action: "submit",
                step: state.step,
            });
        }
        if review.entry.kind() != state.variant {
            return Err(FlowError::VariantLocked);
        }
        self.catalog.check(&review.location)?;

        let submitted_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let submission = review.into_submission(submitted_at);
        let key = store.save(&submission)?;
        tracing::info!(%key, variant = %state.variant, "submission stored");

        let draft_cleared = match store.clear_draft() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%key, error = %err, "draft left behind after submission");
                false
            }
        };
        Ok(Receipt {
            state: state.at(Step::Submitted),
            key,
            draft_cleared,
        })
    }

    /// Start over; only possible once the current form has been submitted.
    pub fn reset(&self, state: &FlowState) -> Result<FlowState, FlowError> {
        if state.step != Step::Submitted {
            return Err(FlowError::WrongStep {
                action: "reset",
                step: state.step,
            });
        }
        Ok(FlowState::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample;

    fn at(step: Step, variant: EntryKind) -> FlowState {
        FlowState {
            step,
            variant,
            variant_locked: !matches!(step, Step::Location | Step::Building),
        }
    }

    #[test]
    fn back_mirrors_the_chosen_path() {
        let catalog = sample();
        let flow = StepFlowController::new(&catalog);
        let cases = [
            (Step::Building, EntryKind::Single, Step::Location),
            (Step::MyFloors, EntryKind::MyFloors, Step::Building),
            (Step::FullBuilding, EntryKind::FullBuilding, Step::Building),
            (Step::Contact, EntryKind::MyFloors, Step::MyFloors),
            (Step::Contact, EntryKind::Single, Step::Building),
            (Step::Review, EntryKind::FullBuilding, Step::FullBuilding),
            (Step::Review, EntryKind::MyFloors, Step::Contact),
        ];
        for (from, variant, expected) in cases {
            let state = flow.back(&at(from, variant)).unwrap();
            assert_eq!(state.step(), expected, "back from {from} ({variant})");
            assert_eq!(state.variant(), variant);
        }
    }

    #[test]
    fn back_is_refused_at_the_ends() {
        let catalog = sample();
        let flow = StepFlowController::new(&catalog);
        assert!(matches!(
            flow.back(&FlowState::new()),
            Err(FlowError::NoPreviousStep { .. })
        ));
        assert!(flow.back(&at(Step::Submitted, EntryKind::Single)).is_err());
    }

    #[test]
    fn invalid_step_keeps_the_state() {
        let catalog = sample();
        let flow = StepFlowController::new(&catalog);
        let state = FlowState::new();
        let err = flow.next(&state, &FormSnapshot::default()).unwrap_err();
        match err {
            FlowError::Invalid { step, result } => {
                assert_eq!(step, Step::Location);
                assert_eq!(result.field_errors.len(), 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(state.step(), Step::Location);
    }

    #[test]
    fn variant_is_locked_after_step_two() {
        let catalog = sample();
        let flow = StepFlowController::new(&catalog);
        let state = flow
            .select_variant(&FlowState::new(), EntryKind::MyFloors)
            .unwrap();
        assert_eq!(state.variant(), EntryKind::MyFloors);

        let locked = at(Step::MyFloors, EntryKind::MyFloors);
        assert!(matches!(
            flow.select_variant(&locked, EntryKind::Single),
            Err(FlowError::VariantLocked)
        ));
        assert!(flow.select_variant(&locked, EntryKind::MyFloors).is_ok());
    }

    #[test]
    fn progress_reports_sub_steps_as_step_two() {
        let half = Progress {
            step: 2,
            total: 4,
            percent: 50,
        };
        assert_eq!(progress(&at(Step::MyFloors, EntryKind::MyFloors)), half);
        assert_eq!(progress(&at(Step::FullBuilding, EntryKind::FullBuilding)), half);
        assert_eq!(progress(&FlowState::new()).percent, 25);
        assert_eq!(progress(&at(Step::Contact, EntryKind::Single)).to_string(), "step 3 of 4 (75%)");
    }

    #[test]
    fn progress_covers_every_step() {
        let expected = [
            (Step::Location, EntryKind::Single, 1, 25),
            (Step::Building, EntryKind::Single, 2, 50),
            (Step::MyFloors, EntryKind::MyFloors, 2, 50),
            (Step::FullBuilding, EntryKind::FullBuilding, 2, 50),
            (Step::Contact, EntryKind::Single, 3, 75),
            (Step::Review, EntryKind::Single, 4, 100),
            (Step::Submitted, EntryKind::Single, 4, 100),
        ];
        for (step, variant, number, percent) in expected {
            let reported = progress(&at(step, variant));
            assert_eq!(reported.step, number, "step number at {step}");
            assert_eq!(reported.percent, percent, "percent at {step}");
            assert_eq!(reported.total, TOTAL_STEPS);
        }
    }

    #[test]
    fn reset_only_after_submission() {
        let catalog = sample();
        let flow = StepFlowController::new(&catalog);
        assert!(flow.reset(&at(Step::Review, EntryKind::Single)).is_err());
        let fresh = flow.reset(&at(Step::Submitted, EntryKind::FullBuilding)).unwrap();
        assert_eq!(fresh, FlowState::new());
        assert!(!fresh.is_variant_locked());
    }
}
