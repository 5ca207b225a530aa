use std::fmt;

use super::field::ValidationError;
use super::render::StepForm;
use super::step::{compute_steps, declaration_index, StepKind};

/// Index into the applicable step list; `current_index < total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardPosition {
    pub current_index: usize,
    pub total: usize,
}

impl WizardPosition {
    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.total
    }
}

impl fmt::Display for WizardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} of {}", self.current_index + 1, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent<S> {
    Moved { from: S, to: S },
    /// The current step is incomplete; the message tells the user what to fix.
    Blocked(ValidationError),
    /// Already at the edge of the list.
    Repeat,
}

/// Tracks the current step by kind. The index is derived from the list
/// recomputed for the draft at hand, so `next` and `back` always walk the
/// same sequence and skip the same steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator<S> {
    current: S,
}

impl<S: Copy + Eq + fmt::Debug> Navigator<S> {
    /// Starts on the first applicable step; `None` if no step applies.
    pub fn start<D>(draft: &D) -> Option<Self>
    where
        S: StepKind<D>,
    {
        compute_steps::<D, S>(draft)
            .first()
            .map(|first| Self { current: *first })
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn position<D>(&self, draft: &D) -> WizardPosition
    where
        S: StepKind<D>,
    {
        let steps = compute_steps::<D, S>(draft);
        WizardPosition {
            current_index: steps
                .iter()
                .position(|step| *step == self.current)
                .unwrap_or(0),
            total: steps.len().max(1),
        }
    }

    pub fn can_finish<D>(&self, draft: &D) -> bool
    where
        S: StepKind<D>,
    {
        self.current.is_applicable(draft) && self.position(draft).is_last()
    }

    /// Advances to the next applicable step once the current one validates.
    pub fn next<F>(&mut self, form: &F, draft: &F::Draft) -> NavigationEvent<S>
    where
        F: StepForm<Step = S>,
        S: StepKind<F::Draft>,
    {
        let steps = compute_steps::<F::Draft, S>(draft);
        let Some(index) = steps.iter().position(|step| *step == self.current) else {
            return NavigationEvent::Repeat;
        };
        let Some(target) = steps.get(index + 1).copied() else {
            return NavigationEvent::Repeat;
        };
        if let Err(err) = form.validate_step(self.current, draft) {
            tracing::debug!(step = ?self.current, error = %err, "next blocked");
            return NavigationEvent::Blocked(err);
        }
        self.move_to(target)
    }

    pub fn back<D>(&mut self, draft: &D) -> NavigationEvent<S>
    where
        S: StepKind<D>,
    {
        let steps = compute_steps::<D, S>(draft);
        match steps.iter().position(|step| *step == self.current) {
            Some(index) if index > 0 => self.move_to(steps[index - 1]),
            _ => NavigationEvent::Repeat,
        }
    }

    /// Keeps the current step valid after a draft mutation.
    ///
    /// When the current step no longer applies, the navigator falls back to
    /// the nearest applicable step declared before it, or to the first
    /// applicable step if none precedes it. Returns the new step if it moved.
    pub fn reconcile<D>(&mut self, draft: &D) -> Option<S>
    where
        S: StepKind<D>,
    {
        if self.current.is_applicable(draft) {
            return None;
        }
        let before = declaration_index::<D, S>(self.current);
        let fallback = S::all()[..before]
            .iter()
            .rev()
            .copied()
            .find(|step| step.is_applicable(draft))
            .or_else(|| compute_steps::<D, S>(draft).first().copied())?;
        tracing::debug!(from = ?self.current, to = ?fallback, "step no longer applies");
        self.current = fallback;
        Some(fallback)
    }

    pub fn reset<D>(&mut self, draft: &D)
    where
        S: StepKind<D>,
    {
        if let Some(first) = compute_steps::<D, S>(draft).first() {
            self.current = *first;
        }
    }

    fn move_to(&mut self, target: S) -> NavigationEvent<S> {
        let from = self.current;
        self.current = target;
        tracing::debug!(?from, to = ?target, "step changed");
        NavigationEvent::Moved { from, to: target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::field::{FieldDescriptor, FieldKind, Validator};
    use crate::wizard::step::fixtures::{TripDraft, TripStep};

    struct TripForm;

    impl StepForm for TripForm {
        type Draft = TripDraft;
        type Step = TripStep;

        fn fields(&self, step: TripStep, _draft: &TripDraft) -> Vec<FieldDescriptor> {
            match step {
                TripStep::Name => vec![FieldDescriptor::new(
                    "name",
                    "Name",
                    FieldKind::Text,
                    Validator::NonEmpty,
                )],
                TripStep::ForWhom => vec![FieldDescriptor::new(
                    "for_self",
                    "For yourself?",
                    FieldKind::Boolean,
                    Validator::None,
                )],
                _ => Vec::new(),
            }
        }

        fn read(&self, _step: TripStep, draft: &TripDraft, key: &str) -> Option<String> {
            match key {
                "name" => Some(draft.name.clone()),
                "for_self" => draft.for_self.map(|value| value.to_string()),
                _ => None,
            }
        }

        fn bind(
            &self,
            _step: TripStep,
            draft: &mut TripDraft,
            key: &str,
            value: &str,
        ) -> Result<(), ValidationError> {
            match key {
                "name" => draft.name = value.to_string(),
                "for_self" => draft.for_self = Some(value == "true"),
                _ => return Err(ValidationError::new("unknown field")),
            }
            Ok(())
        }
    }

    fn filled(for_self: Option<bool>) -> TripDraft {
        TripDraft {
            name: "Trainingslager".into(),
            for_self,
            ..TripDraft::default()
        }
    }

    fn walk_to(nav: &mut Navigator<TripStep>, draft: &TripDraft, target: TripStep) {
        while nav.current() != target {
            assert!(matches!(
                nav.next(&TripForm, draft),
                NavigationEvent::Moved { .. }
            ));
        }
    }

    #[test]
    fn next_is_blocked_by_step_validation() {
        let draft = TripDraft::default();
        let mut nav = Navigator::<TripStep>::start(&draft).unwrap();
        assert_eq!(
            nav.next(&TripForm, &draft),
            NavigationEvent::Blocked(ValidationError::required("Name"))
        );
        assert_eq!(nav.current(), TripStep::Name);
    }

    #[test]
    fn skip_is_symmetric_between_next_and_back() {
        let draft = filled(Some(true));
        let mut nav = Navigator::<TripStep>::start(&draft).unwrap();
        walk_to(&mut nav, &draft, TripStep::ForWhom);

        assert_eq!(
            nav.next(&TripForm, &draft),
            NavigationEvent::Moved {
                from: TripStep::ForWhom,
                to: TripStep::Notes
            }
        );
        assert_eq!(
            nav.back(&draft),
            NavigationEvent::Moved {
                from: TripStep::Notes,
                to: TripStep::ForWhom
            }
        );
    }

    #[test]
    fn edges_repeat() {
        let draft = filled(Some(true));
        let mut nav = Navigator::<TripStep>::start(&draft).unwrap();
        assert_eq!(nav.back(&draft), NavigationEvent::Repeat);
        walk_to(&mut nav, &draft, TripStep::Review);
        assert_eq!(nav.next(&TripForm, &draft), NavigationEvent::Repeat);
    }

    #[test]
    fn finish_only_on_last_applicable_step() {
        let draft = filled(Some(false));
        let mut nav = Navigator::<TripStep>::start(&draft).unwrap();
        loop {
            let position = nav.position(&draft);
            assert_eq!(nav.can_finish(&draft), position.current_index == position.total - 1);
            if nav.next(&TripForm, &draft) == NavigationEvent::Repeat {
                break;
            }
        }
        assert_eq!(nav.current(), TripStep::Review);
        assert_eq!(nav.position(&draft).to_string(), "Step 5 of 5");
    }

    #[test]
    fn reconcile_falls_back_to_nearest_preceding_step() {
        let mut draft = filled(Some(false));
        let mut nav = Navigator::<TripStep>::start(&draft).unwrap();
        walk_to(&mut nav, &draft, TripStep::Guest);

        draft.for_self = Some(true);
        assert_eq!(nav.reconcile(&draft), Some(TripStep::ForWhom));
        assert_eq!(nav.position(&draft).current_index, 1);
        assert_eq!(nav.reconcile(&draft), None);
    }
}
