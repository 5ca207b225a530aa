use std::fmt::Debug;

/// Closed set of steps for one wizard.
///
/// `all` lists every step in display order. A step is navigable while
/// `is_applicable` holds for the current draft; the predicate must depend on
/// the draft alone, never on the position.
pub trait StepKind<D>: Copy + Eq + Debug + Send + Sync + 'static {
    fn all() -> &'static [Self];

    fn key(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn icon(&self) -> &'static str {
        "•"
    }

    fn is_applicable(&self, _draft: &D) -> bool {
        true
    }
}

/// Applicable steps for `draft`, in declaration order.
pub fn compute_steps<D, S: StepKind<D>>(draft: &D) -> Vec<S> {
    S::all()
        .iter()
        .copied()
        .filter(|step| step.is_applicable(draft))
        .collect()
}

pub fn step_by_key<D, S: StepKind<D>>(key: &str) -> Option<S> {
    S::all().iter().copied().find(|step| step.key() == key)
}

/// Position of `step` in declaration order.
pub(crate) fn declaration_index<D, S: StepKind<D>>(step: S) -> usize {
    S::all()
        .iter()
        .position(|candidate| *candidate == step)
        .unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn steps_are_deterministic_and_in_declaration_order() {
        let draft = TripDraft {
            for_self: Some(false),
            ..TripDraft::default()
        };
        let first: Vec<TripStep> = compute_steps(&draft);
        let second: Vec<TripStep> = compute_steps(&draft);
        assert_eq!(first, second);
        assert_eq!(first, TripStep::all().to_vec());
    }

    #[test]
    fn guest_step_only_applies_when_not_for_self() {
        for for_self in [None, Some(true)] {
            let draft = TripDraft {
                for_self,
                ..TripDraft::default()
            };
            let steps: Vec<TripStep> = compute_steps(&draft);
            assert!(!steps.contains(&TripStep::Guest));
        }
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(
            step_by_key::<TripDraft, TripStep>("notes"),
            Some(TripStep::Notes)
        );
        assert_eq!(step_by_key::<TripDraft, TripStep>("missing"), None);
        assert_eq!(declaration_index::<TripDraft, _>(TripStep::Review), 4);
    }
}
