use super::draft::DraftStore;
use super::field::{FieldDescriptor, ValidationError};
use super::navigation::WizardPosition;
use super::step::StepKind;

/// Render contract of a wizard: which inputs a step shows, how each one is
/// read from the draft and how a validated value is written back.
pub trait StepForm: Send + Sync {
    type Draft: Clone + Default + Send + Sync;
    type Step: StepKind<Self::Draft>;

    /// Draft a fresh session starts from.
    fn initial_draft(&self) -> Self::Draft {
        Self::Draft::default()
    }

    fn fields(&self, step: Self::Step, draft: &Self::Draft) -> Vec<FieldDescriptor>;

    /// Current display value of `key`, if any.
    fn read(&self, step: Self::Step, draft: &Self::Draft, key: &str) -> Option<String>;

    /// Writes an already-validated value. An empty value clears the field.
    fn bind(
        &self,
        step: Self::Step,
        draft: &mut Self::Draft,
        key: &str,
        value: &str,
    ) -> Result<(), ValidationError>;

    /// Guard for leaving `step` forward. Defaults to "every required field
    /// has a value".
    fn validate_step(&self, step: Self::Step, draft: &Self::Draft) -> Result<(), ValidationError> {
        for field in self.fields(step, draft) {
            if !field.required {
                continue;
            }
            let filled = self
                .read(step, draft, &field.key)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !filled {
                return Err(ValidationError::required(&field.label));
            }
        }
        Ok(())
    }

    /// Label/value lines shown on the closing review step.
    fn summary(&self, draft: &Self::Draft) -> Vec<(String, String)> {
        let mut lines = Vec::new();
        for step in super::step::compute_steps::<Self::Draft, Self::Step>(draft) {
            for field in self.fields(step, draft) {
                let value = self
                    .read(step, draft, &field.key)
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| "[unfilled]".to_string());
                lines.push((field.label, value));
            }
        }
        lines
    }
}

#[derive(Debug, Clone)]
pub struct FieldView {
    pub descriptor: FieldDescriptor,
    pub value: Option<String>,
}

/// Everything a front-end needs to draw the current step.
#[derive(Debug, Clone)]
pub struct StepView<S> {
    pub step: S,
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub position: WizardPosition,
    pub fields: Vec<FieldView>,
    pub can_back: bool,
    pub can_finish: bool,
}

impl<S> StepView<S> {
    pub fn field(&self, key: &str) -> Option<&FieldView> {
        self.fields.iter().find(|field| field.descriptor.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(|field| field.value.as_deref())
    }
}

pub fn render<F: StepForm>(
    form: &F,
    step: F::Step,
    draft: &F::Draft,
    position: WizardPosition,
) -> StepView<F::Step> {
    let fields = form
        .fields(step, draft)
        .into_iter()
        .map(|descriptor| {
            let value = form.read(step, draft, &descriptor.key);
            FieldView { descriptor, value }
        })
        .collect();
    StepView {
        step,
        key: step.key(),
        label: step.label(),
        icon: step.icon(),
        position,
        fields,
        can_back: !position.is_first(),
        can_finish: position.is_last(),
    }
}

/// Validates `raw` for field `key` of `step` and binds it into the draft.
/// On any error the draft is left as it was.
pub fn apply_input<F: StepForm>(
    form: &F,
    step: F::Step,
    store: &mut DraftStore<F::Draft>,
    key: &str,
    raw: &str,
) -> Result<(), ValidationError> {
    let descriptor = form
        .fields(step, store.get())
        .into_iter()
        .find(|field| field.key == key)
        .ok_or_else(|| ValidationError::new(format!("Unknown field `{}`", key)))?;
    let value = descriptor.validate(raw)?;
    store.try_set(|draft| form.bind(step, draft, key, &value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::field::{FieldKind, Validator};
    use crate::wizard::step::fixtures::{TripDraft, TripStep};

    struct NotesForm;

    impl StepForm for NotesForm {
        type Draft = TripDraft;
        type Step = TripStep;

        fn fields(&self, step: TripStep, _draft: &TripDraft) -> Vec<FieldDescriptor> {
            match step {
                TripStep::Notes => vec![FieldDescriptor::new(
                    "notes",
                    "Notes",
                    FieldKind::Text,
                    Validator::None,
                )
                .with_optional()],
                TripStep::Name => vec![FieldDescriptor::new(
                    "name",
                    "Name",
                    FieldKind::Text,
                    Validator::NonEmpty,
                )],
                _ => Vec::new(),
            }
        }

        fn read(&self, _step: TripStep, draft: &TripDraft, key: &str) -> Option<String> {
            match key {
                "notes" => Some(draft.notes.clone()),
                "name" => Some(draft.name.clone()),
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
                "notes" => draft.notes = value.to_string(),
                "name" => draft.name = value.to_string(),
                _ => unreachable!(),
            }
            Ok(())
        }
    }

    #[test]
    fn render_reads_values_from_draft() {
        let draft = TripDraft {
            notes: "Bring boots".into(),
            ..TripDraft::default()
        };
        let position = WizardPosition {
            current_index: 3,
            total: 4,
        };
        let view = render(&NotesForm, TripStep::Notes, &draft, position);
        assert_eq!(view.key, "notes");
        assert_eq!(view.value("notes"), Some("Bring boots"));
        assert!(view.can_back);
        assert!(!view.can_finish);
    }

    #[test]
    fn input_binds_valid_values_and_rejects_others() {
        let mut store = DraftStore::<TripDraft>::default();
        apply_input(&NotesForm, TripStep::Name, &mut store, "name", "  Lager ").unwrap();
        assert_eq!(store.get().name, "Lager");

        let err = apply_input(&NotesForm, TripStep::Name, &mut store, "name", " ").unwrap_err();
        assert_eq!(err, ValidationError::required("Name"));
        assert_eq!(store.get().name, "Lager");

        let err = apply_input(&NotesForm, TripStep::Name, &mut store, "notes", "x").unwrap_err();
        assert!(err.message.contains("Unknown field"));
    }

    #[test]
    fn summary_marks_unfilled_fields() {
        let draft = TripDraft {
            name: "Lager".into(),
            ..TripDraft::default()
        };
        let summary = NotesForm.summary(&draft);
        assert_eq!(
            summary,
            vec![
                ("Name".to_string(), "Lager".to_string()),
                ("Notes".to_string(), "[unfilled]".to_string()),
            ]
        );
    }
}
