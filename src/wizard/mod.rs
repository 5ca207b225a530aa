//! Headless stepped-draft wizard engine.
//!
//! A wizard is a typed draft, a closed set of steps whose applicability is a
//! pure function of that draft, a render contract that binds inputs into
//! the draft, and a commit that turns the finished draft into persisted
//! entities plus notifications. [`WizardSession`] ties these together.

pub mod commit;
pub mod draft;
pub mod field;
pub mod navigation;
pub mod render;
pub mod session;
pub mod step;

pub use commit::{CommitCheckpoint, CommitReport, WizardFlow};
pub use draft::DraftStore;
pub use field::{
    make_choice_validator, make_max_length_validator, make_multi_choice_validator, ChoiceMapper,
    FieldDescriptor, FieldKind, ValidationError, Validator,
};
pub use navigation::{NavigationEvent, Navigator, WizardPosition};
pub use render::{apply_input, render, FieldView, StepForm, StepView};
pub use session::WizardSession;
pub use step::{compute_steps, step_by_key, StepKind};

pub use crate::errors::SessionError;
