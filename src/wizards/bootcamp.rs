use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Bootcamp, BootcampRegistration, Member, NewRegistration};
use crate::errors::{CommitError, StoreError};
use crate::notify::{fan_out, Notification};
use crate::storage::Filter;
use crate::wizard::field::{non_blank, parse_bool};
use crate::wizard::{
    make_choice_validator, make_max_length_validator, ChoiceMapper, CommitCheckpoint,
    CommitReport, FieldDescriptor, FieldKind, StepForm, StepKind, ValidationError, Validator,
    WizardFlow,
};

use super::{entity_choices, Services};

const NOTES_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub bootcamp_id: Option<Uuid>,
    /// `None` until the registrant has answered.
    pub for_self: Option<bool>,
    pub beneficiary_id: Option<Uuid>,
    pub emergency_contact: String,
    pub notes: String,
}

impl RegistrationDraft {
    /// Member who will attend: the registrant or the chosen beneficiary.
    pub fn participant(&self, actor: Uuid) -> Option<Uuid> {
        match self.for_self {
            Some(true) => Some(actor),
            Some(false) => self.beneficiary_id,
            None => None,
        }
    }

    pub fn to_payload(
        &self,
        actor: Uuid,
        registered_at: DateTime<Utc>,
    ) -> Result<NewRegistration, ValidationError> {
        let bootcamp_id = self
            .bootcamp_id
            .ok_or_else(|| ValidationError::new("Select a training camp"))?;
        let participant_id = match self.for_self {
            None => return Err(ValidationError::new("Choose who you are registering")),
            Some(_) => self
                .participant(actor)
                .ok_or_else(|| ValidationError::new("Select the member you are registering"))?,
        };
        Ok(NewRegistration {
            bootcamp_id,
            registered_by: actor,
            participant_id,
            emergency_contact: non_blank(&self.emergency_contact)
                .ok_or_else(|| ValidationError::required("Emergency contact"))?,
            notes: non_blank(&self.notes),
            registered_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Camp,
    ForWhom,
    Beneficiary,
    Details,
    Review,
}

impl StepKind<RegistrationDraft> for RegistrationStep {
    fn all() -> &'static [Self] {
        &[
            RegistrationStep::Camp,
            RegistrationStep::ForWhom,
            RegistrationStep::Beneficiary,
            RegistrationStep::Details,
            RegistrationStep::Review,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            RegistrationStep::Camp => "camp",
            RegistrationStep::ForWhom => "for_whom",
            RegistrationStep::Beneficiary => "beneficiary",
            RegistrationStep::Details => "details",
            RegistrationStep::Review => "review",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RegistrationStep::Camp => "Training camp",
            RegistrationStep::ForWhom => "Who attends",
            RegistrationStep::Beneficiary => "Participant",
            RegistrationStep::Details => "Details",
            RegistrationStep::Review => "Review",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            RegistrationStep::Camp => "⛺",
            RegistrationStep::ForWhom => "❓",
            RegistrationStep::Beneficiary => "👥",
            RegistrationStep::Details => "📝",
            RegistrationStep::Review => "✔",
        }
    }

    fn is_applicable(&self, draft: &RegistrationDraft) -> bool {
        match self {
            RegistrationStep::Beneficiary => draft.for_self == Some(false),
            _ => true,
        }
    }
}

/// What a registration commit produced.
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    pub registration: BootcampRegistration,
    pub bootcamp: Bootcamp,
    pub participant: Member,
}

/// Registers the acting member, or someone on their behalf, for a camp.
pub struct BootcampRegistrationWizard {
    services: Services,
    actor: Uuid,
    camp_choices: ChoiceMapper<Uuid>,
    beneficiary_choices: ChoiceMapper<Uuid>,
}

impl BootcampRegistrationWizard {
    pub fn new(services: Services, actor: Uuid, bootcamps: Vec<Bootcamp>, members: Vec<Member>) -> Self {
        let camp_choices = ChoiceMapper::from_pairs(
            bootcamps
                .iter()
                .map(|camp| {
                    (
                        format!("{} ({} places left)", camp.name, camp.remaining_places()),
                        camp.id,
                    )
                })
                .collect(),
        );
        let others: Vec<Member> = members
            .into_iter()
            .filter(|member| member.id != actor)
            .collect();
        Self {
            services,
            actor,
            beneficiary_choices: entity_choices(&others),
            camp_choices,
        }
    }

    pub async fn load(services: Services, actor: Uuid) -> Result<Self, StoreError> {
        let bootcamps = services.repo.list::<Bootcamp>(&Filter::All).await?;
        let members = services.repo.list::<Member>(&Filter::All).await?;
        Ok(Self::new(services, actor, bootcamps, members))
    }

    pub fn actor(&self) -> Uuid {
        self.actor
    }
}

impl StepForm for BootcampRegistrationWizard {
    type Draft = RegistrationDraft;
    type Step = RegistrationStep;

    fn fields(&self, step: RegistrationStep, _draft: &RegistrationDraft) -> Vec<FieldDescriptor> {
        match step {
            RegistrationStep::Camp => vec![FieldDescriptor::new(
                "bootcamp_id",
                "Training camp",
                FieldKind::Choice(self.camp_choices.options()),
                make_choice_validator(&self.camp_choices, "training camp"),
            )],
            RegistrationStep::ForWhom => vec![FieldDescriptor::new(
                "for_self",
                "Register yourself?",
                FieldKind::Boolean,
                Validator::None,
            )
            .with_help("Answer `no` to register another member")],
            RegistrationStep::Beneficiary => vec![FieldDescriptor::new(
                "beneficiary_id",
                "Participant",
                FieldKind::Choice(self.beneficiary_choices.options()),
                make_choice_validator(&self.beneficiary_choices, "member"),
            )],
            RegistrationStep::Details => vec![
                FieldDescriptor::new(
                    "emergency_contact",
                    "Emergency contact",
                    FieldKind::Text,
                    Validator::NonEmpty,
                )
                .with_help("Name and phone number"),
                FieldDescriptor::new(
                    "notes",
                    "Notes",
                    FieldKind::Text,
                    make_max_length_validator(NOTES_MAX_LEN),
                )
                .with_optional(),
            ],
            RegistrationStep::Review => Vec::new(),
        }
    }

    fn read(&self, _step: RegistrationStep, draft: &RegistrationDraft, key: &str) -> Option<String> {
        match key {
            "bootcamp_id" => draft
                .bootcamp_id
                .and_then(|id| self.camp_choices.display_for_value(&id)),
            "for_self" => draft
                .for_self
                .map(|value| if value { "yes" } else { "no" }.to_string()),
            "beneficiary_id" => draft
                .beneficiary_id
                .and_then(|id| self.beneficiary_choices.display_for_value(&id)),
            "emergency_contact" => Some(draft.emergency_contact.clone()),
            "notes" => Some(draft.notes.clone()),
            _ => None,
        }
    }

    fn bind(
        &self,
        _step: RegistrationStep,
        draft: &mut RegistrationDraft,
        key: &str,
        value: &str,
    ) -> Result<(), ValidationError> {
        match key {
            "bootcamp_id" => draft.bootcamp_id = self.camp_choices.value_for(value).copied(),
            "for_self" => draft.for_self = parse_bool(value),
            "beneficiary_id" => {
                draft.beneficiary_id = self.beneficiary_choices.value_for(value).copied()
            }
            "emergency_contact" => draft.emergency_contact = value.to_string(),
            "notes" => draft.notes = value.to_string(),
            other => return Err(ValidationError::new(format!("Unknown field `{}`", other))),
        }
        Ok(())
    }
}

#[async_trait]
impl WizardFlow for BootcampRegistrationWizard {
    type Output = RegistrationReceipt;

    fn collection(&self) -> &'static str {
        "bootcamp_registrations"
    }

    fn headline(&self, receipt: &RegistrationReceipt) -> String {
        format!(
            "{} registered for {}",
            receipt.participant.full_name(),
            receipt.bootcamp.name
        )
    }

    async fn commit(
        &self,
        draft: &RegistrationDraft,
        checkpoint: &mut CommitCheckpoint,
    ) -> Result<CommitReport<RegistrationReceipt>, CommitError> {
        let payload = draft.to_payload(self.actor, Utc::now())?;
        let repo = &self.services.repo;

        let mut bootcamp: Bootcamp = self.services.resolve(payload.bootcamp_id).await?;
        let registrant: Member = self.services.resolve(self.actor).await?;
        let participant: Member = if payload.participant_id == registrant.id {
            registrant.clone()
        } else {
            self.services.resolve(payload.participant_id).await?
        };

        // A registration saved by an earlier attempt already holds the place.
        if !checkpoint.contains("registration") {
            if bootcamp.has_participant(participant.id) {
                return Err(CommitError::Rejected(format!(
                    "{} is already registered for {}",
                    participant.full_name(),
                    bootcamp.name
                )));
            }
            if bootcamp.is_full() {
                return Err(CommitError::Rejected(format!(
                    "{} is fully booked",
                    bootcamp.name
                )));
            }
        }

        let registration: BootcampRegistration = checkpoint
            .persist("registration", || {
                repo.create::<BootcampRegistration>(&payload)
            })
            .await?;
        if !bootcamp.has_participant(participant.id) {
            bootcamp.participant_ids.push(participant.id);
        }
        let bootcamp = checkpoint
            .persist("bootcamp", || repo.update(&bootcamp))
            .await?;

        let mut batch = vec![Notification::new(
            registrant.email.clone(),
            format!("Registration for {}", bootcamp.name),
            format!(
                "Hello {},\n\n{} is registered for {} in {} ({} to {}).",
                registrant.first_name,
                if participant.id == registrant.id {
                    "you".to_string()
                } else {
                    participant.full_name()
                },
                bootcamp.name,
                bootcamp.location,
                bootcamp.starts_on,
                bootcamp.ends_on
            ),
        )];
        if participant.id != registrant.id {
            batch.push(Notification::new(
                participant.email.clone(),
                format!("You are registered for {}", bootcamp.name),
                format!(
                    "Hello {},\n\n{} registered you for {} in {} ({} to {}).",
                    participant.first_name,
                    registrant.full_name(),
                    bootcamp.name,
                    bootcamp.location,
                    bootcamp.starts_on,
                    bootcamp.ends_on
                ),
            ));
        }

        let notifications = fan_out(self.services.notifier.as_ref(), batch).await;
        tracing::info!(registration = %registration.id, bootcamp = %bootcamp.id, "registration saved");
        Ok(CommitReport::new(
            RegistrationReceipt {
                registration,
                bootcamp,
                participant,
            },
            notifications,
        ))
    }
}
