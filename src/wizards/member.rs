use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::device::DataUri;
use crate::domain::{Address, Member, NewMember, Role, Team};
use crate::errors::{CommitError, StoreError};
use crate::notify::{fan_out, Notification};
use crate::storage::Filter;
use crate::wizard::field::{non_blank, parse_date};
use crate::wizard::{
    make_multi_choice_validator, ChoiceMapper, CommitCheckpoint, CommitReport, FieldDescriptor,
    FieldKind, StepForm, StepKind, ValidationError, Validator, WizardFlow,
};

use super::{data_uri_validator, entity_choices, today, Services};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDraft {
    pub street: String,
    pub zip: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub address: AddressDraft,
    pub roles: Vec<Role>,
    pub team_ids: Vec<Uuid>,
    pub avatar: Option<DataUri>,
}

impl MemberDraft {
    pub fn needs_team(&self) -> bool {
        self.roles.iter().any(Role::needs_team)
    }

    /// Narrows the draft into a create payload. Team selections only count
    /// while a player or coach role is selected.
    pub fn to_payload(&self, joined_on: NaiveDate) -> Result<NewMember, ValidationError> {
        let first_name =
            non_blank(&self.first_name).ok_or_else(|| ValidationError::required("First name"))?;
        let last_name =
            non_blank(&self.last_name).ok_or_else(|| ValidationError::required("Last name"))?;
        let email = non_blank(&self.email).ok_or_else(|| ValidationError::required("Email"))?;
        if self.roles.is_empty() {
            return Err(ValidationError::new("Select at least one role"));
        }
        Ok(NewMember {
            first_name,
            last_name,
            email,
            phone: non_blank(&self.phone),
            birth_date: self.birth_date,
            address: Address {
                street: self.address.street.trim().to_string(),
                zip: self.address.zip.trim().to_string(),
                city: self.address.city.trim().to_string(),
            },
            roles: self.roles.clone(),
            team_ids: if self.needs_team() {
                self.team_ids.clone()
            } else {
                Vec::new()
            },
            avatar: self.avatar.clone().map(DataUri::into_string),
            joined_on,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStep {
    PersonalInfo,
    Address,
    Roles,
    TeamAssignment,
    Avatar,
    Review,
}

impl StepKind<MemberDraft> for MemberStep {
    fn all() -> &'static [Self] {
        &[
            MemberStep::PersonalInfo,
            MemberStep::Address,
            MemberStep::Roles,
            MemberStep::TeamAssignment,
            MemberStep::Avatar,
            MemberStep::Review,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            MemberStep::PersonalInfo => "personal",
            MemberStep::Address => "address",
            MemberStep::Roles => "roles",
            MemberStep::TeamAssignment => "teams",
            MemberStep::Avatar => "avatar",
            MemberStep::Review => "review",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MemberStep::PersonalInfo => "Personal information",
            MemberStep::Address => "Address",
            MemberStep::Roles => "Roles",
            MemberStep::TeamAssignment => "Team assignment",
            MemberStep::Avatar => "Profile picture",
            MemberStep::Review => "Review",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            MemberStep::PersonalInfo => "👤",
            MemberStep::Address => "🏠",
            MemberStep::Roles => "🎽",
            MemberStep::TeamAssignment => "⚽",
            MemberStep::Avatar => "📷",
            MemberStep::Review => "✔",
        }
    }

    fn is_applicable(&self, draft: &MemberDraft) -> bool {
        match self {
            MemberStep::TeamAssignment => draft.needs_team(),
            _ => true,
        }
    }
}

/// Creates a member, attaches them to the selected teams and welcomes them.
pub struct CreateMemberWizard {
    services: Services,
    teams: Vec<Team>,
    team_choices: ChoiceMapper<Uuid>,
    role_choices: ChoiceMapper<Role>,
}

impl CreateMemberWizard {
    pub fn new(services: Services, teams: Vec<Team>) -> Self {
        let team_choices = entity_choices(&teams);
        let role_choices = ChoiceMapper::from_pairs(
            Role::ALL
                .iter()
                .map(|role| (role.label().to_string(), *role))
                .collect(),
        );
        Self {
            services,
            teams,
            team_choices,
            role_choices,
        }
    }

    /// Opens the wizard with the current team catalogue as its choice list.
    pub async fn load(services: Services) -> Result<Self, StoreError> {
        let teams = services.repo.list::<Team>(&Filter::All).await?;
        Ok(Self::new(services, teams))
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    fn team_notifications(&self, member: &Member, team: &Team, coaches: &[Member]) -> Vec<Notification> {
        let role = if member.has_role(Role::Trainer) && !member.has_role(Role::Spieler) {
            "coach"
        } else {
            "player"
        };
        team.coach_ids
            .iter()
            .filter(|id| **id != member.id)
            .filter_map(|id| coaches.iter().find(|coach| coach.id == *id))
            .map(|coach| {
                Notification::new(
                    coach.email.clone(),
                    format!("New {} in {}", role, team.name),
                    format!(
                        "Hello {},\n\n{} joined {} as {}.\n\n{}",
                        coach.first_name,
                        member.full_name(),
                        team.name,
                        role,
                        self.services.club_name
                    ),
                )
            })
            .collect()
    }
}

impl StepForm for CreateMemberWizard {
    type Draft = MemberDraft;
    type Step = MemberStep;

    fn fields(&self, step: MemberStep, _draft: &MemberDraft) -> Vec<FieldDescriptor> {
        match step {
            MemberStep::PersonalInfo => vec![
                FieldDescriptor::new("first_name", "First name", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("last_name", "Last name", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("email", "Email", FieldKind::Text, Validator::Email),
                FieldDescriptor::new("phone", "Phone", FieldKind::Text, Validator::None)
                    .with_optional(),
                FieldDescriptor::new("birth_date", "Birth date", FieldKind::Date, Validator::None)
                    .with_optional()
                    .with_help("YYYY-MM-DD or DD.MM.YYYY"),
            ],
            MemberStep::Address => vec![
                FieldDescriptor::new("address.street", "Street", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("address.zip", "ZIP", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("address.city", "City", FieldKind::Text, Validator::NonEmpty),
            ],
            MemberStep::Roles => vec![FieldDescriptor::new(
                "roles",
                "Roles",
                FieldKind::MultiChoice(self.role_choices.options()),
                make_multi_choice_validator(&self.role_choices, "role"),
            )
            .with_help("Comma-separated, e.g. `Spieler, Helfer`")],
            MemberStep::TeamAssignment => {
                let field = FieldDescriptor::new(
                    "team_ids",
                    "Teams",
                    FieldKind::MultiChoice(self.team_choices.options()),
                    make_multi_choice_validator(&self.team_choices, "team"),
                );
                // Nothing to pick from in a club without teams.
                if self.team_choices.is_empty() {
                    vec![field.with_optional()]
                } else {
                    vec![field]
                }
            }
            MemberStep::Avatar => vec![FieldDescriptor::new(
                "avatar",
                "Picture",
                FieldKind::Attachment,
                data_uri_validator(),
            )
            .with_optional()],
            MemberStep::Review => Vec::new(),
        }
    }

    fn read(&self, _step: MemberStep, draft: &MemberDraft, key: &str) -> Option<String> {
        match key {
            "first_name" => Some(draft.first_name.clone()),
            "last_name" => Some(draft.last_name.clone()),
            "email" => Some(draft.email.clone()),
            "phone" => Some(draft.phone.clone()),
            "birth_date" => draft.birth_date.map(|date| date.to_string()),
            "address.street" => Some(draft.address.street.clone()),
            "address.zip" => Some(draft.address.zip.clone()),
            "address.city" => Some(draft.address.city.clone()),
            "roles" => {
                let labels: Vec<&str> = draft.roles.iter().map(Role::label).collect();
                Some(labels.join(", "))
            }
            "team_ids" => self.team_choices.display_for_values(&draft.team_ids),
            "avatar" => draft.avatar.as_ref().map(ToString::to_string),
            _ => None,
        }
    }

    fn bind(
        &self,
        _step: MemberStep,
        draft: &mut MemberDraft,
        key: &str,
        value: &str,
    ) -> Result<(), ValidationError> {
        match key {
            "first_name" => draft.first_name = value.to_string(),
            "last_name" => draft.last_name = value.to_string(),
            "email" => draft.email = value.to_string(),
            "phone" => draft.phone = value.to_string(),
            "birth_date" => draft.birth_date = parse_date(value),
            "address.street" => draft.address.street = value.to_string(),
            "address.zip" => draft.address.zip = value.to_string(),
            "address.city" => draft.address.city = value.to_string(),
            "roles" => draft.roles = self.role_choices.values_for_list(value),
            "team_ids" => draft.team_ids = self.team_choices.values_for_list(value),
            "avatar" => draft.avatar = DataUri::parse(value),
            other => return Err(ValidationError::new(format!("Unknown field `{}`", other))),
        }
        Ok(())
    }
}

#[async_trait]
impl WizardFlow for CreateMemberWizard {
    type Output = Member;

    fn collection(&self) -> &'static str {
        "members"
    }

    fn headline(&self, member: &Member) -> String {
        format!("Member {} created", member.full_name())
    }

    async fn commit(
        &self,
        draft: &MemberDraft,
        checkpoint: &mut CommitCheckpoint,
    ) -> Result<CommitReport<Member>, CommitError> {
        let payload = draft.to_payload(today())?;
        let repo = &self.services.repo;

        // Teams are read now rather than when they were picked.
        let resolved: Vec<Team> = self.services.resolve_all(&payload.team_ids).await?;
        let member: Member = checkpoint
            .persist("member", || repo.create::<Member>(&payload))
            .await?;

        let mut teams = Vec::with_capacity(resolved.len());
        for mut team in resolved {
            if member.has_role(Role::Spieler) {
                team.add_player(member.id);
            }
            if member.has_role(Role::Trainer) {
                team.add_coach(member.id);
            }
            let key = format!("team:{}", team.id);
            teams.push(checkpoint.persist(&key, || repo.update(&team)).await?);
        }

        let coach_ids: Vec<Uuid> = teams
            .iter()
            .flat_map(|team| team.coach_ids.iter().copied())
            .filter(|id| *id != member.id)
            .collect();
        let coaches = if coach_ids.is_empty() {
            Vec::new()
        } else {
            repo.list::<Member>(&Filter::Ids(coach_ids))
                .await
                .map_err(CommitError::store("member"))?
        };

        let mut batch = vec![Notification::new(
            member.email.clone(),
            format!("Welcome to {}", self.services.club_name),
            format!(
                "Hello {},\n\nyou are now registered as {} of {}.",
                member.first_name,
                member
                    .roles
                    .iter()
                    .map(Role::label)
                    .collect::<Vec<_>>()
                    .join(", "),
                self.services.club_name
            ),
        )];
        for team in &teams {
            batch.extend(self.team_notifications(&member, team, &coaches));
        }

        let notifications = fan_out(self.services.notifier.as_ref(), batch).await;
        tracing::info!(member = %member.id, teams = teams.len(), "member created");
        Ok(CommitReport::new(member, notifications))
    }
}
