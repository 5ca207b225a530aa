use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Member, NewTeam, Role, Team};
use crate::errors::{CommitError, StoreError};
use crate::notify::{fan_out, Notification};
use crate::storage::Filter;
use crate::wizard::field::non_blank;
use crate::wizard::{
    make_multi_choice_validator, ChoiceMapper, CommitCheckpoint, CommitReport, FieldDescriptor,
    FieldKind, StepForm, StepKind, ValidationError, Validator, WizardFlow,
};

use super::{entity_choices, season_for, today, Services};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamDraft {
    pub name: String,
    pub league: String,
    pub season: String,
    pub coach_ids: Vec<Uuid>,
    pub player_ids: Vec<Uuid>,
    /// Narrows the player list; never persisted.
    pub search: String,
}

impl TeamDraft {
    pub fn to_payload(&self) -> Result<NewTeam, ValidationError> {
        Ok(NewTeam {
            name: non_blank(&self.name).ok_or_else(|| ValidationError::required("Team name"))?,
            league: non_blank(&self.league),
            season: non_blank(&self.season).ok_or_else(|| ValidationError::required("Season"))?,
            coach_ids: dedup(&self.coach_ids),
            player_ids: dedup(&self.player_ids),
        })
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamStep {
    Details,
    Coaches,
    Players,
    Review,
}

impl StepKind<TeamDraft> for TeamStep {
    fn all() -> &'static [Self] {
        &[
            TeamStep::Details,
            TeamStep::Coaches,
            TeamStep::Players,
            TeamStep::Review,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            TeamStep::Details => "details",
            TeamStep::Coaches => "coaches",
            TeamStep::Players => "players",
            TeamStep::Review => "review",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TeamStep::Details => "Team details",
            TeamStep::Coaches => "Coaches",
            TeamStep::Players => "Players",
            TeamStep::Review => "Review",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            TeamStep::Details => "🏷",
            TeamStep::Coaches => "📋",
            TeamStep::Players => "⚽",
            TeamStep::Review => "✔",
        }
    }
}

/// Creates a team and links its coaches and players to it.
pub struct CreateTeamWizard {
    services: Services,
    members: Vec<Member>,
    coach_choices: ChoiceMapper<Uuid>,
    /// Every member, so a player keeps the same number whatever the search.
    player_choices: ChoiceMapper<Uuid>,
}

impl CreateTeamWizard {
    pub fn new(services: Services, members: Vec<Member>) -> Self {
        let trainers: Vec<Member> = members
            .iter()
            .filter(|member| member.has_role(Role::Trainer))
            .cloned()
            .collect();
        // Any member may coach when nobody holds the trainer role yet.
        let coach_choices = if trainers.is_empty() {
            entity_choices(&members)
        } else {
            entity_choices(&trainers)
        };
        Self {
            services,
            player_choices: entity_choices(&members),
            members,
            coach_choices,
        }
    }

    pub async fn load(services: Services) -> Result<Self, StoreError> {
        let members = services.repo.list::<Member>(&Filter::All).await?;
        Ok(Self::new(services, members))
    }

    /// Members matching the draft's search term.
    fn visible_players(&self, draft: &TeamDraft) -> Vec<Uuid> {
        let needle = draft.search.trim().to_lowercase();
        self.members
            .iter()
            .filter(|member| needle.is_empty() || member.full_name().to_lowercase().contains(&needle))
            .map(|member| member.id)
            .collect()
    }
}

impl StepForm for CreateTeamWizard {
    type Draft = TeamDraft;
    type Step = TeamStep;

    fn initial_draft(&self) -> TeamDraft {
        TeamDraft {
            season: season_for(today()),
            ..TeamDraft::default()
        }
    }

    fn fields(&self, step: TeamStep, draft: &TeamDraft) -> Vec<FieldDescriptor> {
        match step {
            TeamStep::Details => vec![
                FieldDescriptor::new("name", "Team name", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("league", "League", FieldKind::Text, Validator::None)
                    .with_optional(),
                FieldDescriptor::new("season", "Season", FieldKind::Text, Validator::NonEmpty)
                    .with_help("e.g. 2025/26"),
            ],
            TeamStep::Coaches => vec![FieldDescriptor::new(
                "coach_ids",
                "Coaches",
                FieldKind::MultiChoice(self.coach_choices.options()),
                make_multi_choice_validator(&self.coach_choices, "coach"),
            )
            .with_optional()],
            TeamStep::Players => {
                let options = self
                    .visible_players(draft)
                    .iter()
                    .filter_map(|id| self.player_choices.display_for_value(id))
                    .collect();
                vec![
                    FieldDescriptor::new("search", "Search", FieldKind::Text, Validator::None)
                        .with_optional()
                        .with_help("Filters the player list by name"),
                    FieldDescriptor::new(
                        "player_ids",
                        "Players",
                        FieldKind::MultiChoice(options),
                        make_multi_choice_validator(&self.player_choices, "player"),
                    )
                    .with_optional()
                    .with_help("Players hidden by the search stay selected"),
                ]
            }
            TeamStep::Review => Vec::new(),
        }
    }

    fn read(&self, _step: TeamStep, draft: &TeamDraft, key: &str) -> Option<String> {
        match key {
            "name" => Some(draft.name.clone()),
            "league" => Some(draft.league.clone()),
            "season" => Some(draft.season.clone()),
            "search" => Some(draft.search.clone()),
            "coach_ids" => self.coach_choices.display_for_values(&draft.coach_ids),
            "player_ids" => self.player_choices.display_for_values(&draft.player_ids),
            _ => None,
        }
    }

    fn bind(
        &self,
        _step: TeamStep,
        draft: &mut TeamDraft,
        key: &str,
        value: &str,
    ) -> Result<(), ValidationError> {
        match key {
            "name" => draft.name = value.to_string(),
            "league" => draft.league = value.to_string(),
            "season" => draft.season = value.to_string(),
            "search" => draft.search = value.to_string(),
            "coach_ids" => draft.coach_ids = self.coach_choices.values_for_list(value),
            "player_ids" => {
                let visible = self.visible_players(draft);
                let mut selected: Vec<Uuid> = draft
                    .player_ids
                    .iter()
                    .copied()
                    .filter(|id| !visible.contains(id))
                    .collect();
                selected.extend(self.player_choices.values_for_list(value));
                draft.player_ids = dedup(&selected);
            }
            other => return Err(ValidationError::new(format!("Unknown field `{}`", other))),
        }
        Ok(())
    }
}

#[async_trait]
impl WizardFlow for CreateTeamWizard {
    type Output = Team;

    fn collection(&self) -> &'static str {
        "teams"
    }

    fn headline(&self, team: &Team) -> String {
        format!("Team {} created", team.name)
    }

    async fn commit(
        &self,
        draft: &TeamDraft,
        checkpoint: &mut CommitCheckpoint,
    ) -> Result<CommitReport<Team>, CommitError> {
        let payload = draft.to_payload()?;
        let repo = &self.services.repo;

        let member_ids = dedup(
            &payload
                .coach_ids
                .iter()
                .chain(payload.player_ids.iter())
                .copied()
                .collect::<Vec<_>>(),
        );
        let resolved: Vec<Member> = self.services.resolve_all(&member_ids).await?;

        let team: Team = checkpoint
            .persist("team", || repo.create::<Team>(&payload))
            .await?;

        let mut members = Vec::with_capacity(resolved.len());
        for mut member in resolved {
            if member.join_team(team.id) {
                let key = format!("member:{}", member.id);
                member = checkpoint.persist(&key, || repo.update(&member)).await?;
            }
            members.push(member);
        }

        let batch = members
            .iter()
            .map(|member| {
                let role = if team.coach_ids.contains(&member.id) {
                    "coach"
                } else {
                    "player"
                };
                Notification::new(
                    member.email.clone(),
                    format!("You were added to {}", team.name),
                    format!(
                        "Hello {},\n\nyou are now listed as {} of {} for the {} season.\n\n{}",
                        member.first_name,
                        role,
                        team.name,
                        team.season,
                        self.services.club_name
                    ),
                )
            })
            .collect();

        let notifications = fan_out(self.services.notifier.as_ref(), batch).await;
        tracing::info!(team = %team.id, members = members.len(), "team created");
        Ok(CommitReport::new(team, notifications))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use chrono::NaiveDate;

    fn member(first: &str, last: &str, roles: Vec<Role>) -> Member {
        Member {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: last.into(),
            email: format!("{}@example.org", first.to_lowercase()),
            phone: None,
            birth_date: None,
            address: Address::default(),
            roles,
            team_ids: Vec::new(),
            avatar: None,
            joined_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn search_narrows_players_and_keeps_hidden_selection() {
        let anna = member("Anna", "Frei", vec![Role::Spieler]);
        let beat = member("Beat", "Graf", vec![Role::Spieler]);
        let wizard = CreateTeamWizard::new(Services::in_memory(), vec![anna.clone(), beat.clone()]);

        let mut draft = wizard.initial_draft();
        wizard
            .bind(TeamStep::Players, &mut draft, "player_ids", "Anna Frei")
            .unwrap();
        wizard
            .bind(TeamStep::Players, &mut draft, "search", "graf")
            .unwrap();

        let fields = wizard.fields(TeamStep::Players, &draft);
        match &fields[1].kind {
            FieldKind::MultiChoice(options) => assert_eq!(options, &vec!["[2] Beat Graf".to_string()]),
            other => panic!("unexpected kind {:?}", other),
        }

        wizard
            .bind(TeamStep::Players, &mut draft, "player_ids", "2")
            .unwrap();
        assert_eq!(draft.player_ids, vec![anna.id, beat.id]);
    }

    #[test]
    fn shown_selection_can_be_typed_back_in() {
        let coach = member("Carla", "Huber", vec![Role::Trainer]);
        let anna = member("Anna", "Frei", vec![Role::Spieler]);
        let beat = member("Beat", "Graf", vec![Role::Spieler]);
        let wizard = CreateTeamWizard::new(
            Services::in_memory(),
            vec![coach.clone(), anna.clone(), beat.clone()],
        );
        let mut draft = wizard.initial_draft();
        wizard
            .bind(TeamStep::Coaches, &mut draft, "coach_ids", "Carla Huber")
            .unwrap();
        wizard
            .bind(TeamStep::Players, &mut draft, "player_ids", "3, 2")
            .unwrap();

        let coaches = wizard.read(TeamStep::Coaches, &draft, "coach_ids").unwrap();
        assert_eq!(coaches, "[1] Carla Huber");
        let players = wizard.read(TeamStep::Players, &draft, "player_ids").unwrap();
        assert_eq!(players, "[3] Beat Graf, [2] Anna Frei");

        let field = &wizard.fields(TeamStep::Players, &draft)[1];
        let normalised = field.validate(&players).unwrap();
        let mut again = wizard.initial_draft();
        wizard
            .bind(TeamStep::Players, &mut again, "player_ids", &normalised)
            .unwrap();
        assert_eq!(again.player_ids, draft.player_ids);
    }

    #[test]
    fn coaches_are_limited_to_trainers() {
        let coach = member("Carla", "Huber", vec![Role::Trainer]);
        let player = member("Dario", "Iten", vec![Role::Spieler]);
        let wizard = CreateTeamWizard::new(Services::in_memory(), vec![coach, player]);
        let fields = wizard.fields(TeamStep::Coaches, &TeamDraft::default());
        assert_eq!(
            fields[0].kind,
            FieldKind::MultiChoice(vec!["[1] Carla Huber".to_string()])
        );
    }

    #[test]
    fn initial_draft_has_a_season() {
        let wizard = CreateTeamWizard::new(Services::in_memory(), Vec::new());
        assert!(wizard.initial_draft().season.contains('/'));
        assert!(TeamDraft::default().to_payload().is_err());
    }
}
