//! Concrete wizards for the club's entities.

pub mod bootcamp;
pub mod expense;
pub mod member;
pub mod team;

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use uuid::Uuid;

use crate::config::Config;
use crate::device::DataUri;
use crate::domain::{Displayable, Persisted};
use crate::errors::CommitError;
use crate::notify::{LogNotifier, Notifier};
use crate::storage::Repository;
use crate::wizard::{ChoiceMapper, Validator};

pub use bootcamp::{BootcampRegistrationWizard, RegistrationDraft, RegistrationReceipt};
pub use expense::{ExpenseDraft, ExpenseItemDraft, ExpenseWizard};
pub use member::{AddressDraft, CreateMemberWizard, MemberDraft};
pub use team::{CreateTeamWizard, TeamDraft};

/// Collaborators shared by every wizard.
#[derive(Clone)]
pub struct Services {
    pub repo: Repository,
    pub notifier: Arc<dyn Notifier>,
    pub club_name: String,
    pub treasurer_email: Option<String>,
}

impl Services {
    pub fn new(repo: Repository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            notifier,
            club_name: Config::default().club_name,
            treasurer_email: None,
        }
    }

    pub fn from_config(repo: Repository, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            repo,
            notifier,
            club_name: config.club_name.clone(),
            treasurer_email: config.treasurer_email.clone(),
        }
    }

    /// In-memory store with logged notifications.
    pub fn in_memory() -> Self {
        Self::new(Repository::memory(), Arc::new(LogNotifier))
    }

    /// Loads `id` at commit time so concurrent edits are picked up.
    pub(crate) async fn resolve<E: Persisted>(&self, id: Uuid) -> Result<E, CommitError> {
        self.repo
            .get::<E>(id)
            .await
            .map_err(CommitError::store(E::NOUN))?
            .ok_or_else(|| CommitError::MissingReference(format!("{} {}", E::NOUN, id)))
    }

    pub(crate) async fn resolve_all<E: Persisted>(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<E>, CommitError> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            resolved.push(self.resolve::<E>(*id).await?);
        }
        Ok(resolved)
    }
}

pub(crate) fn entity_choices<E: Persisted + Displayable>(entities: &[E]) -> ChoiceMapper<Uuid> {
    ChoiceMapper::from_pairs(
        entities
            .iter()
            .map(|entity| (entity.display_label(), entity.id()))
            .collect(),
    )
}

/// Accepts only data URIs; file paths go through the attach command.
pub(crate) fn data_uri_validator() -> Validator {
    Validator::Custom(Arc::new(|input| {
        DataUri::parse(input)
            .map(DataUri::into_string)
            .ok_or_else(|| "Attach a file or capture a photo instead of typing a value".to_string())
    }))
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Season label such as `2025/26`; seasons start in July.
pub fn season_for(date: NaiveDate) -> String {
    let start = if date.month() >= 7 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}/{:02}", start, (start + 1) % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_turn_over_in_july() {
        let june = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(season_for(june), "2024/25");
        assert_eq!(season_for(july), "2025/26");
        assert_eq!(
            season_for(NaiveDate::from_ymd_opt(2099, 8, 1).unwrap()),
            "2099/00"
        );
    }

    #[tokio::test]
    async fn missing_reference_names_the_entity() {
        let services = Services::in_memory();
        let err = services
            .resolve::<crate::domain::Team>(Uuid::nil())
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::MissingReference(ref what) if what.starts_with("team ")));
    }
}
