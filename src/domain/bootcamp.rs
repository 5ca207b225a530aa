use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// Create payload for a training camp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBootcamp {
    pub name: String,
    pub location: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub capacity: u32,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

/// A training camp members can register for, capped at `capacity` participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub capacity: u32,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

impl Bootcamp {
    pub fn remaining_places(&self) -> u32 {
        self.capacity
            .saturating_sub(self.participant_ids.len() as u32)
    }

    pub fn is_full(&self) -> bool {
        self.remaining_places() == 0
    }

    pub fn has_participant(&self, member_id: Uuid) -> bool {
        self.participant_ids.contains(&member_id)
    }
}

impl Identifiable for Bootcamp {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Bootcamp {
    fn display_label(&self) -> String {
        format!(
            "{} in {} ({} – {})",
            self.name, self.location, self.starts_on, self.ends_on
        )
    }
}

impl Persisted for Bootcamp {
    const COLLECTION: &'static str = "bootcamps";
    const NOUN: &'static str = "training camp";
    type Payload = NewBootcamp;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRegistration {
    pub bootcamp_id: Uuid,
    pub registered_by: Uuid,
    pub participant_id: Uuid,
    pub emergency_contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampRegistration {
    pub id: Uuid,
    pub bootcamp_id: Uuid,
    pub registered_by: Uuid,
    pub participant_id: Uuid,
    pub emergency_contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl BootcampRegistration {
    pub fn is_for_self(&self) -> bool {
        self.registered_by == self.participant_id
    }
}

impl Identifiable for BootcampRegistration {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Persisted for BootcampRegistration {
    const COLLECTION: &'static str = "bootcamp_registrations";
    const NOUN: &'static str = "registration";
    type Payload = NewRegistration;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_places_never_underflows() {
        let camp = Bootcamp {
            id: Uuid::new_v4(),
            name: "Sommerlager".into(),
            location: "Tenero".into(),
            starts_on: NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(),
            capacity: 1,
            participant_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert_eq!(camp.remaining_places(), 0);
        assert!(camp.is_full());
    }
}
