use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// Club functions a member can hold. Labels follow the club's own vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Spieler,
    Trainer,
    Vorstand,
    Helfer,
    Passivmitglied,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Spieler,
        Role::Trainer,
        Role::Vorstand,
        Role::Helfer,
        Role::Passivmitglied,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Spieler => "Spieler",
            Role::Trainer => "Trainer",
            Role::Vorstand => "Vorstand",
            Role::Helfer => "Helfer",
            Role::Passivmitglied => "Passivmitglied",
        }
    }

    /// Players and coaches are attached to teams; other functions are not.
    pub fn needs_team(&self) -> bool {
        matches!(self, Role::Spieler | Role::Trainer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    pub street: String,
    pub zip: String,
    pub city: String,
}

/// Create payload for a member; every field required by the schema is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub address: Address,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub joined_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub address: Address,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub joined_on: NaiveDate,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Records a team membership; returns `false` when it was already present.
    pub fn join_team(&mut self, team_id: Uuid) -> bool {
        if self.team_ids.contains(&team_id) {
            false
        } else {
            self.team_ids.push(team_id);
            true
        }
    }
}

impl Identifiable for Member {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Member {
    fn display_label(&self) -> String {
        self.full_name()
    }
}

impl Persisted for Member {
    const COLLECTION: &'static str = "members";
    const NOUN: &'static str = "member";
    type Payload = NewMember;
}
