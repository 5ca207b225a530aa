use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTeam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    pub season: String,
    #[serde(default)]
    pub coach_ids: Vec<Uuid>,
    #[serde(default)]
    pub player_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    pub season: String,
    #[serde(default)]
    pub coach_ids: Vec<Uuid>,
    #[serde(default)]
    pub player_ids: Vec<Uuid>,
}

impl Team {
    pub fn add_player(&mut self, member_id: Uuid) -> bool {
        push_unique(&mut self.player_ids, member_id)
    }

    pub fn add_coach(&mut self, member_id: Uuid) -> bool {
        push_unique(&mut self.coach_ids, member_id)
    }

    pub fn has_member(&self, member_id: Uuid) -> bool {
        self.player_ids.contains(&member_id) || self.coach_ids.contains(&member_id)
    }
}

fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

impl Identifiable for Team {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Team {
    fn display_label(&self) -> String {
        match &self.league {
            Some(league) => format!("{} ({}, {})", self.name, league, self.season),
            None => format!("{} ({})", self.name, self.season),
        }
    }
}

impl Persisted for Team {
    const COLLECTION: &'static str = "teams";
    const NOUN: &'static str = "team";
    type Payload = NewTeam;
}
