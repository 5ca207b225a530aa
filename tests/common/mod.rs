#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use club_core::{
    device::{Camera, DeviceError, StreamHandle},
    domain::{Address, Bootcamp, Member, NewBootcamp, NewMember, NewTeam, Role, Team},
    notify::{Notification, Notifier, NotifyError},
    storage::{DocumentStore, Filter, MemoryStore, Record, Repository, StoreError, StoreResult},
    wizards::Services,
};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Records every notification and rejects the addresses it was told to.
#[derive(Default)]
pub struct RecordingNotifier {
    rejected: Vec<String>,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            rejected: addresses.iter().map(|address| address.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.rejected.contains(&notification.to) {
            return Err(NotifyError::Rejected(notification.to.clone()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Memory store whose first `failures` creates report the store as unavailable.
/// [`FlakyStore::fail_write`] additionally arms a single failure on a later
/// create or update.
pub struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicUsize,
    writes: AtomicUsize,
    fail_at: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(failures),
            writes: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(0),
        }
    }

    /// The `nth` write from now on (1-based) fails once.
    pub fn fail_write(&self, nth: usize) {
        let at = self.writes.load(Ordering::SeqCst) + nth;
        self.fail_at.store(at, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write_attempt(&self) -> StoreResult<()> {
        let count = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .fail_at
            .compare_exchange(count, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.write_attempt()?;
        self.inner.create(collection, fields).await
    }

    async fn update(&self, collection: &str, record: Record) -> StoreResult<Record> {
        self.write_attempt()?;
        self.inner.update(collection, record).await
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        self.inner.get(collection, id).await
    }

    async fn fetch(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Record>> {
        self.inner.fetch(collection, filter).await
    }
}

/// Camera that counts acquisitions and releases.
#[derive(Default)]
pub struct CountingCamera {
    pub deny: bool,
    pub fail_capture: AtomicBool,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl CountingCamera {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for CountingCamera {
    async fn acquire(&self) -> Result<StreamHandle, DeviceError> {
        if self.deny {
            return Err(DeviceError::CameraDenied);
        }
        let id = self.acquired.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(StreamHandle { id })
    }

    async fn capture(&self, _stream: &StreamHandle) -> Result<Vec<u8>, DeviceError> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(DeviceError::Unavailable("sensor error".into()));
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    fn release(&self, _stream: StreamHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn services_with(repo: Repository, notifier: Arc<RecordingNotifier>) -> Services {
    let mut services = Services::new(repo, notifier);
    services.club_name = "FC Example".into();
    services.treasurer_email = Some("kasse@example.org".into());
    services
}

pub fn memory_services() -> (Services, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (services_with(Repository::memory(), notifier.clone()), notifier)
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub async fn seed_member(repo: &Repository, first: &str, last: &str, roles: &[Role]) -> Member {
    let payload = NewMember {
        first_name: first.into(),
        last_name: last.into(),
        email: format!("{}@example.org", first.to_lowercase()),
        phone: None,
        birth_date: None,
        address: Address {
            street: "Hauptstrasse 1".into(),
            zip: "3000".into(),
            city: "Bern".into(),
        },
        roles: roles.to_vec(),
        team_ids: Vec::new(),
        avatar: None,
        joined_on: date("2024-08-01"),
    };
    repo.create::<Member>(&payload).await.unwrap()
}

pub async fn seed_team(repo: &Repository, name: &str, coach_ids: Vec<Uuid>) -> Team {
    let payload = NewTeam {
        name: name.into(),
        league: None,
        season: "2025/26".into(),
        coach_ids,
        player_ids: Vec::new(),
    };
    repo.create::<Team>(&payload).await.unwrap()
}

pub async fn seed_camp(repo: &Repository, name: &str, capacity: u32) -> Bootcamp {
    let payload = NewBootcamp {
        name: name.into(),
        location: "Tenero".into(),
        starts_on: date("2026-07-06"),
        ends_on: date("2026-07-10"),
        capacity,
        participant_ids: Vec::new(),
    };
    repo.create::<Bootcamp>(&payload).await.unwrap()
}
