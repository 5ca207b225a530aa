use std::sync::Arc;

use crate::device::{Camera, CameraSession, DataUri, DeviceError, PendingRead};
use crate::errors::SessionError;
use crate::notify::{Notice, NoticeSink};

use super::commit::{CommitCheckpoint, CommitReport, WizardFlow};
use super::draft::DraftStore;
use super::field::ValidationError;
use super::navigation::{NavigationEvent, Navigator, WizardPosition};
use super::render::{apply_input, render, StepForm, StepView};
use super::step::{compute_steps, StepKind};

/// One open wizard: the flow, its draft and position, an optional camera
/// session and the notice sink it reports to.
///
/// Every transition takes `&mut self`, so a commit in flight inside
/// [`WizardSession::finish`] cannot overlap with navigation or cancellation.
pub struct WizardSession<F: WizardFlow> {
    flow: F,
    store: DraftStore<F::Draft>,
    navigator: Navigator<F::Step>,
    sink: Arc<dyn NoticeSink>,
    camera: Option<CameraSession>,
    checkpoint: CommitCheckpoint,
    open: bool,
}

impl<F: WizardFlow> WizardSession<F> {
    pub fn new(flow: F, sink: Arc<dyn NoticeSink>) -> Result<Self, SessionError> {
        let draft = flow.initial_draft();
        Self::with_draft(flow, draft, sink)
    }

    /// Opens the wizard pre-populated with `draft`, e.g. from an existing entity.
    pub fn with_draft(
        flow: F,
        draft: F::Draft,
        sink: Arc<dyn NoticeSink>,
    ) -> Result<Self, SessionError> {
        let navigator = Navigator::start(&draft).ok_or(SessionError::NoSteps)?;
        Ok(Self {
            flow,
            store: DraftStore::new(draft),
            navigator,
            sink,
            camera: None,
            checkpoint: CommitCheckpoint::new(),
            open: true,
        })
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn draft(&self) -> &F::Draft {
        self.store.get()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Direct draft mutation; the position is reconciled afterwards.
    pub fn set_draft(&mut self, patch: impl FnOnce(&mut F::Draft)) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.store.set(patch);
        self.navigator.reconcile(self.store.get());
        Ok(())
    }

    pub fn steps(&self) -> Vec<F::Step> {
        compute_steps::<F::Draft, F::Step>(self.store.get())
    }

    pub fn current_step(&self) -> F::Step {
        self.navigator.current()
    }

    pub fn position(&self) -> WizardPosition {
        self.navigator.position(self.store.get())
    }

    pub fn can_finish(&self) -> bool {
        self.open && self.navigator.can_finish(self.store.get())
    }

    pub fn view(&self) -> StepView<F::Step> {
        render(
            &self.flow,
            self.navigator.current(),
            self.store.get(),
            self.position(),
        )
    }

    pub fn summary(&self) -> Vec<(String, String)> {
        self.flow.summary(self.store.get())
    }

    /// Validates and binds one field of the current step.
    pub fn input(&mut self, key: &str, raw: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let step = self.navigator.current();
        apply_input(&self.flow, step, &mut self.store, key, raw)?;
        self.navigator.reconcile(self.store.get());
        Ok(())
    }

    pub fn next(&mut self) -> Result<NavigationEvent<F::Step>, SessionError> {
        self.ensure_open()?;
        Ok(self.navigator.next(&self.flow, self.store.get()))
    }

    pub fn back(&mut self) -> Result<NavigationEvent<F::Step>, SessionError> {
        self.ensure_open()?;
        Ok(self.navigator.back(self.store.get()))
    }

    /// Commits the draft.
    ///
    /// On failure the draft and position stay exactly as they were and an
    /// error notice is emitted, so the same call can simply be retried. Writes
    /// that succeeded before the failure are remembered and not repeated. On
    /// success the camera is released, the draft and position are reset, the
    /// session closes and a refresh notice names the changed collection.
    pub async fn finish(&mut self) -> Result<CommitReport<F::Output>, SessionError> {
        self.ensure_open()?;
        if !self.navigator.can_finish(self.store.get()) {
            return Err(SessionError::NotAtLastStep);
        }
        self.flow
            .validate_step(self.navigator.current(), self.store.get())?;

        let report = match self.flow.commit(self.store.get(), &mut self.checkpoint).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(
                    collection = self.flow.collection(),
                    completed_writes = self.checkpoint.len(),
                    error = %err,
                    "commit failed"
                );
                let hint = if err.is_retryable() {
                    " Your entries were kept; try again."
                } else {
                    ""
                };
                self.sink.notify(Notice::error(format!("{}.{}", err, hint)));
                return Err(err.into());
            }
        };

        let headline = self.flow.headline(&report.output);
        tracing::info!(
            collection = self.flow.collection(),
            notifications = report.notifications.attempted(),
            failed = report.notifications.failed(),
            "wizard committed"
        );
        self.close();
        self.sink.notify(Notice::Refresh(self.flow.collection()));
        if report.is_partial() {
            self.sink
                .notify(Notice::warning(report.notifications.describe(&headline)));
        } else {
            self.sink.notify(Notice::success(headline));
        }
        Ok(report)
    }

    /// Discards the draft and position without committing.
    pub fn cancel(&mut self) {
        if !self.open {
            return;
        }
        tracing::debug!(collection = self.flow.collection(), "wizard cancelled");
        self.close();
    }

    pub fn camera_active(&self) -> bool {
        self.camera.is_some()
    }

    /// Acquires the camera. On failure no session is held and the wizard is
    /// otherwise unaffected.
    pub async fn open_camera(&mut self, camera: Arc<dyn Camera>) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.camera.is_some() {
            return Err(DeviceError::CameraBusy.into());
        }
        match CameraSession::open(camera).await {
            Ok(session) => {
                self.camera = Some(session);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera unavailable");
                self.sink.notify(Notice::error(format!("Camera: {}", err)));
                Err(err.into())
            }
        }
    }

    /// Captures one frame into attachment field `key` and releases the camera,
    /// whether or not the capture worked.
    pub async fn capture_into(&mut self, key: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let camera = self.camera.take().ok_or(DeviceError::NoCameraSession)?;
        let captured = camera.capture().await;
        camera.release();
        self.attach(key, captured?)
    }

    pub fn close_camera(&mut self) {
        if let Some(camera) = self.camera.take() {
            camera.release();
        }
    }

    /// Stores a data URI in attachment field `key`, wherever that field lives.
    /// Reads complete in the background, so the user may have navigated on.
    pub fn attach(&mut self, key: &str, uri: DataUri) -> Result<(), SessionError> {
        self.ensure_open()?;
        let step = self.step_owning(key).ok_or_else(|| {
            SessionError::Blocked(ValidationError::new(format!("Unknown field `{}`", key)))
        })?;
        apply_input(&self.flow, step, &mut self.store, key, uri.as_str())?;
        self.navigator.reconcile(self.store.get());
        Ok(())
    }

    pub async fn attach_pending(
        &mut self,
        key: &str,
        pending: PendingRead,
    ) -> Result<(), SessionError> {
        let uri = pending.wait().await?;
        self.attach(key, uri)
    }

    fn step_owning(&self, key: &str) -> Option<F::Step> {
        let draft = self.store.get();
        let owns = |step: &F::Step| {
            self.flow
                .fields(*step, draft)
                .iter()
                .any(|field| field.key == key)
        };
        let current = self.navigator.current();
        if owns(&current) {
            return Some(current);
        }
        <F::Step as StepKind<F::Draft>>::all()
            .iter()
            .copied()
            .find(|step| owns(step))
    }

    fn close(&mut self) {
        self.close_camera();
        self.checkpoint = CommitCheckpoint::new();
        self.store.reset(None);
        self.navigator.reset(self.store.get());
        self.open = false;
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CommitError, StoreError};
    use crate::notify::{CollectingSink, FanOutReport, NoticeLevel};
    use crate::wizard::field::{FieldDescriptor, FieldKind, Validator};
    use crate::wizard::step::fixtures::{TripDraft, TripStep};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct TripFlow {
        fail_commit: AtomicBool,
        commits: AtomicUsize,
    }

    impl StepForm for TripFlow {
        type Draft = TripDraft;
        type Step = TripStep;

        fn fields(&self, step: TripStep, _draft: &TripDraft) -> Vec<FieldDescriptor> {
            match step {
                TripStep::Name => vec![FieldDescriptor::new(
                    "name",
                    "Name",
                    FieldKind::Text,
                    Validator::NonEmpty,
                )],
                TripStep::ForWhom => vec![FieldDescriptor::new(
                    "for_self",
                    "For yourself?",
                    FieldKind::Boolean,
                    Validator::None,
                )],
                TripStep::Guest => vec![FieldDescriptor::new(
                    "guest",
                    "Guest",
                    FieldKind::Text,
                    Validator::NonEmpty,
                )],
                TripStep::Notes => vec![FieldDescriptor::new(
                    "ticket",
                    "Ticket",
                    FieldKind::Attachment,
                    Validator::None,
                )
                .with_optional()],
                TripStep::Review => Vec::new(),
            }
        }

        fn read(&self, _step: TripStep, draft: &TripDraft, key: &str) -> Option<String> {
            match key {
                "name" => Some(draft.name.clone()),
                "for_self" => draft.for_self.map(|value| value.to_string()),
                "guest" => Some(draft.guest.clone()),
                "ticket" => draft.ticket.clone(),
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
                "name" => draft.name = value.into(),
                "for_self" => draft.for_self = Some(value == "true"),
                "guest" => draft.guest = value.into(),
                "ticket" => draft.ticket = Some(value.into()),
                _ => return Err(ValidationError::new("unknown")),
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WizardFlow for TripFlow {
        type Output = String;

        fn collection(&self) -> &'static str {
            "trips"
        }

        fn headline(&self, output: &String) -> String {
            format!("Trip {} saved", output)
        }

        async fn commit(
            &self,
            draft: &TripDraft,
            _checkpoint: &mut CommitCheckpoint,
        ) -> Result<CommitReport<String>, CommitError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit.load(Ordering::SeqCst) {
                return Err(CommitError::store("trip")(StoreError::Unavailable(
                    "offline".into(),
                )));
            }
            Ok(CommitReport::new(draft.name.clone(), FanOutReport::default()))
        }
    }

    #[derive(Default)]
    struct FakeCamera {
        deny: bool,
        releases: AtomicUsize,
    }

    #[async_trait]
    impl Camera for FakeCamera {
        async fn acquire(&self) -> Result<crate::device::StreamHandle, DeviceError> {
            if self.deny {
                Err(DeviceError::CameraDenied)
            } else {
                Ok(crate::device::StreamHandle { id: 1 })
            }
        }

        async fn capture(
            &self,
            _stream: &crate::device::StreamHandle,
        ) -> Result<Vec<u8>, DeviceError> {
            Ok(vec![1, 2, 3])
        }

        fn release(&self, _stream: crate::device::StreamHandle) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session(sink: &CollectingSink) -> WizardSession<TripFlow> {
        WizardSession::new(TripFlow::default(), Arc::new(sink.clone())).unwrap()
    }

    fn fill_to_review(session: &mut WizardSession<TripFlow>) {
        session.input("name", "Trainingslager").unwrap();
        session.next().unwrap();
        session.input("for_self", "yes").unwrap();
        session.next().unwrap();
        session.next().unwrap();
        assert_eq!(session.current_step(), TripStep::Review);
    }

    #[tokio::test]
    async fn failed_commit_keeps_draft_and_position() {
        let sink = CollectingSink::new();
        let mut session = session(&sink);
        fill_to_review(&mut session);
        session.flow().fail_commit.store(true, Ordering::SeqCst);

        let before = (session.draft().clone(), session.position());
        let err = session.finish().await.unwrap_err();
        assert!(matches!(err, SessionError::Commit(_)));
        assert_eq!((session.draft().clone(), session.position()), before);
        assert!(session.is_open());
        assert_eq!(sink.messages(NoticeLevel::Error).len(), 1);

        session.flow().fail_commit.store(false, Ordering::SeqCst);
        let report = session.finish().await.unwrap();
        assert_eq!(report.output, "Trainingslager");
        assert!(!session.is_open());
        assert_eq!(session.draft(), &TripDraft::default());
        assert!(sink.notices().contains(&Notice::Refresh("trips")));
        assert_eq!(
            sink.messages(NoticeLevel::Success),
            vec!["Trip Trainingslager saved".to_string()]
        );
    }

    #[tokio::test]
    async fn finish_is_rejected_before_the_last_step() {
        let sink = CollectingSink::new();
        let mut session = session(&sink);
        session.input("name", "Lager").unwrap();
        assert!(!session.can_finish());
        assert!(matches!(
            session.finish().await,
            Err(SessionError::NotAtLastStep)
        ));
        assert_eq!(session.flow().commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_releases_camera_once_and_discards_draft() {
        let sink = CollectingSink::new();
        let camera = Arc::new(FakeCamera::default());
        let mut session = session(&sink);
        session.input("name", "Lager").unwrap();
        session.open_camera(camera.clone()).await.unwrap();

        session.cancel();
        session.cancel();
        drop(session);
        assert_eq!(camera.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capture_stores_frame_and_releases_camera() {
        let sink = CollectingSink::new();
        let camera = Arc::new(FakeCamera::default());
        let mut session = session(&sink);
        session.open_camera(camera.clone()).await.unwrap();
        assert!(matches!(
            session.open_camera(camera.clone()).await,
            Err(SessionError::Device(DeviceError::CameraBusy))
        ));

        session.capture_into("ticket").await.unwrap();
        assert!(!session.camera_active());
        assert_eq!(camera.releases.load(Ordering::SeqCst), 1);
        let ticket = session.draft().ticket.clone().unwrap();
        assert!(ticket.starts_with("data:image/jpeg;base64,"));
        // Attachment landed on the notes step while the user stayed on the first one.
        assert_eq!(session.current_step(), TripStep::Name);
    }

    #[tokio::test]
    async fn denied_camera_leaves_wizard_usable() {
        let sink = CollectingSink::new();
        let camera = Arc::new(FakeCamera {
            deny: true,
            ..FakeCamera::default()
        });
        let mut session = session(&sink);
        let err = session.open_camera(camera.clone()).await.unwrap_err();
        assert!(matches!(err, SessionError::Device(DeviceError::CameraDenied)));
        assert!(!session.camera_active());
        assert_eq!(camera.releases.load(Ordering::SeqCst), 0);
        session.input("name", "Lager").unwrap();
        assert!(matches!(session.next().unwrap(), NavigationEvent::Moved { .. }));
    }

    #[tokio::test]
    async fn removing_the_current_step_moves_back() {
        let sink = CollectingSink::new();
        let mut session = session(&sink);
        session.input("name", "Lager").unwrap();
        session.next().unwrap();
        session.input("for_self", "no").unwrap();
        session.next().unwrap();
        assert_eq!(session.current_step(), TripStep::Guest);

        session.set_draft(|draft| draft.for_self = Some(true)).unwrap();
        assert_eq!(session.current_step(), TripStep::ForWhom);
        assert_eq!(session.draft().name, "Lager");
    }

    #[tokio::test]
    async fn closed_session_rejects_transitions() {
        let sink = CollectingSink::new();
        let mut session = session(&sink);
        session.cancel();
        assert!(matches!(session.next(), Err(SessionError::Closed)));
        assert!(matches!(
            session.input("name", "x"),
            Err(SessionError::Closed)
        ));
    }
}
