use super::draft::{DraftPatch, ProjectDraft};
use crate::api::{ApiError, ProjectApi};
use crate::redact::redact_secrets;
use crate::session::SessionManager;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const DEFAULT_TOTAL_STEPS: u8 = 6;
pub const PROJECTS_LISTING_ROUTE: &str = "/dashboard/developer/projects";

const STEP_TITLES: [&str; 6] = [
    "Type Selection",
    "Basic Info",
    "Technical Data",
    "Stakeholders",
    "Compliance",
    "Registry Submission",
];

pub fn step_title(step: u8) -> Option<&'static str> {
    let index = usize::from(step).checked_sub(1)?;
    STEP_TITLES.get(index).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Step(u8),
    Submitting,
    Submitted,
    /// Still on the final step; the draft is intact and submit may be retried.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("project has already been submitted")]
    AlreadySubmitted,
    #[error("submit is only allowed from the final step (currently on step {0})")]
    NotOnFinalStep(u8),
    #[error("failed to create project: {0}")]
    SubmitFailed(String),
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub project: Value,
    pub redirect_to: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Editing,
    Submitting,
    Submitted,
    Failed(String),
}

#[derive(Debug)]
struct Inner {
    step: u8,
    draft: ProjectDraft,
    phase: Phase,
}

impl Inner {
    fn fresh() -> Self {
        Self {
            step: 1,
            draft: ProjectDraft::default(),
            phase: Phase::Editing,
        }
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        match self.phase {
            Phase::Submitting => Err(WizardError::SubmitInFlight),
            Phase::Submitted => Err(WizardError::AlreadySubmitted),
            Phase::Editing | Phase::Failed(_) => Ok(()),
        }
    }
}

/// Linear project-registration flow.
///
/// Navigation is never gated on field contents. Locks are released before any
/// network call, so `submit` may be raced against itself from the same task; the
/// loser gets [`WizardError::SubmitInFlight`].
pub struct ProjectWizard {
    total_steps: u8,
    session: Arc<SessionManager>,
    projects: Arc<dyn ProjectApi>,
    inner: Mutex<Inner>,
}

impl ProjectWizard {
    pub fn new(session: Arc<SessionManager>, projects: Arc<dyn ProjectApi>) -> Self {
        Self::with_total_steps(session, projects, DEFAULT_TOTAL_STEPS)
    }

    pub fn with_total_steps(
        session: Arc<SessionManager>,
        projects: Arc<dyn ProjectApi>,
        total_steps: u8,
    ) -> Self {
        Self {
            total_steps: total_steps.max(1),
            session,
            projects,
            inner: Mutex::new(Inner::fresh()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn total_steps(&self) -> u8 {
        self.total_steps
    }

    pub fn step(&self) -> u8 {
        self.lock().step
    }

    pub fn progress_percent(&self) -> f64 {
        f64::from(self.step()) / f64::from(self.total_steps) * 100.0
    }

    pub fn state(&self) -> WizardState {
        let inner = self.lock();
        match &inner.phase {
            Phase::Editing => WizardState::Step(inner.step),
            Phase::Submitting => WizardState::Submitting,
            Phase::Submitted => WizardState::Submitted,
            Phase::Failed(message) => WizardState::Failed {
                message: message.clone(),
            },
        }
    }

    pub fn draft(&self) -> ProjectDraft {
        self.lock().draft.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        match &self.lock().phase {
            Phase::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Advances one step. A no-op on the final step.
    pub fn next(&self) -> Result<u8, WizardError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        if inner.step < self.total_steps {
            inner.step += 1;
            inner.phase = Phase::Editing;
        }
        Ok(inner.step)
    }

    /// Goes back one step. A no-op on the first step. Field data is never dropped.
    pub fn back(&self) -> Result<u8, WizardError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        if inner.step > 1 {
            inner.step -= 1;
            inner.phase = Phase::Editing;
        }
        Ok(inner.step)
    }

    pub fn update_fields(&self, partial: impl Into<DraftPatch>) -> Result<(), WizardError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        inner.draft.merge(partial);
        Ok(())
    }

    /// Restarts the flow with an empty draft on step 1.
    pub fn reset(&self) -> Result<(), WizardError> {
        let mut inner = self.lock();
        if inner.phase == Phase::Submitting {
            return Err(WizardError::SubmitInFlight);
        }
        *inner = Inner::fresh();
        Ok(())
    }

    pub async fn submit(&self) -> Result<SubmitOutcome, WizardError> {
        let draft = {
            let mut inner = self.lock();
            inner.ensure_editable()?;
            if inner.step != self.total_steps {
                return Err(WizardError::NotOnFinalStep(inner.step));
            }
            inner.phase = Phase::Submitting;
            inner.draft.clone()
        };

        let result = self.send(&draft).await;

        let mut inner = self.lock();
        match result {
            Ok(project) => {
                inner.phase = Phase::Submitted;
                log::info!("project submitted");
                Ok(SubmitOutcome {
                    project,
                    redirect_to: PROJECTS_LISTING_ROUTE,
                })
            }
            Err(message) => {
                log::warn!("project submission failed: {message}");
                inner.phase = Phase::Failed(message.clone());
                Err(WizardError::SubmitFailed(message))
            }
        }
    }

    async fn send(&self, draft: &ProjectDraft) -> Result<Value, String> {
        let record = draft.to_json().map_err(|e| e.to_string())?;

        // An unauthenticated submit is still sent; the backend decides.
        let token = if self.session.ensure_valid().await {
            self.session.token()
        } else {
            None
        };

        self.projects
            .create_project(token.as_deref(), &record)
            .await
            .map_err(|e| describe(&e))
    }
}

fn describe(err: &ApiError) -> String {
    let message = match err {
        ApiError::Status {
            code,
            detail: None,
            ..
        } => format!("HTTP {code}"),
        other => other.to_string(),
    };
    redact_secrets(&message).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthApi, HttpErrorStatus};
    use crate::store::MemoryStore;
    use crate::types::{Credentials, LoginResponse, Role, SignupData};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct NoAuth;

    #[async_trait]
    impl AuthApi for NoAuth {
        async fn login(&self, _role: Role, _credentials: &Credentials) -> Result<LoginResponse, ApiError> {
            Err(unauthorized())
        }

        async fn signup(&self, _data: &SignupData) -> Result<LoginResponse, ApiError> {
            Err(unauthorized())
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<LoginResponse, ApiError> {
            Err(unauthorized())
        }
    }

    fn unauthorized() -> ApiError {
        ApiError::Status {
            code: 401,
            status: HttpErrorStatus::Unauthorized,
            detail: None,
        }
    }

    #[derive(Default)]
    struct FakeProjects {
        calls: AtomicUsize,
        fail: AtomicBool,
        gated: bool,
        gate: Notify,
        last_bearer: Mutex<Option<String>>,
        last_record: Mutex<Option<Value>>,
    }

    #[async_trait]
    impl ProjectApi for FakeProjects {
        async fn create_project(&self, bearer: Option<&str>, record: &Value) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_bearer.lock().unwrap() = bearer.map(str::to_string);
            *self.last_record.lock().unwrap() = Some(record.clone());
            if self.gated {
                self.gate.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    code: 500,
                    status: HttpErrorStatus::Error,
                    detail: None,
                });
            }
            Ok(json!({ "id": 42 }))
        }
    }

    fn session() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(Arc::new(MemoryStore::new()), Arc::new(NoAuth)))
    }

    fn wizard(projects: Arc<FakeProjects>) -> ProjectWizard {
        ProjectWizard::new(session(), projects)
    }

    fn to_final_step(wizard: &ProjectWizard) {
        for _ in 1..wizard.total_steps() {
            wizard.next().unwrap();
        }
    }

    fn named(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: Some(name.to_string()),
            ..ProjectDraft::default()
        }
    }

    #[test]
    fn next_five_times_reaches_final_step_and_stops() {
        let wizard = wizard(Arc::new(FakeProjects::default()));
        assert_eq!(wizard.state(), WizardState::Step(1));

        for expected in 2..=6 {
            assert_eq!(wizard.next().unwrap(), expected);
        }
        assert_eq!(wizard.state(), WizardState::Step(6));
        assert_eq!(wizard.next().unwrap(), 6);
        assert_eq!(wizard.progress_percent(), 100.0);
    }

    #[test]
    fn back_on_first_step_is_noop() {
        let wizard = wizard(Arc::new(FakeProjects::default()));
        assert_eq!(wizard.back().unwrap(), 1);
        assert_eq!(wizard.state(), WizardState::Step(1));
    }

    #[test]
    fn fields_survive_navigation() {
        let wizard = wizard(Arc::new(FakeProjects::default()));
        wizard.next().unwrap();
        wizard.update_fields(named("Solar Farm A")).unwrap();
        assert_eq!(wizard.step(), 2);

        wizard.next().unwrap();
        wizard.back().unwrap();

        assert_eq!(wizard.draft().name.as_deref(), Some("Solar Farm A"));
    }

    #[test]
    fn reset_returns_to_empty_first_step() {
        let wizard = wizard(Arc::new(FakeProjects::default()));
        wizard.update_fields(named("Wind Park")).unwrap();
        to_final_step(&wizard);

        wizard.reset().unwrap();

        assert_eq!(wizard.state(), WizardState::Step(1));
        assert_eq!(wizard.draft(), ProjectDraft::default());
    }

    #[test]
    fn explicit_null_clears_a_field() {
        let wizard = wizard(Arc::new(FakeProjects::default()));
        wizard
            .update_fields(ProjectDraft::from_json(json!({ "registry": "Verra", "name": "Solar Farm A" })).unwrap())
            .unwrap();

        wizard
            .update_fields(DraftPatch::from_json(json!({ "registry": null })).unwrap())
            .unwrap();

        let draft = wizard.draft();
        assert_eq!(draft.registry, None);
        assert_eq!(draft.name.as_deref(), Some("Solar Farm A"));
    }

    #[tokio::test]
    async fn submit_requires_final_step() {
        let projects = Arc::new(FakeProjects::default());
        let wizard = wizard(projects.clone());
        wizard.next().unwrap();

        assert_eq!(wizard.submit().await.unwrap_err(), WizardError::NotOnFinalStep(2));
        assert_eq!(projects.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_submit_sends_full_record_without_auth_header() {
        let projects = Arc::new(FakeProjects::default());
        let wizard = wizard(projects.clone());
        wizard
            .update_fields(ProjectDraft::from_json(json!({ "projectType": "Afforestation" })).unwrap())
            .unwrap();
        wizard.update_fields(named("Mangrove Restoration")).unwrap();
        to_final_step(&wizard);

        let outcome = wizard.submit().await.unwrap();

        assert_eq!(outcome.redirect_to, PROJECTS_LISTING_ROUTE);
        assert_eq!(outcome.project, json!({ "id": 42 }));
        assert_eq!(wizard.state(), WizardState::Submitted);
        assert_eq!(*projects.last_bearer.lock().unwrap(), None);
        assert_eq!(
            projects.last_record.lock().unwrap().clone(),
            Some(json!({ "projectType": "Afforestation", "name": "Mangrove Restoration" }))
        );
        assert_eq!(wizard.next().unwrap_err(), WizardError::AlreadySubmitted);
    }

    #[tokio::test]
    async fn submit_uses_current_session_token() {
        let projects = Arc::new(FakeProjects::default());
        let session = session();
        session
            .start_session(
                &LoginResponse {
                    access_token: "access-1".to_string(),
                    refresh_token: "refresh-1".to_string(),
                    token_type: None,
                    user: json!({ "id": 1 }),
                },
                false,
            )
            .unwrap();
        let wizard = ProjectWizard::new(session, projects.clone());
        to_final_step(&wizard);

        wizard.submit().await.unwrap();

        assert_eq!(projects.last_bearer.lock().unwrap().as_deref(), Some("access-1"));
    }

    #[tokio::test]
    async fn concurrent_submit_sends_one_request() {
        let projects = Arc::new(FakeProjects {
            gated: true,
            ..FakeProjects::default()
        });
        let wizard = wizard(projects.clone());
        to_final_step(&wizard);

        let (first, second) = tokio::join!(wizard.submit(), async {
            let second = wizard.submit().await;
            assert_eq!(wizard.state(), WizardState::Submitting);
            projects.gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), WizardError::SubmitInFlight);
        assert_eq!(projects.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_data_and_allows_retry() {
        let projects = Arc::new(FakeProjects::default());
        projects.fail.store(true, Ordering::SeqCst);
        let wizard = wizard(projects.clone());
        wizard.update_fields(named("Solar Farm A")).unwrap();
        to_final_step(&wizard);

        let err = wizard.submit().await.unwrap_err();
        assert_eq!(err, WizardError::SubmitFailed("HTTP 500".to_string()));
        assert_eq!(
            wizard.state(),
            WizardState::Failed {
                message: "HTTP 500".to_string()
            }
        );
        assert_eq!(wizard.step(), 6);
        assert_eq!(wizard.draft().name.as_deref(), Some("Solar Farm A"));

        projects.fail.store(false, Ordering::SeqCst);
        wizard.submit().await.unwrap();
        assert_eq!(projects.calls.load(Ordering::SeqCst), 2);
        assert_eq!(wizard.last_error(), None);
    }

    #[test]
    fn step_titles_cover_each_step() {
        assert_eq!(step_title(1), Some("Type Selection"));
        assert_eq!(step_title(6), Some("Registry Submission"));
        assert_eq!(step_title(0), None);
        assert_eq!(step_title(7), None);
    }
}
