//! In-memory gateway and console for tests.

use crate::{
    console::Console,
    gateway::{Gateway, GatewayError},
    jobs::{Job, JobId, RunHandle, RunId, RunState},
    uc::{ObjectKind, UcObject},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

/// Recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListJobs,
    TriggerRun(JobId),
    GetRunState(RunId),
    CurrentUser,
    ListCatalogs,
    ListSchemas(String),
    ListTables(String),
    SetOwner { object: String, principal: String },
    Delete { object: String, force: bool },
}

impl Call {
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::TriggerRun(_) | Self::SetOwner { .. } | Self::Delete { .. }
        )
    }
}

#[derive(Default)]
struct FakeState {
    jobs: Vec<Job>,
    list_jobs_error: Option<GatewayError>,
    user: Option<String>,
    next_run_id: RunId,
    runs: HashMap<RunId, JobId>,
    trigger_failures: HashMap<JobId, GatewayError>,
    trigger_delays: HashMap<JobId, Duration>,
    run_scripts: HashMap<JobId, VecDeque<Result<RunState, GatewayError>>>,
    objects: Vec<UcObject>,
    owner_failures: HashMap<String, GatewayError>,
    delete_failures: HashMap<String, GatewayError>,
    calls: Vec<Call>,
}

/// Fake gateway that records every call and replays scripted answers
pub struct FakeGateway {
    state: Mutex<FakeState>,
    list_jobs_delay: Duration,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_run_id: 1000,
                user: Some("operator@example.com".to_string()),
                ..FakeState::default()
            }),
            list_jobs_delay: Duration::ZERO,
        }
    }
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_jobs(self, jobs: Vec<Job>) -> Self {
        self.state.lock().jobs = jobs;
        self
    }

    #[must_use]
    pub fn with_user(self, user: Option<&str>) -> Self {
        self.state.lock().user = user.map(str::to_string);
        self
    }

    /// Catalogs, schemas and tables served by the listing calls
    #[must_use]
    pub fn with_objects(self, objects: Vec<UcObject>) -> Self {
        self.state.lock().objects = objects;
        self
    }

    #[must_use]
    pub const fn with_list_jobs_delay(mut self, delay: Duration) -> Self {
        self.list_jobs_delay = delay;
        self
    }

    #[must_use]
    pub fn fail_trigger(self, job_id: JobId, err: GatewayError) -> Self {
        self.state.lock().trigger_failures.insert(job_id, err);
        self
    }

    #[must_use]
    pub fn delay_trigger(self, job_id: JobId, delay: Duration) -> Self {
        self.state.lock().trigger_delays.insert(job_id, delay);
        self
    }

    /// States returned by successive polls of runs of `job_id`; the last one repeats
    #[must_use]
    pub fn script_run(self, job_id: JobId, script: Vec<Result<RunState, GatewayError>>) -> Self {
        self.state.lock().run_scripts.insert(job_id, script.into());
        self
    }

    #[must_use]
    pub fn fail_set_owner(self, full_name: &str, err: GatewayError) -> Self {
        self.state.lock().owner_failures.insert(full_name.to_string(), err);
        self
    }

    #[must_use]
    pub fn fail_delete(self, full_name: &str, err: GatewayError) -> Self {
        self.state.lock().delete_failures.insert(full_name.to_string(), err);
        self
    }

    /// Replace the job listing served from now on
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.state.lock().jobs = jobs;
    }

    /// Make subsequent `list_jobs` calls fail (or succeed again with `None`)
    pub fn set_list_jobs_error(&self, err: Option<GatewayError>) {
        self.state.lock().list_jobs_error = err;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn list_jobs_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::ListJobs))
    }

    #[must_use]
    pub fn poll_count(&self, run_id: RunId) -> usize {
        self.count(|call| *call == Call::GetRunState(run_id))
    }

    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.count(Call::is_mutation)
    }

    /// Full names passed to `delete_object`, in call order
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Delete { object, .. } => Some(object.clone()),
                _ => None,
            })
            .collect()
    }

    /// Full names passed to `set_owner`, in call order
    #[must_use]
    pub fn owner_changes(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SetOwner { object, .. } => Some(object.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
        self.record(Call::ListJobs);
        if !self.list_jobs_delay.is_zero() {
            tokio::time::sleep(self.list_jobs_delay).await;
        }
        let state = self.state.lock();
        match &state.list_jobs_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.jobs.clone()),
        }
    }

    async fn trigger_run(&self, job_id: JobId) -> Result<RunHandle, GatewayError> {
        self.record(Call::TriggerRun(job_id));
        let delay = self.state.lock().trigger_delays.get(&job_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        if let Some(err) = state.trigger_failures.get(&job_id) {
            return Err(err.clone());
        }
        state.next_run_id += 1;
        let run_id = state.next_run_id;
        state.runs.insert(run_id, job_id);
        Ok(RunHandle::pending(job_id, run_id))
    }

    async fn get_run_state(&self, run_id: RunId) -> Result<RunState, GatewayError> {
        self.record(Call::GetRunState(run_id));
        let mut state = self.state.lock();
        let Some(job_id) = state.runs.get(&run_id).copied() else {
            return Err(GatewayError::NotFound(format!("run {run_id}")));
        };
        match state.run_scripts.get_mut(&job_id) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or(Ok(RunState::Succeeded)),
            Some(script) => script.front().cloned().unwrap_or(Ok(RunState::Succeeded)),
            None => Ok(RunState::Succeeded),
        }
    }

    async fn current_user(&self) -> Result<String, GatewayError> {
        self.record(Call::CurrentUser);
        self.state
            .lock()
            .user
            .clone()
            .ok_or_else(|| GatewayError::Auth("no current user".to_string()))
    }

    async fn list_catalogs(&self) -> Result<Vec<UcObject>, GatewayError> {
        self.record(Call::ListCatalogs);
        Ok(self.objects_where(|o| o.kind == ObjectKind::Catalog))
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<UcObject>, GatewayError> {
        self.record(Call::ListSchemas(catalog.to_string()));
        let catalog_exists = !self
            .objects_where(|o| o.kind == ObjectKind::Catalog && o.catalog == catalog)
            .is_empty();
        let schemas = self.objects_where(|o| o.kind == ObjectKind::Schema && o.catalog == catalog);
        if !catalog_exists && schemas.is_empty() {
            return Err(GatewayError::NotFound(format!("catalog '{catalog}'")));
        }
        Ok(schemas)
    }

    async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<UcObject>, GatewayError> {
        self.record(Call::ListTables(format!("{catalog}.{schema}")));
        let in_schema =
            |o: &UcObject| o.catalog == catalog && o.schema.as_deref() == Some(schema);
        let schema_exists = !self
            .objects_where(|o| o.kind == ObjectKind::Schema && in_schema(o))
            .is_empty();
        let tables = self.objects_where(|o| o.name.is_some() && in_schema(o));
        if !schema_exists && tables.is_empty() {
            return Err(GatewayError::NotFound(format!("schema '{catalog}.{schema}'")));
        }
        Ok(tables)
    }

    async fn set_owner(&self, object: &UcObject, principal: &str) -> Result<(), GatewayError> {
        let full_name = object.full_name();
        self.record(Call::SetOwner {
            object: full_name.clone(),
            principal: principal.to_string(),
        });
        let mut state = self.state.lock();
        if let Some(err) = state.owner_failures.get(&full_name) {
            return Err(err.clone());
        }
        for stored in state.objects.iter_mut().filter(|o| o.full_name() == full_name) {
            stored.owner = Some(principal.to_string());
        }
        Ok(())
    }

    async fn delete_object(&self, object: &UcObject, force: bool) -> Result<(), GatewayError> {
        let full_name = object.full_name();
        self.record(Call::Delete {
            object: full_name.clone(),
            force,
        });
        let mut state = self.state.lock();
        if let Some(err) = state.delete_failures.get(&full_name) {
            return Err(err.clone());
        }
        state.objects.retain(|o| o.full_name() != full_name);
        Ok(())
    }
}

impl FakeGateway {
    fn objects_where(&self, pred: impl Fn(&UcObject) -> bool) -> Vec<UcObject> {
        self.state
            .lock()
            .objects
            .iter()
            .filter(|o| pred(o))
            .cloned()
            .collect()
    }
}

/// Console that answers confirmations from a script and records what it was shown
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    selection: Option<Vec<usize>>,
    questions: Mutex<Vec<String>>,
    previews: Mutex<Vec<Vec<String>>>,
}

impl ScriptedConsole {
    /// Answer every confirmation with `answer` and select everything
    #[must_use]
    pub fn always(answer: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer: answer,
            selection: None,
            questions: Mutex::new(Vec::new()),
            previews: Mutex::new(Vec::new()),
        }
    }

    /// Answer confirmations in order, then fall back to `false`
    #[must_use]
    pub fn answers(answers: Vec<bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Self::always(false)
        }
    }

    /// Select only the given indexes
    #[must_use]
    pub fn selecting(mut self, indexes: Vec<usize>) -> Self {
        self.selection = Some(indexes);
        self
    }

    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }

    #[must_use]
    pub fn previews(&self) -> Vec<Vec<String>> {
        self.previews.lock().clone()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    fn preview(&self, _title: &str, objects: &[UcObject]) {
        self.previews
            .lock()
            .push(objects.iter().map(UcObject::full_name).collect());
    }

    async fn confirm(&self, question: &str) -> bool {
        self.questions.lock().push(question.to_string());
        self.answers.lock().pop_front().unwrap_or(self.default_answer)
    }

    async fn select(&self, _title: &str, items: &[String]) -> Vec<usize> {
        match &self.selection {
            Some(indexes) => indexes.iter().copied().filter(|i| *i < items.len()).collect(),
            None => (0..items.len()).collect(),
        }
    }
}
