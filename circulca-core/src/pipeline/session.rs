use super::builder::SimulationRequestBuilder;
use crate::{
    error::{PipelineError, ServiceError},
    merge, metrics,
    service::{LcaService, ReportDocument},
};
use circulca_schemas::{
    defaults::CompanyDefaults,
    metrics::DerivedMetrics,
    project::ProjectMetadata,
    row::{RowId, RowSet},
    wire::{ImputationResponse, ServiceRequest, SimulationResponse},
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
};
use tracing::{info, warn};

/// Company defaults shared with the settings store. The session only reads them,
/// and reads them when a request is built.
pub type SharedDefaults = Arc<RwLock<Option<CompanyDefaults>>>;

/// Sequence number attached to an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunTicket(u64);

impl RunTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Hands out monotonically increasing tickets and remembers the newest one.
#[derive(Debug, Default)]
pub struct RunSequencer {
    latest: AtomicU64,
}

impl RunSequencer {
    pub fn issue(&self) -> RunTicket {
        RunTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RunTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Marks an action as running until dropped.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, action: &'static str) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PipelineError::RunInFlight(action))?;
        Ok(Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// What happened to a service response once it came back.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The response replaced the session's previous state.
    Applied,
    /// A newer request had been issued; the response was dropped.
    Stale,
    /// The service call or the response handling failed; prior state is kept.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub metadata: ProjectMetadata,
    pub rows: RowSet,
    pub metrics: Option<DerivedMetrics>,
    pub last_response: Option<SimulationResponse>,
    /// Last user-facing status line.
    pub status: Option<String>,
}

/// One user's working session: the table, the latest results, and the
/// bookkeeping that keeps overlapping service calls from clobbering each other.
pub struct SimulationSession<S> {
    service: S,
    defaults: SharedDefaults,
    state: Mutex<SessionState>,
    simulations: RunSequencer,
    imputations: RunSequencer,
    simulating: AtomicBool,
    imputing: AtomicBool,
}

impl<S: LcaService + Send + Sync> SimulationSession<S> {
    pub fn new(service: S, metadata: ProjectMetadata, rows: RowSet, defaults: SharedDefaults) -> Self {
        Self {
            service,
            defaults,
            state: Mutex::new(SessionState {
                metadata,
                rows,
                metrics: None,
                last_response: None,
                status: None,
            }),
            simulations: RunSequencer::default(),
            imputations: RunSequencer::default(),
            simulating: AtomicBool::new(false),
            imputing: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn rows(&self) -> RowSet {
        self.lock().rows.clone()
    }

    pub fn edit_rows<R>(&self, edit: impl FnOnce(&mut RowSet) -> R) -> R {
        edit(&mut self.lock().rows)
    }

    pub fn replace_rows(&self, rows: RowSet) {
        self.lock().rows = rows;
    }

    /// Replaces the project metadata. Requests already built keep their own copy.
    pub fn set_metadata(&self, metadata: ProjectMetadata) {
        self.lock().metadata = metadata;
    }

    pub fn metrics(&self) -> Option<DerivedMetrics> {
        self.lock().metrics.clone()
    }

    pub fn status(&self) -> Option<String> {
        self.lock().status.clone()
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating.load(Ordering::SeqCst)
    }

    /// Builds a request from the current table, metadata and company defaults.
    /// Also returns the row ids in the order they were sent.
    pub fn build_request(&self) -> Result<(ServiceRequest, Vec<RowId>), PipelineError> {
        let defaults = self
            .defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let state = self.lock();
        let request = SimulationRequestBuilder::new()
            .with_metadata(state.metadata.clone())
            .with_rows(&state.rows)
            .with_company_defaults(defaults.as_ref())
            .build()?;
        Ok((request, state.rows.ids()))
    }

    /// Tags a new simulation request. Any response carrying an older ticket is discarded.
    ///
    /// Tickets are issued and checked under the state lock, so a response that
    /// passed the newest-ticket check is applied before a newer ticket exists.
    pub fn issue_simulation_ticket(&self) -> RunTicket {
        let _state = self.lock();
        self.simulations.issue()
    }

    pub fn issue_imputation_ticket(&self) -> RunTicket {
        let _state = self.lock();
        self.imputations.issue()
    }

    /// Runs the simulation for the current table.
    ///
    /// # Errors
    ///
    /// Returns `RunInFlight` while another simulation is running, or a request
    /// building error. Service failures are not errors here: they are recorded
    /// as the session status and reported as [`RunOutcome::Failed`].
    pub async fn simulate(&self) -> Result<RunOutcome, PipelineError> {
        let _in_flight = InFlight::acquire(&self.simulating, "simulation")?;
        let (request, _) = self.build_request()?;
        let ticket = self.issue_simulation_ticket();
        info!(ticket = ticket.sequence(), rows = request.data.len(), "simulation started");

        let result = self.service.simulate(&request).await;
        Ok(self.apply_simulation(ticket, result))
    }

    /// Applies a simulation response if `ticket` is still the newest one issued.
    pub fn apply_simulation(
        &self,
        ticket: RunTicket,
        result: Result<SimulationResponse, ServiceError>,
    ) -> RunOutcome {
        let mut state = self.lock();
        if !self.simulations.is_latest(ticket) {
            warn!(ticket = ticket.sequence(), "discarding stale simulation response");
            return RunOutcome::Stale;
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => return fail(&mut state, format!("Simulation failed: {}", e)),
        };
        match metrics::transform(&response) {
            Ok(derived) => {
                state.metrics = Some(derived);
                state.last_response = Some(response);
                state.status = Some("Simulation complete".to_string());
                info!(ticket = ticket.sequence(), "simulation applied");
                RunOutcome::Applied
            }
            Err(e) => fail(&mut state, format!("Simulation failed: {}", e)),
        }
    }

    /// Asks the service to fill absent cells and merges the answer into the table.
    pub async fn impute(&self) -> Result<RunOutcome, PipelineError> {
        let _in_flight = InFlight::acquire(&self.imputing, "imputation")?;
        let (request, sent_ids) = self.build_request()?;
        let ticket = self.issue_imputation_ticket();
        info!(ticket = ticket.sequence(), rows = request.data.len(), "imputation started");

        let result = self.service.impute(&request).await;
        Ok(self.apply_imputation(ticket, &sent_ids, result))
    }

    /// Merges an imputation response if `ticket` is the newest one issued and
    /// the table still has the rows that were sent, in the same order.
    pub fn apply_imputation(
        &self,
        ticket: RunTicket,
        sent_ids: &[RowId],
        result: Result<ImputationResponse, ServiceError>,
    ) -> RunOutcome {
        let mut state = self.lock();
        if !self.imputations.is_latest(ticket) {
            warn!(ticket = ticket.sequence(), "discarding stale imputation response");
            return RunOutcome::Stale;
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => return fail(&mut state, format!("Imputation failed: {}", e)),
        };
        if state.rows.ids() != sent_ids {
            warn!(ticket = ticket.sequence(), "table changed while imputation was running");
            state.status = Some("Table changed during imputation; imputed values were not applied".to_string());
            return RunOutcome::Stale;
        }
        match merge::merge_with_report(&state.rows, &response.imputed_data) {
            Ok(outcome) => {
                let filled = outcome.filled();
                state.rows = outcome.rows;
                state.status = Some(format!("Imputation complete: {} values filled", filled));
                info!(ticket = ticket.sequence(), filled, "imputation applied");
                RunOutcome::Applied
            }
            Err(e) => fail(&mut state, format!("Imputation failed: {}", e)),
        }
    }

    /// Requests a report for the latest simulation.
    pub async fn generate_report(&self) -> Result<ReportDocument, PipelineError> {
        let request = {
            let state = self.lock();
            match (&state.last_response, &state.metrics) {
                (Some(response), Some(derived)) => metrics::report_request(response, derived)?,
                _ => return Err(PipelineError::NoResults),
            }
        };
        match self.service.generate_report(&request).await {
            Ok(document) => {
                self.lock().status = Some(format!("Report ready: {}", document.filename));
                Ok(document)
            }
            Err(e) => {
                self.lock().status = Some(format!("Report generation failed: {}", e));
                Err(e.into())
            }
        }
    }
}

fn fail(state: &mut SessionState, message: String) -> RunOutcome {
    warn!(%message, "run failed; keeping previous results");
    state.status = Some(message.clone());
    RunOutcome::Failed(message)
}
