//! Scenario Runner
//!
//! # Architecture
//!
//! ```text
//! Suite ── Group "Blog app" ── setup: [reset, seed, goto]
//!            ├── Scenario "Login form is shown"
//!            └── Group "Login" ── setup: []
//!                  ├── Scenario "succeeds with correct credentials"
//!                  └── Group "When logged in" ── setup: [log in]
//!                        └── Scenario "a new blog can be created"
//!
//!            │ Suite::plan()
//!            ▼
//! PlannedScenario { path, setup: [reset, seed, goto, log in], body }
//!
//!            │ Runner::run()   (buffer_unordered(workers))
//!            ▼
//! open page ─► setup chain ─► body ─► close page ─► ScenarioReport
//! ```
//!
//! Setup chains are resolved once, at planning time, by walking the group
//! tree outer to inner. Every scenario gets its own page; the page is closed
//! whatever the outcome, including deadline expiry and panics.

use crate::api::BackendApi;
use crate::config::HarnessConfig;
use crate::driver::SessionFactory;
use crate::fixture::{ScenarioContext, SetupStep, StepFn};
use crate::reporter::{Failure, FailureKind, RunReport, ScenarioReport};
use crate::result::{HarnessError, HarnessResult};
use crate::session::Session;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

// =============================================================================
// TREE
// =============================================================================

enum Node {
    Scenario { name: String, body: Arc<StepFn> },
    Group(Group),
}

/// A named scope with its own setup steps, scenarios and child groups
pub struct Group {
    name: String,
    setup: Vec<Arc<dyn SetupStep>>,
    children: Vec<Node>,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("setup", &self.setup.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish()
    }
}

impl Group {
    /// Create an empty group
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Group name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a setup step; it runs after the steps of enclosing groups
    #[must_use]
    pub fn setup(mut self, step: impl SetupStep + 'static) -> Self {
        self.setup.push(Arc::new(step));
        self
    }

    /// Append a scenario
    #[must_use]
    pub fn scenario<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, HarnessResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.children.push(Node::Scenario {
            name: name.into(),
            body: Arc::new(body),
        });
        self
    }

    /// Append a child group
    #[must_use]
    pub fn group(mut self, child: Self) -> Self {
        self.children.push(Node::Group(child));
        self
    }

    fn plan_into(
        &self,
        path: &mut Vec<String>,
        chain: &mut Vec<Arc<dyn SetupStep>>,
        out: &mut Vec<PlannedScenario>,
    ) {
        path.push(self.name.clone());
        let inherited = chain.len();
        chain.extend(self.setup.iter().cloned());

        for child in &self.children {
            match child {
                Node::Scenario { name, body } => {
                    let mut full = path.clone();
                    full.push(name.clone());
                    out.push(PlannedScenario {
                        path: full,
                        setup: chain.clone(),
                        body: Arc::clone(body),
                    });
                }
                Node::Group(group) => group.plan_into(path, chain, out),
            }
        }

        chain.truncate(inherited);
        path.pop();
    }
}

/// Top-level collection of groups
#[derive(Debug)]
pub struct Suite {
    name: String,
    groups: Vec<Group>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Suite name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a top-level group
    #[must_use]
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Flatten the tree into runnable scenarios, in declaration order
    #[must_use]
    pub fn plan(&self) -> Vec<PlannedScenario> {
        let mut out = Vec::new();
        for group in &self.groups {
            group.plan_into(&mut Vec::new(), &mut Vec::new(), &mut out);
        }
        out
    }

    /// Planned scenarios whose full name contains `filter`
    #[must_use]
    pub fn plan_filtered(&self, filter: Option<&str>) -> Vec<PlannedScenario> {
        let mut plan = self.plan();
        if let Some(pattern) = filter {
            plan.retain(|p| p.name().contains(pattern));
        }
        plan
    }
}

/// A leaf scenario with its resolved setup chain
#[derive(Clone)]
pub struct PlannedScenario {
    path: Vec<String>,
    setup: Vec<Arc<dyn SetupStep>>,
    body: Arc<StepFn>,
}

impl std::fmt::Debug for PlannedScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedScenario")
            .field("path", &self.path)
            .field("setup", &self.setup_names())
            .finish()
    }
}

impl PlannedScenario {
    /// Group path followed by the scenario name
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Full name, path segments joined by " > "
    #[must_use]
    pub fn name(&self) -> String {
        self.path.join(" > ")
    }

    /// Setup step names, outermost first
    #[must_use]
    pub fn setup_names(&self) -> Vec<&str> {
        self.setup.iter().map(|s| s.name()).collect()
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Per-scenario lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Planned, page not yet opened
    NotStarted,
    /// Running the setup chain
    SettingUp,
    /// Running the body
    Running,
    /// Finished successfully
    Passed,
    /// Finished with a failure
    Failed,
}

impl ScenarioState {
    /// Whether the state is final
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for any transition outside
    /// `NotStarted → SettingUp → Running → {Passed, Failed}` and
    /// `SettingUp → Failed`.
    pub fn transition(self, next: Self) -> HarnessResult<Self> {
        let allowed = matches!(
            (self, next),
            (Self::NotStarted, Self::SettingUp)
                | (Self::SettingUp, Self::Running | Self::Failed)
                | (Self::Running, Self::Passed | Self::Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(HarnessError::InvalidState {
                message: format!("scenario cannot move from {self:?} to {next:?}"),
            })
        }
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Receives progress events while a run is in flight
pub trait RunObserver: Send + Sync {
    /// The run is about to execute `total` scenarios
    fn run_started(&self, _total: usize) {}

    /// A scenario has produced its verdict
    fn scenario_finished(&self, _report: &ScenarioReport) {}
}

/// Executes planned scenarios and collects their verdicts
pub struct Runner {
    config: Arc<HarnessConfig>,
    factory: Arc<dyn SessionFactory>,
    api: Arc<dyn BackendApi>,
    filter: Option<String>,
    observer: Option<Arc<dyn RunObserver>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner
    #[must_use]
    pub fn new(
        config: HarnessConfig,
        factory: Arc<dyn SessionFactory>,
        api: Arc<dyn BackendApi>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            factory,
            api,
            filter: None,
            observer: None,
        }
    }

    /// Only run scenarios whose full name contains `pattern`
    #[must_use]
    pub fn with_filter(mut self, pattern: Option<String>) -> Self {
        self.filter = pattern;
        self
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run every planned scenario of `suite`
    #[tracing::instrument(skip_all, fields(suite = %suite.name()))]
    pub async fn run(&self, suite: &Suite) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new(suite.name());
        let plan = suite.plan_filtered(self.filter.as_deref());

        if let Err(e) = self.api.probe().await {
            tracing::error!(error = %e, "application unreachable; no scenarios run");
            report.environment_error = Some(e.to_string());
            return report.with_duration(start.elapsed());
        }

        let workers = self.config.workers.max(1);
        tracing::info!(scenarios = plan.len(), workers, "starting run");
        if let Some(observer) = &self.observer {
            observer.run_started(plan.len());
        }

        let stop = AtomicBool::new(false);
        let environment = std::sync::Mutex::new(None::<String>);
        let stop = &stop;
        let environment = &environment;

        let mut results: Vec<(usize, ScenarioReport)> =
            futures::stream::iter(plan.iter().enumerate())
                .map(|(index, planned)| async move {
                    let verdict = if stop.load(Ordering::SeqCst) {
                        ScenarioReport::skipped(planned.name())
                    } else {
                        self.run_one(planned).await
                    };

                    if let Some(failure) = &verdict.failure {
                        if failure.kind == FailureKind::Environment {
                            stop.store(true, Ordering::SeqCst);
                            if let Ok(mut slot) = environment.lock() {
                                slot.get_or_insert_with(|| failure.message.clone());
                            }
                        } else if self.config.fail_fast {
                            stop.store(true, Ordering::SeqCst);
                        }
                    }
                    if let Some(observer) = &self.observer {
                        observer.scenario_finished(&verdict);
                    }
                    (index, verdict)
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        results.sort_by_key(|(index, _)| *index);
        report.results = results.into_iter().map(|(_, r)| r).collect();
        report.environment_error = environment.lock().ok().and_then(|mut e| e.take());

        let report = report.with_duration(start.elapsed());
        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "run finished"
        );
        report
    }

    async fn run_one(&self, planned: &PlannedScenario) -> ScenarioReport {
        let start = Instant::now();
        let name = planned.name();

        let driver = match self.factory.open_page().await {
            Ok(driver) => driver,
            Err(e) => {
                let err = HarnessError::setup("open page", e);
                tracing::warn!(scenario = %name, error = %err, "could not open page");
                return ScenarioReport::failed(name, start.elapsed(), Failure::from_error(&err));
            }
        };

        let session = Session::new(driver, self.config.base_url.clone())
            .with_action_policy(self.config.action_policy())
            .with_expect_policy(self.config.expect_policy());
        let span = tracing::info_span!("scenario", name = %name, session = %session.id());
        let mut ctx = ScenarioContext {
            session,
            api: Arc::clone(&self.api),
            config: Arc::clone(&self.config),
        };

        async {
            let mut state = ScenarioState::NotStarted;
            let deadline = Duration::from_millis(self.config.scenario_timeout_ms);
            let execution = AssertUnwindSafe(execute(planned, &mut ctx, &mut state)).catch_unwind();

            let failure = match tokio::time::timeout(deadline, execution).await {
                Ok(Ok(Ok(()))) => None,
                Ok(Ok(Err(e))) => Some(Failure::from_error(&e)),
                Ok(Err(panic)) => Some(Failure {
                    kind: FailureKind::Other,
                    message: format!("scenario panicked: {}", panic_message(panic.as_ref())),
                }),
                Err(_) => Some(Failure::from_error(&HarnessError::ScenarioTimeout {
                    ms: self.config.scenario_timeout_ms,
                })),
            };

            if let Err(e) = ctx.session.close().await {
                tracing::warn!(error = %e, "failed to close page");
            }

            let next = if failure.is_some() {
                ScenarioState::Failed
            } else {
                ScenarioState::Passed
            };
            if let Err(e) = state.transition(next) {
                tracing::warn!(error = %e, "unexpected lifecycle transition");
            }

            let elapsed = start.elapsed();
            match failure {
                None => {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "passed");
                    ScenarioReport::passed(name, elapsed)
                }
                Some(failure) => {
                    tracing::warn!(kind = failure.kind.label(), message = %failure.message, "failed");
                    ScenarioReport::failed(name, elapsed, failure)
                }
            }
        }
        .instrument(span)
        .await
    }
}

async fn execute(
    planned: &PlannedScenario,
    ctx: &mut ScenarioContext,
    state: &mut ScenarioState,
) -> HarnessResult<()> {
    *state = state.transition(ScenarioState::SettingUp)?;
    for step in &planned.setup {
        tracing::debug!(step = step.name(), "setup");
        step.run(ctx)
            .await
            .map_err(|e| HarnessError::setup(step.name(), e))?;
    }
    *state = state.transition(ScenarioState::Running)?;
    (planned.body)(ctx).await
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
