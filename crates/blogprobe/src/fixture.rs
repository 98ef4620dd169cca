//! Fixture/Setup Layer
//!
//! A group's setup is an ordered list of [`SetupStep`]s. Before a scenario
//! body runs, the runner executes the steps of every enclosing group,
//! outermost first, against a fresh [`ScenarioContext`].
//!
//! ```ignore
//! Group::new("Blog app")
//!     .setup(reset_state())
//!     .setup(seed_user(Credential::new("Matti Luukkainen", "mluukkai", "salainen")))
//!     .setup(goto_root())
//!     .setup(step("log in", |ctx| Box::pin(async move {
//!         login(&mut ctx.session, "mluukkai", "salainen").await
//!     })))
//! ```

use crate::api::{BackendApi, Credential};
use crate::config::HarnessConfig;
use crate::result::HarnessResult;
use crate::session::Session;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Everything a setup step or scenario body can touch
pub struct ScenarioContext {
    /// The scenario's own page
    pub session: Session,
    /// Backend for reset/seed calls
    pub api: Arc<dyn BackendApi>,
    /// Run configuration
    pub config: Arc<HarnessConfig>,
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One named step of a setup chain.
#[async_trait]
pub trait SetupStep: Send + Sync {
    /// Step name, reported when the step fails
    fn name(&self) -> &str;

    /// Run the step
    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()>;
}

/// Signature of closure-based steps and scenario bodies
pub type StepFn =
    dyn for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, HarnessResult<()>> + Send + Sync;

/// A setup step built from a closure
pub struct FnStep {
    name: String,
    f: Box<StepFn>,
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl SetupStep for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        (self.f)(ctx).await
    }
}

/// Build a setup step from an async closure
pub fn step<F>(name: impl Into<String>, f: F) -> FnStep
where
    F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, HarnessResult<()>>
        + Send
        + Sync
        + 'static,
{
    FnStep {
        name: name.into(),
        f: Box::new(f),
    }
}

/// Clears remote state
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetState;

#[async_trait]
impl SetupStep for ResetState {
    fn name(&self) -> &str {
        "reset state"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        ctx.api.reset().await
    }
}

/// Creates a user through the backend
#[derive(Debug, Clone)]
pub struct SeedUser {
    name: String,
    credential: Credential,
}

#[async_trait]
impl SetupStep for SeedUser {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        ctx.api.create_user(&self.credential).await
    }
}

/// Opens the application root
#[derive(Debug, Clone, Copy, Default)]
pub struct GotoRoot;

#[async_trait]
impl SetupStep for GotoRoot {
    fn name(&self) -> &str {
        "goto root"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        ctx.session.goto_root().await
    }
}

/// `POST /testing/reset`
#[must_use]
pub const fn reset_state() -> ResetState {
    ResetState
}

/// `POST /users` with the given credential
#[must_use]
pub fn seed_user(credential: Credential) -> SeedUser {
    SeedUser {
        name: format!("seed user {}", credential.username),
        credential,
    }
}

/// Navigate to the base URL
#[must_use]
pub const fn goto_root() -> GotoRoot {
    GotoRoot
}
