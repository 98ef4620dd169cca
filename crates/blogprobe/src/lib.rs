//! Blogprobe: Browser-Driven Scenario Harness
//!
//! Declares end-to-end scenarios against a web application, groups them under
//! nested setup fixtures, and runs every scenario in its own isolated page
//! with polling assertions and per-scenario deadlines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   BLOGPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Suite /    │    │ Runner     │    │ Session    │            │
//! │   │ Group      │───►│ (setup →   │───►│ (locators, │            │
//! │   │ (fixtures) │    │  body)     │    │  expect)   │            │
//! │   └────────────┘    └─────┬──────┘    └─────┬──────┘            │
//! │                           │                 │                   │
//! │                     ┌─────▼──────┐    ┌─────▼──────┐            │
//! │                     │ BackendApi │    │ PageDriver │            │
//! │                     │ (reset,    │    │ (chromium  │            │
//! │                     │  seed)     │    │  or mock)  │            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Backend reset/seed client
#[allow(clippy::missing_errors_doc)]
pub mod api;

/// Polling assertions over locators
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod assertion;

/// Chromium control over CDP
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod browser;

/// Harness configuration (YAML + environment)
#[allow(clippy::missing_errors_doc, clippy::struct_excessive_bools)]
pub mod config;

mod dialog;
mod driver;

/// Setup steps and scenario context
#[allow(clippy::missing_errors_doc)]
pub mod fixture;

/// Suite tree, scheduling and the scenario runner
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation
)]
pub mod harness;

mod locator;

/// Scriptable in-memory page backend
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;

/// Run reports (text, JSON, JUnit)
#[allow(
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
pub mod reporter;

mod result;
mod session;
mod wait;

pub use api::{ApiClient, BackendApi, Credential};
pub use assertion::{check_descending, check_leading_maximum, first_integer, LocatorAssertions};
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpDriver};
pub use browser::BrowserConfig;
pub use config::HarnessConfig;
pub use dialog::{Dialog, DialogAction, DialogResponse, DialogSlot, DialogType, DialogWaiter};
pub use driver::{ElementInfo, PageDriver, SessionFactory};
pub use fixture::{goto_root, reset_state, seed_user, step, ScenarioContext, SetupStep, StepFn};
pub use harness::{Group, PlannedScenario, RunObserver, Runner, ScenarioState, Suite};
pub use locator::{normalize_whitespace, text_matches, Locator, Nth, Role, Selector, Step};
pub use mock::{MockApp, MockDriver, MockFactory, MockNode, PageEvents, StaticPage};
pub use reporter::{
    Failure, FailureKind, ReportFormat, RunReport, ScenarioReport, ScenarioStatus,
};
pub use result::{HarnessError, HarnessResult};
pub use session::Session;
pub use wait::{poll_until, Check, PollPolicy, Stall};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        goto_root, reset_state, seed_user, step, Credential, DialogResponse, Group,
        HarnessConfig, HarnessError, HarnessResult, Locator, Role, Runner, ScenarioContext,
        Session, Suite,
    };
}
