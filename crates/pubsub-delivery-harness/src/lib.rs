//! # Pub/Sub Delivery Verification Harness
//!
//! Drives a deployed publisher app and subscriber app through failure
//! injection scenarios and checks what the broker delivers.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────┐  set mode / initialize   ┌──────────────┐        ┌────────────┐
//! │ Orchestrator │─────────────────────────▶│  Publisher   │──────▶ │ Subscriber │
//! │              │  publish (rate limited)  │     app      │ broker │    app     │
//! │              │─────────────────────────▶│              │        │  (ledger)  │
//! │              │  getMessages (polled)    │              │◀───────│            │
//! └──────────────┘◀─────────────────────────└──────────────┘        └────────────┘
//! ```
//!
//! Properties checked:
//!
//! - **At-least-once**: with the subscriber acknowledging, every accepted
//!   message shows up in the ledger.
//! - **No spurious redelivery**: once an empty acknowledgement resolved a
//!   delivery, a reset ledger stays empty.
//! - **Redelivery until acknowledged**: after error, retry or invalid-status
//!   acknowledgements, switching to success brings every message back.
//!
//! Comparisons sort identifiers first; delivery order is never asserted.
//!
//! ## Example
//!
//! ```ignore
//! use harness_config_and_utils::Config;
//! use pubsub_delivery_harness::{run_all, ScenarioKind, TestEnvironment};
//!
//! let env = TestEnvironment::from_config(&Config::default(), None)?;
//! let report = run_all(&env, &ScenarioKind::ALL).await;
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod channels;
pub mod clock;
pub mod controller;
pub mod delivery_set;
mod environment;
mod error;
pub mod health;
pub mod ids;
mod orchestrator;
pub mod poller;
pub mod publisher;
pub mod rate_limiter;
pub mod report;
pub mod scenario;
pub mod transport;

pub use channels::{Channel, ChannelSpec, DeliveryExpectation};
pub use clock::{Clock, ManualClock, TokioClock};
pub use controller::{ControlCommand, RemoteController, SubscriberMode};
pub use delivery_set::{compare, ChannelMismatch, Comparison, DeliverySet};
pub use environment::{HarnessSettings, TestEnvironment};
pub use error::{HarnessError, HarnessResult};
pub use orchestrator::{run_all, run_scenario};
pub use poller::{ConvergencePoller, PollOutcome};
pub use publisher::{Payload, PublishCommand, PublishDriver, PublishOutcome};
pub use report::{RunReport, ScenarioOutcome, ScenarioReport};
pub use scenario::{ExpectedOutcome, ScenarioConfig, ScenarioKind, ScenarioPhase};
pub use transport::{HarnessTransport, HttpReply, ReqwestTransport};
