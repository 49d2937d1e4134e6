//! # Extraction Scheduler
//!
//! A batch scheduling and timed capacity-negotiation engine for repeating
//! extraction cycles against remote targets.
//!
//! The engine keeps a target's two mutable properties, a depletable value
//! and an accumulating penalty, pinned at their optimal bounds while
//! continuously issuing time-precise bursts of work. The hard part is not
//! any single operation but coordinating four differently-timed operations
//! so they land in a required temporal order at a shared remote target,
//! while sharing a finite, externally-owned capacity pool with other
//! concurrent consumers, using only asynchronous message exchange.
//!
//! ## Core Components
//!
//! - **Message envelope protocol**: correlation-and-timeout request/response
//!   framing over a shared channel ([`infra::envelope`])
//! - **Capacity negotiation client**: typed "reserve capacity for
//!   \[start, end) costing R units" exchange ([`infra::negotiation`])
//! - **Thread-balance optimizer**: largest thread allocation such that
//!   replenishment always fully offsets depletion ([`core::optimizer`])
//! - **Batch timing planner**: four-stage job timestamps with interlocking
//!   deadlines ([`core::planner`])
//! - **Batch pipeliner**: cadence-shifted replication of a seed batch to
//!   keep capacity saturated ([`core::pipeline`])
//! - **Scheduling client loop**: per-job reservation with abort-forward
//!   truncation on the first denial ([`core::scheduler`])
//! - **Cycle controller**: the Preparing / SteadyCycle / Correcting state
//!   machine driving the whole cycle ([`core::controller`])
//!
//! ## Concurrency Model
//!
//! A single logical task per running instance. Concurrency arises from
//! multiple instances communicating only through shared message channels;
//! there is no shared mutable memory between instances. Every wait
//! (negotiation round-trip, sleep-until-timestamp, dispatcher handoff) is
//! an explicit suspension point.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use extraction_scheduler::config::EngineConfig;
//! use extraction_scheduler::core::CycleController;
//! use extraction_scheduler::infra::SharedChannel;
//! use extraction_scheduler::world::TracingSink;
//!
//! let allocator = SharedChannel::new(50);
//! let dispatcher = SharedChannel::new(50);
//! let mut controller = CycleController::new(
//!     Arc::new(my_world_provider),
//!     TracingSink,
//!     allocator,
//!     dispatcher,
//!     vec!["target-7".into(), "target-12".into()],
//!     EngineConfig::default(),
//! )?;
//! controller.run_once().await?;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling engine: jobs, planning, balancing, pipelining, control.
pub mod core;
/// Configuration models for the engine and operation cost tables.
pub mod config;
/// Infrastructure for shared channels and the envelope protocol.
pub mod infra;
/// External world-state boundary: providers, caching, notifications.
pub mod world;
/// Shared utilities.
pub mod util;
