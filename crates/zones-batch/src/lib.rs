//! # zones-batch — Batch Containment Coordinator
//!
//! Answers many independent, keyed "does any of these zones contain this
//! point" questions in one call, on a bounded pool of worker tasks that
//! share the store's connection pool.
//!
//! ## Key Design Principles
//!
//! - **Validate before fan-out.** A batch that fails validation never
//!   acquires a connection or starts a worker.
//! - **One connection per worker.** Each worker holds exactly one pooled
//!   connection for its lifetime and releases it on exit, including on error.
//! - **Headroom for everyone else.** Workers of all batches together hold at
//!   most `pool capacity - reserved` connections.
//! - **First error wins.** Any acquisition or evaluation failure cancels the
//!   shared scope and becomes the batch's outcome. Remaining workers are
//!   drained, never abandoned, and no partial results are returned.
//! - **Cancellation is observed, not polled.** Workers block on "next task"
//!   and "cancelled" at the same time.
//!
//! ## Crate Policy
//!
//! - The coordinator is generic over [`zones_store::ConnectionPool`] and
//!   [`zones_store::ContainmentEvaluator`]; the HTTP layer sees it only
//!   through the object-safe [`BatchContainment`] trait.
//! - Deadlines are expressed by cancelling the caller's token
//!   ([`Deadline`]); there is no per-query timeout.

pub mod coordinator;
pub mod deadline;
pub mod error;

pub use coordinator::{
    BatchContainment, BatchContainmentCoordinator, CoordinatorConfig,
    DEFAULT_RESERVED_CONNECTIONS, MAX_WORKERS,
};
pub use deadline::Deadline;
pub use error::BatchError;
