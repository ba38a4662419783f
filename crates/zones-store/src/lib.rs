//! # zones-store — Storage Collaborator
//!
//! Capability traits through which the rest of the service reaches the
//! spatial store, and their PostGIS implementation.
//!
//! ## Capabilities
//!
//! | Trait | Used by | Purpose |
//! |-------|---------|---------|
//! | [`ZoneSaver`] | create-zone route | persist a validated feature collection as one zone |
//! | [`ZoneProvider`] | read / single-contains routes | render zones, answer per-zone containment |
//! | [`ZoneDeleter`] | delete route | cascade-delete a zone |
//! | [`ConnectionPool`] | batch coordinator | hand out one connection per worker |
//! | [`ContainmentEvaluator`] | batch coordinator | "does the union of these zones contain this point" over a supplied connection |
//!
//! The point-in-polygon predicate is always evaluated by the store
//! (`ST_Contains`); nothing in this crate does geometry math.

pub mod error;
pub mod postgres;
pub mod traits;
pub mod wkb;

pub use error::StoreError;
pub use postgres::{PgZoneStore, PoolSettings};
pub use traits::{
    ConnectionPool, ContainmentEvaluator, ZoneDeleter, ZoneProvider, ZoneSaver, ZoneStore,
};
