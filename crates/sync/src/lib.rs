//! Sync layer for Moneyvate.
//!
//! Owns the in-memory ledgers for one user session and keeps them consistent
//! with the remote document store and the payment gateway.
//!
//! # Modules
//!
//! - `store` - Document store abstraction and field paths
//! - `document` - Goal document codec, including legacy layouts
//! - `memory` - In-memory document store
//! - `gateway` - Payment gateway abstraction
//! - `reconciler` - Persisting missed-day batches
//! - `projection` - Read-only view published to consumers
//! - `coordinator` - The session owner of all ledgers
//! - `error` - Sync error types

pub mod coordinator;
pub mod document;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod projection;
pub mod reconciler;
pub mod store;

pub use coordinator::{CoordinatorSettings, CreatedGoal, ReconciliationReport, SnapshotReport, SyncCoordinator};
pub use document::{DecodeError, DecodedGoal, GoalDocumentCodec};
pub use error::SyncError;
pub use gateway::{ChargeIntent, GatewayError, PaymentGateway, UnavailableGateway};
pub use memory::InMemoryDocumentStore;
pub use projection::{GoalSummary, LedgerProjection};
pub use store::{DocumentStore, FieldPath, GoalSnapshot, RawDocument, StoreError};
