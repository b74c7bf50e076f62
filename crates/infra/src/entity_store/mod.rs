//! Transactional entity store boundary.
//!
//! The consistency manager only talks to the relational store through these
//! traits: a store hands out transactions, and every read and write happens
//! inside one.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryEntityStore, InMemoryTx};
pub use postgres::{PostgresEntityStore, PostgresTx};
pub use r#trait::{EntityStore, PersistenceError, StoreTx, TxMode};
