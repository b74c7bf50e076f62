//! Pet store domain module (stores, employees, customers).
//!
//! This crate contains the business rules of the store aggregate, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod customer;
pub mod employee;
pub mod ownership;
pub mod store;

pub use customer::{Customer, CustomerFields};
pub use employee::{Employee, EmployeeFields};
pub use ownership::{MembershipPolicy, Owned, Owners, OwnershipValidator};
pub use store::{Store, StoreFields};
