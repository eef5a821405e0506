//! Test utilities shared by use case and route tests.
//!
//! This module provides:
//! - In-memory repository implementations for mocking persistence
//! - Stub collaborators for the payment gateway, clock and sleeper
//! - Test data factories and an `AppState` builder for HTTP tests

mod app_state_builder;
mod clock_mocks;
mod factories;
mod gateway_mocks;
mod ledger_mocks;

pub use app_state_builder::*;
pub use clock_mocks::*;
pub use factories::*;
pub use gateway_mocks::*;
pub use ledger_mocks::*;
