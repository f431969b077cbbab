//! Acquisition engine abstraction and its simulated implementation.

pub mod engine;
pub mod mock;

pub use engine::AcquisitionEngine;
pub use mock::MockEngine;
