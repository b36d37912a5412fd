//! Backend client and job orchestration for surety simulations.
//!
//! Provides the HTTP API wrapper, the [`backend::JobBackend`] seam, job
//! submission, the status poller with its cancel handle, result
//! hydration, the single-job [`slot::JobSlot`] and the two-method
//! [`compare::MethodComparer`].

pub mod api;
pub mod backend;
pub mod compare;
pub mod credentials;
pub mod error;
pub mod hydrator;
pub mod input;
pub mod poller;
pub mod slot;
pub mod submitter;
pub mod wire;
