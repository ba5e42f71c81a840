//! Public boundary of the satellite-access policy core.
//!
//! The outer telephony service links this crate and talks to
//! [`facade::Satlink`] only; everything else in the workspace is an
//! implementation detail reachable only through it.

pub mod facade;

pub use facade::{Satlink, TestOverrideRequest};
