//! Form sources and guarded form submission.
//!
//! [`FormSource`] and [`FormLookup`] abstract over whatever the host uses to
//! represent forms. [`FormGuard`] binds one form to an [`Ajax`](crate::Ajax)
//! instance so that each submit event sends the form as a request, with
//! overlapping submissions suppressed.

mod guard;
mod source;

pub use guard::{
    Confirmation, FormGuard, FormGuardOptions, GuardPhase, SubmitEvent, SubmitOutcome,
};
pub use source::{ControlKind, FormControl, FormLookup, FormSnapshot, FormSource, SelectOption};
