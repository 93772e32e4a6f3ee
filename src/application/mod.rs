//! Application layer orchestrating donation checkouts.
//!
//! `DonationWorkflow` runs each submit action as an ordered pipeline of
//! fallible async steps against injected collaborators. The first failing step
//! stops the pipeline and its error is captured into the submission's state.

pub mod donation;
