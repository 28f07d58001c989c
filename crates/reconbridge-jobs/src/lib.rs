//! Blocking job runner and progress monitoring for reconbridge.
//!
//! This crate runs long, blocking work (typically an external reconstruction
//! tool) on a dedicated background thread per job and reports its progress
//! to a poller living on the UI thread:
//!
//! - [`ExclusionRegistry`] - At most one running job per [`JobKind`]
//! - [`JobRunner`] - One job invocation, from exclusion to finalization
//! - [`StatusCell`] - Status record shared between worker and poller
//! - [`ProgressReporter`] - Direct progress callbacks from the work
//! - [`LogTailer`] - Progress scraped from the shared [`LogSink`]
//! - [`UiBridge`] - Polls jobs on a [`RepeatingTimer`] and draws a [`ProgressView`]
//! - [`ToolCommand`] - Runs external tools as job work

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bridge;
mod definition;
mod error;
mod kind;
pub mod progress;
mod registry;
mod runner;
mod status;
mod subprocess;
mod timer;

pub use bridge::{FinishedHook, ProgressView, UiBridge};
pub use definition::{JobContext, JobDefinition};
pub use error::{BoxError, JobError, Result, SinkError};
pub use kind::JobKind;
pub use progress::{
    LogPatterns, LogSink, LogTailer, PatternError, ProgressChannel, ProgressReporter,
    ProgressSource,
};
pub use registry::{ExclusionRegistry, KindLease};
pub use runner::{JobId, JobOutcome, JobRunner, Poll};
pub use status::{JobSnapshot, JobStatus, StatusCell};
pub use subprocess::{OutputStream, SubprocessError, ToolCommand};
pub use timer::RepeatingTimer;
