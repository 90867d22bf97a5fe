#![forbid(unsafe_code)]

//! rampcheck: declarative ramp-up load profile for a CPU stress endpoint, plus a
//! fixed-layout end-of-run summary.
//!
//! Two halves:
//! 1. **Workload** ([`workload`], [`iteration`]): staged virtual-user ramp,
//!    threshold rules, target URL, and the per-iteration request/check body.
//! 2. **Report** ([`report`]): turns the load engine's aggregated summary into
//!    a text block, a JSON artifact, and threshold verdicts.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use rampcheck::prelude::*;
//!
//! let spec = WorkloadSpec::standard(std::env::var("API_URL").ok().as_deref())?;
//! assert_eq!(spec.peak_concurrency(), 100);
//! # Ok::<(), rampcheck::core::errors::RampError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod iteration;
pub mod logger;
pub mod report;
pub mod workload;
