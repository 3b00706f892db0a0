//! deckhand core - types shared by every deckhand crate
//!
//! - `Manifest`: the release manifest file, with paths resolved
//! - `Values`: configuration values with deep merge and `--set` parsing
//! - `Chart`: an in-memory chart bundle
//! - `Release`: release state reported by the deployment service
//! - `RenderContext`: what templates see when a chart is rendered
//! - `StatusReport`: the textual status layout

pub mod chart;
pub mod context;
pub mod error;
pub mod manifest;
pub mod release;
pub mod status;
pub mod values;

pub use chart::{Chart, ChartMetadata};
pub use context::{Capabilities, KubeVersion, ReleaseOptions, RenderContext};
pub use error::{CoreError, Result};
pub use manifest::Manifest;
pub use release::{Release, ReleaseInfo, ReleaseStatus, StatusInfo, TestSuiteRun};
pub use status::StatusReport;
pub use values::{Values, merge_overrides, parse_set_values};
