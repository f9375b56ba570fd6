//! bag2csv - Export Apollo localization and perception channels to CSV
//!
//! This library reads ROS1 bag files recorded by Apollo (protobuf payloads on
//! `/apollo/localization/pose` and `/apollo/perception/obstacles`) in a single
//! forward pass and writes per-stream, `;`-separated tables for offline
//! analysis.
//!
//! # Features
//!
//! - **Pose**: one row per `LocalizationEstimate` in `{bag}-pose.csv`
//! - **Obstacles**: one file per obstacle id, in first-seen order, from a
//!   bounded pool (`{bag}-obstacle{slot}.csv`), or a single merged file
//! - **Region of interest**: bounding box or polygon filter on obstacle
//!   positions (optionally on poses), with points on the boundary kept
//! - **Summary**: counts of scanned records, decode failures, filtered and
//!   dropped samples
//!
//! # Example
//!
//! ```rust,no_run
//! use bag2csv::{export_bag, ExportOptions, region};
//!
//! let mut options = ExportOptions::new("input.bag");
//! options.region =
//!     region::parse_polygon("586610,4208097;586615,4208098;586618,4208090;586613,4208089")?;
//!
//! let summary = export_bag(&options)?;
//! summary.print_table();
//! # Ok::<(), bag2csv::ExportError>(())
//! ```

pub mod cli;
pub mod convert;
pub mod csv_writer;
pub mod error;
pub mod mappings;
pub mod region;
pub mod rosbags_io;
pub mod router;

// Re-export main types for convenience
pub use convert::{
    ExportOptions, ExportPipeline, ExportState, ExportSummary, ObstacleLayout, export_bag,
};
pub use error::{DecodeFailure, ExportError};
pub use mappings::{Channel, DecodedMessage, ObstacleSample, PoseSample};
pub use region::{Classification, Region};
pub use rosbags_io::{BagScanner, LogRecord};
pub use router::{CapacityPolicy, EntityRouter};
