use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::convert::{ExportOptions, ObstacleLayout};
use crate::error::ExportError;
use crate::region::{self, Region};
use crate::router::{CapacityPolicy, DEFAULT_CAPACITY};

#[derive(Parser, Debug)]
#[command(
    name = "bag2csv",
    about = "Export Apollo pose and obstacle channels from a ROS1 bag into CSV files",
    version
)]
#[command(group(ArgGroup::new("area").args(["bbox", "polygon", "region"])))]
pub struct Cli {
    /// Path to the .bag file
    pub bag: PathBuf,

    /// Existing directory for the CSV files
    #[arg(long = "out-dir", default_value = "out")]
    pub out_dir: PathBuf,

    /// Keep only obstacles inside XMIN,XMAX,YMIN,YMAX (bounds inclusive)
    #[arg(long = "bbox", value_name = "XMIN,XMAX,YMIN,YMAX", allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// Keep only obstacles inside the polygon "X1,Y1;X2,Y2;X3,Y3[;...]"
    #[arg(long = "polygon", value_name = "VERTICES", allow_hyphen_values = true)]
    pub polygon: Option<String>,

    /// Read the region from a JSON file
    #[arg(long = "region", value_name = "FILE")]
    pub region: Option<PathBuf>,

    /// Apply the region to pose samples as well
    #[arg(long = "filter-pose")]
    pub filter_pose: bool,

    /// Maximum number of distinct obstacle ids written to their own file
    #[arg(long = "capacity", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// What to do with obstacles beyond the capacity
    #[arg(long = "on-capacity", value_enum, default_value_t = CapacityPolicy::Drop)]
    pub on_capacity: CapacityPolicy,

    /// One file per obstacle id, or a single merged obstacle file
    #[arg(long = "obstacle-layout", value_enum, default_value_t = ObstacleLayout::PerEntity)]
    pub obstacle_layout: ObstacleLayout,

    /// Show a progress spinner while scanning
    #[arg(long = "progress")]
    pub progress: bool,
}

impl Cli {
    pub fn region(&self) -> Result<Region, ExportError> {
        if let Some(bbox) = &self.bbox {
            return region::parse_bbox(bbox);
        }
        if let Some(polygon) = &self.polygon {
            return region::parse_polygon(polygon);
        }
        if let Some(path) = &self.region {
            return Region::from_json_file(path);
        }
        Ok(Region::Unrestricted)
    }

    pub fn export_options(&self) -> Result<ExportOptions, ExportError> {
        Ok(ExportOptions {
            input: self.bag.clone(),
            out_dir: self.out_dir.clone(),
            region: self.region()?,
            filter_pose: self.filter_pose,
            capacity: self.capacity,
            on_capacity: self.on_capacity,
            obstacle_layout: self.obstacle_layout,
            show_progress: self.progress,
        })
    }
}
