//! `/apollo/perception/obstacles` → per-obstacle table rows

use prost::Message;

use super::{Header, Point3D, Vec3, nan_point};
use crate::csv_writer::{Cell, CsvRow};

#[derive(Clone, PartialEq, Message)]
pub struct PerceptionObstacle {
    #[prost(int32, optional, tag = "1")]
    pub id: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Point3D>,
    #[prost(double, optional, tag = "3")]
    pub theta: Option<f64>,
    #[prost(message, optional, tag = "4")]
    pub velocity: Option<Point3D>,
    #[prost(double, optional, tag = "5")]
    pub length: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub width: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub height: Option<f64>,
    /// `PerceptionObstacle.Type`, kept as its wire value.
    #[prost(int32, optional, tag = "10")]
    pub obstacle_type: Option<i32>,
    #[prost(double, optional, tag = "11")]
    pub timestamp: Option<f64>,
    #[prost(message, optional, tag = "16")]
    pub acceleration: Option<Point3D>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PerceptionObstacles {
    #[prost(message, repeated, tag = "1")]
    pub perception_obstacle: Vec<PerceptionObstacle>,
    #[prost(message, optional, tag = "2")]
    pub header: Option<Header>,
}

/// One perceived object at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleSample {
    pub timestamp_sec: f64,
    pub id: i32,
    pub theta: f64,
    pub obstacle_type: i32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl ObstacleSample {
    fn from_obstacle(timestamp_sec: f64, obstacle: &PerceptionObstacle) -> Self {
        ObstacleSample {
            timestamp_sec,
            id: obstacle.id.unwrap_or(0),
            theta: obstacle.theta.unwrap_or(0.0),
            obstacle_type: obstacle.obstacle_type.unwrap_or(0),
            position: nan_point(obstacle.position.as_ref()),
            velocity: nan_point(obstacle.velocity.as_ref()),
            acceleration: nan_point(obstacle.acceleration.as_ref()),
        }
    }
}

/// Decode an obstacle list. Every entry carries the list header's timestamp.
pub fn decode_obstacles(payload: &[u8]) -> Result<Vec<ObstacleSample>, prost::DecodeError> {
    let msg = PerceptionObstacles::decode(payload)?;
    let timestamp_sec = msg.header.as_ref().and_then(|h| h.timestamp_sec).unwrap_or(0.0);
    Ok(msg
        .perception_obstacle
        .iter()
        .map(|o| ObstacleSample::from_obstacle(timestamp_sec, o))
        .collect())
}

impl CsvRow for ObstacleSample {
    const COLUMNS: &'static [&'static str] = &[
        "timestamp_sec",
        "id",
        "theta",
        "type",
        "position_x",
        "position_y",
        "position_z",
        "velocity_x",
        "velocity_y",
        "velocity_z",
        "acceleration_x",
        "acceleration_y",
        "acceleration_z",
    ];

    fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(Self::COLUMNS.len());
        cells.push(Cell::from(self.timestamp_sec));
        cells.push(Cell::from(self.id));
        cells.push(Cell::from(self.theta));
        cells.push(Cell::from(self.obstacle_type));
        cells.extend(self.position.cells());
        cells.extend(self.velocity.cells());
        cells.extend(self.acceleration.cells());
        cells
    }
}
