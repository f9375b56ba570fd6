//! Channel dispatch and payload decoding for the exported Apollo channels.

pub mod localization;
pub mod perception;

use prost::Message;

use crate::csv_writer::Cell;
use crate::error::DecodeFailure;
use crate::rosbags_io::LogRecord;

pub use localization::PoseSample;
pub use perception::ObstacleSample;

pub const POSE_CHANNEL: &str = "/apollo/localization/pose";
pub const OBSTACLES_CHANNEL: &str = "/apollo/perception/obstacles";

/// The channels this tool knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Pose,
    Obstacles,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Pose, Channel::Obstacles];

    /// Exact-match lookup; anything else is unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            POSE_CHANNEL => Some(Channel::Pose),
            OBSTACLES_CHANNEL => Some(Channel::Obstacles),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Pose => POSE_CHANNEL,
            Channel::Obstacles => OBSTACLES_CHANNEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Pose(PoseSample),
    ObstacleList(Vec<ObstacleSample>),
    Unrecognized,
}

/// Decode a record by its channel. Unknown channels are not an error.
pub fn decode(record: &LogRecord) -> Result<DecodedMessage, DecodeFailure> {
    let Some(channel) = Channel::from_name(&record.channel) else {
        return Ok(DecodedMessage::Unrecognized);
    };
    let failure = |source| DecodeFailure {
        channel: channel.name(),
        source,
    };
    match channel {
        Channel::Pose => localization::decode_pose(&record.payload)
            .map(DecodedMessage::Pose)
            .map_err(failure),
        Channel::Obstacles => perception::decode_obstacles(&record.payload)
            .map(DecodedMessage::ObstacleList)
            .map_err(failure),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Header {
    #[prost(double, optional, tag = "1")]
    pub timestamp_sec: Option<f64>,
    #[prost(string, optional, tag = "2")]
    pub module_name: Option<String>,
    #[prost(uint32, optional, tag = "3")]
    pub sequence_num: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Point3D {
    #[prost(double, optional, tag = "1")]
    pub x: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub y: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn cells(&self) -> [Cell; 3] {
        [Cell::from(self.x), Cell::from(self.y), Cell::from(self.z)]
    }
}

/// `Point3D` components default to NaN when absent.
pub(crate) fn nan_point(p: Option<&Point3D>) -> Vec3 {
    Vec3 {
        x: p.and_then(|p| p.x).unwrap_or(f64::NAN),
        y: p.and_then(|p| p.y).unwrap_or(f64::NAN),
        z: p.and_then(|p| p.z).unwrap_or(f64::NAN),
    }
}
