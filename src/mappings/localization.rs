//! `/apollo/localization/pose` → pose table rows

use prost::Message;

use super::{Header, Point3D, Vec3, nan_point};
use crate::csv_writer::{Cell, CsvRow};

#[derive(Clone, PartialEq, Message)]
pub struct PointEnu {
    #[prost(double, optional, tag = "1")]
    pub x: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub y: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub z: Option<f64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Quaternion {
    #[prost(double, optional, tag = "1")]
    pub qx: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub qy: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub qz: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub qw: Option<f64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Pose {
    #[prost(message, optional, tag = "1")]
    pub position: Option<PointEnu>,
    #[prost(message, optional, tag = "2")]
    pub orientation: Option<Quaternion>,
    #[prost(message, optional, tag = "3")]
    pub linear_velocity: Option<Point3D>,
    #[prost(message, optional, tag = "4")]
    pub linear_acceleration: Option<Point3D>,
    #[prost(message, optional, tag = "5")]
    pub angular_velocity: Option<Point3D>,
    #[prost(double, optional, tag = "6")]
    pub heading: Option<f64>,
    #[prost(message, optional, tag = "9")]
    pub euler_angles: Option<Point3D>,
}

#[derive(Clone, PartialEq, Message)]
pub struct LocalizationEstimate {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(message, optional, tag = "2")]
    pub pose: Option<Pose>,
    #[prost(double, optional, tag = "4")]
    pub measurement_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

/// One decoded vehicle pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub timestamp_sec: f64,
    pub position: Vec3,
    pub heading: f64,
    pub orientation: Orientation,
    pub euler: Vec3,
    pub linear_acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub linear_velocity: Vec3,
}

impl From<&LocalizationEstimate> for PoseSample {
    fn from(msg: &LocalizationEstimate) -> Self {
        let timestamp_sec = msg.header.as_ref().and_then(|h| h.timestamp_sec).unwrap_or(0.0);
        let pose = msg.pose.clone().unwrap_or_default();

        // PointENU leaves x/y as NaN when unset but z defaults to zero.
        let position = pose
            .position
            .map(|p| Vec3 {
                x: p.x.unwrap_or(f64::NAN),
                y: p.y.unwrap_or(f64::NAN),
                z: p.z.unwrap_or(0.0),
            })
            .unwrap_or(Vec3 {
                x: f64::NAN,
                y: f64::NAN,
                z: 0.0,
            });
        let orientation = pose
            .orientation
            .map(|q| Orientation {
                qx: q.qx.unwrap_or(f64::NAN),
                qy: q.qy.unwrap_or(f64::NAN),
                qz: q.qz.unwrap_or(f64::NAN),
                qw: q.qw.unwrap_or(f64::NAN),
            })
            .unwrap_or(Orientation {
                qx: f64::NAN,
                qy: f64::NAN,
                qz: f64::NAN,
                qw: f64::NAN,
            });

        PoseSample {
            timestamp_sec,
            position,
            heading: pose.heading.unwrap_or(0.0),
            orientation,
            euler: nan_point(pose.euler_angles.as_ref()),
            linear_acceleration: nan_point(pose.linear_acceleration.as_ref()),
            angular_velocity: nan_point(pose.angular_velocity.as_ref()),
            linear_velocity: nan_point(pose.linear_velocity.as_ref()),
        }
    }
}

pub fn decode_pose(payload: &[u8]) -> Result<PoseSample, prost::DecodeError> {
    let msg = LocalizationEstimate::decode(payload)?;
    Ok(PoseSample::from(&msg))
}

impl CsvRow for PoseSample {
    const COLUMNS: &'static [&'static str] = &[
        "timestamp_sec",
        "position_x",
        "position_y",
        "position_z",
        "heading",
        "qx",
        "qy",
        "qz",
        "qw",
        "euler_x",
        "euler_y",
        "euler_z",
        "linear_accel_x",
        "linear_accel_y",
        "linear_accel_z",
        "angular_vel_x",
        "angular_vel_y",
        "angular_vel_z",
        "linear_vel_x",
        "linear_vel_y",
        "linear_vel_z",
        "heading",
    ];

    fn cells(&self) -> Vec<Cell> {
        let o = &self.orientation;
        let mut cells = Vec::with_capacity(Self::COLUMNS.len());
        cells.push(Cell::from(self.timestamp_sec));
        cells.extend(self.position.cells());
        cells.push(Cell::from(self.heading));
        cells.extend([o.qx, o.qy, o.qz, o.qw].map(Cell::from));
        cells.extend(self.euler.cells());
        cells.extend(self.linear_acceleration.cells());
        cells.extend(self.angular_velocity.cells());
        cells.extend(self.linear_velocity.cells());
        cells.push(Cell::from(self.heading));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_writer::render_row;

    fn point(x: f64, y: f64, z: f64) -> Option<Point3D> {
        Some(Point3D {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        })
    }

    #[test]
    fn test_decode_full_pose() {
        let msg = LocalizationEstimate {
            header: Some(Header {
                timestamp_sec: Some(1.0),
                ..Default::default()
            }),
            pose: Some(Pose {
                position: Some(PointEnu {
                    x: Some(10.0),
                    y: Some(20.0),
                    z: Some(0.0),
                }),
                orientation: Some(Quaternion {
                    qx: Some(0.0),
                    qy: Some(0.0),
                    qz: Some(0.0),
                    qw: Some(1.0),
                }),
                heading: Some(0.5),
                euler_angles: point(0.1, 0.2, 0.3),
                linear_acceleration: point(1.0, 2.0, 3.0),
                angular_velocity: point(4.0, 5.0, 6.0),
                linear_velocity: point(7.0, 8.0, 9.0),
            }),
            measurement_time: None,
        };

        let sample = decode_pose(&msg.encode_to_vec()).unwrap();
        assert_eq!(sample.timestamp_sec, 1.0);
        assert_eq!(sample.position, Vec3 { x: 10.0, y: 20.0, z: 0.0 });
        assert_eq!(sample.orientation.qw, 1.0);
        assert_eq!(sample.euler.z, 0.3);
        assert_eq!(sample.linear_velocity.x, 7.0);

        let cells = sample.cells();
        assert_eq!(cells.len(), PoseSample::COLUMNS.len());
        assert_eq!(cells[4], Cell::Float(0.5));
        assert_eq!(cells[21], Cell::Float(0.5));
    }

    #[test]
    fn test_unset_fields_follow_proto_defaults() {
        let sample = decode_pose(&[]).unwrap();
        assert_eq!(sample.timestamp_sec, 0.0);
        assert!(sample.position.x.is_nan());
        assert_eq!(sample.position.z, 0.0);
        assert_eq!(sample.heading, 0.0);
        assert!(sample.orientation.qw.is_nan());
        assert!(sample.angular_velocity.y.is_nan());

        let row = render_row(&sample.cells());
        assert!(row.starts_with("0.000000;nan;nan;0.000000;0.000000;nan;"));
    }

    #[test]
    fn test_truncated_payload_fails() {
        // field 1, length-delimited, claims 5 bytes but only 2 follow
        assert!(decode_pose(&[0x0a, 0x05, 0x09, 0x00]).is_err());
    }
}
