use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};

/// 经纬度坐标（WGS84，单位：度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display)]
#[display(fmt = "({}, {})", latitude, longitude)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// 校验坐标是否有限且在合法范围内
    ///
    /// `encode` 本身不做校验，越界输入会偏向最近的极点或反子午线；
    /// 需要严格语义的调用方（服务边界）在这里拒绝。
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }

    /// 以指定精度编码为 geohash
    pub fn geohash(&self, precision: usize) -> String {
        super::encode(self.latitude, self.longitude, precision)
    }

    /// 到另一点的大圆距离（公里）
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        super::distance(*self, *other)
    }
}

// geo 使用 (x, y) = (lon, lat)
impl From<Coordinate> for geo::Point<f64> {
    fn from(coord: Coordinate) -> Self {
        geo::Point::new(coord.longitude, coord.latitude)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(point: geo::Point<f64>) -> Self {
        Coordinate::new(point.y(), point.x())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(37.7749, -122.4194).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(matches!(
            Coordinate::new(90.5, 0.0).validate(),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5).validate(),
            Err(GeoError::InvalidLongitude(_))
        ));
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0).validate(),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, f64::INFINITY).validate(),
            Err(GeoError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_point_conversion_swaps_axes() {
        let coord = Coordinate::new(39.9, 116.4);
        let point: geo::Point<f64> = coord.into();
        assert_eq!(point.x(), 116.4);
        assert_eq!(point.y(), 39.9);
        assert_eq!(Coordinate::from(point), coord);
    }

    #[test]
    fn test_display() {
        assert_eq!(Coordinate::new(1.5, -2.25).to_string(), "(1.5, -2.25)");
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_value(Coordinate::new(1.0, 2.0)).unwrap();
        assert_eq!(json["latitude"], 1.0);
        assert_eq!(json["longitude"], 2.0);
    }
}
