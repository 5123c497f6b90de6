//! Geohash 编解码
//!
//! 对经度和纬度交替做二分，从经度开始，每 5 位打包成 base-32 字母表中的一个字符。
//! 前缀相同的键落在同一个单元内，因此对有序索引做字典序范围扫描就能近似邻近搜索。
//!
//! ## 边界行为
//!
//! 恰好落在中点上的值进入下半区（比较是严格的 `>`），所以 `encode(0.0, 0.0, 1)`
//! 是 `"7"` 而不是 `"s"`。

use geo::{Coord, Polygon, Rect};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Base-32 geohash 字母表（不含 `a`、`i`、`l`、`o`）
pub const ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// 每个字符携带的位数
pub const BITS_PER_CHAR: usize = 5;

/// ASCII -> 字母表下标，字母表外为 -1
const DECODE_TABLE: [i8; 128] = build_decode_table();

const fn build_decode_table() -> [i8; 128] {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as i8;
        i += 1;
    }
    table
}

/// 查找 geohash 字符对应的 5 位值
///
/// 字母表外的字符（包括大写）返回 `None`。
pub fn symbol_index(c: char) -> Option<u8> {
    let code = c as u32;
    if code >= 128 {
        return None;
    }
    match DECODE_TABLE[code as usize] {
        -1 => None,
        index => Some(index as u8),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Longitude,
    Latitude,
}

impl Axis {
    fn flip(self) -> Self {
        match self {
            Axis::Longitude => Axis::Latitude,
            Axis::Latitude => Axis::Longitude,
        }
    }
}

/// geohash 单元：纬度和经度区间，单位：度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// 整个世界，即空 geohash 的单元
    pub const WORLD: BoundingBox = BoundingBox {
        lat_min: -90.0,
        lat_max: 90.0,
        lon_min: -180.0,
        lon_max: 180.0,
    };

    fn midpoint(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Longitude => (self.lon_min + self.lon_max) / 2.0,
            Axis::Latitude => (self.lat_min + self.lat_max) / 2.0,
        }
    }

    /// 将 `axis` 的区间减半，`upper` 为真时保留上半区
    fn narrow(&mut self, axis: Axis, upper: bool) {
        let mid = self.midpoint(axis);
        match (axis, upper) {
            (Axis::Longitude, true) => self.lon_min = mid,
            (Axis::Longitude, false) => self.lon_max = mid,
            (Axis::Latitude, true) => self.lat_min = mid,
            (Axis::Latitude, false) => self.lat_max = mid,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            self.midpoint(Axis::Latitude),
            self.midpoint(Axis::Longitude),
        )
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// 单元中心的最大纬度误差（度）
    pub fn lat_error(&self) -> f64 {
        self.height() / 2.0
    }

    /// 单元中心的最大经度误差（度）
    pub fn lon_error(&self) -> f64 {
        self.width() / 2.0
    }

    /// 闭区间包含判定
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coord.latitude)
            && (self.lon_min..=self.lon_max).contains(&coord.longitude)
    }

    /// 转换为 `geo` 多边形（x = 经度，y = 纬度）
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            Coord {
                x: self.lon_min,
                y: self.lat_min,
            },
            Coord {
                x: self.lon_max,
                y: self.lat_max,
            },
        )
        .to_polygon()
    }
}

/// 将坐标编码为恰好 `precision` 个字符的 geohash
///
/// 不校验输入：越界的值会一直选择上（或下）半区，最终落在极点或反子午线沿线的单元里。
/// 需要严格校验时使用 [`Coordinate::validate`]。
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> String {
    let mut hash = String::with_capacity(precision);
    let mut bbox = BoundingBox::WORLD;
    let mut axis = Axis::Longitude;
    let mut bits = 0usize;
    let mut bit_count = 0;

    while hash.len() < precision {
        let value = match axis {
            Axis::Longitude => longitude,
            Axis::Latitude => latitude,
        };
        let upper = value > bbox.midpoint(axis);
        bbox.narrow(axis, upper);
        bits = (bits << 1) | upper as usize;
        bit_count += 1;
        axis = axis.flip();

        if bit_count == BITS_PER_CHAR {
            hash.push(ALPHABET[bits] as char);
            bits = 0;
            bit_count = 0;
        }
    }

    hash
}

/// 将 geohash 解码为所在单元
///
/// 字母表外的字符直接跳过，不消耗任何位，所以解码不会失败。没有任何有效字符时返回
/// [`BoundingBox::WORLD`]。
pub fn decode_bbox(geohash: &str) -> BoundingBox {
    let mut bbox = BoundingBox::WORLD;
    let mut axis = Axis::Longitude;

    for index in geohash.chars().filter_map(symbol_index) {
        for shift in (0..BITS_PER_CHAR).rev() {
            let upper = (index >> shift) & 1 == 1;
            bbox.narrow(axis, upper);
            axis = axis.flip();
        }
    }

    bbox
}

/// 将 geohash 解码为单元中心
pub fn decode(geohash: &str) -> Coordinate {
    decode_bbox(geohash).center()
}
