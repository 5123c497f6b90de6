use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::codec::{decode_bbox, encode, symbol_index};

/// 八个方位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[display(fmt = "n")]
    North,
    #[display(fmt = "ne")]
    NorthEast,
    #[display(fmt = "e")]
    East,
    #[display(fmt = "se")]
    SouthEast,
    #[display(fmt = "s")]
    South,
    #[display(fmt = "sw")]
    SouthWest,
    #[display(fmt = "w")]
    West,
    #[display(fmt = "nw")]
    NorthWest,
}

impl Direction {
    /// 顺时针，从正北开始
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// 以单元为单位的 (纬度, 经度) 偏移
    fn offset(self) -> (f64, f64) {
        match self {
            Direction::North => (1.0, 0.0),
            Direction::NorthEast => (1.0, 1.0),
            Direction::East => (0.0, 1.0),
            Direction::SouthEast => (-1.0, 1.0),
            Direction::South => (-1.0, 0.0),
            Direction::SouthWest => (-1.0, -1.0),
            Direction::West => (0.0, -1.0),
            Direction::NorthWest => (1.0, -1.0),
        }
    }
}

/// 相邻单元的 geohash，精度与输入相同
///
/// 将单元中心沿指定方向平移一个单元再重新编码。经度跨越反子午线时回绕；
/// 极点以外没有相邻单元，返回 `None`。无效字符与 `decode` 一样被忽略。
pub fn neighbor(geohash: &str, direction: Direction) -> Option<String> {
    let precision = geohash.chars().filter(|c| symbol_index(*c).is_some()).count();
    if precision == 0 {
        return None;
    }

    let bbox = decode_bbox(geohash);
    let center = bbox.center();
    let (d_lat, d_lon) = direction.offset();

    let latitude = center.latitude + d_lat * bbox.height();
    if !(-90.0..=90.0).contains(&latitude) {
        return None;
    }

    let mut longitude = center.longitude + d_lon * bbox.width();
    if longitude >= 180.0 {
        longitude -= 360.0;
    } else if longitude < -180.0 {
        longitude += 360.0;
    }

    Some(encode(latitude, longitude, precision))
}

/// 所有存在的相邻单元，按 [`Direction::ALL`] 的顺序
pub fn neighbors(geohash: &str) -> Vec<(Direction, String)> {
    Direction::ALL
        .iter()
        .filter_map(|&direction| neighbor(geohash, direction).map(|hash| (direction, hash)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geohash::{decode, distance};

    #[test]
    fn test_reference_neighbors() {
        let expected = [
            (Direction::North, "ezs48"),
            (Direction::NorthEast, "ezs49"),
            (Direction::East, "ezs43"),
            (Direction::SouthEast, "ezs41"),
            (Direction::South, "ezs40"),
            (Direction::SouthWest, "ezefp"),
            (Direction::West, "ezefr"),
            (Direction::NorthWest, "ezefx"),
        ];
        for (direction, hash) in expected {
            assert_eq!(neighbor("ezs42", direction).as_deref(), Some(hash), "{}", direction);
        }
    }

    #[test]
    fn test_neighbors_of_san_francisco() {
        let found: Vec<String> = neighbors("9q8yyk").into_iter().map(|(_, h)| h).collect();
        assert_eq!(
            found,
            vec!["9q8yym", "9q8yyt", "9q8yys", "9q8yye", "9q8yy7", "9q8yy5", "9q8yyh", "9q8yyj"]
        );
    }

    #[test]
    fn test_antimeridian_wraps() {
        assert_eq!(neighbor("zzzz", Direction::East).as_deref(), Some("bpbp"));
        assert_eq!(neighbor("zzzz", Direction::SouthEast).as_deref(), Some("bpbn"));
    }

    #[test]
    fn test_no_neighbor_beyond_pole() {
        assert_eq!(neighbor("zzzz", Direction::North), None);
        assert_eq!(neighbor("zzzz", Direction::NorthWest), None);
        assert_eq!(neighbors("zzzz").len(), 5);
    }

    #[test]
    fn test_empty_geohash_has_no_neighbors() {
        assert!(neighbors("").is_empty());
        assert!(neighbors("!!").is_empty());
    }

    #[test]
    fn test_neighbors_are_adjacent_cells() {
        let hash = "u4pruyd";
        let center = decode(hash);
        for (direction, other) in neighbors(hash) {
            assert_eq!(other.len(), hash.len());
            assert_ne!(other, hash);
            // 7 位精度单元约 153m x 153m（该纬度下经度方向更窄）
            let d = distance(center, decode(&other));
            assert!(d < 0.25, "{} neighbor {} is {} km away", direction, other, d);
        }
    }
}
