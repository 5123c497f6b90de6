use super::codec::BITS_PER_CHAR;

/// 搜索半径（公里）到 geohash 精度的映射，按升序匹配，取第一个满足的
///
/// 阈值是针对 5 位/字符的 base-32 编码标定的经验值，更换字母表或每字符位数时需要重新推导。
const RADIUS_THRESHOLDS: [(f64, usize); 6] = [
    (0.02, 8),
    (0.15, 7),
    (1.2, 6),
    (5.0, 5),
    (20.0, 4),
    (80.0, 3),
];

/// 半径超出所有阈值时使用的精度（单元约 ±300 km）
pub const MIN_QUERY_PRECISION: usize = 2;

/// 为给定搜索半径选择前缀长度
///
/// 半径过大（或为 NaN）时退化为 [`MIN_QUERY_PRECISION`]，这不是错误。
pub fn precision_for_radius(radius_km: f64) -> usize {
    RADIUS_THRESHOLDS
        .iter()
        .find(|(max_radius, _)| radius_km <= *max_radius)
        .map(|(_, precision)| *precision)
        .unwrap_or(MIN_QUERY_PRECISION)
}

/// 指定精度下单元的尺寸 `(纬度跨度, 经度跨度)`，单位：度
///
/// 经度先取位，所以奇数个总位数时经度多一位。
pub fn cell_size(precision: usize) -> (f64, f64) {
    let bits = precision * BITS_PER_CHAR;
    let lon_bits = bits.div_ceil(2);
    let lat_bits = bits / 2;
    (
        180.0 / 2f64.powi(lat_bits as i32),
        360.0 / 2f64.powi(lon_bits as i32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geohash::decode_bbox;

    #[test]
    fn test_precision_table() {
        assert_eq!(precision_for_radius(0.02), 8);
        assert_eq!(precision_for_radius(0.15), 7);
        assert_eq!(precision_for_radius(5.0), 5);
        assert_eq!(precision_for_radius(100.0), 2);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(precision_for_radius(0.0), 8);
        assert_eq!(precision_for_radius(0.021), 7);
        assert_eq!(precision_for_radius(1.2), 6);
        assert_eq!(precision_for_radius(1.21), 5);
        assert_eq!(precision_for_radius(20.0), 4);
        assert_eq!(precision_for_radius(80.0), 3);
        assert_eq!(precision_for_radius(80.0001), 2);
    }

    #[test]
    fn test_degenerate_radius() {
        assert_eq!(precision_for_radius(20_000.0), MIN_QUERY_PRECISION);
        assert_eq!(precision_for_radius(f64::INFINITY), MIN_QUERY_PRECISION);
        assert_eq!(precision_for_radius(f64::NAN), MIN_QUERY_PRECISION);
    }

    #[test]
    fn test_precision_decreases_with_radius() {
        let radii = [0.01, 0.1, 1.0, 3.0, 10.0, 50.0, 500.0];
        let precisions: Vec<usize> = radii.iter().map(|r| precision_for_radius(*r)).collect();
        assert!(precisions.windows(2).all(|w| w[0] > w[1]), "{:?}", precisions);
    }

    #[test]
    fn test_cell_size_matches_decoded_cell() {
        assert_eq!(cell_size(0), (180.0, 360.0));
        assert_eq!(cell_size(1), (45.0, 45.0));
        for precision in 1..=10 {
            let bbox = decode_bbox(&"9q8yyk8ytp"[..precision]);
            assert_eq!(cell_size(precision), (bbox.height(), bbox.width()));
        }
    }
}
