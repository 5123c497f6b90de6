use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geohash::{
    cell_size, encode, neighbors, precision_for_radius, Coordinate, EARTH_RADIUS_KM,
};

/// 范围上界的哨兵字符，大于任何 geohash 字符
pub const RANGE_END_SENTINEL: char = '\u{f8ff}';

/// 针对有序索引的前缀范围查询 `[prefix, prefix + '\u{f8ff}')`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display(fmt = "[{}, {})", start, end)]
pub struct SpatialQuery {
    pub prefix: String,
    pub start: String,
    pub end: String,
}

impl SpatialQuery {
    pub fn for_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let mut end = String::with_capacity(prefix.len() + RANGE_END_SENTINEL.len_utf8());
        end.push_str(&prefix);
        end.push(RANGE_END_SENTINEL);
        Self {
            start: prefix.clone(),
            prefix,
            end,
        }
    }

    /// 观察位置所在单元的查询，前缀就是 `encode` 的输出
    pub fn for_location(location: Coordinate, precision: usize) -> Self {
        Self::for_prefix(encode(location.latitude, location.longitude, precision))
    }

    /// 半开区间判定：`start <= key < end`
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && key < self.end.as_str()
    }

    pub fn precision(&self) -> usize {
        self.prefix.chars().count()
    }
}

/// 纬度方向每度对应的公里数
const KM_PER_DEGREE: f64 = std::f64::consts::PI * EARTH_RADIUS_KM / 180.0;

/// 能保证覆盖半径的前缀长度
///
/// 从 [`precision_for_radius`] 开始逐级变粗，直到中心单元加一圈相邻单元在每个方向上
/// 至少延伸 `radius_km`。高纬度的单元在东西方向上更窄，所以按圆在经度上的实际跨度计算。
/// 圆跨过极点时返回 0，即空前缀，覆盖整个键空间。
pub fn covering_precision(center: Coordinate, radius_km: f64, max_precision: usize) -> usize {
    let lat_reach = radius_km / KM_PER_DEGREE;
    if lat_reach.is_nan() || center.latitude.abs() + lat_reach >= 90.0 {
        return 0;
    }
    let lon_reach = (lat_reach.to_radians().sin() / center.latitude.to_radians().cos())
        .min(1.0)
        .asin()
        .to_degrees();

    let mut precision = precision_for_radius(radius_km).min(max_precision);
    while precision > 0 {
        let (lat_span, lon_span) = cell_size(precision);
        if lat_span >= lat_reach && lon_span >= lon_reach {
            break;
        }
        precision -= 1;
    }
    precision
}

/// 覆盖以 `center` 为圆心、`radius_km` 为半径区域的查询集合
///
/// 结果为 [`covering_precision`] 精度下的中心单元加上存在的相邻单元，去重并按起始键排序。
/// 范围内的键都会被覆盖，调用方再按精确距离过滤一次。
pub fn query_bounds(center: Coordinate, radius_km: f64) -> Vec<SpatialQuery> {
    query_bounds_capped(center, radius_km, usize::MAX)
}

/// 同 [`query_bounds`]，但前缀不超过 `max_precision` 个字符
///
/// 索引里的键比查询前缀短时会排在范围起点之前，扫描不到；用最短的键长作为上限。
pub fn query_bounds_capped(
    center: Coordinate,
    radius_km: f64,
    max_precision: usize,
) -> Vec<SpatialQuery> {
    let precision = covering_precision(center, radius_km, max_precision);
    let cell = encode(center.latitude, center.longitude, precision);

    let mut prefixes: Vec<String> = neighbors(&cell).into_iter().map(|(_, hash)| hash).collect();
    prefixes.push(cell);
    prefixes.sort();
    prefixes.dedup();

    debug!(
        "query bounds for {} within {} km: precision {}, {} ranges",
        center,
        radius_km,
        precision,
        prefixes.len()
    );

    prefixes.into_iter().map(SpatialQuery::for_prefix).collect()
}
