use colored::*;

use crate::feed::NearbyEntity;
use crate::geohash::{BoundingBox, Coordinate, Direction};
use crate::query::SpatialQuery;

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format_geohash(coord: &Coordinate, geohash: &str) -> String {
        format!("{} -> {}", coord.to_string().cyan(), geohash.green().bold())
    }

    pub fn format_cell(geohash: &str, bbox: &BoundingBox) -> String {
        let center = bbox.center();
        let mut result = format!("{}\n", geohash.green().bold());
        result.push_str(&format!(
            "  center:    {}\n",
            format!("{:.6}, {:.6}", center.latitude, center.longitude).cyan()
        ));
        result.push_str(&format!(
            "  latitude:  [{}, {}] ±{}\n",
            bbox.lat_min,
            bbox.lat_max,
            bbox.lat_error().to_string().yellow()
        ));
        result.push_str(&format!(
            "  longitude: [{}, {}] ±{}",
            bbox.lon_min,
            bbox.lon_max,
            bbox.lon_error().to_string().yellow()
        ));
        result
    }

    pub fn format_distance(km: f64) -> String {
        format!("{} km", format!("{:.3}", km).cyan())
    }

    pub fn format_precision(radius_km: f64, precision: usize, cell: (f64, f64)) -> String {
        format!(
            "{} km -> precision {} (cell {}° x {}°)",
            radius_km,
            precision.to_string().green().bold(),
            cell.0,
            cell.1
        )
    }

    pub fn format_queries(queries: &[SpatialQuery]) -> String {
        if queries.is_empty() {
            return "(empty list)".yellow().to_string();
        }
        let mut result = String::new();
        for (i, query) in queries.iter().enumerate() {
            // 哨兵字符不可打印，按转义形式输出
            result.push_str(&format!(
                "{}) [{}, {}\\uf8ff)\n",
                (i + 1).to_string().blue(),
                query.start.green(),
                query.prefix
            ));
        }
        result.trim_end().to_string()
    }

    pub fn format_neighbors(neighbors: &[(Direction, String)]) -> String {
        if neighbors.is_empty() {
            return "(no neighbors)".yellow().to_string();
        }
        neighbors
            .iter()
            .map(|(direction, hash)| format!("{:>2}  {}", direction.to_string().blue(), hash.green()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_nearby(results: &[NearbyEntity]) -> String {
        if results.is_empty() {
            return "(empty list)".yellow().to_string();
        }
        let mut result = String::new();
        for (i, item) in results.iter().enumerate() {
            result.push_str(&format!(
                "{}) {} {} {}\n",
                (i + 1).to_string().blue(),
                item.entity.id.green(),
                item.entity.geohash,
                Self::format_distance(item.distance)
            ));
        }
        result.trim_end().to_string()
    }

    pub fn format_error(err: &str) -> String {
        format!("(error) {}", err.red())
    }
}
