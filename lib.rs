pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod geohash;
pub mod query;

// 重新导出主要的公共接口
pub use geohash::{
    decode, decode_bbox, distance, encode, neighbors, precision_for_radius, BoundingBox,
    Coordinate, Direction, ALPHABET,
};
pub use query::{covering_precision, query_bounds, query_bounds_capped, SpatialQuery};

// 重新导出常用类型，便于二进制文件使用
pub use config::GeoKeyConfig;
pub use error::{GeoError, Result};
pub use feed::{
    ChangeEvent, ChangeFeed, ChangeKind, Entity, MemoryIndex, NearbyEntity, NearbyRequest,
    NearbyService, NearbyWatcher, Subscription,
};
