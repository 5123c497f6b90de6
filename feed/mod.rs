//! 与后端协作者之间的接口
//!
//! - [`NearbyService`]：远程 "附近" 查询
//! - [`ChangeFeed`]：按 geohash 前缀范围过滤的实时变更订阅
//!
//! [`MemoryIndex`] 是两者的内存实现，[`NearbyWatcher`] 在观察位置的前缀变化时重启订阅。

pub mod memory;
pub mod watcher;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::{GeoError, Result};
use crate::geohash::Coordinate;
use crate::query::SpatialQuery;

pub use memory::MemoryIndex;
pub use watcher::NearbyWatcher;

/// 后端文档：以 geohash 为索引键的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geohash: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Entity {
    /// 创建实体，geohash 按 `precision` 计算
    pub fn new(id: impl Into<String>, location: Coordinate, precision: usize) -> Self {
        Self {
            id: id.into(),
            latitude: location.latitude,
            longitude: location.longitude,
            geohash: location.geohash(precision),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// 附近查询请求，线上格式为 `{ latitude, longitude, radiusKm }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl NearbyRequest {
    pub fn new(center: Coordinate, radius_km: f64) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            radius_km,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<()> {
        self.center().validate()?;
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(GeoError::InvalidRadius(self.radius_km));
        }
        Ok(())
    }
}

/// 附近查询结果：实体加上到查询中心的距离（公里）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    #[serde(flatten)]
    pub entity: Entity,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    #[display(fmt = "added")]
    Added,
    #[display(fmt = "modified")]
    Modified,
    #[display(fmt = "removed")]
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub entity: Entity,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, entity: Entity) -> Self {
        Self { kind, entity }
    }
}

/// 一个活跃的范围订阅，丢弃即取消
#[derive(Debug)]
pub struct Subscription {
    query: SpatialQuery,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(query: SpatialQuery, receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { query, receiver }
    }

    pub fn query(&self) -> &SpatialQuery {
        &self.query
    }

    /// 等待下一个事件，流结束时返回 `None`
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// 不等待，取出已到达的事件
    ///
    /// 暂无事件时返回 `Ok(None)`；流已结束且没有剩余事件时返回 [`GeoError::FeedClosed`]。
    pub fn try_next(&mut self) -> Result<Option<ChangeEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(GeoError::FeedClosed),
        }
    }
}

/// 远程附近查询服务
pub trait NearbyService {
    /// 返回 `radius_km` 内的实体，按距离升序
    fn nearby(
        &self,
        request: &NearbyRequest,
    ) -> impl std::future::Future<Output = Result<Vec<NearbyEntity>>> + Send;
}

/// 范围过滤的变更订阅服务
///
/// 订阅建立时先以 `Added` 推送当前范围内的实体，之后推送增量变更。
pub trait ChangeFeed {
    fn subscribe(
        &self,
        query: &SpatialQuery,
    ) -> impl std::future::Future<Output = Result<Subscription>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_new_computes_geohash() {
        let entity = Entity::new("signal-1", Coordinate::new(37.7749, -122.4194), 9);
        assert_eq!(entity.geohash, "9q8yyk8yt");
        assert_eq!(entity.coordinate(), Coordinate::new(37.7749, -122.4194));
        assert_eq!(entity.data, serde_json::Value::Null);
    }

    #[test]
    fn test_request_wire_format() {
        let request = NearbyRequest::new(Coordinate::new(1.0, 2.0), 5.0);
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(value, json!({"latitude": 1.0, "longitude": 2.0, "radiusKm": 5.0}));

        let parsed: NearbyRequest =
            serde_json::from_str(r#"{"latitude": 3.0, "longitude": 4.0, "radiusKm": 0.5}"#).unwrap();
        assert_eq!(parsed.radius_km, 0.5);
    }

    #[test]
    fn test_request_validation() {
        assert!(NearbyRequest::new(Coordinate::new(1.0, 2.0), 0.0).validate().is_ok());
        assert!(matches!(
            NearbyRequest::new(Coordinate::new(1.0, 2.0), -1.0).validate(),
            Err(GeoError::InvalidRadius(_))
        ));
        assert!(matches!(
            NearbyRequest::new(Coordinate::new(1.0, 2.0), f64::NAN).validate(),
            Err(GeoError::InvalidRadius(_))
        ));
        assert!(matches!(
            NearbyRequest::new(Coordinate::new(100.0, 2.0), 1.0).validate(),
            Err(GeoError::InvalidLatitude(_))
        ));
    }

    #[test]
    fn test_nearby_entity_flattens() {
        let entity = Entity::new("a", Coordinate::new(0.0, 0.0), 4).with_data(json!({"name": "x"}));
        let value = serde_json::to_value(NearbyEntity {
            entity,
            distance: 1.5,
        })
        .unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["geohash"], "7zzz");
        assert_eq!(value["distance"], 1.5);
        assert_eq!(value["data"]["name"], "x");
    }

    #[test]
    fn test_subscription_try_next_reports_closed_stream() {
        let (sender, receiver) = mpsc::channel(4);
        let mut subscription = Subscription::new(SpatialQuery::for_prefix("9q"), receiver);
        assert!(subscription.try_next().unwrap().is_none());

        let entity = Entity::new("a", Coordinate::new(37.0, -122.0), 6);
        sender
            .try_send(ChangeEvent::new(ChangeKind::Added, entity))
            .unwrap();
        drop(sender);

        // 剩余事件先取完，再报告关闭
        assert!(subscription.try_next().unwrap().is_some());
        assert!(matches!(subscription.try_next(), Err(GeoError::FeedClosed)));
    }

    #[test]
    fn test_change_kind_format() {
        assert_eq!(ChangeKind::Removed.to_string(), "removed");
        assert_eq!(serde_json::to_value(ChangeKind::Added).unwrap(), json!("added"));
    }
}
