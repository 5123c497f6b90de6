use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ChangeEvent, ChangeFeed, ChangeKind, Entity, Subscription};
use crate::error::{GeoError, Result};
use crate::geohash::{precision_for_radius, Coordinate};
use crate::query::SpatialQuery;

/// 跟随观察位置的附近订阅
///
/// 由调用方显式创建并持有。位置所在单元的前缀变化时丢弃旧订阅、清空本地视图并重新订阅；
/// 前缀不变时什么也不做。
pub struct NearbyWatcher<F: ChangeFeed> {
    feed: Arc<F>,
    precision: usize,
    active: Option<Subscription>,
    visible: HashMap<String, Entity>,
}

impl<F: ChangeFeed> NearbyWatcher<F> {
    pub fn new(feed: Arc<F>, precision: usize) -> Self {
        Self {
            feed,
            precision,
            active: None,
            visible: HashMap::new(),
        }
    }

    /// 按搜索半径选择订阅精度
    pub fn for_radius(feed: Arc<F>, radius_km: f64) -> Self {
        Self::new(feed, precision_for_radius(radius_km))
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn current_query(&self) -> Option<&SpatialQuery> {
        self.active.as_ref().map(Subscription::query)
    }

    pub fn current_prefix(&self) -> Option<&str> {
        self.current_query().map(|query| query.prefix.as_str())
    }

    /// 更新观察位置，返回是否重启了订阅
    pub async fn update_location(&mut self, location: Coordinate) -> Result<bool> {
        location.validate()?;
        let query = SpatialQuery::for_location(location, self.precision);

        if self.current_query() == Some(&query) {
            debug!("location {} still in {}", location, query.prefix);
            return Ok(false);
        }

        if let Some(previous) = self.active.take() {
            info!(
                "prefix changed {} -> {}, restarting subscription",
                previous.query().prefix,
                query.prefix
            );
        } else {
            info!("subscribing to {}", query);
        }
        self.visible.clear();

        self.active = Some(self.feed.subscribe(&query).await?);
        Ok(true)
    }

    /// 等待下一个事件并应用到本地视图
    ///
    /// 没有订阅或订阅流已结束时返回 [`GeoError::FeedClosed`]；之后再次调用
    /// `update_location` 会重新订阅，即使前缀没有变化。
    pub async fn next_event(&mut self) -> Result<ChangeEvent> {
        let subscription = self.active.as_mut().ok_or(GeoError::FeedClosed)?;
        let next = subscription.next().await;
        match next {
            Some(event) => {
                self.apply(&event);
                Ok(event)
            }
            None => {
                self.active = None;
                Err(GeoError::FeedClosed)
            }
        }
    }

    /// 取出所有已到达的事件并应用
    ///
    /// 订阅流已结束时同样放弃当前订阅，下一次 `update_location` 会重新订阅。
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let mut closed = false;
        if let Some(subscription) = self.active.as_mut() {
            loop {
                match subscription.try_next() {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => break,
                    Err(_) => {
                        warn!("subscription to {} ended", subscription.query());
                        closed = true;
                        break;
                    }
                }
            }
        }
        if closed {
            self.active = None;
        }
        for event in &events {
            self.apply(event);
        }
        events
    }

    fn apply(&mut self, event: &ChangeEvent) {
        match event.kind {
            ChangeKind::Added | ChangeKind::Modified => {
                self.visible
                    .insert(event.entity.id.clone(), event.entity.clone());
            }
            ChangeKind::Removed => {
                self.visible.remove(&event.entity.id);
            }
        }
    }

    /// 当前订阅范围内可见的实体
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.visible.values()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// 取消订阅并清空本地视图
    pub fn stop(&mut self) {
        if let Some(subscription) = self.active.take() {
            info!("unsubscribing from {}", subscription.query());
        }
        self.visible.clear();
    }
}
