use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::{
    ChangeEvent, ChangeFeed, ChangeKind, Entity, NearbyEntity, NearbyRequest, NearbyService,
    Subscription,
};
use crate::geohash::distance;
use crate::query::{query_bounds_capped, SpatialQuery};
use crate::Result;

/// 默认的订阅通道容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// 内存中的有序 geohash 索引，同时实现 [`NearbyService`] 和 [`ChangeFeed`]
///
/// 克隆共享同一份数据。
#[derive(Clone)]
pub struct MemoryIndex {
    state: Arc<RwLock<IndexState>>,
    channel_capacity: usize,
}

#[derive(Default)]
struct IndexState {
    // (geohash, id) 排序，前缀范围扫描即 BTreeMap::range
    by_key: BTreeMap<(String, String), Entity>,
    // id -> geohash
    keys: HashMap<String, String>,
    // geohash 长度 -> 实体数
    key_lengths: BTreeMap<usize, usize>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    query: SpatialQuery,
    sender: mpsc::Sender<ChangeEvent>,
}

impl IndexState {
    fn range<'a>(&'a self, query: &SpatialQuery) -> impl Iterator<Item = &'a Entity> + 'a {
        let lower = (query.start.clone(), String::new());
        let upper = (query.end.clone(), String::new());
        self.by_key.range(lower..upper).map(|(_, entity)| entity)
    }

    fn take(&mut self, id: &str) -> Option<Entity> {
        let geohash = self.keys.remove(id)?;
        if let Some(count) = self.key_lengths.get_mut(&geohash.len()) {
            *count -= 1;
            if *count == 0 {
                self.key_lengths.remove(&geohash.len());
            }
        }
        self.by_key.remove(&(geohash, id.to_string()))
    }

    fn put(&mut self, entity: Entity) {
        *self.key_lengths.entry(entity.geohash.len()).or_insert(0) += 1;
        self.keys.insert(entity.id.clone(), entity.geohash.clone());
        self.by_key
            .insert((entity.geohash.clone(), entity.id.clone()), entity);
    }

    /// 最短的 geohash 长度，索引为空时为 `None`
    fn shortest_key(&self) -> Option<usize> {
        self.key_lengths.keys().next().copied()
    }

    /// 根据写入前后实体是否落在各订阅范围内推送事件
    fn notify(&mut self, previous: Option<&Entity>, current: Option<&Entity>) {
        self.subscribers.retain(|subscriber| {
            let was_in = previous.is_some_and(|e| subscriber.query.contains(&e.geohash));
            let is_in = current.is_some_and(|e| subscriber.query.contains(&e.geohash));

            let event = match (was_in, is_in, previous, current) {
                (false, true, _, Some(entity)) => ChangeEvent::new(ChangeKind::Added, entity.clone()),
                (true, true, _, Some(entity)) => {
                    ChangeEvent::new(ChangeKind::Modified, entity.clone())
                }
                (true, false, Some(entity), _) => {
                    ChangeEvent::new(ChangeKind::Removed, entity.clone())
                }
                _ => return !subscriber.sender.is_closed(),
            };

            match subscriber.sender.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Closed(_)) => {
                    debug!("subscriber {} closed, pruning", subscriber.query);
                    false
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "subscriber {} is not keeping up, dropping subscription",
                        subscriber.query
                    );
                    false
                }
            }
        });
    }
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(IndexState::default())),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// 插入或更新实体，返回旧值
    pub async fn upsert(&self, entity: Entity) -> Option<Entity> {
        let mut state = self.state.write().await;
        let previous = state.take(&entity.id);
        debug!("upsert {} at {}", entity.id, entity.geohash);
        state.put(entity.clone());
        state.notify(previous.as_ref(), Some(&entity));
        previous
    }

    /// 删除实体，返回被删除的值
    pub async fn remove(&self, id: &str) -> Option<Entity> {
        let mut state = self.state.write().await;
        let previous = state.take(id)?;
        debug!("remove {} at {}", id, previous.geohash);
        state.notify(Some(&previous), None);
        Some(previous)
    }

    pub async fn get(&self, id: &str) -> Option<Entity> {
        let state = self.state.read().await;
        let geohash = state.keys.get(id)?;
        state.by_key.get(&(geohash.clone(), id.to_string())).cloned()
    }

    /// 前缀范围内的全部实体，按 geohash 排序
    pub async fn range(&self, query: &SpatialQuery) -> Vec<Entity> {
        let state = self.state.read().await;
        state.range(query).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 仍然存活的订阅数量
    pub async fn subscriber_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .subscribers
            .iter()
            .filter(|subscriber| !subscriber.sender.is_closed())
            .count()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NearbyService for MemoryIndex {
    async fn nearby(&self, request: &NearbyRequest) -> Result<Vec<NearbyEntity>> {
        request.validate()?;
        let center = request.center();

        let state = self.state.read().await;
        // 前缀不能比索引里最短的键长
        let max_precision = state.shortest_key().unwrap_or(usize::MAX);
        let bounds = query_bounds_capped(center, request.radius_km, max_precision);
        // 相同长度的不同前缀互不重叠，不会重复
        let mut results: Vec<NearbyEntity> = bounds
            .iter()
            .flat_map(|query| state.range(query))
            .filter_map(|entity| {
                let d = distance(center, entity.coordinate());
                (d <= request.radius_km).then(|| NearbyEntity {
                    entity: entity.clone(),
                    distance: d,
                })
            })
            .collect();
        drop(state);

        results.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));

        debug!(
            "nearby {} within {} km: {} results from {} ranges",
            center,
            request.radius_km,
            results.len(),
            bounds.len()
        );
        Ok(results)
    }
}

impl ChangeFeed for MemoryIndex {
    async fn subscribe(&self, query: &SpatialQuery) -> Result<Subscription> {
        let mut state = self.state.write().await;
        let snapshot: Vec<Entity> = state.range(query).cloned().collect();

        // 容量至少能放下初始快照
        let (sender, receiver) = mpsc::channel(self.channel_capacity.max(snapshot.len()));
        for entity in snapshot {
            // 接收端就在本函数里，快照不会失败
            let _ = sender.try_send(ChangeEvent::new(ChangeKind::Added, entity));
        }

        state.subscribers.push(Subscriber {
            query: query.clone(),
            sender,
        });
        debug!("subscribed to {}", query);

        Ok(Subscription::new(query.clone(), receiver))
    }
}
