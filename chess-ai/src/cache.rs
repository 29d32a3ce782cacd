//! 走法缓存
//!
//! 以 (调用点, 局面记法, 其他区分项) 为键缓存计算结果，避免重复生成走法。
//! 同一个键只接受第一次写入，不做淘汰，换局时整体清空。

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::perf::{NoopPerf, PerfSink};

/// 走法缓存
pub struct MoveCache {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
    perf: Arc<dyn PerfSink>,
    /// 命中次数
    hits: AtomicU64,
    /// 查询次数
    probes: AtomicU64,
}

impl MoveCache {
    /// 创建缓存，命中情况报告给 `perf`
    pub fn new(perf: Arc<dyn PerfSink>) -> Self {
        Self {
            entries: HashMap::new(),
            perf,
            hits: AtomicU64::new(0),
            probes: AtomicU64::new(0),
        }
    }

    /// 生成缓存键：`name-part1-part2…`
    pub fn key(name: &str, parts: &[&str]) -> String {
        let mut key = String::with_capacity(name.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
        key.push_str(name);
        key.push('-');
        key.push_str(&parts.join("-"));
        key
    }

    /// 查询
    pub fn get<T: Clone + 'static>(&self, name: &str, parts: &[&str]) -> Option<T> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let key = Self::key(name, parts);

        let Some(entry) = self.entries.get(&key) else {
            self.perf.cache_miss(&key);
            return None;
        };

        match entry.downcast_ref::<T>() {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.perf.cache_hit(&key);
                Some(value.clone())
            }
            None => {
                warn!("缓存条目类型不匹配: {}", key);
                self.perf.cache_miss(&key);
                None
            }
        }
    }

    /// 写入（键已存在时忽略）
    pub fn set<T: Send + Sync + 'static>(&mut self, name: &str, parts: &[&str], value: T) {
        self.entries
            .entry(Self::key(name, parts))
            .or_insert_with(|| Box::new(value));
    }

    /// 清空缓存与统计
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.probes.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }
}

impl Default for MoveCache {
    fn default() -> Self {
        Self::new(Arc::new(NoopPerf))
    }
}

impl std::fmt::Debug for MoveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub probes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.hits as f64 / self.probes as f64
        }
    }
}
