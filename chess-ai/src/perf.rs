//! 性能统计
//!
//! 搜索与缓存通过 [`PerfSink`] 报告耗时和命中情况。统计不允许阻塞搜索：
//! [`PerfRecorder`] 拿不到锁时直接丢弃样本。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

/// 平均耗时低于该值的计时项不输出
const REPORT_THRESHOLD: Duration = Duration::from_millis(2);

/// 性能统计接收端
pub trait PerfSink: Send + Sync {
    /// 开始计时
    fn time_start(&self, key: &str);
    /// 结束计时
    fn time_stop(&self, key: &str);
    /// 缓存命中
    fn cache_hit(&self, key: &str);
    /// 缓存未命中
    fn cache_miss(&self, key: &str);
}

/// 不做任何统计
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPerf;

impl PerfSink for NoopPerf {
    fn time_start(&self, _key: &str) {}
    fn time_stop(&self, _key: &str) {}
    fn cache_hit(&self, _key: &str) {}
    fn cache_miss(&self, _key: &str) {}
}

/// 单个计时项
#[derive(Debug, Default)]
struct Timer {
    calls: u64,
    total: Duration,
    /// 嵌套调用层数，递归时只在最外层计时
    active: u32,
    started: Option<Instant>,
}

#[derive(Debug, Default)]
struct PerfState {
    timers: HashMap<String, Timer>,
    hits: HashMap<String, u64>,
    misses: HashMap<String, u64>,
}

/// 计时项汇总
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    pub key: String,
    pub calls: u64,
    pub total: Duration,
}

impl TimingSummary {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// 缓存命中汇总（按调用点分组）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSummary {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
}

/// 性能报告
#[derive(Debug, Clone, Default)]
pub struct PerfReport {
    pub timings: Vec<TimingSummary>,
    pub cache: Vec<CacheSummary>,
}

/// 基于 tracing 输出的性能记录器
#[derive(Debug, Default)]
pub struct PerfRecorder {
    state: Mutex<PerfState>,
}

impl PerfRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空所有统计
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = PerfState::default();
        }
    }

    /// 生成报告
    pub fn report(&self) -> PerfReport {
        let Ok(state) = self.state.lock() else {
            return PerfReport::default();
        };

        let mut timings: Vec<TimingSummary> = state
            .timers
            .iter()
            .map(|(key, timer)| TimingSummary {
                key: key.clone(),
                calls: timer.calls,
                total: timer.total,
            })
            .collect();
        timings.sort_by(|a, b| a.key.cmp(&b.key));

        let mut groups: HashMap<&str, CacheSummary> = HashMap::new();
        for (key, count) in &state.hits {
            let name = Self::call_site(key);
            groups
                .entry(name)
                .or_insert_with(|| CacheSummary {
                    name: name.to_string(),
                    hits: 0,
                    misses: 0,
                })
                .hits += count;
        }
        for (key, count) in &state.misses {
            let name = Self::call_site(key);
            groups
                .entry(name)
                .or_insert_with(|| CacheSummary {
                    name: name.to_string(),
                    hits: 0,
                    misses: 0,
                })
                .misses += count;
        }
        let mut cache: Vec<CacheSummary> = groups.into_values().collect();
        cache.sort_by(|a, b| a.name.cmp(&b.name));

        PerfReport { timings, cache }
    }

    /// 将报告输出到日志
    pub fn log_report(&self) {
        let report = self.report();

        for timing in &report.timings {
            let average = timing.average();
            if average > REPORT_THRESHOLD {
                info!(
                    "{} 平均耗时 {:.1} ms，调用 {} 次，总计 {} ms",
                    timing.key,
                    average.as_secs_f64() * 1000.0,
                    timing.calls,
                    timing.total.as_millis()
                );
            }
        }

        for summary in &report.cache {
            info!(
                "缓存 [{}]: 命中 {}，未命中 {}",
                summary.name, summary.hits, summary.misses
            );
        }
    }

    /// 缓存键中第一个 `-` 之前的部分为调用点
    fn call_site(key: &str) -> &str {
        key.split_once('-').map_or(key, |(name, _)| name)
    }
}

impl PerfSink for PerfRecorder {
    fn time_start(&self, key: &str) {
        let Ok(mut state) = self.state.try_lock() else {
            return;
        };
        let timer = state.timers.entry(key.to_string()).or_default();
        timer.calls += 1;
        if timer.active == 0 {
            timer.started = Some(Instant::now());
        }
        timer.active += 1;
    }

    fn time_stop(&self, key: &str) {
        let Ok(mut state) = self.state.try_lock() else {
            return;
        };
        let Some(timer) = state.timers.get_mut(key) else {
            return;
        };
        timer.active = timer.active.saturating_sub(1);
        if timer.active == 0 {
            if let Some(started) = timer.started.take() {
                timer.total += started.elapsed();
            }
        }
    }

    fn cache_hit(&self, key: &str) {
        if let Ok(mut state) = self.state.try_lock() {
            *state.hits.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    fn cache_miss(&self, key: &str) {
        if let Ok(mut state) = self.state.try_lock() {
            *state.misses.entry(key.to_string()).or_insert(0) += 1;
        }
    }
}
