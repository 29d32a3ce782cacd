//! 国际象棋 AI 引擎
//!
//! 包含:
//! - 吃子得分与子力评估
//! - 负极大值风格的累加得分搜索
//! - 限时迭代加深与固定深度搜索
//! - 三档走法选择策略
//! - 走法缓存与性能统计

mod cache;
mod evaluate;
mod perf;
mod search;

pub use cache::{CacheStats, MoveCache};
pub use evaluate::Evaluator;
pub use perf::{CacheSummary, NoopPerf, PerfRecorder, PerfReport, PerfSink, TimingSummary};
pub use search::{
    expand, AiConfig, AiEngine, Difficulty, MoveScore, SearchContext, SearchResult,
    TERMINAL_BONUS,
};
