//! 国际象棋对局
//!
//! 包含:
//! - 对局控制（走子、升变、重置、终局判定）
//! - 走子事件广播
//! - AI 走子
//! - 对局配置

pub mod config;
pub mod game;

pub use config::GameConfig;
pub use game::{Game, MoveEvent};
