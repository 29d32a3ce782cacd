//! 错误类型定义

use thiserror::Error;

use crate::piece::Position;

/// 象棋规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },

    /// 无效的走法文本
    #[error("Invalid move text: {text:?}")]
    InvalidMoveText { text: String },

    /// 起点与终点相同
    #[error("Source and destination are the same square")]
    SameSquare,

    /// 没有棋子
    #[error("No piece at position {pos}")]
    NoPiece { pos: Position },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 无效的走法
    #[error("Illegal move: {from} -> {to}")]
    IllegalMove { from: Position, to: Position },

    /// 无法升变为该棋子
    #[error("Promotion is not available")]
    PromotionUnavailable,
}

/// 规则操作结果类型
pub type Result<T> = std::result::Result<T, ChessError>;
