//! 走法文本表示
//!
//! 格式：`<起点> <终点>`，每个坐标为两位数字：列在前，行在后，均从 1 开始。
//!
//! 示例：`52 54` 表示从 (5, 2) 走到 (5, 4)。仅用于测试与调试输出。

use crate::error::ChessError;
use crate::moves::Move;
use crate::piece::Position;

/// 走法文本
pub struct Notation;

impl Notation {
    /// 解析坐标，如 `52`
    pub fn parse_position(text: &str) -> Result<Position, ChessError> {
        let invalid = || ChessError::InvalidMoveText {
            text: text.to_string(),
        };

        let mut chars = text.chars();
        let col = chars.next().and_then(|c| c.to_digit(10)).ok_or_else(invalid)?;
        let row = chars.next().and_then(|c| c.to_digit(10)).ok_or_else(invalid)?;
        if chars.next().is_some() {
            return Err(invalid());
        }

        Ok(Position::new(col as i8, row as i8))
    }

    /// 解析走法，如 `52 54`
    pub fn parse_move(text: &str) -> Result<Move, ChessError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens.as_slice() {
            [from, to] => Ok(Move::new(
                Self::parse_position(from)?,
                Self::parse_position(to)?,
            )),
            _ => Err(ChessError::InvalidMoveText {
                text: text.to_string(),
            }),
        }
    }

    /// 生成走法文本
    pub fn format_move(mv: &Move) -> String {
        format!("{} {}", mv.from, mv.to)
    }
}
