//! 走法历史
//!
//! 只追加的走法记录，用于判断吃过路兵与王车易位资格。
//! 每局棋持有独立的实例，显式传给走法生成器。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::constants::{BLACK_BACK_ROW, BOARD_SIZE, KING_HOME_COL, WHITE_BACK_ROW};
use crate::moves::Move;
use crate::piece::{PieceType, Position};

/// 走法历史
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistory {
    moves: Vec<Move>,
}

impl MoveHistory {
    /// 创建空历史
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一步
    pub fn push(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// 撤销最后一步（仅供搜索在当前路径上回退）
    pub fn pop(&mut self) -> Option<Move> {
        self.moves.pop()
    }

    /// 最后一步
    pub fn last(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// 该格上的棋子是否曾经离开过
    pub fn has_departed(&self, pos: Position) -> bool {
        self.moves.iter().any(|mv| mv.from == pos)
    }

    /// 由历史决定的走子资格，如 `KQkq 44`
    ///
    /// 前半为尚存的王车易位资格（白方大写、黑方小写，王翼在前），
    /// 后半为可被吃过路兵的兵所在格；没有时写作 `-`。
    /// 棋盘相同但资格不同的局面合法走法不同，需要区分时与局面记法一起使用。
    pub fn rights(&self, board: &Board) -> String {
        let mut castling = String::new();
        for (row, king_side, queen_side) in [(WHITE_BACK_ROW, 'K', 'Q'), (BLACK_BACK_ROW, 'k', 'q')] {
            if self.has_departed(Position::new(KING_HOME_COL, row)) {
                continue;
            }
            if !self.has_departed(Position::new(BOARD_SIZE, row)) {
                castling.push(king_side);
            }
            if !self.has_departed(Position::new(1, row)) {
                castling.push(queen_side);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let en_passant = self
            .last()
            .filter(|mv| (mv.to.row - mv.from.row).abs() == 2)
            .filter(|mv| {
                board
                    .at(mv.to)
                    .is_some_and(|p| p.piece_type == PieceType::Pawn)
            })
            .map_or_else(|| "-".to_string(), |mv| mv.to.to_string());

        format!("{} {}", castling, en_passant)
    }

    /// 已走步数
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// 是否还没有走过棋
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// 清空历史（重新开局）
    pub fn clear(&mut self) {
        self.moves.clear();
    }

    /// 按走子顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    /// 以切片形式访问全部走法
    pub fn as_slice(&self) -> &[Move] {
        &self.moves
    }
}

impl From<Vec<Move>> for MoveHistory {
    fn from(moves: Vec<Move>) -> Self {
        Self { moves }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_push_pop_last() {
        let mut history = MoveHistory::new();
        assert!(history.last().is_none());

        let mv = Move::new(Position::new(5, 7), Position::new(5, 5));
        history.push(mv);
        assert_eq!(history.last(), Some(&mv));
        assert_eq!(history.len(), 1);

        assert_eq!(history.pop(), Some(mv));
        assert!(history.is_empty());
    }

    #[test]
    fn test_has_departed() {
        let history = MoveHistory::from(vec![
            Move::new(Position::new(8, 8), Position::new(8, 6)),
            Move::new(Position::new(8, 6), Position::new(8, 8)),
        ]);
        // 车回到原位也算移动过
        assert!(history.has_departed(Position::new(8, 8)));
        assert!(!history.has_departed(Position::new(1, 8)));
    }

    #[test]
    fn test_rights() {
        let board = Board::initial();
        assert_eq!(MoveHistory::new().rights(&board), "KQkq -");

        // 王车走开再回来，资格不会恢复
        let history = MoveHistory::from(vec![
            Move::new(Position::new(8, 8), Position::new(8, 6)),
            Move::new(Position::new(1, 1), Position::new(1, 3)),
            Move::new(Position::new(8, 6), Position::new(8, 8)),
            Move::new(Position::new(1, 3), Position::new(1, 1)),
        ]);
        assert_eq!(history.rights(&board), "Qk -");

        let history = MoveHistory::from(vec![Move::new(Position::new(5, 1), Position::new(5, 2))]);
        assert_eq!(history.rights(&board), "KQ -");
    }

    #[test]
    fn test_rights_en_passant_target() {
        let board = Board::from_str("rnbqkbnr/ppp1pppp/8/3p/8/8/PPPPPPPP/RNBQKBNR w").unwrap();
        let double_step = Move::new(Position::new(4, 2), Position::new(4, 4));
        let mut history = MoveHistory::from(vec![
            Move::new(Position::new(7, 8), Position::new(6, 6)),
            double_step,
        ]);
        assert_eq!(history.rights(&board), "KQkq 44");

        // 再走一步后资格消失
        history.push(Move::new(Position::new(6, 6), Position::new(7, 8)));
        assert_eq!(history.rights(&board), "KQkq -");

        // 非兵的两格移动不算
        let history = MoveHistory::from(vec![Move::new(Position::new(1, 8), Position::new(1, 6))]);
        assert_eq!(history.rights(&Board::from_str("k/8/8/8/8/R/8/4K b").unwrap()), "Kkq -");
    }
}
