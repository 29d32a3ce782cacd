//! 子力评估

use chess_core::{Board, Color, Move, MoveGenerator, PieceType};

/// 评估器
pub struct Evaluator;

impl Evaluator {
    /// 走法的即时得分：被吃棋子的分值，不吃子为 0
    ///
    /// 吃过路兵按兵计分。
    pub fn capture_score(board: &Board, mv: Move) -> i32 {
        match board.at(mv.to) {
            Some(piece) => piece.value(),
            None if MoveGenerator::is_en_passant(board, mv) => PieceType::Pawn.value(),
            None => 0,
        }
    }

    /// 子力差（白方视角，正值对白方有利，不计王）
    pub fn evaluate_material(board: &Board) -> i32 {
        board
            .all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.piece_type != PieceType::King)
            .map(|(_, piece)| match piece.color {
                Color::White => piece.value(),
                Color::Black => -piece.value(),
            })
            .sum()
    }

    /// 从指定阵营视角的子力差
    pub fn material_for(board: &Board, color: Color) -> i32 {
        let score = Self::evaluate_material(board);
        match color {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Fen;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn test_initial_evaluation() {
        assert_eq!(Evaluator::evaluate_material(&Board::initial()), 0);
    }

    #[test]
    fn test_material_advantage() {
        // 黑方少一个后
        let board = Fen::parse("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w").unwrap();
        assert_eq!(Evaluator::evaluate_material(&board), 20);
        assert_eq!(Evaluator::material_for(&board, Color::Black), -20);
    }

    #[test]
    fn test_capture_score() {
        let board = Fen::parse("k/8/8/8/3q/4P/8/7K w").unwrap();
        assert_eq!(Evaluator::capture_score(&board, mv("56 45")), 20);
        assert_eq!(Evaluator::capture_score(&board, mv("56 55")), 0);
    }

    #[test]
    fn test_en_passant_scores_pawn() {
        let board = Fen::parse("rnbqkbnr/ppppp1pp/8/4Pp/8/8/PPP2PPP/RNBQKBNR w").unwrap();
        assert_eq!(Evaluator::capture_score(&board, mv("54 63")), 2);
    }
}
