//! 将军与将死判定

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::history::MoveHistory;
use crate::moves::{MoveGenerator, BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRECTIONS};
use crate::piece::{Color, PieceType, Position};

/// 对局终局类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// 被将死
    Checkmate { loser: Color },
    /// 无子可动但未被将军
    Stalemate { side: Color },
}

impl GameOutcome {
    /// 无子可动的一方
    pub fn side(&self) -> Color {
        match self {
            GameOutcome::Checkmate { loser } => *loser,
            GameOutcome::Stalemate { side } => *side,
        }
    }
}

/// 将军判定
pub struct CheckDetector;

impl CheckDetector {
    /// 检查指定格子是否被对方攻击
    ///
    /// `color` 是格子上（或将要站在格子上）的棋子的阵营，攻击方为其对手。
    pub fn is_attacked(board: &Board, square: Position, color: Color) -> bool {
        let enemy = color.opponent();
        let enemy_piece = |pos: Position, types: &[PieceType]| {
            board
                .at(pos)
                .is_some_and(|p| p.color == enemy && types.contains(&p.piece_type))
        };

        // 马
        if KNIGHT_OFFSETS
            .iter()
            .filter_map(|&(dc, dr)| square.offset(dc, dr))
            .any(|pos| enemy_piece(pos, &[PieceType::Knight]))
        {
            return true;
        }

        // 王
        if KING_OFFSETS
            .iter()
            .filter_map(|&(dc, dr)| square.offset(dc, dr))
            .any(|pos| enemy_piece(pos, &[PieceType::King]))
        {
            return true;
        }

        // 横竖线：第一个遇到的棋子必须是对方的车或后
        if Self::ray_hits(board, square, &ROOK_DIRECTIONS, enemy, PieceType::Rook) {
            return true;
        }

        // 斜线：第一个遇到的棋子必须是对方的象或后
        if Self::ray_hits(board, square, &BISHOP_DIRECTIONS, enemy, PieceType::Bishop) {
            return true;
        }

        // 兵：按攻击方的前进方向反推兵的位置
        [-1i8, 1i8]
            .iter()
            .filter_map(|&dc| square.offset(dc, -enemy.forward()))
            .any(|pos| enemy_piece(pos, &[PieceType::Pawn]))
    }

    /// 沿方向扫描，遇到的第一枚棋子是否为对方的 `slider` 或后
    fn ray_hits(
        board: &Board,
        square: Position,
        directions: &[(i8, i8)],
        enemy: Color,
        slider: PieceType,
    ) -> bool {
        for &(dc, dr) in directions {
            let mut current = square;
            while let Some(next) = current.offset(dc, dr) {
                if let Some(piece) = board.at(next) {
                    if piece.color == enemy
                        && (piece.piece_type == slider || piece.piece_type == PieceType::Queen)
                    {
                        return true;
                    }
                    break;
                }
                current = next;
            }
        }
        false
    }

    /// 检查指定阵营是否被将军
    pub fn is_in_check(board: &Board, color: Color) -> bool {
        match board.find_king(color) {
            Some(king) => Self::is_attacked(board, king, color),
            None => false, // 没有王，视为不被将军
        }
    }

    /// 检查指定阵营是否无子可动
    ///
    /// 与将军与否无关：被困毙同样返回 true，需要区分时使用 [`CheckDetector::outcome`]。
    pub fn is_checkmated(board: &Board, color: Color, history: &MoveHistory) -> bool {
        board
            .pieces(color)
            .into_iter()
            .all(|(pos, _)| MoveGenerator::legal_moves(board, pos, history).is_empty())
    }

    /// 判定指定阵营的终局状态（仍有合法走法时返回 None）
    pub fn outcome(board: &Board, color: Color, history: &MoveHistory) -> Option<GameOutcome> {
        if !Self::is_checkmated(board, color, history) {
            return None;
        }

        if Self::is_in_check(board, color) {
            Some(GameOutcome::Checkmate { loser: color })
        } else {
            Some(GameOutcome::Stalemate { side: color })
        }
    }
}
