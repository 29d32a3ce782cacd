//! 走法生成和验证

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::Board;
use crate::check::CheckDetector;
use crate::constants::KING_HOME_COL;
use crate::error::ChessError;
use crate::history::MoveHistory;
use crate::notation::Notation;
use crate::piece::{Color, Piece, PieceType, Position};

/// 马的 8 个跳跃方向
pub(crate) const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// 王的 8 个相邻方向
pub(crate) const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// 横竖方向（车）
pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// 斜线方向（象）
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// 王车易位：(王的列偏移, 车的起始列, 车的目标列)
const CASTLING_SIDES: [(i8, i8, i8); 2] = [(2, 8, 6), (-2, 1, 4)];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

impl std::str::FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Notation::parse_move(s)
    }
}

/// 带走子/吃子限制的候选走法
///
/// 兵的直走只能走到空格，斜走只能吃子；其余棋子两者皆可。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceMove {
    pub from: Position,
    pub to: Position,
    /// 目标为空格时是否允许
    pub move_allowed: bool,
    /// 目标为对方棋子时是否允许
    pub capture_allowed: bool,
}

impl PieceMove {
    /// 既可走到空格也可吃子
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            move_allowed: true,
            capture_allowed: true,
        }
    }

    /// 只能走到空格
    pub fn quiet(from: Position, to: Position) -> Self {
        Self {
            capture_allowed: false,
            ..Self::new(from, to)
        }
    }

    /// 只能吃子
    pub fn capture_only(from: Position, to: Position) -> Self {
        Self {
            move_allowed: false,
            ..Self::new(from, to)
        }
    }

    fn as_move(&self) -> Move {
        Move::new(self.from, self.to)
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定格子上棋子的所有合法走法
    ///
    /// 格子为空时返回空列表（调试构建下断言失败）。
    pub fn legal_moves(board: &Board, from: Position, history: &MoveHistory) -> Vec<Move> {
        let Some(piece) = board.at(from) else {
            debug_assert!(false, "起点没有棋子: {}", from);
            return Vec::new();
        };

        let mut moves = Self::pseudo_legal(board, from, piece);
        Self::add_special_moves(board, from, piece, history, &mut moves);
        Self::filter_illegal(board, piece, &moves)
    }

    /// 生成指定阵营的所有合法走法（按棋子的行、列顺序）
    pub fn all_legal_moves(board: &Board, color: Color, history: &MoveHistory) -> Vec<Move> {
        board
            .pieces(color)
            .into_iter()
            .flat_map(|(pos, _)| Self::legal_moves(board, pos, history))
            .collect()
    }

    /// 生成指定棋子的基本候选走法（不含特殊走法，不考虑将军）
    pub fn pseudo_legal(board: &Board, from: Position, piece: Piece) -> Vec<PieceMove> {
        let mut moves = Vec::with_capacity(28);

        match piece.piece_type {
            PieceType::Rook => Self::slider_moves(board, from, &ROOK_DIRECTIONS, &mut moves),
            PieceType::Bishop => Self::slider_moves(board, from, &BISHOP_DIRECTIONS, &mut moves),
            PieceType::Queen => {
                Self::slider_moves(board, from, &ROOK_DIRECTIONS, &mut moves);
                Self::slider_moves(board, from, &BISHOP_DIRECTIONS, &mut moves);
            }
            PieceType::Knight => Self::step_moves(from, &KNIGHT_OFFSETS, &mut moves),
            PieceType::King => Self::step_moves(from, &KING_OFFSETS, &mut moves),
            PieceType::Pawn => Self::pawn_moves(from, piece.color, &mut moves),
        }

        moves
    }

    /// 沿方向滑行，遇到第一个棋子停止（己方棋子由过滤阶段剔除）
    fn slider_moves(
        board: &Board,
        from: Position,
        directions: &[(i8, i8)],
        moves: &mut Vec<PieceMove>,
    ) {
        for &(dc, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(dc, dr) {
                moves.push(PieceMove::new(from, to));
                if board.at(to).is_some() {
                    break;
                }
                current = to;
            }
        }
    }

    /// 固定偏移的走法（马、王）
    fn step_moves(from: Position, offsets: &[(i8, i8)], moves: &mut Vec<PieceMove>) {
        moves.extend(
            offsets
                .iter()
                .filter_map(|&(dc, dr)| from.offset(dc, dr))
                .map(|to| PieceMove::new(from, to)),
        );
    }

    /// 兵：直走一格，斜前方吃子
    fn pawn_moves(from: Position, color: Color, moves: &mut Vec<PieceMove>) {
        let forward = color.forward();

        if let Some(to) = from.offset(0, forward) {
            moves.push(PieceMove::quiet(from, to));
        }

        for dc in [-1i8, 1i8] {
            if let Some(to) = from.offset(dc, forward) {
                moves.push(PieceMove::capture_only(from, to));
            }
        }
    }

    /// 依赖局面与历史的特殊走法
    fn add_special_moves(
        board: &Board,
        from: Position,
        piece: Piece,
        history: &MoveHistory,
        moves: &mut Vec<PieceMove>,
    ) {
        match piece.piece_type {
            PieceType::Pawn => {
                Self::pawn_double_step(board, from, piece.color, moves);
                Self::en_passant(board, from, piece.color, history, moves);
            }
            PieceType::King => Self::castling(board, from, piece.color, history, moves),
            _ => {}
        }
    }

    /// 兵在初始行可以直走两格，途经的格子必须为空
    fn pawn_double_step(board: &Board, from: Position, color: Color, moves: &mut Vec<PieceMove>) {
        if from.row != color.pawn_home_row() {
            return;
        }

        let forward = color.forward();
        if let (Some(middle), Some(to)) = (from.offset(0, forward), from.offset(0, 2 * forward)) {
            if board.at(middle).is_none() {
                moves.push(PieceMove::quiet(from, to));
            }
        }
    }

    /// 吃过路兵：上一步是相邻对方兵从初始行直走两格
    fn en_passant(
        board: &Board,
        from: Position,
        color: Color,
        history: &MoveHistory,
        moves: &mut Vec<PieceMove>,
    ) {
        if from.row != color.en_passant_row() {
            return;
        }
        let Some(last) = history.last() else {
            return;
        };

        let enemy = color.opponent();
        let double_step = last.from.col == last.to.col
            && last.from.row == enemy.pawn_home_row()
            && last.to.row == from.row;
        let adjacent = (last.to.col - from.col).abs() == 1;
        let is_pawn = board.at(last.to) == Some(Piece::new(PieceType::Pawn, enemy));

        if double_step && adjacent && is_pawn {
            if let Some(to) = last.to.offset(0, color.forward()) {
                moves.push(PieceMove::quiet(from, to));
            }
        }
    }

    /// 王车易位
    ///
    /// 王与对应的车都不能离开过原位，两者之间为空，
    /// 王当前不被将军，经过的格子不被攻击。落点由过滤阶段检查。
    fn castling(
        board: &Board,
        from: Position,
        color: Color,
        history: &MoveHistory,
        moves: &mut Vec<PieceMove>,
    ) {
        let back_row = color.back_row();
        if from != Position::new(KING_HOME_COL, back_row) || history.has_departed(from) {
            return;
        }
        if CheckDetector::is_attacked(board, from, color) {
            return;
        }

        for (dc, rook_col, _) in CASTLING_SIDES {
            let rook_pos = Position::new(rook_col, back_row);
            if board.at(rook_pos) != Some(Piece::new(PieceType::Rook, color))
                || history.has_departed(rook_pos)
            {
                continue;
            }

            let step = dc.signum();
            let path_clear = (1..)
                .map(|i| from.col + i * step)
                .take_while(|&col| col != rook_col)
                .all(|col| board.at(Position::new(col, back_row)).is_none());
            if !path_clear {
                continue;
            }

            let transit = Position::new(from.col + step, back_row);
            if CheckDetector::is_attacked(board, transit, color) {
                continue;
            }

            moves.push(PieceMove::quiet(from, Position::new(from.col + dc, back_row)));
        }
    }

    /// 过滤候选走法
    ///
    /// 剔除越界、落在己方棋子或任一方王上、违反走子/吃子限制，
    /// 以及走完后己方王被攻击的走法。
    fn filter_illegal(board: &Board, piece: Piece, candidates: &[PieceMove]) -> Vec<Move> {
        candidates
            .iter()
            .filter(|candidate| candidate.to.is_on_board())
            .filter(|candidate| match board.at(candidate.to) {
                Some(target) if target.piece_type == PieceType::King => false,
                Some(target) if target.color == piece.color => false,
                Some(_) => candidate.capture_allowed,
                None => candidate.move_allowed,
            })
            .map(PieceMove::as_move)
            .filter(|mv| {
                // 模拟走法
                let next = Self::apply_move(board, *mv);
                let king = if piece.piece_type == PieceType::King {
                    Some(mv.to)
                } else {
                    next.find_king(piece.color)
                };
                king.map_or(true, |king| {
                    !CheckDetector::is_attacked(&next, king, piece.color)
                })
            })
            .collect()
    }

    /// 是否为吃过路兵：兵斜走到空格
    pub fn is_en_passant(board: &Board, mv: Move) -> bool {
        board
            .at(mv.from)
            .is_some_and(|p| p.piece_type == PieceType::Pawn)
            && mv.from.col != mv.to.col
            && board.at(mv.to).is_none()
    }

    /// 是否为王车易位：王横走两格
    pub fn is_castling(board: &Board, mv: Move) -> bool {
        board
            .at(mv.from)
            .is_some_and(|p| p.piece_type == PieceType::King)
            && mv.from.row == mv.to.row
            && (mv.to.col - mv.from.col).abs() == 2
    }

    /// 执行走法并返回新棋盘（不检查合法性）
    ///
    /// 吃过路兵时移除被吃的兵，王车易位时同时移动车。
    pub fn apply_move(board: &Board, mv: Move) -> Board {
        if board.at(mv.from).is_none() {
            warn!("起点没有棋子: {}", mv);
        }

        let en_passant = Self::is_en_passant(board, mv);
        let castling = Self::is_castling(board, mv);
        let mut next = board.move_piece(mv.from, mv.to);

        if en_passant {
            next.remove(Position::new(mv.to.col, mv.from.row));
        }

        if castling {
            let row = mv.from.row;
            let kingside = mv.to.col > mv.from.col;
            if let Some(&(_, rook_from, rook_to)) = CASTLING_SIDES
                .iter()
                .find(|(dc, _, _)| (*dc > 0) == kingside)
            {
                let rook_pos = Position::new(rook_from, row);
                if next.at(rook_pos).is_none() {
                    warn!("王车易位时找不到车: {}", rook_pos);
                }
                next.displace(rook_pos, Position::new(rook_to, row));
            }
        }

        next
    }
}
