//! 棋盘状态
//!
//! 棋盘是值类型：每次走子都返回新的棋盘快照。唯一的原地修改是
//! crate 内部的辅助位移（王车易位时的车、吃过路兵时被吃的兵），
//! 且只作用于尚未交给调用方的新快照。

use serde::{Deserialize, Serialize};

use crate::constants::{FULL_PIECE_SET, SQUARE_COUNT};
use crate::fen::Fen;
use crate::piece::{Color, Piece, PieceType, Position};

/// 底线棋子排列（从第 1 列到第 8 列）
const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 (row - 1) * 8 + (col - 1)，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
    /// 当前走子方
    turn: Color,
}

impl Board {
    /// 创建空棋盘
    pub fn empty(turn: Color) -> Self {
        Self {
            squares: vec![None; SQUARE_COUNT],
            turn,
        }
    }

    /// 创建初始棋盘（白方先走）
    pub fn initial() -> Self {
        let mut board = Self::empty(Color::White);

        for (i, piece_type) in BACK_RANK.iter().enumerate() {
            let col = i as i8 + 1;
            board.set(
                Position::new(col, Color::Black.back_row()),
                Some(Piece::new(*piece_type, Color::Black)),
            );
            board.set(
                Position::new(col, Color::White.back_row()),
                Some(Piece::new(*piece_type, Color::White)),
            );
            board.set(
                Position::new(col, Color::Black.pawn_home_row()),
                Some(Piece::new(PieceType::Pawn, Color::Black)),
            );
            board.set(
                Position::new(col, Color::White.pawn_home_row()),
                Some(Piece::new(PieceType::Pawn, Color::White)),
            );
        }

        board
    }

    /// 当前走子方
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// 获取指定位置的棋子（越界或空格返回 None）
    pub fn at(&self, pos: Position) -> Option<Piece> {
        if pos.is_on_board() {
            self.squares[pos.to_index()]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子
    pub(crate) fn set(&mut self, pos: Position, piece: Option<Piece>) {
        if pos.is_on_board() {
            self.squares[pos.to_index()] = piece;
        }
    }

    /// 移动棋子并交换走子方，返回新棋盘（不检查规则）
    pub fn move_piece(&self, from: Position, to: Position) -> Board {
        let mut next = self.clone();
        next.displace(from, to);
        next.turn = self.turn.opponent();
        debug_assert!(
            next.find_king(Color::White).is_some() && next.find_king(Color::Black).is_some(),
            "棋盘上不能缺少任何一方的王: {}",
            next
        );
        next
    }

    /// 辅助位移：原地移动第二枚棋子，不交换走子方
    ///
    /// 只能用在刚由 [`Board::move_piece`] 产生、尚未交给调用方的快照上。
    pub(crate) fn displace(&mut self, from: Position, to: Position) {
        let piece = self.at(from);
        self.set(from, None);
        self.set(to, piece);
    }

    /// 原地移除棋子（吃过路兵）
    pub(crate) fn remove(&mut self, pos: Position) -> Option<Piece> {
        let piece = self.at(pos);
        self.set(pos, None);
        piece
    }

    /// 升变：返回替换了指定格子棋子的新棋盘，走子方不变
    pub fn promote(&self, pos: Position, piece: Piece) -> Board {
        let mut next = self.clone();
        next.set(pos, Some(piece));
        next
    }

    /// 被吃掉的棋子：标准 32 枚棋子中不在棋盘上的部分
    pub fn captures(&self) -> Vec<Piece> {
        let mut remaining: Vec<Piece> = FULL_PIECE_SET
            .chars()
            .filter_map(Piece::from_fen_char)
            .collect();

        for (_, piece) in self.all_pieces() {
            if let Some(index) = remaining.iter().position(|p| *p == piece) {
                remaining.remove(index);
            }
        }

        remaining
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, color: Color) -> Option<Position> {
        self.all_pieces()
            .into_iter()
            .find(|(_, piece)| piece.is(PieceType::King, color))
            .map(|(pos, _)| pos)
    }

    /// 获取指定阵营的所有棋子位置（按行、列顺序）
    pub fn pieces(&self, color: Color) -> Vec<(Position, Piece)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.color == color)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Position, Piece)> {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(index, square)| {
                let piece = (*square)?;
                Position::from_index(index).map(|pos| (pos, piece))
            })
            .collect()
    }

    /// 序列化为棋盘记法
    pub fn to_fen(&self) -> String {
        Fen::to_string(self)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Fen::to_string(self))
    }
}

impl std::str::FromStr for Board {
    type Err = crate::error::ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fen::parse(s)
    }
}
