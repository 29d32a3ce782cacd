//! 棋子定义

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::constants::{BLACK_BACK_ROW, BOARD_SIZE, WHITE_BACK_ROW};

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    /// 兵
    Pawn,
    /// 车
    Rook,
    /// 马
    Knight,
    /// 象
    Bishop,
    /// 后
    Queen,
    /// 王
    King,
}

impl PieceType {
    /// 获取棋子的子力分值（用于 AI 评估）
    pub fn value(&self) -> i32 {
        match self {
            PieceType::Pawn => 2,
            PieceType::Knight => 9,
            PieceType::Bishop => 10,
            PieceType::Rook => 8,
            PieceType::Queen => 20,
            PieceType::King => 100_000,
        }
    }

    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, color: Color) -> char {
        let c = match self {
            PieceType::Pawn => 'p',
            PieceType::Rook => 'r',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceType, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece_type = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'r' => PieceType::Rook,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        Some((piece_type, color))
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手，在下方，朝第 1 行前进）
    White,
    /// 黑方（后手，在上方，朝第 8 行前进）
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// 获取 FEN 走子方字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// 从 FEN 走子方字符解析
    pub fn from_fen_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    /// 兵前进方向（行增量）
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// 底线所在行
    pub fn back_row(&self) -> i8 {
        match self {
            Color::White => WHITE_BACK_ROW,
            Color::Black => BLACK_BACK_ROW,
        }
    }

    /// 兵的初始行
    pub fn pawn_home_row(&self) -> i8 {
        self.back_row() + self.forward()
    }

    /// 可以吃过路兵的行
    pub fn en_passant_row(&self) -> i8 {
        self.pawn_home_row() + 3 * self.forward()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
}

impl Piece {
    /// 创建新棋子
    pub fn new(piece_type: PieceType, color: Color) -> Self {
        Self { piece_type, color }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.piece_type.to_fen_char(self.color)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceType::from_fen_char(c).map(|(piece_type, color)| Piece { piece_type, color })
    }

    /// 获取棋子分值
    pub fn value(&self) -> i32 {
        self.piece_type.value()
    }

    /// 是否为指定阵营的指定棋子
    pub fn is(&self, piece_type: PieceType, color: Color) -> bool {
        self.piece_type == piece_type && self.color == color
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_fen_char())
    }
}

/// 棋盘位置
///
/// 列、行均从 1 开始。第 1 行是 FEN 中最先写出的一行（黑方底线），
/// 第 8 行是白方底线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 列 (1-8)
    pub col: i8,
    /// 行 (1-8)
    pub row: i8,
}

impl Position {
    /// 空位置占位符（仅供界面使用，不是合法坐标）
    pub const EMPTY: Position = Position { col: 0, row: 0 };

    /// 创建新位置（不检查边界）
    pub const fn new(col: i8, row: i8) -> Self {
        Self { col, row }
    }

    /// 检查位置是否在棋盘内
    pub fn is_on_board(&self) -> bool {
        (1..=BOARD_SIZE).contains(&self.col) && (1..=BOARD_SIZE).contains(&self.row)
    }

    /// 获取偏移后的位置，越界时返回 None
    pub fn offset(&self, dc: i8, dr: i8) -> Option<Position> {
        let pos = *self + Position::new(dc, dr);
        pos.is_on_board().then_some(pos)
    }

    /// 转换为数组索引
    pub fn to_index(&self) -> usize {
        (self.row - 1) as usize * BOARD_SIZE as usize + (self.col - 1) as usize
    }

    /// 从数组索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        let size = BOARD_SIZE as usize;
        if index < size * size {
            Some(Position {
                col: (index % size) as i8 + 1,
                row: (index / size) as i8 + 1,
            })
        } else {
            None
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.col + rhs.col, self.row + rhs.row)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}
