//! 国际象棋规则库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 棋盘记法 (FEN) 解析与生成
//! - 走法生成和规则验证（王车易位、吃过路兵、升变）
//! - 将军、将死与困毙判定
//! - 走法历史与文本记法

mod board;
mod check;
mod constants;
mod error;
mod fen;
mod history;
mod moves;
mod notation;
mod piece;

pub use board::Board;
pub use check::{CheckDetector, GameOutcome};
pub use constants::*;
pub use error::{ChessError, Result};
pub use fen::Fen;
pub use history::MoveHistory;
pub use moves::{Move, MoveGenerator, PieceMove};
pub use notation::Notation;
pub use piece::{Color, Piece, PieceType, Position};
