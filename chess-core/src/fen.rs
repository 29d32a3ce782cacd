//! 棋盘记法解析和生成
//!
//! 格式：`<第1行>/<第2行>/.../<第8行> <走子方>`
//!
//! - 白方棋子大写，黑方小写
//! - 数字表示连续空格
//! - 不足 8 格的行右侧补空格；生成时省略行尾空格，整行为空写作 `8`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w`

use crate::board::Board;
use crate::constants::BOARD_SIZE;
use crate::error::ChessError;
use crate::piece::{Color, Piece, Position};

/// 棋盘记法处理
pub struct Fen;

impl Fen {
    /// 解析记法字符串为棋盘
    ///
    /// 不校验双方是否各有一个王。
    pub fn parse(fen: &str) -> Result<Board, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(ChessError::InvalidFen {
                reason: format!("Expected placement and turn fields, got {}", parts.len()),
            });
        }

        // 解析走子方
        let turn = parts[1]
            .chars()
            .next()
            .and_then(Color::from_fen_char)
            .ok_or_else(|| ChessError::InvalidFen {
                reason: format!("Invalid turn field: {}", parts[1]),
            })?;

        let mut board = Board::empty(turn);
        let rows: Vec<&str> = parts[0].split('/').collect();

        if rows.len() != BOARD_SIZE as usize {
            return Err(ChessError::InvalidFen {
                reason: format!("Expected 8 rows, got {}", rows.len()),
            });
        }

        for (row_idx, row) in rows.iter().enumerate() {
            let row_no = row_idx as i8 + 1;
            let mut col = 1i8;

            for c in row.chars() {
                if let Some(empty_count) = c.to_digit(10) {
                    // 空格数量，每段之后检查列数
                    col += empty_count as i8;
                    if col > BOARD_SIZE + 1 {
                        return Err(ChessError::InvalidFen {
                            reason: format!("Row {} has too many columns", row_no),
                        });
                    }
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    if col > BOARD_SIZE {
                        return Err(ChessError::InvalidFen {
                            reason: format!("Row {} has too many columns", row_no),
                        });
                    }
                    board.set(Position::new(col, row_no), Some(piece));
                    col += 1;
                } else {
                    return Err(ChessError::InvalidFen {
                        reason: format!("Invalid piece character: {}", c),
                    });
                }
            }

            if col > BOARD_SIZE + 1 {
                return Err(ChessError::InvalidFen {
                    reason: format!("Row {} has {} columns, expected at most 8", row_no, col - 1),
                });
            }
        }

        Ok(board)
    }

    /// 将棋盘转换为记法字符串
    pub fn to_string(board: &Board) -> String {
        let rows: Vec<String> = (1..=BOARD_SIZE).map(|row| Self::row_to_string(board, row)).collect();
        format!("{} {}", rows.join("/"), board.turn().to_fen_char())
    }

    /// 编码一行：连续空格写成数字，行尾空格省略
    fn row_to_string(board: &Board, row: i8) -> String {
        let mut line = String::new();
        let mut empty_count = 0;

        for col in 1..=BOARD_SIZE {
            if let Some(piece) = board.at(Position::new(col, row)) {
                if empty_count > 0 {
                    line.push_str(&empty_count.to_string());
                    empty_count = 0;
                }
                line.push(piece.to_fen_char());
            } else {
                empty_count += 1;
            }
        }

        if line.is_empty() {
            line.push_str(&BOARD_SIZE.to_string());
        }

        line
    }
}
