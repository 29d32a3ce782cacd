//! 规则常量定义

/// 棋盘边长（行数与列数）
pub const BOARD_SIZE: i8 = 8;

/// 棋盘格子总数
pub const SQUARE_COUNT: usize = 64;

/// 初始局面
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w";

/// 标准 32 枚棋子，吃子清单按此顺序给出
pub const FULL_PIECE_SET: &str = "rnbqkbnrppppppppPPPPPPPPRNBQKBNR";

/// 白方底线所在行
pub const WHITE_BACK_ROW: i8 = 8;

/// 黑方底线所在行
pub const BLACK_BACK_ROW: i8 = 1;

/// 王的初始列
pub const KING_HOME_COL: i8 = 5;
