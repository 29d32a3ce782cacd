//! 对局控制
//!
//! 持有权威棋盘与走法历史，校验并执行走子、升变、重置，
//! 向订阅者广播每一步已执行的走法，并在需要时让 AI 走子。

use std::sync::Arc;

use chess_ai::{AiConfig, AiEngine, MoveScore, PerfRecorder};
use chess_core::{
    Board, CheckDetector, ChessError, Color, Fen, GameOutcome, Move, MoveGenerator, MoveHistory,
    Piece, PieceType, Position, BOARD_SIZE,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::GameConfig;

/// 事件通道容量
const EVENT_CAPACITY: usize = 64;

/// 走法已执行事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub mv: Move,
    /// 走子方
    pub color: Color,
    /// 走子后的局面
    pub fen: String,
}

/// 一局棋
pub struct Game {
    board: Board,
    history: MoveHistory,
    engine: AiEngine,
    perf: Arc<PerfRecorder>,
    events: broadcast::Sender<MoveEvent>,
}

impl Game {
    /// 从初始局面开始
    pub fn new(config: AiConfig) -> Self {
        Self::with_board(Board::initial(), config)
    }

    /// 从指定局面开始
    pub fn with_board(board: Board, config: AiConfig) -> Self {
        let perf = Arc::new(PerfRecorder::new());
        let engine = AiEngine::with_perf(config, perf.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            board,
            history: MoveHistory::new(),
            engine,
            perf,
            events,
        }
    }

    /// 按配置创建
    pub fn from_config(config: &GameConfig) -> Result<Self, ChessError> {
        let board = Fen::parse(&config.initial_fen)?;
        Ok(Self::with_board(board, config.ai.clone()))
    }

    /// 走子
    ///
    /// 被拒绝时棋盘与历史保持不变。
    pub fn make_move(&mut self, from: Position, to: Position) -> Result<Move, ChessError> {
        if from == to {
            return Err(ChessError::SameSquare);
        }

        let piece = self.board.at(from).ok_or(ChessError::NoPiece { pos: from })?;
        let color = self.board.turn();
        if piece.color != color {
            return Err(ChessError::NotYourTurn);
        }

        let mv = Move::new(from, to);
        if !MoveGenerator::legal_moves(&self.board, from, &self.history).contains(&mv) {
            return Err(ChessError::IllegalMove { from, to });
        }

        info!("[{}] {}", color, mv);
        self.board = MoveGenerator::apply_move(&self.board, mv);
        self.history.push(mv);

        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(MoveEvent {
            mv,
            color,
            fen: self.board.to_fen(),
        });

        Ok(mv)
    }

    /// 检查刚走完的一方是否有兵可以升变
    ///
    /// 走子后走子方已经交换：轮到黑方时检查第 1 行的白兵，轮到白方时检查第 8 行的黑兵。
    /// 只有该方有棋子被吃过时才可能升变。
    pub fn can_promote(&self) -> Option<(Position, Piece)> {
        let mover = self.board.turn().opponent();
        if !self.board.captures().iter().any(|p| p.color == mover) {
            return None;
        }

        let row = mover.opponent().back_row();
        (1..=BOARD_SIZE)
            .map(|col| Position::new(col, row))
            .find_map(|pos| {
                self.board
                    .at(pos)
                    .filter(|p| p.is(PieceType::Pawn, mover))
                    .map(|p| (pos, p))
            })
    }

    /// 可升变的棋子类型：该方被吃掉的棋子中的非兵、非王类型
    pub fn promotion_choices(&self) -> Vec<PieceType> {
        let Some((_, pawn)) = self.can_promote() else {
            return Vec::new();
        };

        let mut choices = Vec::new();
        for piece in self.board.captures() {
            if piece.color == pawn.color
                && !matches!(piece.piece_type, PieceType::Pawn | PieceType::King)
                && !choices.contains(&piece.piece_type)
            {
                choices.push(piece.piece_type);
            }
        }
        choices
    }

    /// 升变（不交换走子方）
    pub fn promote(&mut self, pos: Position, piece_type: PieceType) -> Result<(), ChessError> {
        let Some((pawn_pos, pawn)) = self.can_promote() else {
            return Err(ChessError::PromotionUnavailable);
        };
        if pawn_pos != pos || !self.promotion_choices().contains(&piece_type) {
            return Err(ChessError::PromotionUnavailable);
        }

        let piece = Piece::new(piece_type, pawn.color);
        self.board = self.board.promote(pos, piece);
        info!("[{}] {} 升变为 {}", pawn.color, pos, piece);
        Ok(())
    }

    /// 升变为可选棋子中分值最高的一种
    pub fn promote_best(&mut self) -> Option<PieceType> {
        let (pos, _) = self.can_promote()?;
        let best = self
            .promotion_choices()
            .into_iter()
            .max_by_key(|piece_type| piece_type.value())?;
        self.promote(pos, best).ok()?;
        Some(best)
    }

    /// 指定阵营的终局状态
    pub fn check_status(&self, color: Color) -> Option<GameOutcome> {
        CheckDetector::outcome(&self.board, color, &self.history)
    }

    /// 重置为初始局面
    pub fn reset(&mut self) {
        self.board = Board::initial();
        self.history.clear();
        self.engine.clear_cache();
        self.perf.reset();
        info!("对局已重置");
    }

    /// 让 AI 为当前走子方走一步
    ///
    /// 在棋盘与历史的副本上限时搜索，选出走法后通过 [`Game::make_move`] 执行。
    pub async fn play_ai_move(&mut self) -> Option<MoveScore> {
        let board = self.board.clone();
        let history = self.history.clone();

        self.perf.reset();
        let chosen = self.engine.best_move(&board, &history).await?;
        self.perf.log_report();

        match self.make_move(chosen.mv.from, chosen.mv.to) {
            Ok(_) => Some(chosen),
            Err(e) => {
                warn!("AI 走法被拒绝: {}", e);
                None
            }
        }
    }

    /// 订阅走子事件
    pub fn subscribe(&self) -> broadcast::Receiver<MoveEvent> {
        self.events.subscribe()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.to_fen()
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.board.at(pos)
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn engine(&self) -> &AiEngine {
        &self.engine
    }

    /// 指定格子上棋子的合法走法（空格返回空列表）
    pub fn legal_moves(&self, from: Position) -> Vec<Move> {
        if self.board.at(from).is_none() {
            return Vec::new();
        }
        MoveGenerator::legal_moves(&self.board, from, &self.history)
    }

    /// 指定阵营被吃掉的棋子
    pub fn captures(&self, color: Color) -> Vec<Piece> {
        self.board
            .captures()
            .into_iter()
            .filter(|p| p.color == color)
            .collect()
    }

    /// 指定阵营在棋盘上的棋子
    pub fn pieces(&self, color: Color) -> Vec<(Position, Piece)> {
        self.board.pieces(color)
    }

    /// 该格上的棋子是否属于走子方
    pub fn is_my_turn(&self, from: Position) -> bool {
        self.board
            .at(from)
            .is_some_and(|p| p.color == self.board.turn())
    }

    /// 该格是否被对方攻击（空格按走子方计算）
    pub fn can_be_captured(&self, pos: Position) -> bool {
        let color = self.board.at(pos).map_or(self.board.turn(), |p| p.color);
        CheckDetector::is_attacked(&self.board, pos, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{Notation, INITIAL_FEN};

    fn pos(text: &str) -> Position {
        Notation::parse_position(text).unwrap()
    }

    fn play(game: &mut Game, text: &str) -> Result<Move, ChessError> {
        let mv = Notation::parse_move(text).unwrap();
        game.make_move(mv.from, mv.to)
    }

    fn seeded() -> AiConfig {
        AiConfig {
            time_budget_ms: 200,
            max_depth: 2,
            seed: Some(3),
            ..AiConfig::default()
        }
    }

    fn game_at(fen: &str) -> Game {
        Game::with_board(Fen::parse(fen).unwrap(), seeded())
    }

    #[test]
    fn test_make_move() {
        let mut game = Game::new(seeded());
        let mut events = game.subscribe();

        let mv = play(&mut game, "57 55").unwrap();
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(game.piece_at(pos("57")), None);
        assert_eq!(
            game.piece_at(pos("55")),
            Some(Piece::new(PieceType::Pawn, Color::White))
        );
        assert_eq!(game.history().len(), 1);

        let event = events.try_recv().unwrap();
        assert_eq!(event.mv, mv);
        assert_eq!(event.color, Color::White);
        assert_eq!(event.fen, game.fen());
    }

    #[test]
    fn test_rejected_moves_leave_state() {
        let mut game = Game::new(seeded());

        assert_eq!(play(&mut game, "57 57"), Err(ChessError::SameSquare));
        assert_eq!(
            play(&mut game, "44 45"),
            Err(ChessError::NoPiece { pos: pos("44") })
        );
        assert_eq!(play(&mut game, "52 54"), Err(ChessError::NotYourTurn));
        assert_eq!(
            play(&mut game, "57 54"),
            Err(ChessError::IllegalMove {
                from: pos("57"),
                to: pos("54")
            })
        );

        assert_eq!(game.fen(), INITIAL_FEN);
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new(seeded());
        for text in ["67 66", "52 54", "77 75", "41 85"] {
            play(&mut game, text).unwrap();
        }

        assert_eq!(
            game.check_status(Color::White),
            Some(GameOutcome::Checkmate {
                loser: Color::White
            })
        );
        assert_eq!(game.check_status(Color::Black), None);
    }

    #[test]
    fn test_en_passant_through_game() {
        let mut game = Game::new(seeded());
        for text in ["57 55", "12 13", "55 54", "42 44"] {
            play(&mut game, text).unwrap();
        }
        assert!(game.legal_moves(pos("54")).contains(&Notation::parse_move("54 43").unwrap()));

        play(&mut game, "54 43").unwrap();
        assert_eq!(game.history().len(), 5);
        assert_eq!(game.piece_at(pos("44")), None);
        assert_eq!(
            game.piece_at(pos("43")),
            Some(Piece::new(PieceType::Pawn, Color::White))
        );
        assert_eq!(
            game.captures(Color::Black),
            vec![Piece::new(PieceType::Pawn, Color::Black)]
        );
    }

    #[test]
    fn test_en_passant_expires() {
        let mut game = Game::new(seeded());
        for text in ["57 55", "12 13", "55 54", "42 44", "78 66", "13 14"] {
            play(&mut game, text).unwrap();
        }
        assert!(matches!(
            play(&mut game, "54 43"),
            Err(ChessError::IllegalMove { .. })
        ));
        assert_eq!(game.history().len(), 6);
    }

    #[test]
    fn test_castling_through_game() {
        let mut game = game_at("r3k2r/8/8/8/8/8/8/R3K2R w");

        play(&mut game, "58 78").unwrap();
        assert_eq!(
            game.piece_at(pos("78")),
            Some(Piece::new(PieceType::King, Color::White))
        );
        assert_eq!(
            game.piece_at(pos("68")),
            Some(Piece::new(PieceType::Rook, Color::White))
        );
        assert_eq!(game.piece_at(pos("88")), None);
        assert_eq!(game.history().len(), 1);

        // 白车控制了 f 线，黑方王翼易位要经过被攻击的格子
        assert!(matches!(
            play(&mut game, "51 71"),
            Err(ChessError::IllegalMove { .. })
        ));

        play(&mut game, "51 31").unwrap();
        assert_eq!(
            game.piece_at(pos("41")),
            Some(Piece::new(PieceType::Rook, Color::Black))
        );
        assert_eq!(game.piece_at(pos("11")), None);
        assert_eq!(game.history().len(), 2);
    }

    #[test]
    fn test_promotion() {
        let mut game = game_at("4k/P/8/8/8/8/8/4K w");
        assert!(game.can_promote().is_none());

        play(&mut game, "12 11").unwrap();
        let (at, pawn) = game.can_promote().unwrap();
        assert_eq!(at, pos("11"));
        assert_eq!(pawn, Piece::new(PieceType::Pawn, Color::White));
        assert_eq!(
            game.promotion_choices(),
            vec![
                PieceType::Rook,
                PieceType::Knight,
                PieceType::Bishop,
                PieceType::Queen
            ]
        );

        assert_eq!(
            game.promote(at, PieceType::King),
            Err(ChessError::PromotionUnavailable)
        );
        assert_eq!(
            game.promote(pos("21"), PieceType::Queen),
            Err(ChessError::PromotionUnavailable)
        );

        game.promote(at, PieceType::Queen).unwrap();
        assert_eq!(
            game.piece_at(at),
            Some(Piece::new(PieceType::Queen, Color::White))
        );
        assert_eq!(game.turn(), Color::Black);
        assert!(game.can_promote().is_none());
    }

    #[test]
    fn test_promotion_needs_captured_piece() {
        // 白方一个子都没丢
        let mut game = game_at("1nbqkbnr/PPpppppp/8/8/8/8/2PPPPPP/RNBQKBNR w");
        play(&mut game, "12 11").unwrap();

        assert!(game.can_promote().is_none());
        assert!(game.promotion_choices().is_empty());
        assert_eq!(
            game.promote(pos("11"), PieceType::Queen),
            Err(ChessError::PromotionUnavailable)
        );
    }

    #[test]
    fn test_promote_best() {
        let mut game = game_at("4k/P/8/8/8/8/8/4K w");
        play(&mut game, "12 11").unwrap();
        assert_eq!(game.promote_best(), Some(PieceType::Queen));
        assert_eq!(game.promote_best(), None);
    }

    #[test]
    fn test_reset() {
        let mut game = Game::new(seeded());
        play(&mut game, "57 55").unwrap();
        game.reset();

        assert_eq!(game.fen(), INITIAL_FEN);
        assert!(game.history().is_empty());
        assert!(game.engine().cache().is_empty());
    }

    #[test]
    fn test_queries() {
        let mut game = Game::new(seeded());
        assert!(game.is_my_turn(pos("57")));
        assert!(!game.is_my_turn(pos("52")));
        assert!(!game.is_my_turn(pos("44")));
        assert_eq!(game.legal_moves(pos("57")).len(), 2);
        assert!(game.legal_moves(pos("44")).is_empty());
        assert_eq!(game.pieces(Color::White).len(), 16);

        play(&mut game, "57 55").unwrap();
        play(&mut game, "42 44").unwrap();
        assert!(game.can_be_captured(pos("55")));
        assert!(game.can_be_captured(pos("44")));
        assert!(!game.can_be_captured(pos("58")));
    }

    #[test]
    fn test_captures_by_color() {
        let game = game_at("2P/p3pk1p/6p/4B/r2N1Kn/5b/P/3q w");
        let white = game.captures(Color::White);
        assert!(white.contains(&Piece::new(PieceType::Queen, Color::White)));
        assert!(white.iter().all(|p| p.color == Color::White));
        assert!(game
            .captures(Color::Black)
            .iter()
            .all(|p| p.color == Color::Black));
    }

    #[test]
    fn test_from_config() {
        let config = GameConfig {
            initial_fen: "k/8/8/8/8/8/8/K b".to_string(),
            ..GameConfig::default()
        };
        let game = Game::from_config(&config).unwrap();
        assert_eq!(game.turn(), Color::Black);

        let config = GameConfig {
            initial_fen: "bad".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(
            Game::from_config(&config),
            Err(ChessError::InvalidFen { .. })
        ));
    }

    #[tokio::test]
    async fn test_ai_takes_queen() {
        let mut game = game_at("k/8/8/8/3q/4P/8/7K w");
        let mut events = game.subscribe();

        let chosen = game.play_ai_move().await.unwrap();
        assert_eq!(chosen.mv, Notation::parse_move("56 45").unwrap());
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(events.recv().await.unwrap().mv, chosen.mv);
    }

    #[tokio::test]
    async fn test_ai_plays_consecutive_moves() {
        let mut game = Game::new(AiConfig {
            time_budget_ms: 100,
            max_depth: 1,
            seed: Some(11),
            ..AiConfig::default()
        });

        for ply in 0..16 {
            if game.check_status(game.turn()).is_some() {
                break;
            }
            let turn = game.turn();
            let chosen = game.play_ai_move().await;
            assert!(chosen.is_some(), "第 {} 步 {} 没有走出合法走法", ply + 1, turn);
            game.promote_best();
            assert_eq!(game.history().len(), ply + 1);
        }
    }

    #[tokio::test]
    async fn test_ai_without_moves() {
        let mut game = game_at("k/1Q/2K/8/8/8/8/8 b");
        assert!(game.play_ai_move().await.is_none());
        assert!(game.history().is_empty());
    }
}
