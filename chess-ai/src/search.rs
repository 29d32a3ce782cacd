//! 搜索引擎
//!
//! 负极大值风格的递归搜索：每个候选走法的即时得分为吃子分值乘以视角系数，
//! 再向下展开一层找到对手的最佳应对，沿应对链累加得分。
//! 支持固定深度与限时迭代加深两种方式。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chess_core::{Board, Move, MoveGenerator, MoveHistory};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::MoveCache;
use crate::evaluate::Evaluator;
use crate::perf::{NoopPerf, PerfSink};

/// 走完后对手无子可动时给走子方的奖励分
pub const TERMINAL_BONUS: i32 = 1000;

/// 展开节点时使用的缓存调用点
const EXPAND_SITE: &str = "expand";

/// 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// 简单：时间短，最多 2 层
    Easy,
    /// 中等
    Medium,
    /// 困难：时间长，最多 8 层
    Hard,
}

/// AI 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub difficulty: Difficulty,
    /// 每步思考时间（毫秒）
    pub time_budget_ms: u64,
    /// 迭代加深的最大层数
    pub max_depth: u32,
    /// 随机种子，未设置时每次使用系统熵
    pub seed: Option<u64>,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                difficulty,
                time_budget_ms: 500,
                max_depth: 2,
                seed: None,
            },
            Difficulty::Medium => Self {
                difficulty,
                time_budget_ms: 1500,
                max_depth: 6,
                seed: None,
            },
            Difficulty::Hard => Self {
                difficulty,
                time_budget_ms: 3000,
                max_depth: 8,
                seed: None,
            },
        }
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::Medium)
    }
}

/// 带得分的走法
///
/// `next` 是对手在下一层找到的最佳应对，`total` 为整条应对链的得分之和。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveScore {
    pub mv: Move,
    /// 即时得分（走子方为正）
    pub score: i32,
    pub next: Option<Box<MoveScore>>,
    pub total: i32,
}

impl MoveScore {
    pub fn new(mv: Move, score: i32) -> Self {
        Self {
            mv,
            score,
            next: None,
            total: score,
        }
    }

    /// 沿应对链累加得分
    pub fn sum_scores(&self) -> i32 {
        self.line().map(|step| step.score).sum()
    }

    /// 从本步开始的整条应对链
    pub fn line(&self) -> impl Iterator<Item = &MoveScore> {
        std::iter::successors(Some(self), |step| step.next.as_deref())
    }

    /// 输出思考过程
    pub fn log_thinking(&self) {
        for step in self.line() {
            debug!("{} S[{}] T[{}]", step.mv, step.score, self.total);
        }
    }
}

/// 搜索上下文
///
/// 一轮搜索内共享的状态：截止时间、沿当前路径推进的历史副本、各层完成的节点数。
pub struct SearchContext<'a> {
    cache: &'a mut MoveCache,
    perf: &'a dyn PerfSink,
    deadline: Option<Instant>,
    history: MoveHistory,
    completed: Vec<u64>,
    stopped: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        cache: &'a mut MoveCache,
        perf: &'a dyn PerfSink,
        history: MoveHistory,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            cache,
            perf,
            deadline,
            history,
            completed: Vec::new(),
            stopped: false,
        }
    }

    /// 检查是否应当停止（超过截止时间后保持停止）
    fn should_stop(&mut self) -> bool {
        if !self.stopped {
            self.stopped = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        }
        self.stopped
    }

    /// 本轮是否被截止时间打断
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// 已展开的节点总数
    pub fn nodes(&self) -> u64 {
        self.completed.iter().sum()
    }

    /// 指定层已展开的节点数
    pub fn completed_at(&self, depth: u32) -> u64 {
        self.completed.get(depth as usize).copied().unwrap_or(0)
    }

    fn mark_completed(&mut self, depth: u32) {
        let depth = depth as usize;
        if self.completed.len() <= depth {
            self.completed.resize(depth + 1, 0);
        }
        self.completed[depth] += 1;
    }
}

/// 展开一个节点，返回走子方的所有候选走法
///
/// 候选列表以 (局面记法, 层数, 易位与过路兵资格) 为键缓存。
/// `multiplier` 为 1 表示根节点一方走子，-1 表示对手走子。
pub fn expand(
    ctx: &mut SearchContext<'_>,
    board: &Board,
    depth: u32,
    max_depth: u32,
    multiplier: i32,
) -> Vec<MoveScore> {
    ctx.perf.time_start(EXPAND_SITE);

    let fen = board.to_fen();
    let depth_key = depth.to_string();
    let rights = ctx.history.rights(board);
    let parts = [fen.as_str(), depth_key.as_str(), rights.as_str()];

    let mut candidates = match ctx.cache.get::<Vec<MoveScore>>(EXPAND_SITE, &parts) {
        Some(cached) => cached,
        None => {
            let candidates: Vec<MoveScore> =
                MoveGenerator::all_legal_moves(board, board.turn(), &ctx.history)
                    .into_iter()
                    .map(|mv| MoveScore::new(mv, Evaluator::capture_score(board, mv) * multiplier))
                    .collect();
            ctx.cache.set(EXPAND_SITE, &parts, candidates.clone());
            candidates
        }
    };

    if ctx.should_stop() || depth >= max_depth {
        ctx.perf.time_stop(EXPAND_SITE);
        return candidates;
    }

    // 对走子方有利的先展开，返回列表保持生成顺序
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    if multiplier > 0 {
        order.sort_by(|&a, &b| candidates[b].score.cmp(&candidates[a].score));
    } else {
        order.sort_by_key(|&i| candidates[i].score);
    }

    for index in order {
        ctx.mark_completed(depth);

        let mv = candidates[index].mv;
        let next = MoveGenerator::apply_move(board, mv);
        ctx.history.push(mv);
        let replies = expand(ctx, &next, depth + 1, max_depth, -multiplier);
        ctx.history.pop();

        let candidate = &mut candidates[index];
        match best_reply(replies, multiplier > 0) {
            Some(reply) => candidate.next = Some(Box::new(reply)),
            None => candidate.score += TERMINAL_BONUS * multiplier,
        }

        if ctx.should_stop() {
            break;
        }
    }

    ctx.perf.time_stop(EXPAND_SITE);
    candidates
}

/// 对手的最佳应对：我方取最大时对手取最小，反之亦然；同分取第一个
fn best_reply(replies: Vec<MoveScore>, minimize: bool) -> Option<MoveScore> {
    replies.into_iter().reduce(|best, reply| {
        let better = if minimize {
            reply.score < best.score
        } else {
            reply.score > best.score
        };
        if better {
            reply
        } else {
            best
        }
    })
}

/// 一次搜索的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// 根节点的所有候选走法（已计算总分）
    pub moves: Vec<MoveScore>,
    /// 完成的搜索深度
    pub depth: u32,
    /// 展开的节点数
    pub nodes: u64,
}

impl SearchResult {
    fn new(mut moves: Vec<MoveScore>, depth: u32, nodes: u64) -> Self {
        for mv in &mut moves {
            mv.total = mv.sum_scores();
        }
        Self { moves, depth, nodes }
    }

    /// 总分最高的走法（同分取第一个）
    pub fn best(&self) -> Option<&MoveScore> {
        self.moves
            .iter()
            .reduce(|best, mv| if mv.total > best.total { mv } else { best })
    }
}

/// AI 引擎
pub struct AiEngine {
    config: AiConfig,
    cache: MoveCache,
    perf: Arc<dyn PerfSink>,
    rng: ChaCha8Rng,
    nodes_searched: u64,
}

impl AiEngine {
    /// 创建新的 AI 引擎
    pub fn new(config: AiConfig) -> Self {
        Self::with_perf(config, Arc::new(NoopPerf))
    }

    /// 创建带性能统计的 AI 引擎
    pub fn with_perf(config: AiConfig, perf: Arc<dyn PerfSink>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            cache: MoveCache::new(perf.clone()),
            config,
            perf,
            rng,
            nodes_searched: 0,
        }
    }

    /// 从难度创建
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self::new(AiConfig::from_difficulty(difficulty))
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn cache(&self) -> &MoveCache {
        &self.cache
    }

    /// 换局时清空缓存
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// 最近一次搜索展开的节点数
    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// 固定深度搜索，不受时间限制
    ///
    /// 没有合法走法时返回 None。
    pub fn search_depth(
        &mut self,
        board: &Board,
        history: &MoveHistory,
        depth: u32,
    ) -> Option<SearchResult> {
        let (result, _) = self.run_round(board, history, depth, None)?;
        self.nodes_searched = result.nodes;
        Some(result)
    }

    /// 限时迭代加深搜索
    ///
    /// 从深度 0 开始逐轮加深，每轮重新完整搜索，轮与轮之间让出调度。
    /// 时间用完（且至少尝试过深度 1）或达到最大深度时停止；
    /// 被截止时间打断的一轮作废，返回最后完整的一轮。
    pub async fn search_timed(
        &mut self,
        board: &Board,
        history: &MoveHistory,
        budget: Duration,
    ) -> Option<SearchResult> {
        self.perf.time_start("search_timed");
        let deadline = Instant::now() + budget;
        let mut best: Option<SearchResult> = None;
        let mut depth = 0;

        loop {
            let Some((result, complete)) = self.run_round(board, history, depth, Some(deadline))
            else {
                self.perf.time_stop("search_timed");
                return None;
            };

            if complete || best.is_none() {
                best = Some(result);
            }

            let out_of_time = Instant::now() >= deadline;
            if !complete || (out_of_time && depth > 0) || depth >= self.config.max_depth {
                break;
            }

            depth += 1;
            tokio::task::yield_now().await;
        }

        self.perf.time_stop("search_timed");

        if let Some(result) = &best {
            self.nodes_searched = result.nodes;
            info!(
                "搜索了 {} 个节点，深度 {}，缓存 {} 条",
                result.nodes,
                result.depth,
                self.cache.len()
            );
        }
        best
    }

    /// 执行一轮搜索，返回结果以及该轮是否完整
    fn run_round(
        &mut self,
        board: &Board,
        history: &MoveHistory,
        depth: u32,
        deadline: Option<Instant>,
    ) -> Option<(SearchResult, bool)> {
        let mut ctx = SearchContext::new(
            &mut self.cache,
            self.perf.as_ref(),
            history.clone(),
            deadline,
        );
        let moves = expand(&mut ctx, board, 0, depth, 1);
        if moves.is_empty() {
            return None;
        }

        let complete = depth == 0 || !ctx.stopped();
        debug!(
            "深度 {} 完成 {} 个节点{}",
            depth,
            ctx.nodes(),
            if complete { "" } else { "（被打断）" }
        );
        Some((SearchResult::new(moves, depth, ctx.nodes()), complete))
    }

    /// 从搜索结果中选择走法
    ///
    /// 1. 有总分为正的走法时，在最高分中随机选一个
    /// 2. 否则在总分不小于 0 的走法中随机选一个
    /// 3. 否则在损失最小的一组中随机选一个
    pub fn choose_move(&mut self, result: &SearchResult) -> Option<MoveScore> {
        let max_total = result.moves.iter().map(|m| m.total).max()?;

        let (label, pool): (&str, Vec<&MoveScore>) = if max_total > 0 {
            (
                "有利走法",
                result.moves.iter().filter(|m| m.total == max_total).collect(),
            )
        } else if max_total == 0 {
            (
                "均势走法",
                result.moves.iter().filter(|m| m.total >= 0).collect(),
            )
        } else {
            (
                "减少损失",
                result.moves.iter().filter(|m| m.total == max_total).collect(),
            )
        };

        let chosen = pool.choose(&mut self.rng).map(|m| (*m).clone())?;
        info!("[{}] {} 总分 {}", label, chosen.mv, chosen.total);
        chosen.log_thinking();
        Some(chosen)
    }

    /// 按配置的时间限制搜索并选择走法
    pub async fn best_move(&mut self, board: &Board, history: &MoveHistory) -> Option<MoveScore> {
        let budget = self.config.time_budget();
        let result = self.search_timed(board, history, budget).await?;
        self.choose_move(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Fen;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    fn seeded(max_depth: u32) -> AiEngine {
        AiEngine::new(AiConfig {
            max_depth,
            seed: Some(7),
            ..AiConfig::default()
        })
    }

    fn result_with_totals(totals: &[i32]) -> SearchResult {
        let moves = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let col = i as i8 % 8 + 1;
                MoveScore::new(
                    Move::new(
                        chess_core::Position::new(col, 7),
                        chess_core::Position::new(col, 6),
                    ),
                    total,
                )
            })
            .collect();
        SearchResult::new(moves, 0, 0)
    }

    #[test]
    fn test_difficulty_config() {
        let easy = AiConfig::from_difficulty(Difficulty::Easy);
        assert_eq!(easy.max_depth, 2);
        assert_eq!(easy.time_budget_ms, 500);

        let medium = AiConfig::default();
        assert_eq!(medium.difficulty, Difficulty::Medium);
        assert_eq!(medium.time_budget_ms, 1500);
        assert_eq!(medium.max_depth, 6);

        let hard = AiConfig::from_difficulty(Difficulty::Hard);
        assert_eq!(hard.max_depth, 8);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: AiConfig = serde_json::from_str(r#"{"seed": 42}"#).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.time_budget_ms, 1500);
    }

    #[test]
    fn test_depth_zero_prefers_queen_capture() {
        // 白兵可以吃掉黑后
        let board = Fen::parse("k/8/8/8/3q/4P/8/7K w").unwrap();
        let mut engine = seeded(6);
        let result = engine.search_depth(&board, &MoveHistory::new(), 0).unwrap();

        let best = result.best().unwrap();
        assert_eq!(best.mv, mv("56 45"));
        assert_eq!(best.score, 20);
        assert!(best.next.is_none());
    }

    #[test]
    fn test_depth_one_follows_reply() {
        let board = Fen::parse("k/8/8/8/3q/4P/8/7K w").unwrap();
        let mut engine = seeded(6);
        let result = engine.search_depth(&board, &MoveHistory::new(), 1).unwrap();

        let best = result.best().unwrap();
        assert_eq!(best.mv, mv("56 45"));
        assert_eq!(best.total, 20);
        assert!(best.next.is_some());

        // 兵前进一步会被黑后吃掉
        let push = result.moves.iter().find(|m| m.mv == mv("56 55")).unwrap();
        assert_eq!(push.total, -2);

        let chosen = engine.choose_move(&result).unwrap();
        assert_eq!(chosen.mv, mv("56 45"));
    }

    #[test]
    fn test_terminal_bonus_for_mate() {
        // 车沉底将死
        let board = Fen::parse("6k/5ppp/8/8/8/8/8/R5K w").unwrap();
        let mut engine = seeded(6);
        let result = engine.search_depth(&board, &MoveHistory::new(), 1).unwrap();

        let best = result.best().unwrap();
        assert_eq!(best.mv, mv("18 11"));
        assert_eq!(best.score, TERMINAL_BONUS);
        assert_eq!(best.total, TERMINAL_BONUS);
    }

    #[test]
    fn test_no_legal_moves() {
        let board = Fen::parse("k/1Q/2K/8/8/8/8/8 b").unwrap();
        let mut engine = seeded(6);
        assert!(engine.search_depth(&board, &MoveHistory::new(), 2).is_none());
    }

    #[test]
    fn test_totals_sum_chain() {
        let mut first = MoveScore::new(mv("52 54"), 5);
        let mut second = MoveScore::new(mv("57 55"), -3);
        second.next = Some(Box::new(MoveScore::new(mv("54 55"), 2)));
        first.next = Some(Box::new(second));
        assert_eq!(first.sum_scores(), 4);
        assert_eq!(first.line().count(), 3);
    }

    #[test]
    fn test_search_uses_cache() {
        let board = Board::initial();
        let history = MoveHistory::new();
        let mut engine = seeded(6);

        let first = engine.search_depth(&board, &history, 1).unwrap();
        assert!(!engine.cache().is_empty());
        let probes = engine.cache().stats().probes;

        let second = engine.search_depth(&board, &history, 1).unwrap();
        assert_eq!(first.moves, second.moves);
        assert!(engine.cache().stats().hits > 0);
        assert!(engine.cache().stats().probes > probes);
        assert_eq!(first.moves.len(), 20);
        assert_eq!(first.nodes, 20);
    }

    #[test]
    fn test_cache_keeps_en_passant_rights_apart() {
        let board = Fen::parse("kn/8/8/4Pp/8/8/8/6NK w").unwrap();
        let en_passant = mv("54 63");
        let mut engine = seeded(6);

        let history = MoveHistory::from(vec![mv("62 64")]);
        let first = engine.search_depth(&board, &history, 1).unwrap();
        assert!(first.moves.iter().any(|m| m.mv == en_passant));

        // 双方马走开再回来，局面相同但吃过路兵的机会已经过去
        let mut later = history.clone();
        for text in ["78 66", "21 33", "66 78", "33 21"] {
            later.push(mv(text));
        }
        let legal = MoveGenerator::all_legal_moves(&board, board.turn(), &later);
        assert!(!legal.contains(&en_passant));

        let second = engine.search_depth(&board, &later, 1).unwrap();
        assert_eq!(second.moves.len(), legal.len());
        assert!(second.moves.iter().all(|m| legal.contains(&m.mv)));
        let chosen = engine.choose_move(&second).unwrap();
        assert!(legal.contains(&chosen.mv));
    }

    #[test]
    fn test_choose_move_tiers() {
        let mut engine = seeded(6);

        // 有正分时取最高分
        let result = result_with_totals(&[3, 5, 5, -1]);
        let chosen = engine.choose_move(&result).unwrap();
        assert_eq!(chosen.total, 5);

        // 没有正分时取不小于 0 的
        let result = result_with_totals(&[-2, 0, -7, 0]);
        let chosen = engine.choose_move(&result).unwrap();
        assert_eq!(chosen.total, 0);

        // 全部为负时取损失最小的一组
        let result = result_with_totals(&[-3, -1, -8, -1]);
        let chosen = engine.choose_move(&result).unwrap();
        assert_eq!(chosen.total, -1);

        assert!(engine.choose_move(&result_with_totals(&[])).is_none());
    }

    #[test]
    fn test_seeded_choice_is_reproducible() {
        let result = result_with_totals(&[0, 0, 0, 0, 0, 0]);
        let a = seeded(6).choose_move(&result).unwrap();
        let b = seeded(6).choose_move(&result).unwrap();
        assert_eq!(a.mv, b.mv);
    }

    #[test]
    fn test_search_does_not_touch_history() {
        let history = MoveHistory::from(vec![mv("52 54")]);
        let board = Board::initial();
        let mut engine = seeded(6);
        engine.search_depth(&board, &history, 2).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_timed_search_respects_max_depth() {
        let mut engine = seeded(1);
        let result = engine
            .search_timed(&Board::initial(), &MoveHistory::new(), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(result.depth, 1);
        assert_eq!(result.moves.len(), 20);
        assert_eq!(engine.nodes_searched(), 20);
    }

    #[tokio::test]
    async fn test_timed_search_with_tiny_budget() {
        let mut engine = seeded(6);
        let result = engine
            .search_timed(&Board::initial(), &MoveHistory::new(), Duration::ZERO)
            .await
            .unwrap();
        // 深度 1 被打断，保留深度 0 的结果
        assert_eq!(result.depth, 0);
        assert_eq!(result.moves.len(), 20);
    }

    #[tokio::test]
    async fn test_timed_search_no_moves() {
        let board = Fen::parse("k/1Q/2K/8/8/8/8/8 b").unwrap();
        let mut engine = seeded(6);
        assert!(engine
            .search_timed(&board, &MoveHistory::new(), Duration::from_millis(50))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_best_move_takes_queen() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let board = Fen::parse("k/8/8/8/3q/4P/8/7K w").unwrap();
        let mut engine = AiEngine::new(AiConfig {
            time_budget_ms: 200,
            max_depth: 2,
            seed: Some(1),
            ..AiConfig::default()
        });
        let chosen = engine.best_move(&board, &MoveHistory::new()).await.unwrap();
        assert_eq!(chosen.mv, mv("56 45"));
    }
}
