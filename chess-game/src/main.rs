use std::path::PathBuf;

use anyhow::Result;
use chess_ai::Evaluator;
use chess_core::{GameOutcome, Notation};
use chess_game::{Game, GameConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("chess_game=info".parse()?))
        .init();

    info!("国际象棋对局启动中...");

    // 参数为配置文件路径，缺省时使用系统配置目录
    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load_from(&PathBuf::from(path)),
        None => GameConfig::load(),
    };

    let mut game = Game::from_config(&config)?;

    let mut events = game.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!("[{}] {} => {}", event.color, event.mv, event.fen),
                Err(RecvError::Lagged(skipped)) => warn!("走子事件积压，跳过 {} 条", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut plies = 0;

    while plies < config.max_plies {
        let turn = game.turn();
        if let Some(outcome) = game.check_status(turn) {
            match outcome {
                GameOutcome::Checkmate { loser } => info!("{} 被将死", loser),
                GameOutcome::Stalemate { side } => info!("{} 无子可动，和棋", side),
            }
            break;
        }

        let ai_turn = config.ai_color.map_or(true, |color| color == turn);
        if ai_turn {
            if game.play_ai_move().await.is_none() {
                break;
            }
        } else {
            println!("{} 走子（如 52 54）：", turn);
            let Some(line) = input.next_line().await? else {
                break;
            };

            let mv = match Notation::parse_move(line.trim()) {
                Ok(mv) => mv,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if let Err(e) = game.make_move(mv.from, mv.to) {
                println!("{}", e);
                continue;
            }
        }

        if let Some(piece_type) = game.promote_best() {
            debug!("自动升变为 {:?}", piece_type);
        }
        plies += 1;
    }

    info!(
        "对局结束，共 {} 步，子力差（白方视角）{}",
        game.history().len(),
        Evaluator::evaluate_material(game.board())
    );
    println!("{}", game.fen());

    Ok(())
}
