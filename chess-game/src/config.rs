//! 对局配置
//!
//! JSON 格式，默认位于系统配置目录下的 `western-chess/config.json`。
//! 文件缺失或格式无效时使用默认配置。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chess_ai::AiConfig;
use chess_core::{Color, INITIAL_FEN};
use serde::{Deserialize, Serialize};

/// 对局配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// 开局局面
    pub initial_fen: String,
    /// AI 设置
    pub ai: AiConfig,
    /// AI 执哪一方，None 表示双方都由 AI 走（自对弈）
    pub ai_color: Option<Color>,
    /// 自对弈的最大步数
    pub max_plies: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_fen: INITIAL_FEN.to_string(),
            ai: AiConfig::default(),
            ai_color: Some(Color::Black),
            max_plies: 200,
        }
    }
}

impl GameConfig {
    /// 获取默认配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("western-chess");
            path.push("config.json");
            path
        })
    }

    /// 从默认位置加载配置
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("无法获取配置目录，使用默认配置");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// 从指定文件加载配置
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    tracing::info!("已加载配置: {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("配置文件格式无效: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取配置文件: {}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, content).with_context(|| format!("写入配置文件失败: {:?}", path))?;

        tracing::info!("配置已保存: {:?}", path);
        Ok(())
    }
}
