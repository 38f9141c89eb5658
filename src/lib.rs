//! 植物病害AI診断
//!
//! 画像の検証・診断・再翻訳のワークフロー、診断履歴、
//! 位置情報ベースの気象・栽培アドバイス

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod inference;
pub mod location;
pub mod orchestrator;
pub mod panels;
pub mod session;
