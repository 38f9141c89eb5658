use crate::config::parse_coordinates;
use clap::{Parser, Subcommand};
use plant_doctor_common::{Coordinates, Language};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plant-doctor")]
#[command(about = "植物の病害AI診断ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 表示言語 (en/ar)。省略時は設定ファイルの値
    #[arg(long, global = true)]
    pub lang: Option<Language>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 植物の写真を診断して履歴に追加
    Analyze {
        /// 画像ファイルのパス
        #[arg(required = true)]
        image: PathBuf,
    },

    /// 診断履歴の管理
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 診断結果を表示言語 (--lang) で再解析
    Translate {
        /// 診断ID
        #[arg(required = true)]
        id: String,
    },

    /// 現在地の気象情報
    Weather {
        /// 地名を指定（現在地を使わない）
        #[arg(long)]
        place: Option<String>,
    },

    /// 現在地に合った栽培アドバイス
    Tips {
        /// 地名を指定（現在地を使わない）
        #[arg(long)]
        place: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 既定の表示言語を設定
        #[arg(long)]
        set_language: Option<Language>,

        /// 現在地を設定 (緯度,経度)
        #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
        set_location: Option<Coordinates>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 一覧（新しい順）
    List,

    /// 診断レポートを表示
    Show {
        #[arg(required = true)]
        id: String,
    },

    /// 指定した診断を削除
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 診断レポートをMarkdownで出力（1件ずつ順番に）
    Export {
        ids: Vec<String>,

        /// 全件出力
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// 履歴をすべて削除
    Clear {
        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },
}
