use anyhow::{bail, Context};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use plant_doctor::cli::{Cli, Commands, HistoryAction};
use plant_doctor::config::Config;
use plant_doctor::error::PlantDoctorError;
use plant_doctor::export::{export_sequentially, render_markdown, MarkdownExporter};
use plant_doctor::history::JsonHistoryStore;
use plant_doctor::inference::GeminiClient;
use plant_doctor::location::ConfiguredLocation;
use plant_doctor::orchestrator::{AnalysisOutcome, Orchestrator, TranslationOutcome};
use plant_doctor::panels::LocationPanel;
use plant_doctor::session::Session;
use plant_doctor_common::{Language, PendingImage, PlantCategory, TipsSnapshot, WeatherSnapshot};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliSession = Session<GeminiClient, ConfiguredLocation, JsonHistoryStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    let language = cli.lang.unwrap_or(config.language);
    let store = JsonHistoryStore::new(config.history_path()?);

    match cli.command {
        Commands::Analyze { image } => {
            let pending = read_image(&image).await?;
            tracing::debug!(mime = %pending.mime_type, bytes = pending.approx_size(), "image loaded");

            let spinner = spinner()?;
            let mut session = build_session(&config, store, language, &spinner)?;
            session.select_image(pending);
            let outcome = session.analyze().await;
            spinner.finish_and_clear();

            match outcome {
                Some(AnalysisOutcome::Created(id)) => {
                    if let Some(record) = session.orchestrator().find(&id) {
                        println!("{}", render_markdown(record));
                        println!("ID: {}", id);
                    }
                }
                Some(AnalysisOutcome::Rejected(failure)) => bail!("{}", failure.message_key().default_text()),
                Some(AnalysisOutcome::Discarded) | None => bail!("解析を開始できませんでした"),
            }
        }

        Commands::History { action } => {
            let mut orchestrator = Orchestrator::new(store, language);
            run_history(&mut orchestrator, action, &config).await?;
        }

        Commands::Translate { id } => {
            let spinner = spinner()?;
            let mut session = build_session(&config, store, language, &spinner)?;
            if session.orchestrator().find(&id).is_none() {
                spinner.finish_and_clear();
                return Err(PlantDoctorError::RecordNotFound(id).into());
            }
            let outcome = session.pick_from_history(&id).await;
            spinner.finish_and_clear();

            match outcome {
                Some(TranslationOutcome::Failed(failure)) => bail!("{}", failure.message_key().default_text()),
                Some(TranslationOutcome::Discarded) => bail!("翻訳結果が破棄されました"),
                Some(TranslationOutcome::Translated(_)) | None => {
                    if let Some(record) = session.orchestrator().current() {
                        println!("{}", render_markdown(record));
                    }
                }
            }
        }

        Commands::Weather { place } => {
            let spinner = spinner()?;
            let mut session = build_session(&config, store, language, &spinner)?;
            match place {
                Some(place) => session.search_weather(&place).await,
                None => session.open_weather().await,
            }
            spinner.finish_and_clear();
            report_panel(session.orchestrator().weather(), print_weather)?;
        }

        Commands::Tips { place } => {
            let spinner = spinner()?;
            let mut session = build_session(&config, store, language, &spinner)?;
            match place {
                Some(place) => session.search_tips(&place).await,
                None => session.open_tips().await,
            }
            spinner.finish_and_clear();
            report_panel(session.orchestrator().tips(), print_tips)?;
        }

        Commands::Config { set_api_key, set_language, set_location, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }
            if let Some(language) = set_language {
                config.set_language(language)?;
                println!("✔ 表示言語を設定しました: {}", language);
            }
            if let Some(coordinates) = set_location {
                config.set_home_location(coordinates)?;
                println!("✔ 現在地を設定しました: {}, {}", coordinates.latitude, coordinates.longitude);
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  表示言語: {}", config.language);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  出力間隔: {}ms", config.export_pause_ms);
                println!("  履歴ファイル: {}", config.history_path()?.display());
                match config.home_location {
                    Some(c) => println!("  現在地: {}, {}", c.latitude, c.longitude),
                    None => println!("  現在地: 未設定"),
                }
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn build_session(
    config: &Config,
    store: JsonHistoryStore,
    language: Language,
    spinner: &ProgressBar,
) -> anyhow::Result<CliSession> {
    let client = GeminiClient::new(config.get_api_key()?, config.model.clone(), config.timeout())?;
    let orchestrator = Orchestrator::new(store, language);
    let locator = ConfiguredLocation::new(config.home_location);

    let progress = spinner.clone();
    Ok(Session::new(orchestrator, client, locator)
        .with_progress(move |key| progress.set_message(key.default_text())))
}

async fn read_image(path: &Path) -> anyhow::Result<PendingImage> {
    if !path.exists() {
        return Err(PlantDoctorError::FileNotFound(path.display().to_string()).into());
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let format = image::guess_format(&bytes)
        .map_err(|_| PlantDoctorError::UnsupportedImage(path.display().to_string()))?;
    Ok(PendingImage::from_bytes(&bytes, format.to_mime_type()))
}

async fn run_history(
    orchestrator: &mut Orchestrator<JsonHistoryStore>,
    action: HistoryAction,
    config: &Config,
) -> anyhow::Result<()> {
    match action {
        HistoryAction::List => {
            if orchestrator.history().is_empty() {
                println!("履歴はありません");
            }
            for record in orchestrator.history() {
                println!(
                    "{}  {}  [{}] {} ({}/10)",
                    record.id,
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.language,
                    record.disease,
                    record.severity_level
                );
            }
        }

        HistoryAction::Show { id } => {
            let record = orchestrator
                .find(&id)
                .ok_or_else(|| PlantDoctorError::RecordNotFound(id.clone()))?;
            println!("{}", render_markdown(record));
        }

        HistoryAction::Delete { ids, yes } => {
            orchestrator.enter_selection_mode();
            for id in &ids {
                if !orchestrator.select(id) {
                    return Err(PlantDoctorError::RecordNotFound(id.clone()).into());
                }
            }
            let count = orchestrator.selected_records().len();
            if !yes && !confirm(&format!("{}件の診断を削除しますか?", count))? {
                orchestrator.exit_selection_mode();
                return Ok(());
            }
            let removed = orchestrator.delete_selected();
            println!("✔ {}件削除しました", removed);
        }

        HistoryAction::Export { ids, all, output } => {
            orchestrator.enter_selection_mode();
            let targets: Vec<String> = if all {
                orchestrator.history().iter().map(|r| r.id.clone()).collect()
            } else {
                ids
            };
            if targets.is_empty() {
                bail!("出力対象がありません（IDまたは --all を指定してください）");
            }
            for id in &targets {
                if !orchestrator.select(id) {
                    return Err(PlantDoctorError::RecordNotFound(id.clone()).into());
                }
            }

            let exporter = MarkdownExporter::new(output);
            let results = export_sequentially(&exporter, &orchestrator.selected_records(), config.export_pause()).await;
            orchestrator.exit_selection_mode();

            let mut failed = 0;
            for (id, result) in results {
                match result {
                    Ok(path) => println!("✔ {} → {}", id, path.display()),
                    Err(e) => {
                        failed += 1;
                        eprintln!("✘ {}: {}", id, e);
                    }
                }
            }
            if failed > 0 {
                bail!("{}件の出力に失敗しました", failed);
            }
        }

        HistoryAction::Clear { yes } => {
            let ids: Vec<String> = orchestrator.history().iter().map(|r| r.id.clone()).collect();
            if ids.is_empty() {
                println!("履歴はありません");
                return Ok(());
            }
            if !yes && !confirm(&format!("履歴{}件をすべて削除しますか?", ids.len()))? {
                return Ok(());
            }
            let removed = orchestrator.delete(&ids);
            println!("✔ {}件削除しました", removed);
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn report_panel<T>(panel: &LocationPanel<T>, print: fn(&T)) -> anyhow::Result<()> {
    if let Some(data) = panel.data() {
        print(data);
        return Ok(());
    }
    if let Some(key) = panel.error_message() {
        if panel.offers_manual_search() {
            eprintln!("地名を指定して再試行できます: --place <PLACE>");
        }
        bail!("{}", key.default_text());
    }
    Ok(())
}

fn print_weather(weather: &WeatherSnapshot) {
    println!("{}  {:.0}°C", weather.condition, weather.current_temp);
    println!("Humidity: {:.0}%  Wind: {:.0} km/h", weather.humidity, weather.wind_speed);
    if !weather.agricultural_summary.is_empty() {
        println!("\n{}", weather.agricultural_summary);
    }
    if !weather.forecast.is_empty() {
        println!();
        for day in &weather.forecast {
            println!("  {:<12} {:>4.0}° / {:>4.0}°  {}", day.day, day.min_temp, day.max_temp, day.condition);
        }
    }
}

fn print_tips(tips: &TipsSnapshot) {
    if !tips.summary.is_empty() {
        println!("{}\n", tips.summary);
    }
    for (title, category) in [("Productive", PlantCategory::Productive), ("Ornamental", PlantCategory::Ornamental)] {
        let plants: Vec<_> = tips.suggestions.iter().filter(|s| s.category == category).collect();
        if plants.is_empty() {
            continue;
        }
        println!("## {}", title);
        for plant in plants {
            println!("- {}: {}", plant.plant_name, plant.planting_advice);
            if !plant.productivity_outlook.is_empty() {
                println!("  {}", plant.productivity_outlook);
            }
        }
        println!();
    }
}
