mod composer;
mod config;
mod error;
mod extractor;
mod hashtags;
mod holiday;
mod http;
mod locator;
mod publisher;
mod run;

use clap::Parser;
use config::{Cli, Config};
use error::exit_code;
use holiday::HolidaysJpApi;
use publisher::{Publisher, XPublisher};
use run::RunOutcome;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("設定エラー: {:#}", e);
            std::process::exit(1);
        }
    };

    let client = http::new_client();
    let calendar = HolidaysJpApi::new(client.clone());
    let x_publisher = config
        .credentials()
        .ok()
        .map(|creds| XPublisher::new(creds, client));

    let outcome = run::run(
        &config,
        run::today_jst(),
        &calendar,
        x_publisher.as_ref().map(|p| p as &dyn Publisher),
    )
    .await;

    let code = match outcome {
        Ok(RunOutcome::HolidaySkip) => {
            println!("市場休業日のため投稿をスキップしました。");
            exit_code::SUCCESS
        }
        Ok(RunOutcome::EmptyExtraction) => {
            println!("銘柄を抽出できなかったため投稿をスキップしました。");
            exit_code::SUCCESS
        }
        Ok(RunOutcome::DryRun { text }) => {
            println!("(dry run) 投稿は実行していません。");
            info!("dry run composed {} chars", text.chars().count());
            exit_code::SUCCESS
        }
        Ok(RunOutcome::Posted { text }) => {
            println!("投稿しました。");
            info!("posted {} chars", text.chars().count());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
