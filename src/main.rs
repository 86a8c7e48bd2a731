use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vocadeck::{
    anki::open_existing,
    config::{
        BuildArgs,
        Cli,
        Command,
        InspectArgs,
        RunConfig,
        Settings,
        SETTINGS_FILE,
    },
    core::{
        cleanup::cleanup,
        WorkDir,
    },
    persistence::{
        app_data_dir,
        load_json_or_default,
        save_json,
    },
    tts::GoogleTranslateTts,
    RunSummary,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vocadeck=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings_dir = cli.settings_dir.clone().unwrap_or_else(app_data_dir);

    match cli.command {
        Command::Build(args) => build(args, settings_dir).await,
        Command::Inspect(args) => inspect(args).await,
    }
}

fn default_work_root() -> PathBuf {
    std::env::temp_dir().join("vocadeck")
}

async fn build(args: BuildArgs, settings_dir: PathBuf) -> anyhow::Result<()> {
    let stored: Settings = load_json_or_default(&settings_dir, SETTINGS_FILE);
    let settings = args.apply(stored);
    let output_dir = std::env::current_dir().context("Cannot determine the current directory")?;
    let config = RunConfig::resolve(&args.input, &settings, &default_work_root(), &output_dir)?;

    if args.save_settings {
        save_json(&settings, &settings_dir, SETTINGS_FILE)?;
    }

    let synthesizer = GoogleTranslateTts::new()?;
    let summary = vocadeck::run(&config, &synthesizer)
        .await
        .with_context(|| format!("Building deck from {}", config.input.display()))?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!("  Rows processed:          {}", summary.rows);
    println!(
        "  Audio found (word/ctx):  {}/{} of {}",
        summary.links.word_found, summary.links.context_found, summary.links.rows
    );
    println!("  New cards added:         {}", summary.merge.new_cards);
    println!("  Duplicates skipped:      {}", summary.merge.duplicates);
    println!("  Total cards in deck:     {}", summary.merge.total_cards);
    println!("  Deck:                    {}", summary.merge.path.display());
    if let Some(exported) = &summary.exported {
        println!("  Spreadsheet:             {}", exported.display());
    }
    if !summary.warnings.is_empty() {
        println!("  Warnings:                {}", summary.warnings.len());
        for warning in &summary.warnings {
            println!("    - {}", warning);
        }
    }
}

async fn inspect(args: InspectArgs) -> anyhow::Result<()> {
    let work_dir = WorkDir::new(args.work_dir.unwrap_or_else(default_work_root));
    let deck = open_existing(&args.deck, &work_dir)
        .await
        .with_context(|| format!("Reading {}", args.deck.display()))?;

    println!("Deck: {}", args.deck.display());
    println!("  Notes:           {}", deck.collection.notes.len());
    println!("  Cards:           {}", deck.collection.cards.len());
    println!("  Distinct keys:   {}", deck.duplicate_keys().len());
    if let Some(store) = deck.unread_store {
        println!("  Not read:        {} (unsupported note store)", store);
    }
    println!("  Audio files:     {}", deck.media.len());
    for name in deck.media.keys() {
        println!("    {}", name);
    }

    cleanup(&work_dir);
    Ok(())
}
