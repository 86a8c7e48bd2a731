use std::{
    fs,
    path::PathBuf,
    time::Instant,
};

use super::{
    cleanup::cleanup,
    VocadeckError,
};
use crate::{
    anki::{
        DeckMerger,
        MergeOutcome,
    },
    config::RunConfig,
    spreadsheet::{
        self,
        export_table,
        Table,
    },
    tts::{
        resolve_links,
        synthesize_rows,
        LinkSummary,
        SpeechSynthesizer,
        SynthesisSummary,
    },
};

#[derive(Debug)]
pub struct RunSummary {
    pub rows: usize,
    pub synthesis: SynthesisSummary,
    pub links: LinkSummary,
    pub exported: Option<PathBuf>,
    pub merge: MergeOutcome,
    pub warnings: Vec<VocadeckError>,
}

/// Load the spreadsheet, then hand it to [`process_table`]. A malformed
/// sheet stops the run here, before any audio is requested.
pub async fn run(
    config: &RunConfig,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<RunSummary, VocadeckError> {
    let table = spreadsheet::load_path(&config.input)?;
    process_table(table, config, synthesizer).await
}

/// Synthesize -> link -> export -> merge -> cleanup, strictly in that order.
pub async fn process_table(
    mut table: Table,
    config: &RunConfig,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<RunSummary, VocadeckError> {
    let total_start = Instant::now();
    config.work_dir.ensure()?;
    fs::create_dir_all(&config.output_dir)?;
    let audio_dir = config.audio_dir();

    let (synthesis, mut warnings) =
        synthesize_rows(&table.rows, &audio_dir, synthesizer, &config.speech).await?.into_parts();

    let links = resolve_links(&mut table.rows, &audio_dir);

    let export_path = config.export_path();
    let exported = match export_table(&table, &export_path) {
        Ok(()) => Some(export_path),
        Err(e) => {
            tracing::warn!("Spreadsheet export failed: {}", e);
            warnings.push(e);
            None
        }
    };

    let (merge, merge_warnings) = DeckMerger::new(&config.identity, &config.work_dir)
        .merge(&table.rows, &audio_dir, &config.deck_path())
        .await?
        .into_parts();
    warnings.extend(merge_warnings);

    let (_, cleanup_warnings) = cleanup(&config.work_dir).into_parts();
    warnings.extend(cleanup_warnings);

    tracing::info!(
        elapsed = format!("{:.1}s", total_start.elapsed().as_secs_f32()),
        warnings = warnings.len(),
        "run completed"
    );

    Ok(RunSummary { rows: table.rows.len(), synthesis, links, exported, merge, warnings })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        anki::{
            note::split_fields,
            open_existing,
        },
        config::{
            RunConfig,
            Settings,
        },
        spreadsheet::loader::tests::xlsx,
        tts::tests::ScriptedTts,
    };

    fn config_in(root: &Path, input: PathBuf) -> RunConfig {
        let settings = Settings { deck_name: "Pipeline Deck".to_string(), ..Default::default() };
        RunConfig::resolve(&input, &settings, &root.join("work"), &root.join("out")).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_then_rerun() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("words.xlsx");
        fs::write(&input, xlsx(&[
            &["Word", "Translation", "Phonetic", "Context"],
            &["dog", "cão", "dɔg", "the dog ran"],
            &["cat", "gato", "kæt", "the cat sat"],
        ]))
        .unwrap();
        let config = config_in(root.path(), input);
        let tts = ScriptedTts::failing_on(&["the cat sat"]);

        let first = run(&config, &tts).await.unwrap();

        assert_eq!(first.rows, 2);
        assert_eq!(first.synthesis.written, 3);
        assert_eq!(first.links.context_found, 1);
        assert_eq!(first.merge.new_cards, 2);
        assert_eq!(first.merge.total_cards, 2);
        assert!(matches!(first.warnings.as_slice(), [VocadeckError::Synthesis { row: 2, .. }]));
        assert!(config.deck_path().exists());
        assert_eq!(first.exported.as_deref(), Some(config.export_path().as_path()));
        assert!(!config.work_dir.media_staging_dir().exists());

        let second = run(&config, &ScriptedTts::default()).await.unwrap();

        assert_eq!(second.merge.new_cards, 0);
        assert_eq!(second.merge.duplicates, 2);
        assert_eq!(second.merge.total_cards, 2);
        assert!(second.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_failed_audio_never_falls_back_to_an_earlier_run() {
        let root = tempfile::tempdir().unwrap();
        let first_sheet = root.path().join("first.xlsx");
        fs::write(&first_sheet, xlsx(&[&["Word", "Context"], &["cat", "the cat sat"]])).unwrap();
        let second_sheet = root.path().join("second.xlsx");
        fs::write(&second_sheet, xlsx(&[&["Word", "Context"], &["dog", "the dog ran"]])).unwrap();

        run(&config_in(root.path(), first_sheet), &ScriptedTts::default()).await.unwrap();
        let config = config_in(root.path(), second_sheet);
        let summary = run(&config, &ScriptedTts::failing_on(&["the dog ran"])).await.unwrap();

        assert_eq!(summary.links.context_found, 0);
        assert_eq!(summary.merge.new_cards, 1);
        let deck = open_existing(&config.deck_path(), &config.work_dir).await.unwrap();
        let dog = deck
            .collection
            .notes
            .iter()
            .map(|n| split_fields(&n.flds))
            .find(|fields| fields[0] == "dog")
            .unwrap();
        assert_eq!(dog[5], "");
        assert_ne!(dog[4], "");
    }

    #[tokio::test]
    async fn test_format_error_stops_before_audio() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("bad.xlsx");
        fs::write(&input, xlsx(&[&["Word"], &["dog"]])).unwrap();
        let config = config_in(root.path(), input);
        let tts = ScriptedTts::default();

        let err = run(&config, &tts).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(tts.calls.lock().unwrap().is_empty());
        assert!(!config.audio_dir().exists());
        assert!(!config.deck_path().exists());
    }
}
