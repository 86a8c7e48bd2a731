use std::{
    collections::{
        BTreeMap,
        HashMap,
        HashSet,
    },
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use chrono::Utc;
use serde_json::{
    Map,
    Value,
};

use super::{
    collection::{
        deck_json,
        CollectionContents,
        StoredCard,
        StoredNote,
    },
    model::CardModel,
    note::{
        guid_for,
        join_fields,
        split_fields,
        Note,
    },
    package::{
        open_existing,
        write_package,
        ExistingDeck,
    },
};
use crate::core::{
    utils::{
        sound_tag,
        StripMarkup,
    },
    AudioField,
    DuplicateKey,
    Report,
    Row,
    VocadeckError,
    WorkDir,
};

/// Which deck and note type a run writes into. Both ids must stay the same
/// between runs for re-imports to land on the same deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckIdentity {
    pub name: String,
    pub deck_id: i64,
    pub model_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub path: PathBuf,
    pub new_cards: usize,
    pub duplicates: usize,
    pub existing_cards: usize,
    pub total_cards: usize,
    pub carried_media: usize,
}

pub struct DeckMerger<'a> {
    identity: &'a DeckIdentity,
    work_dir: &'a WorkDir,
}

impl<'a> DeckMerger<'a> {
    pub fn new(identity: &'a DeckIdentity, work_dir: &'a WorkDir) -> Self {
        Self { identity, work_dir }
    }

    /// Merge `rows` into the deck at `output_path`, creating it when absent.
    /// Rows whose duplicate key already exists in that deck are skipped;
    /// everything the old deck held (notes, cards, audio) is written back.
    pub async fn merge(
        &self,
        rows: &[Row],
        audio_dir: &Path,
        output_path: &Path,
    ) -> Result<Report<MergeOutcome>, VocadeckError> {
        let mut report = Report::new(MergeOutcome {
            path: output_path.to_path_buf(),
            new_cards: 0,
            duplicates: 0,
            existing_cards: 0,
            total_cards: 0,
            carried_media: 0,
        });

        let existing = self.load_existing(output_path, &mut report).await;
        let existing_keys = existing.duplicate_keys();
        report.value.existing_cards = existing.collection.notes.len();
        report.value.carried_media = existing.media.len();
        if output_path.exists() {
            tracing::info!(
                existing = report.value.existing_cards,
                keys = existing_keys.len(),
                "cards already in deck"
            );
        }

        let model = CardModel::vocabulary(self.identity.model_id);
        let mut media = MediaPlan::new(existing.media.clone());
        let mut guids: HashSet<String> =
            existing.collection.notes.iter().map(|n| n.guid.clone()).collect();
        let mut first_seen: HashMap<DuplicateKey, usize> = HashMap::new();
        let mut new_notes = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            let position = i + 1;
            let key = row.duplicate_key();
            if existing_keys.contains(&key) {
                tracing::debug!(word = %row.word, "duplicate card skipped");
                report.value.duplicates += 1;
                continue;
            }

            if let Some(first) = first_seen.get(&key) {
                report.warn(VocadeckError::RepeatedInBatch {
                    key: key.to_string(),
                    first: *first,
                    repeat: position,
                });
            } else {
                first_seen.insert(key, position);
            }

            let mut note = Note::new(self.note_fields(row, audio_dir, &mut media)?);
            note.guid = unique_guid(note.guid, &note.fields, &mut guids);
            new_notes.push(note);
        }
        report.value.new_cards = new_notes.len();

        let contents = self.assemble(&model, existing, &new_notes);
        write_package(output_path, &contents, media.entries(), self.work_dir).await?;

        report.value.total_cards = report.value.existing_cards + report.value.new_cards;
        tracing::info!(
            new = report.value.new_cards,
            duplicates = report.value.duplicates,
            total = report.value.total_cards,
            "deck merge finished"
        );
        Ok(report)
    }

    /// A missing deck is a fresh start; an unreadable one is reported and
    /// then treated the same way.
    async fn load_existing(
        &self,
        output_path: &Path,
        report: &mut Report<MergeOutcome>,
    ) -> ExistingDeck {
        if !output_path.exists() {
            return ExistingDeck::default();
        }

        match open_existing(output_path, self.work_dir).await {
            Ok(existing) => {
                if let Some(store) = existing.unread_store {
                    report.warn(VocadeckError::ContainerRead {
                        path: output_path.to_path_buf(),
                        reason: format!(
                            "{} is not supported; notes stored there will not be kept",
                            store
                        ),
                    });
                }
                existing
            }
            Err(e) => {
                report.warn(VocadeckError::ContainerRead {
                    path: output_path.to_path_buf(),
                    reason: e.to_string(),
                });
                ExistingDeck::default()
            }
        }
    }

    fn note_fields(
        &self,
        row: &Row,
        audio_dir: &Path,
        media: &mut MediaPlan,
    ) -> Result<Vec<String>, VocadeckError> {
        let mut fields = vec![
            row.word.clone(),
            row.translation.clone().unwrap_or_default(),
            row.phonetic.clone().unwrap_or_default(),
            row.context.clone(),
        ];

        for field in AudioField::ALL {
            let file_name = row.audio_ref(field);
            let source = audio_dir.join(file_name);
            let tag = if !file_name.is_empty() && source.is_file() {
                sound_tag(&media.add_new(file_name, &source)?)
            } else {
                String::new()
            };
            fields.push(tag);
        }

        Ok(fields)
    }

    fn assemble(
        &self,
        model: &CardModel,
        existing: ExistingDeck,
        new_notes: &[Note],
    ) -> CollectionContents {
        let now_ms = Utc::now().timestamp_millis();
        let now_secs = now_ms / 1000;
        let deck_id = self.identity.deck_id;

        let mut models: Map<String, Value> = existing.collection.models;
        models.insert(model.id.to_string(), model.to_json(deck_id));

        let mut decks = Map::new();
        decks.insert("1".to_string(), deck_json(1, "Default", 0));
        decks.insert(deck_id.to_string(), deck_json(deck_id, &self.identity.name, now_secs));

        let mut notes = existing.collection.notes;
        for note in &mut notes {
            conform_legacy_note(note, model, &models);
        }
        let mut cards = existing.collection.cards;
        for card in &mut cards {
            card.rehome(deck_id);
        }

        let mut next_note_id = notes.iter().map(|n| n.id + 1).max().unwrap_or(0).max(now_ms);
        let mut next_card_id = cards.iter().map(|c| c.id + 1).max().unwrap_or(0).max(now_ms);
        let first_due = cards.iter().filter(|c| c.card_type == 0).map(|c| c.due + 1).max().unwrap_or(0);

        for (i, note) in new_notes.iter().enumerate() {
            notes.push(StoredNote {
                id: next_note_id,
                guid: note.guid.clone(),
                mid: model.id,
                modified: now_secs,
                usn: -1,
                tags: note.joined_tags(),
                flds: note.joined_fields(),
                sfld: note.sort_field().strip_markup(),
                csum: note.checksum(),
                flags: 0,
                data: String::new(),
            });
            cards.push(StoredCard::new_card(
                next_card_id,
                next_note_id,
                deck_id,
                first_due + i as i64,
                now_secs,
            ));
            next_note_id += 1;
            next_card_id += 1;
        }

        CollectionContents {
            created: existing.collection.created.unwrap_or(now_secs),
            modified: now_ms,
            models,
            decks,
            notes,
            cards,
        }
    }
}

/// Legacy notes written under this model id with fewer fields, or whose
/// note type is missing, are mapped onto the current field list with the
/// same fallback the duplicate key uses.
fn conform_legacy_note(note: &mut StoredNote, model: &CardModel, models: &Map<String, Value>) {
    let orphaned = !models.contains_key(&note.mid.to_string());
    if note.mid != model.id && !orphaned {
        return;
    }

    let fields = split_fields(&note.flds);
    let conformed: Vec<String> = match fields.len() {
        n if n >= model.field_count() => return,
        0 | 1 => vec![fields.first().copied().unwrap_or_default().to_string()],
        2 => vec![fields[0].to_string(), String::new(), String::new(), fields[1].to_string()],
        3 => vec![fields[0].to_string(), String::new(), fields[1].to_string(), fields[2].to_string()],
        _ => fields.iter().map(|f| f.to_string()).collect(),
    };

    let mut padded = conformed;
    padded.resize(model.field_count(), String::new());
    note.flds = join_fields(&padded);
    note.mid = model.id;
}

/// Keep GUIDs unique inside one package; a repeat gets a salted GUID.
fn unique_guid(guid: String, fields: &[String], taken: &mut HashSet<String>) -> String {
    if taken.insert(guid.clone()) {
        return guid;
    }

    let mut salt = 1usize;
    loop {
        let mut values: Vec<String> = fields.to_vec();
        values.push(salt.to_string());
        let candidate = guid_for(&values);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        salt += 1;
    }
}

/// Media to embed, by name. Carried-over files keep their names; a new file
/// that would shadow a different carried-over file gets a free name.
struct MediaPlan {
    entries: BTreeMap<String, PathBuf>,
}

impl MediaPlan {
    fn new(carried: BTreeMap<String, PathBuf>) -> Self {
        Self { entries: carried }
    }

    fn entries(&self) -> &BTreeMap<String, PathBuf> {
        &self.entries
    }

    fn add_new(&mut self, name: &str, source: &Path) -> Result<String, VocadeckError> {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (name, String::new()),
        };

        let mut candidate = name.to_string();
        let mut k = 0usize;
        loop {
            match self.entries.get(&candidate) {
                None => {
                    self.entries.insert(candidate.clone(), source.to_path_buf());
                    return Ok(candidate);
                }
                Some(existing) if same_media(existing, source)? => return Ok(candidate),
                Some(_) => {
                    k += 1;
                    candidate = format!("{}-{}{}", stem, k, ext);
                }
            }
        }
    }
}

fn same_media(a: &Path, b: &Path) -> Result<bool, VocadeckError> {
    if a == b {
        return Ok(true);
    }
    Ok(fs::read(a)? == fs::read(b)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::anki::collection::write_collection;

    const DECK_ID: i64 = 2059400110;
    const MODEL_ID: i64 = 1607392319;

    struct Fixture {
        root: tempfile::TempDir,
        work_dir: WorkDir,
        audio_dir: PathBuf,
        output: PathBuf,
        identity: DeckIdentity,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let work_dir = WorkDir::new(root.path().join("work"));
            let audio_dir = work_dir.audio_dir("Test Deck");
            fs::create_dir_all(&audio_dir).unwrap();
            let output = root.path().join("out").join("Test Deck.apkg");
            let identity =
                DeckIdentity { name: "Test Deck".to_string(), deck_id: DECK_ID, model_id: MODEL_ID };
            Fixture { root, work_dir, audio_dir, output, identity }
        }

        fn audio(&self, name: &str, bytes: &[u8]) {
            fs::write(self.audio_dir.join(name), bytes).unwrap();
        }

        async fn merge(&self, rows: &[Row]) -> Report<MergeOutcome> {
            DeckMerger::new(&self.identity, &self.work_dir)
                .merge(rows, &self.audio_dir, &self.output)
                .await
                .unwrap()
        }

        /// Notes and media entry names inside the written package.
        async fn contents(&self) -> (Vec<StoredNote>, Vec<String>) {
            let deck = open_existing(&self.output, &self.work_dir).await.unwrap();
            (deck.collection.notes, deck.media.keys().cloned().collect())
        }
    }

    fn linked(word: &str, context: &str, position: usize) -> Row {
        let mut row = Row::new(word, context);
        row.audio_word_ref = AudioField::Word.file_name(position);
        row.audio_context_ref = AudioField::Context.file_name(position);
        row
    }

    #[tokio::test]
    async fn test_fresh_deck_gets_every_row() {
        let fx = Fixture::new();
        fx.audio("word_1.mp3", b"ID3 dog");
        fx.audio("context_1.mp3", b"ID3 the dog ran");
        let rows = vec![linked("dog", "the dog ran", 1).with_translation("cão")];

        let report = fx.merge(&rows).await;

        assert!(report.is_clean());
        assert_eq!(report.value.new_cards, 1);
        assert_eq!(report.value.duplicates, 0);
        assert_eq!(report.value.total_cards, 1);
        let (notes, media) = fx.contents().await;
        assert_eq!(
            split_fields(&notes[0].flds),
            vec!["dog", "cão", "", "the dog ran", "[sound:word_1.mp3]", "[sound:context_1.mp3]"]
        );
        assert_eq!(notes[0].mid, MODEL_ID);
        assert_eq!(media, vec!["context_1.mp3", "word_1.mp3"]);
    }

    #[tokio::test]
    async fn test_existing_card_is_skipped_regardless_of_case() {
        let fx = Fixture::new();
        fx.merge(&[Row::new("cat", "the cat sat")]).await;

        let report =
            fx.merge(&[Row::new("cat", "The Cat Sat"), Row::new("dog", "the dog ran")]).await;

        assert_eq!(report.value.new_cards, 1);
        assert_eq!(report.value.duplicates, 1);
        assert_eq!(report.value.existing_cards, 1);
        assert_eq!(report.value.total_cards, 2);
        let (notes, _) = fx.contents().await;
        let words: Vec<&str> = notes.iter().map(|n| split_fields(&n.flds)[0]).collect();
        assert_eq!(words, vec!["cat", "dog"]);
    }

    #[tokio::test]
    async fn test_second_run_on_same_input_adds_nothing() {
        let fx = Fixture::new();
        fx.audio("word_1.mp3", b"ID3 dog");
        let rows = vec![linked("dog", "the dog ran", 1), linked("cat", "the cat sat", 2)];

        let first = fx.merge(&rows).await;
        let second = fx.merge(&rows).await;
        let third = fx.merge(&[]).await;

        assert_eq!(first.value.new_cards, 2);
        assert_eq!(second.value.new_cards, 0);
        assert_eq!(second.value.duplicates, 2);
        assert_eq!(second.value.total_cards, first.value.total_cards);
        assert_eq!(third.value.new_cards, 0);
        assert_eq!(third.value.total_cards, first.value.total_cards);
        let (notes, media) = fx.contents().await;
        assert_eq!(notes.len(), 2);
        assert_eq!(media, vec!["word_1.mp3"]);
    }

    #[tokio::test]
    async fn test_missing_context_audio_leaves_field_empty() {
        let fx = Fixture::new();
        fx.audio("word_1.mp3", b"ID3 dog");
        let rows = vec![linked("dog", "the dog ran", 1)];

        let report = fx.merge(&rows).await;

        assert_eq!(report.value.new_cards, 1);
        let (notes, _) = fx.contents().await;
        let fields = split_fields(&notes[0].flds);
        assert_eq!(fields[4], "[sound:word_1.mp3]");
        assert_eq!(fields[5], "");
    }

    #[tokio::test]
    async fn test_old_media_survives_without_matching_rows() {
        let fx = Fixture::new();
        fx.audio("word_1.mp3", b"ID3 cat");
        fx.merge(&[linked("cat", "the cat sat", 1)]).await;
        fs::remove_file(fx.audio_dir.join("word_1.mp3")).unwrap();

        let report = fx.merge(&[Row::new("dog", "the dog ran")]).await;

        assert_eq!(report.value.carried_media, 1);
        let (notes, media) = fx.contents().await;
        assert_eq!(notes.len(), 2);
        assert_eq!(media, vec!["word_1.mp3"]);
    }

    #[tokio::test]
    async fn test_colliding_audio_name_is_renamed() {
        let fx = Fixture::new();
        fx.audio("word_1.mp3", b"ID3 cat");
        fx.merge(&[linked("cat", "the cat sat", 1)]).await;
        fx.audio("word_1.mp3", b"ID3 dog");

        fx.merge(&[linked("dog", "the dog ran", 1)]).await;

        let (notes, media) = fx.contents().await;
        assert_eq!(media, vec!["word_1-1.mp3", "word_1.mp3"]);
        assert_eq!(split_fields(&notes[0].flds)[4], "[sound:word_1.mp3]");
        assert_eq!(split_fields(&notes[1].flds)[4], "[sound:word_1-1.mp3]");
        let deck = open_existing(&fx.output, &fx.work_dir).await.unwrap();
        assert_eq!(fs::read(&deck.media["word_1.mp3"]).unwrap(), b"ID3 cat");
        assert_eq!(fs::read(&deck.media["word_1-1.mp3"]).unwrap(), b"ID3 dog");
    }

    #[tokio::test]
    async fn test_repeats_within_a_batch_are_kept_and_reported() {
        let fx = Fixture::new();
        let rows = vec![Row::new("dog", "the dog ran"), Row::new("Dog", "The dog ran ")];

        let report = fx.merge(&rows).await;

        assert_eq!(report.value.new_cards, 2);
        assert!(matches!(
            report.warnings.as_slice(),
            [VocadeckError::RepeatedInBatch { first: 1, repeat: 2, .. }]
        ));
        let (notes, _) = fx.contents().await;
        assert_ne!(notes[0].guid, notes[1].guid);
    }

    #[tokio::test]
    async fn test_round_trip_total_counts_repeated_rows() {
        let fx = Fixture::new();
        let rows = vec![Row::new("dog", "the dog ran"), Row::new("dog", "the dog ran")];

        let first = fx.merge(&rows).await;
        let second = fx.merge(&[]).await;

        assert_eq!(first.value.total_cards, 2);
        assert_eq!(second.value.existing_cards, 2);
        assert_eq!(second.value.new_cards, 0);
        assert_eq!(second.value.total_cards, first.value.total_cards);
        let (notes, _) = fx.contents().await;
        assert_eq!(notes.len(), second.value.total_cards);
    }

    #[tokio::test]
    async fn test_unreadable_deck_degrades_to_fresh_deck() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.output.parent().unwrap()).unwrap();
        fs::write(&fx.output, b"this is not a zip").unwrap();

        let report = fx.merge(&[Row::new("dog", "the dog ran")]).await;

        assert!(matches!(report.warnings.as_slice(), [VocadeckError::ContainerRead { .. }]));
        assert_eq!(report.value.existing_cards, 0);
        assert_eq!(report.value.total_cards, 1);
        let (notes, _) = fx.contents().await;
        assert_eq!(notes.len(), 1);
    }

    #[tokio::test]
    async fn test_newer_note_store_is_reported() {
        let fx = Fixture::new();
        let placeholder = fx.root.path().join("collection.anki2");
        write_collection(&placeholder, &CollectionContents {
            created: 0,
            modified: 0,
            models: Map::new(),
            decks: Map::new(),
            notes: Vec::new(),
            cards: Vec::new(),
        })
        .await
        .unwrap();
        fs::create_dir_all(fx.output.parent().unwrap()).unwrap();
        let mut zip = zip::ZipWriter::new(fs::File::create(&fx.output).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("collection.anki2", options).unwrap();
        std::io::copy(&mut fs::File::open(&placeholder).unwrap(), &mut zip).unwrap();
        zip.start_file("collection.anki21b", options).unwrap();
        std::io::Write::write_all(&mut zip, b"zstd compressed store").unwrap();
        zip.finish().unwrap();

        let report = fx.merge(&[Row::new("dog", "the dog ran")]).await;

        assert!(matches!(
            report.warnings.as_slice(),
            [VocadeckError::ContainerRead { reason, .. }] if reason.contains("collection.anki21b")
        ));
        assert_eq!(report.value.new_cards, 1);
    }

    #[tokio::test]
    async fn test_short_legacy_notes_are_matched_and_conformed() {
        let fx = Fixture::new();
        let legacy_db = fx.root.path().join("collection.anki2");
        let mut models = Map::new();
        models.insert(MODEL_ID.to_string(), serde_json::json!({ "id": MODEL_ID }));
        let legacy = |id: i64, flds: &str| StoredNote {
            id,
            guid: format!("legacy{id}"),
            mid: MODEL_ID,
            modified: 0,
            usn: -1,
            tags: String::new(),
            flds: flds.to_string(),
            sfld: String::new(),
            csum: 0,
            flags: 0,
            data: String::new(),
        };
        write_collection(&legacy_db, &CollectionContents {
            created: 1_600_000_000,
            modified: 0,
            models,
            decks: Map::new(),
            notes: vec![legacy(1, "cat\x1fthe cat sat"), legacy(2, "owl\x1fawl\x1fthe owl hoots")],
            cards: vec![StoredCard::new_card(10, 1, 99, 0, 0), StoredCard::new_card(11, 2, 99, 1, 0)],
        })
        .await
        .unwrap();
        fs::create_dir_all(fx.output.parent().unwrap()).unwrap();
        let mut zip = zip::ZipWriter::new(fs::File::create(&fx.output).unwrap());
        zip.start_file("collection.anki2", zip::write::SimpleFileOptions::default()).unwrap();
        std::io::copy(&mut fs::File::open(&legacy_db).unwrap(), &mut zip).unwrap();
        zip.finish().unwrap();

        let report =
            fx.merge(&[Row::new("Cat", "the cat sat"), Row::new("owl", "THE OWL HOOTS")]).await;

        assert_eq!(report.value.duplicates, 2);
        assert_eq!(report.value.total_cards, 2);
        let stored = open_existing(&fx.output, &fx.work_dir).await.unwrap().collection;
        assert_eq!(split_fields(&stored.notes[0].flds), vec!["cat", "", "", "the cat sat", "", ""]);
        assert_eq!(split_fields(&stored.notes[1].flds), vec![
            "owl",
            "",
            "awl",
            "the owl hoots",
            "",
            ""
        ]);
        assert!(stored.cards.iter().all(|c| c.did == DECK_ID));
        assert_eq!(stored.created, Some(1_600_000_000));
    }
}
