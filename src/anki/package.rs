use std::{
    collections::{
        BTreeMap,
        HashMap,
        HashSet,
    },
    fs::{
        self,
        File,
    },
    io::{
        self,
        Read,
    },
    path::{
        Path,
        PathBuf,
    },
};

use zip::{
    write::SimpleFileOptions,
    CompressionMethod,
    ZipArchive,
    ZipWriter,
};

use super::{
    collection::{
        read_collection,
        write_collection,
        CollectionContents,
        StoredCollection,
        COLLECTION_NAMES,
        UNREADABLE_COLLECTION_NAMES,
        WRITTEN_COLLECTION,
    },
    note::stored_note_key,
};
use crate::core::{
    utils::is_audio_file,
    DuplicateKey,
    VocadeckError,
    WorkDir,
};

const MEDIA_MANIFEST: &str = "media";

/// A previously packaged deck, opened for merging.
#[derive(Debug, Default)]
pub struct ExistingDeck {
    pub collection: StoredCollection,
    /// Audio files copied out of the container, keyed by their media name.
    pub media: BTreeMap<String, PathBuf>,
    /// Entry name of a note store present in the container that was not read.
    pub unread_store: Option<&'static str>,
}

impl ExistingDeck {
    /// The set of duplicate keys of every stored note that has one.
    pub fn duplicate_keys(&self) -> HashSet<DuplicateKey> {
        self.collection.notes.iter().filter_map(|note| stored_note_key(&note.flds)).collect()
    }
}

/// Open an `.apkg`, read its note store and copy its audio files into the
/// work dir's media staging area.
pub async fn open_existing(path: &Path, work_dir: &WorkDir) -> Result<ExistingDeck, VocadeckError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let collection_name = COLLECTION_NAMES
        .into_iter()
        .find(|name| archive.index_for_name(name).is_some())
        .ok_or_else(|| VocadeckError::Custom("no note store in the container".to_string()))?;

    let unread_store = UNREADABLE_COLLECTION_NAMES
        .into_iter()
        .find(|name| archive.index_for_name(name).is_some());
    if let Some(name) = unread_store {
        tracing::warn!(
            store = name,
            read = collection_name,
            "container holds an unsupported note store"
        );
    }

    let scratch = work_dir.extraction_dir()?;
    let db_path = scratch.path().join(collection_name);
    extract_entry(&mut archive, collection_name, &db_path)?;
    let collection = read_collection(&db_path).await?;

    let manifest = read_manifest(&mut archive)?;
    let media = stage_media(&mut archive, &manifest, &work_dir.media_staging_dir())?;

    tracing::info!(
        notes = collection.notes.len(),
        media = media.len(),
        store = collection_name,
        "opened existing deck"
    );
    Ok(ExistingDeck { collection, media, unread_store })
}

fn extract_entry(
    archive: &mut ZipArchive<File>,
    name: &str,
    target: &Path,
) -> Result<(), VocadeckError> {
    let mut entry = archive.by_name(name)?;
    let mut out = File::create(target)?;
    io::copy(&mut entry, &mut out)?;
    Ok(())
}

/// Entry name -> media file name. Containers without a manifest yield an
/// empty map.
fn read_manifest(archive: &mut ZipArchive<File>) -> Result<HashMap<String, String>, VocadeckError> {
    let mut raw = String::new();
    match archive.by_name(MEDIA_MANIFEST) {
        Ok(mut entry) => {
            entry.read_to_string(&mut raw)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    }

    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn stage_media(
    archive: &mut ZipArchive<File>,
    manifest: &HashMap<String, String>,
    staging: &Path,
) -> Result<BTreeMap<String, PathBuf>, VocadeckError> {
    if staging.exists() {
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir_all(staging)?;

    let mut staged = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let entry_name = entry.name().to_string();
        if entry_name == MEDIA_MANIFEST
            || COLLECTION_NAMES.contains(&entry_name.as_str())
            || UNREADABLE_COLLECTION_NAMES.contains(&entry_name.as_str())
        {
            continue;
        }

        let media_name = match manifest.get(&entry_name) {
            Some(name) => name.clone(),
            None => entry_name,
        };
        // Media live at the container root; never follow a path out of staging
        let Some(file_name) = Path::new(&media_name).file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_audio_file(file_name) {
            continue;
        }

        let target = staging.join(file_name);
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        staged.insert(file_name.to_string(), target);
    }

    Ok(staged)
}

/// Write the note store and media into a fresh container at `path`,
/// replacing whatever was there once the new file is complete.
pub async fn write_package(
    path: &Path,
    contents: &CollectionContents,
    media: &BTreeMap<String, PathBuf>,
    work_dir: &WorkDir,
) -> Result<(), VocadeckError> {
    let scratch = work_dir.extraction_dir()?;
    let db_path = scratch.path().join(WRITTEN_COLLECTION);
    write_collection(&db_path, contents).await?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = scratch.path().join("package.partial");
    let mut zip = ZipWriter::new(File::create(&partial)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(WRITTEN_COLLECTION, options)?;
    io::copy(&mut File::open(&db_path)?, &mut zip)?;

    let mut manifest = BTreeMap::new();
    for (index, (name, source)) in media.iter().enumerate() {
        let entry_name = index.to_string();
        zip.start_file(entry_name.as_str(), options)?;
        io::copy(&mut File::open(source)?, &mut zip)?;
        manifest.insert(entry_name, name.clone());
    }

    zip.start_file(MEDIA_MANIFEST, options)?;
    serde_json::to_writer(&mut zip, &manifest)?;
    zip.finish()?;

    // The scratch dir may sit on another filesystem than the output
    if fs::rename(&partial, path).is_err() {
        fs::copy(&partial, path)?;
    }

    tracing::info!(
        path = %path.display(),
        notes = contents.notes.len(),
        media = media.len(),
        "wrote deck package"
    );
    Ok(())
}
