use std::path::Path;

use serde_json::{
    json,
    Map,
    Value,
};
use sqlx::{
    sqlite::{
        SqliteConnectOptions,
        SqliteJournalMode,
    },
    ConnectOptions,
    Connection,
    SqliteConnection,
};

use crate::core::VocadeckError;

/// Note store entry names, in order of preference. Exports that carry
/// `collection.anki21` also ship a placeholder `collection.anki2`.
pub const COLLECTION_NAMES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Note stores of newer exports that cannot be read here. Such containers
/// also hold a placeholder `collection.anki2` with a single notice note.
pub const UNREADABLE_COLLECTION_NAMES: [&str; 1] = ["collection.anki21b"];

/// Name used when writing.
pub const WRITTEN_COLLECTION: &str = "collection.anki2";

const SCHEMA_VERSION: i64 = 11;

const SCHEMA: &str = r#"
CREATE TABLE col (
    id      integer primary key,
    crt     integer not null,
    mod     integer not null,
    scm     integer not null,
    ver     integer not null,
    dty     integer not null,
    usn     integer not null,
    ls      integer not null,
    conf    text not null,
    models  text not null,
    decks   text not null,
    dconf   text not null,
    tags    text not null
);
CREATE TABLE notes (
    id      integer primary key,
    guid    text not null,
    mid     integer not null,
    mod     integer not null,
    usn     integer not null,
    tags    text not null,
    flds    text not null,
    sfld    integer not null,
    csum    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE cards (
    id      integer primary key,
    nid     integer not null,
    did     integer not null,
    ord     integer not null,
    mod     integer not null,
    usn     integer not null,
    type    integer not null,
    queue   integer not null,
    due     integer not null,
    ivl     integer not null,
    factor  integer not null,
    reps    integer not null,
    lapses  integer not null,
    left    integer not null,
    odue    integer not null,
    odid    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE revlog (
    id      integer primary key,
    cid     integer not null,
    usn     integer not null,
    ease    integer not null,
    ivl     integer not null,
    lastIvl integer not null,
    factor  integer not null,
    time    integer not null,
    type    integer not null
);
CREATE TABLE graves (
    usn     integer not null,
    oid     integer not null,
    type    integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

/// A `notes` row as stored, carried over without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredNote {
    pub id: i64,
    pub guid: String,
    pub mid: i64,
    #[sqlx(rename = "mod")]
    pub modified: i64,
    pub usn: i64,
    pub tags: String,
    pub flds: String,
    pub sfld: String,
    pub csum: i64,
    pub flags: i64,
    pub data: String,
}

/// A `cards` row as stored; scheduling state travels with it untouched.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredCard {
    pub id: i64,
    pub nid: i64,
    pub did: i64,
    pub ord: i64,
    #[sqlx(rename = "mod")]
    pub modified: i64,
    pub usn: i64,
    #[sqlx(rename = "type")]
    pub card_type: i64,
    pub queue: i64,
    pub due: i64,
    pub ivl: i64,
    pub factor: i64,
    pub reps: i64,
    pub lapses: i64,
    pub left: i64,
    pub odue: i64,
    pub odid: i64,
    pub flags: i64,
    pub data: String,
}

impl StoredCard {
    /// Fresh card in the "new" queue.
    pub fn new_card(id: i64, nid: i64, did: i64, due: i64, modified: i64) -> Self {
        StoredCard {
            id,
            nid,
            did,
            ord: 0,
            modified,
            usn: -1,
            card_type: 0,
            queue: 0,
            due,
            ivl: 0,
            factor: 0,
            reps: 0,
            lapses: 0,
            left: 0,
            odue: 0,
            odid: 0,
            flags: 0,
            data: String::new(),
        }
    }

    /// Move the card into `did`, taking it out of any filtered deck.
    pub fn rehome(&mut self, did: i64) {
        if self.odid != 0 {
            self.due = self.odue;
            self.odue = 0;
            self.odid = 0;
        }
        self.did = did;
    }
}

/// What a previously written note store contains.
#[derive(Debug, Clone, Default)]
pub struct StoredCollection {
    pub created: Option<i64>,
    pub models: Map<String, Value>,
    pub notes: Vec<StoredNote>,
    pub cards: Vec<StoredCard>,
}

/// Everything needed to write a fresh note store.
#[derive(Debug, Clone)]
pub struct CollectionContents {
    pub created: i64,  // Seconds since epoch
    pub modified: i64, // Milliseconds since epoch
    pub models: Map<String, Value>,
    pub decks: Map<String, Value>,
    pub notes: Vec<StoredNote>,
    pub cards: Vec<StoredCard>,
}

async fn open(path: &Path, create: bool) -> Result<SqliteConnection, VocadeckError> {
    let conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .read_only(!create)
        .journal_mode(SqliteJournalMode::Delete)
        .connect()
        .await?;
    Ok(conn)
}

pub async fn read_collection(path: &Path) -> Result<StoredCollection, VocadeckError> {
    let mut conn = open(path, false).await?;

    let col: Option<(i64, String)> =
        sqlx::query_as("SELECT crt, models FROM col LIMIT 1").fetch_optional(&mut conn).await?;
    let (created, models) = match col {
        Some((crt, models)) => (Some(crt), parse_models(&models)?),
        None => (None, Map::new()),
    };

    let notes: Vec<StoredNote> = sqlx::query_as(
        "SELECT id, guid, mid, mod, usn, tags, flds, CAST(sfld AS TEXT) AS sfld, \
         CAST(csum AS INTEGER) AS csum, flags, data FROM notes ORDER BY id",
    )
    .fetch_all(&mut conn)
    .await?;

    let cards: Vec<StoredCard> =
        sqlx::query_as("SELECT * FROM cards ORDER BY id").fetch_all(&mut conn).await?;

    conn.close().await?;
    tracing::debug!(notes = notes.len(), cards = cards.len(), "read note store");
    Ok(StoredCollection { created, models, notes, cards })
}

fn parse_models(raw: &str) -> Result<Map<String, Value>, VocadeckError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(VocadeckError::Custom("col.models is not a JSON object".to_string())),
    }
}

pub async fn write_collection(
    path: &Path,
    contents: &CollectionContents,
) -> Result<(), VocadeckError> {
    let mut conn = open(path, true).await?;
    sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;

    let mut tx = conn.begin().await?;

    sqlx::query("INSERT INTO col VALUES (1, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?, ?, '{}')")
        .bind(contents.created)
        .bind(contents.modified)
        .bind(contents.modified)
        .bind(SCHEMA_VERSION)
        .bind(default_conf().to_string())
        .bind(Value::Object(contents.models.clone()).to_string())
        .bind(Value::Object(contents.decks.clone()).to_string())
        .bind(default_dconf().to_string())
        .execute(&mut *tx)
        .await?;

    for note in &contents.notes {
        sqlx::query("INSERT INTO notes VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(note.id)
            .bind(&note.guid)
            .bind(note.mid)
            .bind(note.modified)
            .bind(note.usn)
            .bind(&note.tags)
            .bind(&note.flds)
            .bind(&note.sfld)
            .bind(note.csum)
            .bind(note.flags)
            .bind(&note.data)
            .execute(&mut *tx)
            .await?;
    }

    for card in &contents.cards {
        sqlx::query(
            "INSERT INTO cards VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(card.id)
        .bind(card.nid)
        .bind(card.did)
        .bind(card.ord)
        .bind(card.modified)
        .bind(card.usn)
        .bind(card.card_type)
        .bind(card.queue)
        .bind(card.due)
        .bind(card.ivl)
        .bind(card.factor)
        .bind(card.reps)
        .bind(card.lapses)
        .bind(card.left)
        .bind(card.odue)
        .bind(card.odid)
        .bind(card.flags)
        .bind(&card.data)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    conn.close().await?;

    tracing::debug!(
        notes = contents.notes.len(),
        cards = contents.cards.len(),
        path = %path.display(),
        "wrote note store"
    );
    Ok(())
}

/// Entry for `col.decks`.
pub fn deck_json(id: i64, name: &str, modified_secs: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "conf": 1,
        "dyn": 0,
        "collapsed": false,
        "extendNew": 10,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "mod": modified_secs,
        "usn": -1,
    })
}

fn default_conf() -> Value {
    json!({
        "activeDecks": [1],
        "curDeck": 1,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn default_dconf() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "dyn": false,
            "maxTaken": 60,
            "timer": 0,
            "autoplay": true,
            "replayq": true,
            "new": {
                "bury": true,
                "delays": [1.0, 10.0],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
            "lapse": {
                "delays": [10.0],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0,
            },
        }
    })
}
