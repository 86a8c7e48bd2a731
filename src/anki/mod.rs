//! Anki package (`.apkg`) handling: the fixed vocabulary note type, the
//! SQLite note store, the zip container and the deck merge.

pub mod collection;
pub mod merge;
pub mod model;
pub mod note;
pub mod package;

pub use merge::{
    DeckIdentity,
    DeckMerger,
    MergeOutcome,
};
pub use model::CardModel;
pub use note::Note;
pub use package::{
    open_existing,
    ExistingDeck,
};
