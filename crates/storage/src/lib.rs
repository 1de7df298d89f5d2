#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    CardRecord, CardRepository, DeckRepository, InMemoryRepository, StorageError,
};
