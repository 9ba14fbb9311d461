pub mod memory;
pub mod persistence;
pub mod versions;

pub use memory::{InMemoryRepository, RepositorySnapshot};
pub use persistence::JsonSnapshot;
pub use versions::{
    FileVersionStore, InMemoryVersionStore, POOTLE_BUILDVERSION, pootle_version,
    save_pootle_version,
};
