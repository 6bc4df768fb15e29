pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, LevelStateRepository, ProgressRepository, RewardRepository,
    SettingsRepository, Storage, StorageError,
};
