pub mod connection;
pub mod directory;
pub mod fixtures;
pub mod intake;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use directory::{ClientDirectory, ClientPage, DirectoryError, ResolvedClient};
pub use fixtures::{BakerySeedDataset, ClientSeedInfo, SeedResult, VerificationResult};
pub use intake::{OrderIntake, RecordedOrder};
