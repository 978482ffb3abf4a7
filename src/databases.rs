use crate::config::TrackerConfig;
use crate::database::{Database, DbError};
use crate::modules::voice::database::VoiceDatabase;

pub struct Databases {
    pub voice: Database<VoiceDatabase>,
}

impl Databases {
    pub async fn open(config: &TrackerConfig) -> Result<Self, DbError> {
        Ok(Self {
            voice: Database::new(config.database_path.clone()).await?,
        })
    }
}
