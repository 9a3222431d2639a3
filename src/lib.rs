pub mod audio;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod models;
pub mod routes;
pub mod storage;
pub mod templates;

pub use config::Config;
pub use error::{AppError, Result};
pub use metadata::MetadataStore;
pub use routes::create_router;
pub use storage::StorageGateway;

pub struct AppState {
    pub config: Config,
    pub metadata: MetadataStore,
    pub storage: StorageGateway,
    pub templates: tera::Tera,
}

impl AppState {
    pub fn new(config: Config, storage: StorageGateway) -> tera::Result<Self> {
        Ok(Self {
            metadata: MetadataStore::new(config.metadata_file.clone()),
            templates: templates::load()?,
            config,
            storage,
        })
    }
}
