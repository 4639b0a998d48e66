pub mod app_config;
pub mod catalog;
pub mod config;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod products;
pub mod store;
pub mod uploads;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryProductStore;
pub use products::{
    NewProduct, ProductKey, ProductRecord, ProductUpdate, ProductView, WriteOutcome,
    MSG_DUPLICATE_SKU, MSG_NOT_FOUND, MSG_UPDATED,
};
pub use store::{InsertResult, ProductStore, StoreError, UpdateResult};
pub use uploads::{image_file_name, is_allowed_image, is_plain_file_name, ALLOWED_IMAGE_EXTENSIONS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Only image files are allowed! ({0})")]
    DisallowedImage(String),
}
