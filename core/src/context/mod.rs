mod background_tasks;
mod config;
mod error;

pub use background_tasks::BackgroundTasks;
pub use config::{
    CategoryToggles, DeliveryMode, PeonConfig, PeonConfigExt, RelaySettings, resolve_home,
};
pub use error::ConfigError;
