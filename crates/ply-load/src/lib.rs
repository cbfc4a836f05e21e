mod error;
mod files;
mod flows;
mod requests;
mod values_loader;

pub use error::{LoadError, Result};
pub use files::{FileAccess, ListOptions, LocalFileAccess};
pub use flows::{FlowLoader, LoadOptions};
pub use requests::RequestLoader;
pub use values_loader::ValuesLoader;
