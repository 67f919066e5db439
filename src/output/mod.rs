pub mod persistence;

pub use persistence::{persist_panel, read_panel, write_panel, PersistError};
