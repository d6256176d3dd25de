pub mod body;
pub mod dates;
pub mod db;
pub mod error;
pub mod importer;
pub mod migrations;
pub mod models;
pub mod packet;
pub mod query;
pub mod report;

pub use db::{open_store, open_store_read_only, PktStore, StoreCapabilities};
pub use error::{CoreError, FormatError};
pub use packet::decode_packet;
