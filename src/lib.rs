//! Loading and validation of the configuration of an OpenSprinkler
//! irrigation integration.
//!
//! The configuration is an INI file with three sections:
//!
//! ```ini
//! [opensprinkler]
//! controller = http://192.168.1.20
//! password = a6d82bced638de3def1e9bbb4983225c
//!
//! [database]
//! config = host=localhost dbname=garden
//! table = public.lines
//!
//! [irrigation]
//! daily_slots = 2
//! slot_minutes = 60
//! program_name_prefix = Auto
//! slot_1_name = morning
//! slot_1_time = 16384
//! slot_2_name = evening
//! slot_2_time = 12468
//! ```
//!
//! Slot start times use the controller's packed encoding, see
//! [`start_time`].

pub mod config;
pub mod document;
pub mod error;
pub mod program;
pub mod start_time;

pub use config::Config;
pub use document::Document;
pub use error::ConfigError;
pub use start_time::Anchor;
pub use start_time::StartTime;
