//! `medswap` - A local registry of medicine donors and recipients
//!
//! This library provides registration form handling, medicine name
//! autocomplete, the versioned record store, and the users page view with
//! its text filters and renderers.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod autocomplete;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod record;
pub mod render;
pub mod storage;
pub mod view;

pub use autocomplete::{AutocompleteField, MedicineCatalog};
pub use config::Config;
pub use error::{Error, Result};
pub use form::{submit, FieldVisibility, FormData, Submission};
pub use logging::init_logging;
pub use record::{Record, Role, Status, DEFAULT_ROLE};
pub use storage::{MemoryBackend, RecordStats, RecordStore, SlotBackend, SqliteBackend};
pub use view::{MatchBoard, MatchCard, TextFilter, UsersPage};
