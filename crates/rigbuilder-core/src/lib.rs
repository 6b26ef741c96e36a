//! Rigbuilder Core - Part catalog, visibility resolution, and admin editing
//!
//! This crate holds everything that does not need a renderer or a browser:
//! - The configuration document (`meshMap` + `partDetails`) and its validation
//! - Resolution of selected parts to the set of visible mesh names
//! - Shopper selection state and cart snapshots
//! - Admin mesh assignment sessions, part editing, and raw JSON editing
//! - Storage-agnostic repositories plus in-memory and file backends
//! - TOML application settings

pub mod assignment;
pub mod cart;
pub mod config;
pub mod json_editor;
pub mod part;
pub mod parts;
pub mod repository;
pub mod resolver;
pub mod selection;
pub mod settings;
pub mod storage;

pub use assignment::{AssignmentConflict, AssignmentSession, MeshStatus, StagedChange};
pub use cart::{CartError, CartItem, CartSnapshot};
pub use config::{ConfigData, ConfigError};
pub use json_editor::JsonEditor;
pub use part::{Cents, KeyError, MeshId, PartDetail, PartIcon, PartKey};
pub use parts::PartError;
pub use repository::{
    CartRepository, ConfigRepository, ExternalChange, RepositoryError, Subscription,
};
pub use resolver::{apply_visibility, visible_meshes, MeshVisibilitySink, VisibilityReport};
pub use selection::{SelectionError, SelectionState};
pub use settings::{Settings, SettingsError, Shortcut};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
