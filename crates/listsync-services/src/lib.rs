//! # listsync Services
//!
//! Collaborators the store's callers use to build drafts: who is signed in
//! and where an uploaded file lives.
//!
//! ## Overview
//!
//! Neither service gates store logic. The current user only fills fields
//! like `sender_id` before an insert, and an upload only produces the
//! `file_url` attached to a draft.
//!
//! ## Key Types
//!
//! - [`AuthProvider`] - current user, login and logout
//! - [`UploadService`] - store a file, get back its URL
//! - [`MemoryAuth`] / [`MemoryUploads`] - in-process implementations
//! - [`Authored`] / [`Attachable`] - how a draft takes a user or a file
//!
//! ## Usage
//!
//! ```rust
//! use listsync_services::{AuthProvider, MemoryAuth, User};
//!
//! # async fn example() {
//! let auth = MemoryAuth::new();
//! auth.login(User::new("u-1", "ada@example.com")).await.unwrap();
//! let me = auth.current_user().await.unwrap();
//! assert_eq!(me.map(|u| u.id), Some("u-1".to_string()));
//! # }
//! ```

pub mod auth;
pub mod draft;
pub mod error;
pub mod upload;

pub use auth::{AuthProvider, MemoryAuth, User};
pub use draft::{Attachable, Authored};
pub use error::{Result, ServiceError};
pub use upload::{MemoryUploads, Upload, UploadService, UploadedFile};
