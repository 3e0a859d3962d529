//! Hooks for filling service-provided fields into drafts.

use crate::auth::User;
use crate::upload::UploadedFile;

/// A draft that records who created it.
pub trait Authored {
    /// Stamp `user` as the author (e.g. set `sender_id`).
    fn set_author(&mut self, user: &User);
}

/// A draft that can point at an uploaded file.
pub trait Attachable {
    /// Point the draft at `file` (e.g. set `file_url`).
    fn attach(&mut self, file: &UploadedFile);
}
