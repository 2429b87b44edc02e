//! Auxiliary HTTP downloaders
//!
//! Two best-effort fetchers that run beside the main sync pipeline:
//!
//! - [`thumbnail::ThumbnailDownloader`] retrieves a note's thumbnail
//!   bytes keyed by note guid and shard id
//! - [`ink_image::InkNoteImageDownloader`] retrieves the rendered PNG of
//!   an ink-note resource and writes it to the configured storage
//!   directory
//!
//! A failure in either is logged by the engine and never fails the sync
//! session; the note still counts as fully downloaded.

pub mod error;
pub mod ink_image;
pub mod thumbnail;

pub use error::DownloadError;
pub use ink_image::InkNoteImageDownloader;
pub use thumbnail::ThumbnailDownloader;
