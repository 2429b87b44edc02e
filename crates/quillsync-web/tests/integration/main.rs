//! Integration tests for the auxiliary downloaders
//!
//! Each module drives a downloader against a wiremock server standing in
//! for the service's shard endpoints.

mod common;
mod test_thumbnail;
