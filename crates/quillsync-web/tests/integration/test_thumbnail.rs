//! Thumbnail downloader tests

use quillsync_core::domain::AuthToken;
use quillsync_web::{DownloadError, ThumbnailDownloader};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_downloads_thumbnail_bytes() {
    let server = common::mock_server().await;
    let body = common::png_bytes();

    Mock::given(method("POST"))
        .and(path(format!("/shard/{}/thm/note/note-001", common::SHARD)))
        .and(body_string_contains("auth="))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let downloader = ThumbnailDownloader::with_base_url(
        server.uri(),
        common::shard_id(),
        common::auth_token(),
    );

    let bytes = downloader
        .download(&common::guid("note-001"))
        .await
        .expect("thumbnail download failed");
    assert_eq!(bytes, body);
}

#[tokio::test]
async fn test_public_note_uses_get_without_auth() {
    let server = common::mock_server().await;

    Mock::given(method("GET"))
        .and(path(format!("/shard/{}/thm/note/note-pub", common::SHARD)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::png_bytes()))
        .mount(&server)
        .await;

    let downloader = ThumbnailDownloader::with_base_url(
        server.uri(),
        common::shard_id(),
        AuthToken::new(""),
    );

    let bytes = downloader.download(&common::guid("note-pub")).await.unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_empty_body_is_an_error() {
    let server = common::mock_server().await;

    Mock::given(method("POST"))
        .and(path(format!("/shard/{}/thm/note/note-002", common::SHARD)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let downloader = ThumbnailDownloader::with_base_url(
        server.uri(),
        common::shard_id(),
        common::auth_token(),
    );

    let err = downloader
        .download(&common::guid("note-002"))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::EmptyBody(_)));
}

#[tokio::test]
async fn test_http_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/shard/{}/thm/note/note-003", common::SHARD)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let downloader = ThumbnailDownloader::with_base_url(
        server.uri(),
        common::shard_id(),
        common::auth_token(),
    );

    let err = downloader
        .download(&common::guid("note-003"))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Http(_)));
}
