//! The track start flow against mocked Spotify and image hosts: metadata
//! chain, card rendering and the outgoing embed.

use lavacard::commands::music::utils::{
    embedded_messages,
    music_card::{self, CARD_HEIGHT, CARD_WIDTH, CardStyle, MusicCard},
    spotify_api::SpotifyApi,
};
use lavacard::config::{Config, Icons};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::fixtures::{
    SAMPLE_SPOTIFY_ID, SAMPLE_TRACK_AUTHOR, SAMPLE_TRACK_TITLE, sample_png,
};
use crate::test_utils;

async fn spotify_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", SAMPLE_TRACK_TITLE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": { "items": [{ "id": SAMPLE_SPOTIFY_ID }] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/tracks/{}", SAMPLE_SPOTIFY_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "album": { "images": [{ "url": format!("{}/art/cover.png", server.uri()) }] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/art/cover.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample_png()))
        .mount(&server)
        .await;

    server
}

fn spotify_for(server: &MockServer) -> SpotifyApi {
    let mut config = Config::default();
    config.spotify_client_id = "client".to_string();
    config.spotify_client_secret = "secret".to_string();
    config.spotify.accounts_url = server.uri();
    config.spotify.api_url = server.uri();
    config.spotify.timeout = Duration::from_secs(2);
    SpotifyApi::from_config(&config)
}

#[tokio::test]
async fn test_track_start_renders_card_with_album_art() {
    test_utils::init();
    let server = spotify_server().await;
    let spotify = spotify_for(&server);

    let thumbnail_url = spotify
        .now_playing_thumbnail(SAMPLE_TRACK_TITLE)
        .await
        .unwrap();
    assert_eq!(thumbnail_url, format!("{}/art/cover.png", server.uri()));

    let thumbnail = music_card::fetch_image(&thumbnail_url, spotify.timeout()).await;
    assert!(thumbnail.is_some());

    let png = music_card::render_off_runtime(
        CardStyle::from_settings(&Config::default().music_card),
        thumbnail,
        None,
    )
    .await
    .unwrap();
    let card = image::load_from_memory(&png).unwrap();
    assert_eq!((card.width(), card.height()), (CARD_WIDTH, CARD_HEIGHT));

    let embed = serde_json::to_value(embedded_messages::now_playing(
        SAMPLE_TRACK_TITLE,
        SAMPLE_TRACK_AUTHOR,
        &Icons::default(),
        "",
    ))
    .unwrap();
    assert_eq!(
        embed["description"],
        "- Song name :**Bohemian Rhapsody**\n- Author :**Queen**"
    );
    assert_eq!(embed["image"]["url"], "attachment://musicard.png");
}

#[tokio::test]
async fn test_unknown_track_produces_no_card() {
    let server = spotify_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", "Completely Unknown"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "tracks": { "items": [] } })),
        )
        .mount(&server)
        .await;

    let err = spotify_for(&server)
        .now_playing_thumbnail("Completely Unknown")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Track ID not found for song: Completely Unknown"
    );
}

#[tokio::test]
async fn test_unreachable_background_still_renders() {
    let background = music_card::fetch_image(
        "http://127.0.0.1:9/banners/unreachable.png",
        Duration::from_millis(500),
    )
    .await;
    assert!(background.is_none());

    let png = MusicCard::new(CardStyle::from_settings(&Config::default().music_card))
        .background(background.as_deref().and_then(music_card::decode_image))
        .render()
        .unwrap();
    assert!(!png.is_empty());
}
