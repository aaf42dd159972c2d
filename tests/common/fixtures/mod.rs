//! Sample data used across the integration tests

/// Track title reported by the Lavalink node
pub const SAMPLE_TRACK_TITLE: &str = "Bohemian Rhapsody";

/// Track author reported by the Lavalink node
pub const SAMPLE_TRACK_AUTHOR: &str = "Queen";

/// Spotify id the search endpoint resolves the sample title to
pub const SAMPLE_SPOTIFY_ID: &str = "4u7EnebtmKWzUH433cf5Qv";

/// A small PNG, used as album art
#[cfg(feature = "music")]
pub fn sample_png() -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([30, 144, 255, 255])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode sample PNG");
    bytes
}
