//! Renders the "now playing" card attached to the track start message.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rand::seq::IndexedRandom;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

use crate::HTTP_CLIENT;
use crate::config::{MusicCardSettings, parse_hex_color};

use super::music_manager::{MusicError, MusicResult};

/// File name of the card attachment, referenced by the embed image
pub const CARD_FILE_NAME: &str = "musicard.png";

pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 360;
const MARGIN: u32 = 40;
const THUMBNAIL_SIZE: u32 = 280;
const FRAME_WIDTH: u32 = 6;
const BAR_LEFT: u32 = MARGIN * 3 + THUMBNAIL_SIZE;
const BAR_WIDTH: u32 = CARD_WIDTH - BAR_LEFT - MARGIN * 2;
const BAR_TOP: u32 = CARD_HEIGHT / 2 + 60;
const BAR_HEIGHT: u32 = 18;

const BASE_FILL: Rgba<u8> = Rgba([7, 7, 7, 255]);

/// Colors and proportions of the card
#[derive(Debug, Clone, PartialEq)]
pub struct CardStyle {
    pub author_color: Rgba<u8>,
    pub progress_color: Rgba<u8>,
    pub progress_bar_color: Rgba<u8>,
    pub image_darkness: u8,
    pub progress: u8,
}

impl CardStyle {
    pub fn from_settings(settings: &MusicCardSettings) -> Self {
        let defaults = MusicCardSettings::default();
        let color = |value: &str, fallback: &str| {
            let [r, g, b] = parse_hex_color(value)
                .or_else(|| parse_hex_color(fallback))
                .unwrap_or([255, 255, 255]);
            Rgba([r, g, b, 255])
        };

        Self {
            author_color: color(&settings.author_color, &defaults.author_color),
            progress_color: color(&settings.progress_color, &defaults.progress_color),
            progress_bar_color: color(&settings.progress_bar_color, &defaults.progress_bar_color),
            image_darkness: settings.image_darkness.min(100),
            progress: settings.progress.min(100),
        }
    }
}

pub struct MusicCard {
    style: CardStyle,
    thumbnail: Option<DynamicImage>,
    background: Option<DynamicImage>,
}

impl MusicCard {
    pub fn new(style: CardStyle) -> Self {
        Self {
            style,
            thumbnail: None,
            background: None,
        }
    }

    pub fn thumbnail(mut self, thumbnail: Option<DynamicImage>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn background(mut self, background: Option<DynamicImage>) -> Self {
        self.background = background;
        self
    }

    /// Encode the card as PNG
    pub fn render(&self) -> MusicResult<Vec<u8>> {
        let canvas = self.compose();
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| MusicError::CardError(e.to_string()))?;
        Ok(bytes)
    }

    fn compose(&self) -> RgbaImage {
        let mut canvas = match &self.background {
            Some(background) => background
                .resize_to_fill(CARD_WIDTH, CARD_HEIGHT, FilterType::Triangle)
                .to_rgba8(),
            None => RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, BASE_FILL),
        };
        darken(&mut canvas, self.style.image_darkness);

        // Frame, then the artwork (or a placeholder) inside it
        let thumb_top = (CARD_HEIGHT - THUMBNAIL_SIZE) / 2;
        fill_rect(
            &mut canvas,
            MARGIN - FRAME_WIDTH,
            thumb_top - FRAME_WIDTH,
            THUMBNAIL_SIZE + FRAME_WIDTH * 2,
            THUMBNAIL_SIZE + FRAME_WIDTH * 2,
            self.style.author_color,
        );
        match &self.thumbnail {
            Some(thumbnail) => {
                let art = thumbnail
                    .resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle)
                    .to_rgba8();
                imageops::overlay(&mut canvas, &art, MARGIN as i64, thumb_top as i64);
            }
            None => fill_rect(
                &mut canvas,
                MARGIN,
                thumb_top,
                THUMBNAIL_SIZE,
                THUMBNAIL_SIZE,
                self.style.progress_bar_color,
            ),
        }

        fill_rect(
            &mut canvas,
            BAR_LEFT,
            BAR_TOP,
            BAR_WIDTH,
            BAR_HEIGHT,
            self.style.progress_bar_color,
        );
        fill_rect(
            &mut canvas,
            BAR_LEFT,
            BAR_TOP,
            filled_width(BAR_WIDTH, self.style.progress),
            BAR_HEIGHT,
            self.style.progress_color,
        );

        canvas
    }
}

fn filled_width(total: u32, progress: u8) -> u32 {
    total * u32::from(progress.min(100)) / 100
}

fn darken(image: &mut RgbaImage, darkness: u8) {
    let keep = 100 - u16::from(darkness.min(100));
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = (u16::from(*channel) * keep / 100) as u8;
        }
    }
}

fn fill_rect(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    let x_end = (x + width).min(image.width());
    let y_end = (y + height).min(image.height());
    for py in y..y_end {
        for px in x..x_end {
            image.put_pixel(px, py, color);
        }
    }
}

/// Pick one of the configured backgrounds uniformly at random
pub fn pick_background(images: &[String]) -> Option<&str> {
    images.choose(&mut rand::rng()).map(String::as_str)
}

/// Largest image body accepted for the card
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Download an image body. Any failure yields `None`.
pub async fn fetch_image(url: &str, timeout: Duration) -> Option<Vec<u8>> {
    fetch_image_with_limit(url, timeout, MAX_IMAGE_BYTES).await
}

async fn fetch_image_with_limit(url: &str, timeout: Duration, limit: usize) -> Option<Vec<u8>> {
    if url.is_empty() {
        return None;
    }

    let result: MusicResult<Vec<u8>> = async {
        let mut response = HTTP_CLIENT
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| MusicError::ExternalApiError(format!("Failed to fetch image: {}", e)))?;

        let too_large = || MusicError::CardError(format!("Image exceeds {} bytes", limit));
        if response
            .content_length()
            .is_some_and(|length| length > limit as u64)
        {
            return Err(too_large());
        }

        // Chunked bodies carry no length, so the cap is enforced while reading too
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MusicError::ExternalApiError(format!("Failed to read image: {}", e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
    .await;

    result
        .map_err(|e| debug!("Skipping card image {}: {}", url, e))
        .ok()
}

/// Decode a downloaded image, dropping anything unreadable
pub fn decode_image(bytes: &[u8]) -> Option<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| debug!("Skipping undecodable card image: {}", e))
        .ok()
}

/// Decode the artwork and render the card on the blocking pool, keeping the
/// resize and encode work off the async workers.
pub async fn render_off_runtime(
    style: CardStyle,
    thumbnail: Option<Vec<u8>>,
    background: Option<Vec<u8>>,
) -> MusicResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        MusicCard::new(style)
            .thumbnail(thumbnail.as_deref().and_then(decode_image))
            .background(background.as_deref().and_then(decode_image))
            .render()
    })
    .await
    .map_err(|e| MusicError::CardError(e.to_string()))?
}
