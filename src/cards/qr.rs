use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{DeckError, DeckResult};

const MODULE_PX: u32 = 10;
/// Final edge length of every code image, whatever the module count.
pub const FOOTPRINT_PX: u32 = 300;

pub fn parse_ec_level(level: &str) -> Option<EcLevel> {
    match level.trim().to_ascii_uppercase().as_str() {
        "L" => Some(EcLevel::L),
        "M" => Some(EcLevel::M),
        "Q" => Some(EcLevel::Q),
        "H" => Some(EcLevel::H),
        _ => None,
    }
}

/// Encode `locator` as a black-on-white QR code and return it as a PNG data URI.
pub fn qr_data_uri(locator: &str, ec_level: EcLevel) -> DeckResult<String> {
    if locator.trim().is_empty() {
        return Err(DeckError::encoding("cannot encode an empty locator"));
    }
    let code = QrCode::with_error_correction_level(locator.as_bytes(), ec_level)
        .map_err(|e| DeckError::encoding(format!("{locator}: {e}")))?;

    let rendered = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(MODULE_PX, MODULE_PX)
        .dark_color(Luma([0]))
        .light_color(Luma([255]))
        .build();
    let resized = imageops::resize(&rendered, FOOTPRINT_PX, FOOTPRINT_PX, FilterType::Nearest);

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(resized)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| DeckError::encoding(e.to_string()))?;
    Ok(png_data_uri(&png))
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
