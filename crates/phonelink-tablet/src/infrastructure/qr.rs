//! Pairing code rasterization.
//!
//! [`render_pairing_code`] maps a content string (the tablet's LAN address)
//! into a QR symbol and rasterizes it into an exact `size × size` grayscale
//! bitmap: dark modules black, background white, integer module scale,
//! centered with at least a four-module quiet zone on every side.  Pure
//! function of `(content, size)`: the same inputs always produce the same
//! pixels, so the handset camera sees a stable image across refreshes.

use image::{GrayImage, Luma};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use thiserror::Error;

/// Quiet-zone width on each side of the symbol, in modules.
const QUIET_ZONE_MODULES: u32 = 4;

/// Black and white pixel values of the rendered bitmap.
const DARK_PIXEL: Luma<u8> = Luma([0]);
const LIGHT_PIXEL: Luma<u8> = Luma([255]);

/// Errors that can occur while rendering a pairing code.
///
/// All variants are recoverable: the caller records the error for the UI
/// and publishes no image.
#[derive(Debug, Error)]
pub enum PairingCodeError {
    /// The content does not fit in a QR symbol (too long for the chosen
    /// error-correction level).
    #[error("content cannot be encoded as a QR symbol: {0:?}")]
    Encode(QrError),

    /// The requested bitmap is smaller than one pixel per module.
    #[error("target size {size}px cannot fit a {modules}-module symbol")]
    SizeTooSmall { size: u32, modules: u32 },
}

impl From<QrError> for PairingCodeError {
    fn from(e: QrError) -> Self {
        PairingCodeError::Encode(e)
    }
}

/// Renders `content` as a `size × size` grayscale pairing code bitmap.
///
/// # Errors
///
/// Returns [`PairingCodeError`] when the content is too long to encode or
/// `size` is too small to fit the symbol plus its quiet zone.
///
/// # Examples
///
/// ```rust
/// use phonelink_tablet::infrastructure::qr::render_pairing_code;
///
/// let image = render_pairing_code("192.168.1.42", 512).unwrap();
/// assert_eq!(image.dimensions(), (512, 512));
/// ```
pub fn render_pairing_code(content: &str, size: u32) -> Result<GrayImage, PairingCodeError> {
    let code = QrCode::new(content.as_bytes())?;
    let modules_per_side = code.width() as u32;
    let colors = code.to_colors();

    // Integer module scale: the symbol plus its quiet zone must fit in the
    // requested edge length at one or more pixels per module.
    let total_modules = modules_per_side + 2 * QUIET_ZONE_MODULES;
    let module_px = size / total_modules;
    if module_px == 0 {
        return Err(PairingCodeError::SizeTooSmall {
            size,
            modules: total_modules,
        });
    }

    // Center the symbol; the leftover margin is at least the quiet zone.
    let offset = (size - module_px * modules_per_side) / 2;

    let mut image = GrayImage::from_pixel(size, size, LIGHT_PIXEL);
    for (index, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let module_x = index as u32 % modules_per_side;
        let module_y = index as u32 / modules_per_side;
        let origin_x = offset + module_x * module_px;
        let origin_y = offset + module_y * module_px;
        for dy in 0..module_px {
            for dx in 0..module_px {
                image.put_pixel(origin_x + dx, origin_y + dy, DARK_PIXEL);
            }
        }
    }

    Ok(image)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
