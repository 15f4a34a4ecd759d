//! QR payload encoding for issued tickets.
//!
//! A ticket's QR code carries a small JSON document identifying the ticket,
//! its event and its holder. Turning that document into pixels is the job of a
//! [`QrRenderer`]; [`QrPayloadEncoder`] wraps one and degrades any failure to
//! "no image" so a missing QR never blocks issuance.

use base64::Engine;
use chrono::{DateTime, Utc};
use image::{imageops::FilterType, ImageBuffer, ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use ticketr_client::{types::timestamp, EventId, TicketId, UserId};

/// Smallest rendered width in pixels
pub const MIN_WIDTH: u32 = 300;
/// Largest rendered width in pixels
pub const MAX_WIDTH: u32 = 400;

/// Errors from building or rendering a QR code
#[derive(Debug, Error)]
pub enum QrError {
    /// Payload could not be turned into (or read back from) JSON
    #[error("Invalid QR payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Data does not fit in a QR symbol
    #[error("QR encoding failed: {0}")]
    Encode(String),

    /// Rasterising or PNG encoding failed
    #[error("QR image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// What a ticket's QR code says.
///
/// Serialized with fields in this order; `timestamp` is ISO 8601 with millisecond precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Issued ticket
    pub ticket_id: TicketId,
    /// Event admitted to
    pub event_id: EventId,
    /// Event name at issue time
    pub event_name: String,
    /// Holder
    pub user_id: UserId,
    /// Holder name at issue time
    pub user_name: String,
    /// When the payload was encoded
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl QrPayload {
    /// Canonical JSON text
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Payload`] if serialization fails.
    pub fn to_json(&self) -> Result<String, QrError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON read back from a scanned code
    ///
    /// # Errors
    ///
    /// Returns [`QrError::Payload`] for malformed documents or timestamps.
    pub fn from_json(json: &str) -> Result<Self, QrError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Rendering parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QrOptions {
    /// Output width (and height) in pixels, within [`MIN_WIDTH`]..=[`MAX_WIDTH`]
    pub width: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Module colour
    pub dark: Rgb<u8>,
    /// Background colour
    pub light: Rgb<u8>,
}

impl QrOptions {
    /// Indigo on white
    pub const DARK: Rgb<u8> = Rgb([0x4F, 0x46, 0xE5]);
    /// White
    pub const LIGHT: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

    /// Options used right after registration (300 px)
    #[must_use]
    pub const fn registration() -> Self {
        Self {
            width: MIN_WIDTH,
            margin: 2,
            dark: Self::DARK,
            light: Self::LIGHT,
        }
    }

    /// Options used when a holder opens a ticket from their list (400 px)
    #[must_use]
    pub const fn viewing() -> Self {
        Self {
            width: MAX_WIDTH,
            ..Self::registration()
        }
    }

    /// Same options at another width, clamped to the supported range
    #[must_use]
    pub fn with_width(self, width: u32) -> Self {
        Self {
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
            ..self
        }
    }
}

impl Default for QrOptions {
    fn default() -> Self {
        Self::registration()
    }
}

/// A rendered QR code
#[derive(Clone, PartialEq, Eq)]
pub struct QrImage {
    /// Side length in pixels
    pub width: u32,
    /// PNG bytes
    pub png: Vec<u8>,
}

impl QrImage {
    /// `data:image/png;base64,...` form for embedding
    #[must_use]
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

impl std::fmt::Debug for QrImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrImage")
            .field("width", &self.width)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Turns text into a QR image
pub trait QrRenderer: Send + Sync {
    /// Render `data` as a square PNG
    ///
    /// # Errors
    ///
    /// Returns [`QrError`] if the data cannot be encoded or rasterised.
    fn render(&self, data: &str, options: &QrOptions) -> Result<QrImage, QrError>;
}

/// [`QrRenderer`] backed by the `qrcode` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrCodeRenderer;

impl QrRenderer for QrCodeRenderer {
    fn render(&self, data: &str, options: &QrOptions) -> Result<QrImage, QrError> {
        let code = qrcode::QrCode::new(data.as_bytes()).map_err(|e| QrError::Encode(e.to_string()))?;
        let colors = code.to_colors();
        let modules = u32::try_from(code.width()).map_err(|e| QrError::Encode(e.to_string()))?;

        let margin = options.margin;
        let side_modules = margin
            .checked_mul(2)
            .and_then(|quiet| quiet.checked_add(modules))
            .filter(|side| *side <= options.width)
            .ok_or_else(|| {
                QrError::Encode(format!(
                    "{modules} modules with a {margin}-module margin do not fit in {} px",
                    options.width
                ))
            })?;
        let scale = options.width / side_modules;

        let raster: RgbImage = ImageBuffer::from_fn(side_modules * scale, side_modules * scale, |x, y| {
            let (mx, my) = (x / scale, y / scale);
            let inside = (margin..margin + modules).contains(&mx) && (margin..margin + modules).contains(&my);
            if !inside {
                return options.light;
            }
            let index = ((my - margin) * modules + (mx - margin)) as usize;
            match colors.get(index) {
                Some(qrcode::Color::Dark) => options.dark,
                _ => options.light,
            }
        });

        let raster = if raster.width() == options.width {
            raster
        } else {
            image::imageops::resize(&raster, options.width, options.width, FilterType::Nearest)
        };

        let mut png = Vec::new();
        raster.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(QrImage {
            width: options.width,
            png,
        })
    }
}

/// Builds ticket payloads and renders them, never failing outward.
#[derive(Clone)]
pub struct QrPayloadEncoder {
    renderer: Arc<dyn QrRenderer>,
    options: QrOptions,
}

impl QrPayloadEncoder {
    /// Encoder using `renderer` with `options`
    #[must_use]
    pub fn new(renderer: Arc<dyn QrRenderer>, options: QrOptions) -> Self {
        Self { renderer, options }
    }

    /// Encoder using the `qrcode`-backed renderer
    #[must_use]
    pub fn qrcode(options: QrOptions) -> Self {
        Self::new(Arc::new(QrCodeRenderer), options)
    }

    /// Same renderer, different options
    #[must_use]
    pub fn with_options(&self, options: QrOptions) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            options,
        }
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &QrOptions {
        &self.options
    }

    /// Render `payload`, or `None` if anything goes wrong.
    ///
    /// Failures are logged; the ticket stays valid without an image.
    #[must_use]
    pub fn encode(&self, payload: &QrPayload) -> Option<QrImage> {
        let result = payload
            .to_json()
            .and_then(|json| self.renderer.render(&json, &self.options));

        match result {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(ticket_id = %payload.ticket_id, error = %err, "QR generation failed; continuing without image");
                None
            },
        }
    }
}

impl std::fmt::Debug for QrPayloadEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrPayloadEncoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
