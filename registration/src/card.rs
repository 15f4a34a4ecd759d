//! Downloadable ticket cards.
//!
//! A card is a 600×800 PNG: a coloured header band with title and brand, the
//! event details, the ticket's QR code and a scan instruction. Rendering is
//! two explicit steps so the QR image is always fully decoded before it is
//! drawn: [`TicketCardRenderer::load`] (async decode) then
//! [`TicketCardRenderer::compose`] (pure drawing).

use crate::qr::QrImage;
use crate::workflow::IssuedTicket;
use chrono::{DateTime, Utc};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{imageops::FilterType, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ticketr_client::{Event, Ticket, TicketId};

/// Card width in pixels
pub const CARD_WIDTH: u32 = 600;
/// Card height in pixels
pub const CARD_HEIGHT: u32 = 800;
/// Header band height
pub const HEADER_HEIGHT: u32 = 150;
/// Top-left corner of the QR slot
pub const QR_ORIGIN: (u32, u32) = (150, 380);
/// Side of the QR slot
pub const QR_SLOT: u32 = 300;

const LEFT_MARGIN: u32 = 50;
const WHITE: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
const INK: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xFF]);
const MUTED: Rgba<u8> = Rgba([0x66, 0x66, 0x66, 0xFF]);

/// Errors from rendering or saving a ticket card
#[derive(Debug, Error)]
pub enum CardError {
    /// QR image could not be decoded, or the card could not be encoded
    #[error("Ticket image error: {0}")]
    Image(#[from] image::ImageError),

    /// Writing the file failed
    #[error("Could not save ticket: {0}")]
    Io(#[from] std::io::Error),

    /// Background decode task died
    #[error("Image decoding task failed: {0}")]
    Task(String),
}

/// What goes on a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCard {
    /// Ticket id, also used in the file name
    pub ticket_id: TicketId,
    /// Event name
    pub event_name: String,
    /// Event date
    pub event_date: DateTime<Utc>,
    /// Venue
    pub location: String,
    /// QR code; no card can be produced without one
    pub qr: Option<QrImage>,
}

impl TicketCard {
    /// Card for a ticket fresh out of the registration workflow
    #[must_use]
    pub fn from_issued(issued: &IssuedTicket) -> Self {
        Self {
            ticket_id: issued.ticket_id,
            event_name: issued.event.name.clone(),
            event_date: issued.event.date,
            location: issued.event.location.clone(),
            qr: issued.qr.clone(),
        }
    }

    /// Card for a stored ticket and its event
    #[must_use]
    pub fn from_ticket(ticket: &Ticket, event: &Event, qr: Option<QrImage>) -> Self {
        Self {
            ticket_id: ticket.id,
            event_name: event.name.clone(),
            event_date: event.date,
            location: event.location.clone(),
            qr,
        }
    }

    /// `ticket_{id}.png`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("ticket_{}.png", self.ticket_id)
    }
}

/// Human-readable event date, e.g. `Saturday, March 15, 2025 at 7:00 PM UTC`
#[must_use]
pub fn format_event_date(date: DateTime<Utc>) -> String {
    date.format("%A, %B %-d, %Y at %-I:%M %p UTC").to_string()
}

/// Draws ticket cards and writes them to a download directory.
#[derive(Debug, Clone)]
pub struct TicketCardRenderer {
    brand: String,
    header: Rgba<u8>,
    download_dir: PathBuf,
}

impl TicketCardRenderer {
    /// Renderer writing into `download_dir`, with `brand` under the title
    #[must_use]
    pub fn new(brand: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            brand: brand.into(),
            header: Rgba([0x4F, 0x46, 0xE5, 0xFF]),
            download_dir: download_dir.into(),
        }
    }

    /// Use `colour` for the header band
    #[must_use]
    pub fn with_header_colour(mut self, colour: image::Rgb<u8>) -> Self {
        let [r, g, b] = colour.0;
        self.header = Rgba([r, g, b, 0xFF]);
        self
    }

    /// Directory cards are written to
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Decode the QR PNG off the async runtime.
    ///
    /// # Errors
    ///
    /// [`CardError::Image`] for undecodable bytes, [`CardError::Task`] if the
    /// decode task panicked.
    pub async fn load(&self, qr: &QrImage) -> Result<RgbaImage, CardError> {
        let png = qr.png.clone();
        tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&png, ImageFormat::Png).map(|img| img.to_rgba8())
        })
        .await
        .map_err(|e| CardError::Task(e.to_string()))?
        .map_err(CardError::from)
    }

    /// Draw the card around an already decoded QR image.
    #[must_use]
    pub fn compose(&self, card: &TicketCard, qr: &RgbaImage) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, WHITE);

        for y in 0..HEADER_HEIGHT {
            for x in 0..CARD_WIDTH {
                canvas.put_pixel(x, y, self.header);
            }
        }
        draw_text_centered(&mut canvas, "Event Ticket", 60, 4, WHITE);
        draw_text_centered(&mut canvas, &self.brand, 100, 2, WHITE);

        draw_text(&mut canvas, &card.event_name, LEFT_MARGIN, 220, 3, INK);
        let date_line = format!("Date: {}", format_event_date(card.event_date));
        draw_text(&mut canvas, &date_line, LEFT_MARGIN, 260, 2, MUTED);
        let location_line = format!("Location: {}", card.location);
        draw_text(&mut canvas, &location_line, LEFT_MARGIN, 290, 2, MUTED);
        let ticket_line = format!("Ticket ID: {}", card.ticket_id);
        draw_text(&mut canvas, &ticket_line, LEFT_MARGIN, 320, 2, MUTED);

        let scaled = if qr.dimensions() == (QR_SLOT, QR_SLOT) {
            qr.clone()
        } else {
            image::imageops::resize(qr, QR_SLOT, QR_SLOT, FilterType::Nearest)
        };
        image::imageops::overlay(
            &mut canvas,
            &scaled,
            i64::from(QR_ORIGIN.0),
            i64::from(QR_ORIGIN.1),
        );

        draw_text_centered(&mut canvas, "Scan this QR code at the event entrance", 720, 2, MUTED);
        canvas
    }

    /// Render the card and write it as `ticket_{id}.png`.
    ///
    /// Returns `Ok(None)` without touching the disk when the card has no QR
    /// image.
    ///
    /// # Errors
    ///
    /// Decode, encode and IO failures as [`CardError`].
    #[tracing::instrument(skip(self, card), fields(ticket_id = %card.ticket_id))]
    pub async fn download(&self, card: &TicketCard) -> Result<Option<PathBuf>, CardError> {
        let Some(qr) = &card.qr else {
            tracing::debug!("No QR image; skipping card download");
            return Ok(None);
        };

        let decoded = self.load(qr).await?;
        let composed = self.compose(card, &decoded);

        let mut png = Vec::new();
        composed.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(card.file_name());
        tokio::fs::write(&path, &png).await?;

        tracing::info!(path = %path.display(), "Ticket card saved");
        Ok(Some(path))
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Pixel width of `text` at `scale`
fn text_width(text: &str, scale: u32) -> u32 {
    u32::try_from(text.chars().count())
        .unwrap_or(u32::MAX)
        .saturating_mul(8 * scale)
}

/// Draw `text` with its baseline at `baseline`, clipping at the canvas edge.
fn draw_text(canvas: &mut RgbaImage, text: &str, x: u32, baseline: u32, scale: u32, colour: Rgba<u8>) {
    let top = baseline.saturating_sub(8 * scale);
    let mut pen_x = x;

    for c in text.chars() {
        if pen_x >= canvas.width() {
            break;
        }
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let row = u32::try_from(row).unwrap_or(0);
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = pen_x + col * scale + dx;
                        let py = top + row * scale + dy;
                        if px < canvas.width() && py < canvas.height() {
                            canvas.put_pixel(px, py, colour);
                        }
                    }
                }
            }
        }
        pen_x += 8 * scale;
    }
}

fn draw_text_centered(canvas: &mut RgbaImage, text: &str, baseline: u32, scale: u32, colour: Rgba<u8>) {
    let x = canvas.width().saturating_sub(text_width(text, scale)) / 2;
    draw_text(canvas, text, x, baseline, scale, colour);
}
