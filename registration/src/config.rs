//! Configuration management for the registration front end.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::card::TicketCardRenderer;
use crate::qr::QrOptions;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use ticketr_client::{ApiClient, ApiError, DEFAULT_API_URL};

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Colour is not `#RRGGBB`
    #[error("{name} must be a #RRGGBB colour, got {value:?}")]
    InvalidColour {
        /// Variable name
        name: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL (`TICKETR_API_URL`)
    pub api_url: String,
    /// Bearer token (`TICKETR_API_TOKEN`)
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Request timeout in seconds (`TICKETR_API_TIMEOUT_SECS`)
    pub api_timeout_secs: u64,
    /// QR width at registration (`TICKETR_QR_WIDTH`)
    pub qr_width: u32,
    /// QR width when viewing a stored ticket (`TICKETR_QR_VIEW_WIDTH`)
    pub qr_view_width: u32,
    /// Quiet zone in modules (`TICKETR_QR_MARGIN`)
    pub qr_margin: u32,
    /// Dark module colour (`TICKETR_QR_DARK`)
    pub qr_dark: [u8; 3],
    /// Light module colour (`TICKETR_QR_LIGHT`)
    pub qr_light: [u8; 3],
    /// Where ticket cards are written (`TICKETR_DOWNLOAD_DIR`)
    pub download_dir: PathBuf,
    /// Brand printed on cards (`TICKETR_BRAND`)
    pub brand: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            api_timeout_secs: 30,
            qr_width: 300,
            qr_view_width: 400,
            qr_margin: 2,
            qr_dark: QrOptions::DARK.0,
            qr_light: QrOptions::LIGHT.0,
            download_dir: PathBuf::from("."),
            brand: "Ticketr".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed colours.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// Unset variables and unparsable numbers fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed colours.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let number = |name: &str, default| {
            lookup(name)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        let colour = |name: &'static str, default| {
            lookup(name).map_or(Ok(default), |value| parse_hex_colour(name, &value))
        };

        Ok(Self {
            api_url: lookup("TICKETR_API_URL").unwrap_or(defaults.api_url),
            api_token: lookup("TICKETR_API_TOKEN").filter(|t| !t.trim().is_empty()),
            api_timeout_secs: number("TICKETR_API_TIMEOUT_SECS", defaults.api_timeout_secs),
            qr_width: u32::try_from(number("TICKETR_QR_WIDTH", u64::from(defaults.qr_width)))
                .unwrap_or(defaults.qr_width),
            qr_view_width: u32::try_from(number(
                "TICKETR_QR_VIEW_WIDTH",
                u64::from(defaults.qr_view_width),
            ))
            .unwrap_or(defaults.qr_view_width),
            qr_margin: u32::try_from(number("TICKETR_QR_MARGIN", u64::from(defaults.qr_margin)))
                .unwrap_or(defaults.qr_margin),
            qr_dark: colour("TICKETR_QR_DARK", defaults.qr_dark)?,
            qr_light: colour("TICKETR_QR_LIGHT", defaults.qr_light)?,
            download_dir: lookup("TICKETR_DOWNLOAD_DIR").map_or(defaults.download_dir, PathBuf::from),
            brand: lookup("TICKETR_BRAND").unwrap_or(defaults.brand),
        })
    }

    fn qr_base(&self) -> QrOptions {
        QrOptions {
            margin: self.qr_margin,
            dark: Rgb(self.qr_dark),
            light: Rgb(self.qr_light),
            ..QrOptions::registration()
        }
    }

    /// QR options for registration
    #[must_use]
    pub fn qr_options(&self) -> QrOptions {
        self.qr_base().with_width(self.qr_width)
    }

    /// QR options for viewing stored tickets
    #[must_use]
    pub fn view_qr_options(&self) -> QrOptions {
        self.qr_base().with_width(self.qr_view_width)
    }

    /// Card renderer writing to the download directory
    #[must_use]
    pub fn card_renderer(&self) -> TicketCardRenderer {
        TicketCardRenderer::new(self.brand.clone(), self.download_dir.clone())
            .with_header_colour(Rgb(self.qr_dark))
    }

    /// Backend client for these settings.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn api_client(&self) -> Result<ApiClient, ApiError> {
        let client = ApiClient::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.api_timeout_secs))?;
        Ok(match &self.api_token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }
}

/// Parse `#RRGGBB` (the `#` is optional).
///
/// # Errors
///
/// [`ConfigError::InvalidColour`] for anything else.
pub fn parse_hex_colour(name: &'static str, value: &str) -> Result<[u8; 3], ConfigError> {
    let invalid = || ConfigError::InvalidColour {
        name,
        value: value.to_string(),
    };
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.qr_options(), QrOptions::registration());
        assert_eq!(config.view_qr_options().width, 400);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TICKETR_API_URL", "https://tickets.example.edu/api"),
            ("TICKETR_API_TOKEN", "secret"),
            ("TICKETR_QR_WIDTH", "350"),
            ("TICKETR_QR_DARK", "#000000"),
            ("TICKETR_DOWNLOAD_DIR", "/tmp/cards"),
            ("TICKETR_BRAND", "Campus Events"),
        ]))
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.qr_options().width, 350);
        assert_eq!(config.qr_options().dark, Rgb([0, 0, 0]));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/cards"));
        assert_eq!(config.brand, "Campus Events");
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("TICKETR_API_TIMEOUT_SECS", "soon"),
            ("TICKETR_QR_MARGIN", "-1"),
        ]))
        .unwrap();

        assert_eq!(config.api_timeout_secs, 30);
        assert_eq!(config.qr_margin, 2);
    }

    #[test]
    fn test_huge_margin_fails_rendering_without_panic() {
        use crate::qr::{QrCodeRenderer, QrError, QrRenderer};

        let config = Config::from_lookup(lookup(&[("TICKETR_QR_MARGIN", "3000000000")])).unwrap();
        assert!(matches!(
            QrCodeRenderer.render("hi", &config.qr_options()),
            Err(QrError::Encode(_))
        ));
    }

    #[test]
    fn test_width_is_clamped() {
        let config = Config::from_lookup(lookup(&[("TICKETR_QR_VIEW_WIDTH", "4000")])).unwrap();
        assert_eq!(config.view_qr_options().width, crate::qr::MAX_WIDTH);
    }

    #[test]
    fn test_invalid_colour_rejected() {
        let err = Config::from_lookup(lookup(&[("TICKETR_QR_LIGHT", "white")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidColour {
                name: "TICKETR_QR_LIGHT",
                value: "white".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(parse_hex_colour("X", "#4F46E5").unwrap(), [0x4F, 0x46, 0xE5]);
        assert_eq!(parse_hex_colour("X", "ffffff").unwrap(), [0xFF; 3]);
        assert!(parse_hex_colour("X", "#12345").is_err());
        assert!(parse_hex_colour("X", "#GGGGGG").is_err());
    }

    #[test]
    fn test_api_client_uses_url() {
        let config = Config::from_lookup(lookup(&[("TICKETR_API_URL", "http://backend:5000/api/")]))
            .unwrap();
        assert_eq!(config.api_client().unwrap().base_url(), "http://backend:5000/api");
    }
}
