//! Common types shared across reader implementations.
//!
//! This module defines device metadata, the device kind used to tag reader
//! events, and the barcode detection data reported by decoders.

use serde::{Deserialize, Serialize};
use std::fmt;
use tagpair_core::Barcode;

/// Generic device information.
///
/// Contains metadata about a reader such as name, model and firmware version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Mock NFC Reader").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional firmware or library version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// Kind of scanning collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Camera-based barcode reader.
    Barcode,

    /// NFC tag reader.
    Nfc,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Barcode => write!(f, "Barcode"),
            Self::Nfc => write!(f, "NFC"),
        }
    }
}

/// Barcode symbology reported by the decoder.
///
/// Names follow the decoder's format identifiers (`QR_CODE`, `EAN_13`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Symbology {
    QrCode,
    DataMatrix,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code39,
    Code93,
    Code128,
    Codabar,
    Itf,
    Aztec,
    Pdf417,

    /// Format the decoder reported but this crate does not name.
    Unknown(String),
}

impl Symbology {
    /// Decoder format identifier.
    pub fn name(&self) -> &str {
        match self {
            Self::QrCode => "QR_CODE",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Ean13 => "EAN_13",
            Self::Ean8 => "EAN_8",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::Codabar => "CODABAR",
            Self::Itf => "ITF",
            Self::Aztec => "AZTEC",
            Self::Pdf417 => "PDF_417",
            Self::Unknown(name) => name,
        }
    }

    /// Returns `true` for two-dimensional formats.
    pub fn is_2d(&self) -> bool {
        matches!(
            self,
            Self::QrCode | Self::DataMatrix | Self::Aztec | Self::Pdf417
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Symbology {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Ok(match normalized.as_str() {
            "QR_CODE" | "QR" => Self::QrCode,
            "DATA_MATRIX" => Self::DataMatrix,
            "EAN_13" | "EAN13" => Self::Ean13,
            "EAN_8" | "EAN8" => Self::Ean8,
            "UPC_A" => Self::UpcA,
            "UPC_E" => Self::UpcE,
            "CODE_39" => Self::Code39,
            "CODE_93" => Self::Code93,
            "CODE_128" => Self::Code128,
            "CODABAR" => Self::Codabar,
            "ITF" => Self::Itf,
            "AZTEC" => Self::Aztec,
            "PDF_417" => Self::Pdf417,
            _ => Self::Unknown(normalized),
        })
    }
}

/// A single decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeDetection {
    /// Decoded text.
    pub barcode: Barcode,

    /// Format the text was decoded from.
    pub symbology: Symbology,

    /// When the barcode was decoded.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BarcodeDetection {
    /// Create a detection stamped with the current time.
    pub fn new(barcode: Barcode, symbology: Symbology) -> Self {
        Self {
            barcode,
            symbology,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("Camera", "html5-qrcode").with_firmware_version("2.3.8");

        assert_eq!(info.name, "Camera");
        assert_eq!(info.model, "html5-qrcode");
        assert_eq!(info.firmware_version, Some("2.3.8".to_string()));
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(DeviceType::Barcode.to_string(), "Barcode");
        assert_eq!(DeviceType::Nfc.to_string(), "NFC");
    }

    #[test]
    fn test_symbology_parse_known_formats() {
        assert_eq!("EAN_13".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("ean-13".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("qr_code".parse::<Symbology>().unwrap(), Symbology::QrCode);
        assert_eq!("CODE_128".parse::<Symbology>().unwrap(), Symbology::Code128);
    }

    #[test]
    fn test_symbology_parse_unknown_format() {
        let symbology: Symbology = "maxicode".parse().unwrap();
        assert_eq!(symbology, Symbology::Unknown("MAXICODE".to_string()));
        assert_eq!(symbology.name(), "MAXICODE");
    }

    #[test]
    fn test_symbology_dimensions() {
        assert!(Symbology::QrCode.is_2d());
        assert!(!Symbology::Ean13.is_2d());
    }

    #[test]
    fn test_detection_serialization() {
        let detection = BarcodeDetection::new(
            Barcode::new("8901435003005").unwrap(),
            Symbology::Ean13,
        );
        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"8901435003005\""));

        let parsed: BarcodeDetection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, detection);
    }
}
