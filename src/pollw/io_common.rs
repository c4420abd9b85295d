use std::path::Path;

use calamine::DataType;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::warn;

/// A spreadsheet cell, reduced to what the extraction needs.
#[derive(PartialEq, Debug, Clone)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Flag(bool),
    Blank,
}

impl RawCell {
    pub fn from_calamine(cell: &DataType) -> RawCell {
        match cell {
            DataType::String(s) => RawCell::Text(s.clone()),
            DataType::Int(i) => RawCell::Number(*i as f64),
            DataType::Float(f) | DataType::DateTime(f) => RawCell::Number(*f),
            DataType::Bool(b) => RawCell::Flag(*b),
            _ => RawCell::Blank,
        }
    }

    /// Empty strings, zero, `false` and blank cells count as missing.
    pub fn is_truthy(&self) -> bool {
        match self {
            RawCell::Text(s) => !s.is_empty(),
            RawCell::Number(n) => *n != 0.0 && !n.is_nan(),
            RawCell::Flag(b) => *b,
            RawCell::Blank => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Number(n) => format!("{}", n),
            RawCell::Flag(b) => b.to_string(),
            RawCell::Blank => String::new(),
        }
    }

    /// The population held by the cell, if it is a non-negative whole number.
    ///
    /// Text cells are read as numbers after trimming, so that `" 12345 "` is
    /// accepted. Thousands separators and footnote markers are not.
    pub fn to_population(&self) -> Option<u64> {
        let n = match self {
            RawCell::Number(n) => *n,
            RawCell::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
            Some(n as u64)
        } else {
            None
        }
    }
}

/// Text encodings accepted for the poll uploads.
///
/// The Latin-1 labels are read as windows-1252, the way browsers do.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
}

impl TextEncoding {
    pub fn from_label(label: &str) -> Option<TextEncoding> {
        match label.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "windows-1252" | "cp1252" => {
                Some(TextEncoding::Windows1252)
            }
            _ => None,
        }
    }

    fn codec(self) -> &'static Encoding {
        match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Windows1252 => WINDOWS_1252,
        }
    }

    /// Malformed sequences are replaced, and a leading byte order mark is dropped.
    pub fn decode(self, payload: &[u8]) -> String {
        let (text, had_errors) = self.codec().decode_with_bom_removal(payload);
        if had_errors {
            warn!("decode: invalid {:?} sequences were replaced", self);
        }
        text.into_owned()
    }
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}
