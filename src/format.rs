//! Output formats accepted by the engine's `--imgformat` flag.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    Png,
    Svg,
    Eps,
    Pdf,
    Xml,
    XmlEnum,
    Json,
    JsonTime,
    Csv,
    Tsv,
    Ssv,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 11] = [
        Self::Png,
        Self::Svg,
        Self::Eps,
        Self::Pdf,
        Self::Xml,
        Self::XmlEnum,
        Self::Json,
        Self::JsonTime,
        Self::Csv,
        Self::Tsv,
        Self::Ssv,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Svg => "SVG",
            Self::Eps => "EPS",
            Self::Pdf => "PDF",
            Self::Xml => "XML",
            Self::XmlEnum => "XMLENUM",
            Self::Json => "JSON",
            Self::JsonTime => "JSONTIME",
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::Ssv => "SSV",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::Eps => "application/eps",
            Self::Pdf => "application/pdf",
            Self::Xml | Self::XmlEnum => "application/xml",
            Self::Json | Self::JsonTime => "application/json",
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Ssv => "text/plain",
        }
    }

    /// Derive the format from the extension of the requested file name,
    /// e.g. `/rrd/monitor.png` or `traffic.JSONTIME`.
    pub fn from_path_suffix(path: &str) -> Option<Self> {
        let fname = path.rsplit('/').next().unwrap_or(path);
        let (_, suffix) = fname.rsplit_once('.')?;
        suffix.parse().ok()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown image format: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("png".parse::<ImageFormat>(), Ok(ImageFormat::Png));
        assert_eq!("XmlEnum".parse::<ImageFormat>(), Ok(ImageFormat::XmlEnum));
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn content_types_follow_the_fixed_table() {
        assert_eq!(ImageFormat::Svg.content_type(), "image/svg+xml");
        assert_eq!(ImageFormat::JsonTime.content_type(), "application/json");
        assert_eq!(ImageFormat::Tsv.content_type(), "text/tab-separated-values");
        assert_eq!(ImageFormat::Ssv.content_type(), "text/plain");
    }

    #[test]
    fn suffix_comes_from_the_file_name_only() {
        assert_eq!(ImageFormat::from_path_suffix("/rrd/monitor.png"), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::from_path_suffix("/rrd/t.JSONTIME"),
            Some(ImageFormat::JsonTime)
        );
        assert_eq!(ImageFormat::from_path_suffix("/rrd.d/monitor"), None);
        assert_eq!(ImageFormat::from_path_suffix("/rrd/monitor.rrd"), None);
    }
}
