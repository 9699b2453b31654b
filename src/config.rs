//! Configuration types for worksheet-to-LaTeX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is an immutable value that
//! every pipeline component receives at construction; nothing reads ambient
//! process state.

use crate::error::ConvertError;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for a worksheet-to-LaTeX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use worksheet2tex::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .iso639_language("de")
///     .image_dir("figures")
///     .text_color(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.language.babel, "ngerman");
/// ```
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Display language (`\selectlanguage`) and babel option. Default: english.
    pub language: Language,

    /// Diagnostic verbosity. 0 logs nothing but warnings; 1 adds per-stage
    /// progress; 2 adds per-rule and per-element detail. Default: 0.
    pub verbosity: u8,

    /// Directory the image directory is created in. Default: `.`.
    pub work_dir: PathBuf,

    /// Image cache directory, relative to `work_dir`. Also the prefix of
    /// every `\includegraphics` path in the output. Default: `images`.
    pub image_dir: String,

    /// Render `[color=…]` as coloured text. When off, colours fall back to
    /// italics. Default: true.
    pub text_color: bool,

    /// Append citation markers to links and emit a bibliography. Default: true.
    pub references: bool,

    /// Do not indent non-first paragraphs. Default: true.
    pub no_indent: bool,

    /// Reuse images already present in the cache directory. Default: true.
    pub image_cache: bool,

    /// Wrap translated text at 75 columns. Default: false.
    ///
    /// Wrapping may split `\href` arguments across lines.
    pub word_wrap: bool,

    /// Heuristic image sizing constants.
    pub sizing: ImageSizing,

    /// How downloaded rasters are normalized to PNG.
    pub raster: RasterBackend,

    /// Overall timeout for a single HTTP fetch, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Localized caption prefixes for applet and video figures.
    pub labels: Labels,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let language = Language::default();
        let labels = Labels::for_language(&language.name);
        Self {
            language,
            verbosity: 0,
            work_dir: PathBuf::from("."),
            image_dir: "images".to_string(),
            text_color: true,
            references: true,
            no_indent: true,
            image_cache: true,
            word_wrap: false,
            sizing: ImageSizing::default(),
            raster: RasterBackend::default(),
            download_timeout_secs: 120,
            labels,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
            labels_set: false,
        }
    }

    /// Absolute-or-relative location of the image cache on disk.
    pub fn image_path(&self) -> PathBuf {
        self.work_dir.join(&self.image_dir)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
    labels_set: bool,
}

impl ConversionConfigBuilder {
    /// Set display and babel language names directly.
    pub fn language(mut self, name: impl Into<String>, babel: impl Into<String>) -> Self {
        self.config.language = Language {
            name: name.into(),
            babel: babel.into(),
        };
        self
    }

    /// Derive both language names from a two-letter code (`hu`, `de`, `de_AT`, …).
    pub fn iso639_language(mut self, code: &str) -> Self {
        self.config.language = Language::from_iso639(code);
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.config.verbosity = level;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn text_color(mut self, v: bool) -> Self {
        self.config.text_color = v;
        self
    }

    pub fn references(mut self, v: bool) -> Self {
        self.config.references = v;
        self
    }

    pub fn no_indent(mut self, v: bool) -> Self {
        self.config.no_indent = v;
        self
    }

    pub fn image_cache(mut self, v: bool) -> Self {
        self.config.image_cache = v;
        self
    }

    pub fn word_wrap(mut self, v: bool) -> Self {
        self.config.word_wrap = v;
        self
    }

    pub fn sizing(mut self, sizing: ImageSizing) -> Self {
        self.config.sizing = sizing;
        self
    }

    pub fn raster(mut self, backend: RasterBackend) -> Self {
        self.config.raster = backend;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Override the caption prefixes. Otherwise they follow the language.
    pub fn labels(mut self, labels: Labels) -> Self {
        self.config.labels = labels;
        self.labels_set = true;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ConversionConfig, ConvertError> {
        if !self.labels_set {
            self.config.labels = Labels::for_language(&self.config.language.name);
        }
        let c = &self.config;
        if c.image_dir.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "image directory must not be empty".into(),
            ));
        }
        if PathBuf::from(&c.image_dir).is_absolute() {
            return Err(ConvertError::InvalidConfig(format!(
                "image directory must be relative to the work dir, got '{}'",
                c.image_dir
            )));
        }
        c.sizing.validate()?;
        Ok(self.config)
    }
}

// ── Language ─────────────────────────────────────────────────────────────

/// Language names used in the preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language {
    /// Name passed to `\selectlanguage`.
    pub name: String,
    /// Option passed to the babel package.
    pub babel: String,
}

impl Default for Language {
    fn default() -> Self {
        Self {
            name: "english".to_string(),
            babel: "english".to_string(),
        }
    }
}

impl Language {
    /// Map a two-letter (optionally region-qualified) code to babel names.
    ///
    /// Unknown codes fall back to english. German variants use the
    /// new-orthography babel names (`ngerman`, `naustrian`) for the package
    /// option while keeping the plain name for `\selectlanguage`.
    pub fn from_iso639(code: &str) -> Self {
        let name = match code {
            "hu" | "hu_HU" => "magyar",
            "de" => "german",
            "de_AT" => "austrian",
            _ => "english",
        };
        let babel = match code {
            "de" | "de_AT" => format!("n{name}"),
            _ => name.to_string(),
        };
        Self {
            name: name.to_string(),
            babel,
        }
    }
}

/// Caption prefixes for figures generated from interactive elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub applet: String,
    pub video: String,
}

impl Labels {
    /// Static mapping from a `\selectlanguage` name to captions.
    pub fn for_language(name: &str) -> Self {
        let (applet, video) = match name {
            "magyar" => ("Interaktív alkalmazás", "Videó"),
            "german" | "ngerman" | "austrian" | "naustrian" => ("Interaktives Applet", "Video"),
            _ => ("Interactive applet", "Video"),
        };
        Self {
            applet: applet.to_string(),
            video: video.to_string(),
        }
    }
}

// ── Images ───────────────────────────────────────────────────────────────

/// Heuristic constants turning raster pixels into printed millimetres.
///
/// These are approximations tuned for typical worksheet screenshots, not
/// DPI-correct conversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageSizing {
    /// Pixels per printed millimetre. Default: 5.
    pub ratio: f64,
    /// Figure width bounds in mm. Default: 30–120.
    pub min_width_mm: f64,
    pub max_width_mm: f64,
    /// Inline image height bounds in mm. Default: 4–5.
    pub min_inline_height_mm: f64,
    pub max_inline_height_mm: f64,
    /// Fixed icon width in cm. Default: 0.7.
    pub icon_size_cm: f64,
    /// Table and cell width as a fraction of `\textwidth`. Default: 0.8.
    pub column_width: f64,
}

impl Default for ImageSizing {
    fn default() -> Self {
        Self {
            ratio: 5.0,
            min_width_mm: 30.0,
            max_width_mm: 120.0,
            min_inline_height_mm: 4.0,
            max_inline_height_mm: 5.0,
            icon_size_cm: 0.7,
            column_width: 0.8,
        }
    }
}

impl ImageSizing {
    fn validate(&self) -> Result<(), ConvertError> {
        let positive = [
            ("image ratio", self.ratio),
            ("minimum figure width", self.min_width_mm),
            ("maximum figure width", self.max_width_mm),
            ("minimum inline height", self.min_inline_height_mm),
            ("maximum inline height", self.max_inline_height_mm),
            ("icon size", self.icon_size_cm),
        ];
        // NaN fails `> 0.0`, so this also rejects non-numbers.
        if let Some((name, value)) = positive
            .iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        {
            return Err(ConvertError::InvalidConfig(format!(
                "{name} must be a positive number, got {value}"
            )));
        }
        if self.min_width_mm > self.max_width_mm
            || self.min_inline_height_mm > self.max_inline_height_mm
        {
            return Err(ConvertError::InvalidConfig(
                "image size minimum exceeds maximum".into(),
            ));
        }
        if self.column_width <= 0.0 || !(0.0..=1.0).contains(&self.column_width) {
            return Err(ConvertError::InvalidConfig(format!(
                "column width must be in (0, 1], got {}",
                self.column_width
            )));
        }
        Ok(())
    }
}

/// Raster normalization backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RasterBackend {
    /// Shell out to ImageMagick (`<program> src[0] [-trim] png:dest`). Falls
    /// back to the built-in decoder when the tool fails. (default)
    ImageMagick { program: String },
    /// Decode and re-encode with the `image` crate only. Trimming crops
    /// rows and columns matching the top-left pixel.
    Builtin,
}

impl Default for RasterBackend {
    fn default() -> Self {
        RasterBackend::ImageMagick {
            program: "convert".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso639_mapping() {
        assert_eq!(Language::from_iso639("xx"), Language::default());
        let hu = Language::from_iso639("hu_HU");
        assert_eq!((hu.name.as_str(), hu.babel.as_str()), ("magyar", "magyar"));
        let de = Language::from_iso639("de");
        assert_eq!((de.name.as_str(), de.babel.as_str()), ("german", "ngerman"));
        let at = Language::from_iso639("de_AT");
        assert_eq!((at.name.as_str(), at.babel.as_str()), ("austrian", "naustrian"));
    }

    #[test]
    fn labels_follow_language_unless_overridden() {
        let c = ConversionConfig::builder().iso639_language("de").build().unwrap();
        assert_eq!(c.labels.applet, "Interaktives Applet");

        let custom = Labels {
            applet: "Applet".into(),
            video: "Clip".into(),
        };
        let c = ConversionConfig::builder()
            .labels(custom.clone())
            .iso639_language("hu")
            .build()
            .unwrap();
        assert_eq!(c.labels, custom);
    }

    #[test]
    fn rejects_absolute_image_dir() {
        let err = ConversionConfig::builder()
            .image_dir("/tmp/images")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("relative"));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let sizing = ImageSizing {
            min_width_mm: 200.0,
            ..ImageSizing::default()
        };
        assert!(ConversionConfig::builder().sizing(sizing).build().is_err());
    }

    #[test]
    fn rejects_zero_and_nan_sizes() {
        for sizing in [
            ImageSizing {
                min_width_mm: 0.0,
                ..ImageSizing::default()
            },
            ImageSizing {
                icon_size_cm: 0.0,
                ..ImageSizing::default()
            },
            ImageSizing {
                max_inline_height_mm: f64::NAN,
                ..ImageSizing::default()
            },
            ImageSizing {
                column_width: f64::NAN,
                ..ImageSizing::default()
            },
        ] {
            let err = ConversionConfig::builder().sizing(sizing).build().unwrap_err();
            assert!(matches!(err, ConvertError::InvalidConfig(_)), "{sizing:?}");
        }
    }

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert!(c.text_color && c.references && c.no_indent && c.image_cache);
        assert!(!c.word_wrap);
        assert_eq!(c.image_path(), PathBuf::from("./images"));
        assert_eq!(c.sizing.ratio, 5.0);
    }
}
