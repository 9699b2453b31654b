//! Raster normalization: whatever was downloaded → first frame as PNG.
//!
//! Worksheet images arrive as PNG, JPEG, GIF (often animated) or previews
//! with wide uniform margins. pdflatex only needs a single PNG frame. The
//! default backend shells out to ImageMagick; if the tool is missing or
//! exits unsuccessfully the built-in decoder takes over and a warning is
//! logged.

use crate::config::RasterBackend;
use crate::error::ImageError;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Convert the first frame of `src` into a PNG at `dest`.
pub trait RasterNormalizer {
    /// `trim` removes a uniform border around the picture.
    fn normalize(&self, src: &Path, dest: &Path, trim: bool) -> Result<(), ImageError>;
}

/// Build the normalizer selected by the configuration.
pub fn from_backend(backend: &RasterBackend) -> Box<dyn RasterNormalizer> {
    match backend {
        RasterBackend::ImageMagick { program } => Box::new(ImageMagick {
            program: program.clone(),
        }),
        RasterBackend::Builtin => Box::new(Builtin),
    }
}

/// `<program> "src[0]" [-trim] png:dest`, with [`Builtin`] as fallback.
pub struct ImageMagick {
    pub program: String,
}

impl ImageMagick {
    fn run(&self, src: &Path, dest: &Path, trim: bool) -> Result<(), ImageError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("{}[0]", src.display()));
        if trim {
            cmd.arg("-trim");
        }
        cmd.arg(format!("png:{}", dest.display()));
        debug!("Running {:?}", cmd);

        let failed = |status: String| ImageError::Convert {
            program: self.program.clone(),
            path: src.to_path_buf(),
            status,
        };
        let status = cmd.status().map_err(|e| failed(e.to_string()))?;
        if !status.success() {
            return Err(failed(status.to_string()));
        }
        Ok(())
    }
}

impl RasterNormalizer for ImageMagick {
    fn normalize(&self, src: &Path, dest: &Path, trim: bool) -> Result<(), ImageError> {
        match self.run(src, dest, trim) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("{e}; falling back to the built-in decoder");
                Builtin.normalize(src, dest, trim)
            }
        }
    }
}

/// Decode with the `image` crate and re-encode as PNG.
pub struct Builtin;

impl RasterNormalizer for Builtin {
    fn normalize(&self, src: &Path, dest: &Path, trim: bool) -> Result<(), ImageError> {
        let decode_err = |detail: String| ImageError::Decode {
            path: src.to_path_buf(),
            detail,
        };
        let img = ImageReader::open(src)
            .map_err(|e| ImageError::Io {
                path: src.to_path_buf(),
                source: e,
            })?
            .with_guessed_format()
            .map_err(|e| decode_err(e.to_string()))?
            .decode()
            .map_err(|e| decode_err(e.to_string()))?;

        let img = if trim { trim_border(img) } else { img };
        img.save_with_format(dest, ImageFormat::Png)
            .map_err(|e| decode_err(e.to_string()))
    }
}

/// Crop away rows and columns that match the top-left pixel.
fn trim_border(img: DynamicImage) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img;
    }
    let bg = img.get_pixel(0, 0);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0, 0);
    for (x, y, px) in img.pixels() {
        if px != bg {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        // Uniform image: nothing but border.
        return img;
    }
    img.crop_imm(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn framed(w: u32, h: u32, border: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        for y in border..h - border {
            for x in border..w - border {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn trim_removes_uniform_frame() {
        let trimmed = trim_border(framed(20, 10, 2));
        assert_eq!(trimmed.dimensions(), (16, 6));
    }

    #[test]
    fn trim_keeps_uniform_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        assert_eq!(trim_border(img).dimensions(), (4, 4));
    }

    #[test]
    fn builtin_converts_jpeg_to_png() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("raw");
        framed(30, 12, 0)
            .to_rgb8()
            .save_with_format(&src, ImageFormat::Jpeg)
            .unwrap();
        let dest = dir.path().join("raw.png");
        Builtin.normalize(&src, &dest, false).unwrap();
        assert_eq!(image::image_dimensions(&dest).unwrap(), (30, 12));
    }

    #[test]
    fn missing_tool_falls_back() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("raw");
        framed(10, 10, 1).save_with_format(&src, ImageFormat::Png).unwrap();
        let dest = dir.path().join("out.png");
        let magick = ImageMagick {
            program: "definitely-not-an-installed-tool".into(),
        };
        magick.normalize(&src, &dest, true).unwrap();
        assert_eq!(image::image_dimensions(&dest).unwrap(), (8, 8));
    }

    #[test]
    fn undecodable_input_is_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("raw");
        std::fs::write(&src, b"<html>not an image</html>").unwrap();
        let err = Builtin
            .normalize(&src, &dir.path().join("x.png"), false)
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }), "got {err:?}");
    }
}
