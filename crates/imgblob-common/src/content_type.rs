//! MIME type lookup by file extension
//!
//! Covers the image and document formats that show up in image path columns.
//! Anything else resolves to [`FALLBACK_CONTENT_TYPE`].

use mime::Mime;
use std::path::Path;

/// Content type returned for unknown or missing extensions.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Extensions without a named constant in the `mime` crate. Every entry must
/// parse as a MIME type.
const EXTRA_TYPES: &[(&str, &str)] = &[
    ("webp", "image/webp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("jxr", "image/jxr"),
    ("wdp", "image/vnd.ms-photo"),
    ("hdp", "image/vnd.ms-photo"),
    ("jxl", "image/jxl"),
    ("jp2", "image/jp2"),
    ("j2k", "image/jp2"),
    ("jpf", "image/jpx"),
    ("jpx", "image/jpx"),
    ("jpm", "image/jpm"),
    ("apng", "image/apng"),
    ("psd", "image/vnd.adobe.photoshop"),
    ("tga", "image/x-tga"),
    ("pcx", "image/x-pcx"),
    ("dds", "image/vnd.ms-dds"),
    ("exr", "image/x-exr"),
    ("hdr", "image/vnd.radiance"),
    ("qoi", "image/qoi"),
    ("cur", "image/x-icon"),
    ("pbm", "image/x-portable-bitmap"),
    ("pgm", "image/x-portable-graymap"),
    ("ppm", "image/x-portable-pixmap"),
    ("pnm", "image/x-portable-anymap"),
    ("ras", "image/x-cmu-raster"),
    ("rgb", "image/x-rgb"),
    ("xbm", "image/x-xbitmap"),
    ("xpm", "image/x-xpixmap"),
    ("xwd", "image/x-xwindowdump"),
    ("emf", "image/emf"),
    ("wmf", "image/wmf"),
    ("cod", "image/cis-cod"),
    ("ief", "image/ief"),
    ("djvu", "image/vnd.djvu"),
    ("dng", "image/x-adobe-dng"),
    ("cr2", "image/x-canon-cr2"),
    ("nef", "image/x-nikon-nef"),
    ("arw", "image/x-sony-arw"),
    ("eps", "application/postscript"),
    ("ai", "application/postscript"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("xml", "text/xml"),
    ("csv", "text/csv"),
    ("zip", "application/zip"),
];

/// Look up the MIME type for `path` from its extension.
///
/// The lookup is case-insensitive and never fails.
pub fn mime_type(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| lookup(&ext))
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

fn lookup(ext: &str) -> Option<Mime> {
    let mime = match ext {
        "jpg" | "jpeg" | "jpe" | "jfif" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "bmp" | "dib" => mime::IMAGE_BMP,
        "svg" | "svgz" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        "txt" => mime::TEXT_PLAIN,
        other => {
            return EXTRA_TYPES
                .iter()
                .find(|(known, _)| *known == other)
                .and_then(|(_, essence)| essence.parse().ok())
        },
    };

    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_image_types() {
        assert_eq!(mime_type("/data/products/a.jpg"), "image/jpeg");
        assert_eq!(mime_type("a.jpeg"), "image/jpeg");
        assert_eq!(mime_type("a.png"), "image/png");
        assert_eq!(mime_type("a.gif"), "image/gif");
        assert_eq!(mime_type("a.svg"), "image/svg+xml");
        assert_eq!(mime_type("scan.tif"), "image/tiff");
        assert_eq!(mime_type("hero.webp"), "image/webp");
        assert_eq!(mime_type("invoice.pdf"), "application/pdf");
    }

    #[test]
    fn test_less_common_image_types() {
        assert_eq!(mime_type("scan.jp2"), "image/jp2");
        assert_eq!(mime_type("layers.PSD"), "image/vnd.adobe.photoshop");
        assert_eq!(mime_type("sprite.tga"), "image/x-tga");
        assert_eq!(mime_type("frame.ppm"), "image/x-portable-pixmap");
        assert_eq!(mime_type("modern.jxl"), "image/jxl");
    }

    #[test]
    fn test_extra_types_all_parse() {
        for (ext, essence) in EXTRA_TYPES {
            assert_eq!(mime_type(format!("x.{}", ext)), *essence);
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(mime_type("A.JPG"), "image/jpeg");
        assert_eq!(mime_type("logo.Png"), "image/png");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(mime_type("archive.xyz"), FALLBACK_CONTENT_TYPE);
        assert_eq!(mime_type("no_extension"), FALLBACK_CONTENT_TYPE);
        assert_eq!(mime_type(".hidden"), FALLBACK_CONTENT_TYPE);
        assert_eq!(mime_type(""), FALLBACK_CONTENT_TYPE);
    }
}
