use crate::config::ImageSettings;
use crate::error::BotResult;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::info;

/// Shrink an image to fit within the configured bounds and re-encode it as JPEG.
/// Smaller images are never enlarged.
pub fn normalize_image(image_data: &[u8], settings: &ImageSettings) -> BotResult<Vec<u8>> {
    info!("Normalizing image, size: {} bytes", image_data.len());

    let img = image::ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()?
        .decode()?;

    let max = settings.max_image_dimension;
    let img = if img.width() > max || img.height() > max {
        // resize keeps the aspect ratio and fits inside max x max
        img.resize(max, max, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, settings.jpeg_quality);
    rgb.write_with_encoder(encoder)?;

    info!(
        "Image normalized to {}x{}, {} bytes",
        rgb.width(),
        rgb.height(),
        buffer.len()
    );
    Ok(buffer)
}
