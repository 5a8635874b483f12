pub mod image_helper {
    use crate::core_modules::pixel::pixel::*;
    use crate::error::{IterError, Result};
    use image::ImageEncoder;
    use std::io::BufWriter;
    use std::path::Path;

    /// A decoded image as packed pixels.
    #[derive(Debug, Clone)]
    pub struct LoadedImage {
        pub width: u32,
        pub height: u32,
        /// The source carried an alpha channel.
        pub has_alpha: bool,
        pub pixels: Vec<PackedPixel>,
    }

    /// Decodes any format the `image` crate understands into packed RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedImage> {
        let decoded = image::open(path)?;
        let has_alpha = decoded.color().has_alpha();
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(LoadedImage {
            width,
            height,
            has_alpha,
            pixels: pack_rgba(rgba.as_raw()),
        })
    }

    /// Writes packed pixels as a PNG, RGBA8 when `has_alpha` and RGB8 otherwise.
    pub fn save<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        pixels: &[PackedPixel],
        has_alpha: bool,
    ) -> Result<()> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(IterError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let output = BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        let buffer = unpack_rgba(pixels, has_alpha);
        let color = if has_alpha {
            image::ExtendedColorType::Rgba8
        } else {
            image::ExtendedColorType::Rgb8
        };
        encoder.write_image(&buffer, width, height, color)?;

        Ok(())
    }

    /// Packs an RGBA8 byte buffer. Trailing bytes short of a pixel are dropped.
    pub fn pack_rgba(bytes: &[u8]) -> Vec<PackedPixel> {
        bytes
            .chunks_exact(CHANNELS)
            .map(|rgba| pack(rgba[2], rgba[1], rgba[0], rgba[3]))
            .collect()
    }

    /// Unpacks into RGBA8 bytes, or RGB8 when `with_alpha` is false.
    pub fn unpack_rgba(pixels: &[PackedPixel], with_alpha: bool) -> Vec<u8> {
        let stride = if with_alpha { 4 } else { 3 };
        let mut bytes = Vec::with_capacity(pixels.len() * stride);
        for &p in pixels {
            let pixel = Pixel::from(p);
            bytes.extend_from_slice(&[pixel.red, pixel.green, pixel.blue]);
            if with_alpha {
                bytes.push(pixel.alpha);
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::pixel::pixel::pack;

    fn temp_png(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("adaptive_iter_{}_{}.png", name, std::process::id()))
    }

    #[test]
    fn pack_and_unpack_agree_on_channel_order() {
        let bytes = [10u8, 20, 30, 40, 1, 2, 3, 4, 99];
        let pixels = pack_rgba(&bytes);
        assert_eq!(pixels, vec![pack(30, 20, 10, 40), pack(3, 2, 1, 4)]);
        assert_eq!(unpack_rgba(&pixels, true), bytes[..8].to_vec());
        assert_eq!(unpack_rgba(&pixels, false), vec![10, 20, 30, 1, 2, 3]);
    }

    #[test]
    fn save_and_load_rgba_gradient() {
        let (width, height) = (7u32, 5u32);
        let pixels: Vec<u32> = (0..width * height)
            .map(|i| pack((i * 7) as u8, (i * 3) as u8, i as u8, 200))
            .collect();
        let path = temp_png("rgba");

        save(&path, width, height, &pixels, true).expect("Error Saving File.");
        let loaded = load(&path).expect("Error Loading File.");
        std::fs::remove_file(&path).ok();

        assert_eq!((loaded.width, loaded.height), (width, height));
        assert!(loaded.has_alpha);
        assert_eq!(loaded.pixels, pixels);
    }

    #[test]
    fn rgb_files_load_opaque() {
        let pixels = vec![pack(1, 2, 3, 0); 4];
        let path = temp_png("rgb");

        save(&path, 2, 2, &pixels, false).expect("Error Saving File.");
        let loaded = load(&path).expect("Error Loading File.");
        std::fs::remove_file(&path).ok();

        assert!(!loaded.has_alpha);
        assert!(loaded.pixels.iter().all(|&p| p == pack(1, 2, 3, 0xFF)));
    }

    #[test]
    fn save_rejects_a_short_buffer() {
        let path = temp_png("short");
        assert!(save(&path, 3, 3, &[0u32; 4], true).is_err());
        assert!(!path.exists());
    }
}
