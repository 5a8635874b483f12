// THEORY:
// The `pixel` module defines how a color is laid out in memory throughout the
// crate. Every buffer the engine sees is a flat slice of `PackedPixel` values
// (a `u32` per pixel), with the components packed low-to-high as B, G, R, A.
//
// Key architectural principles:
// 1.  **One Layout**: The packed `u32` is the only representation used by the hot
//     loops. Arithmetic on deltas works directly on the packed word, one byte lane
//     at a time, so no unpacking is ever needed inside the traversal.
// 2.  **Readable Edges**: The `Pixel` struct exists for the boundaries of the
//     system (image I/O, tests, reports) where named channels read better than
//     shifts and masks. Converting between the two is lossless.

pub mod pixel {
    pub type Channel = u8;
    pub type PackedPixel = u32;

    pub const CHANNELS: usize = 4;

    pub const BLUE_SHIFT: u32 = 0;
    pub const GREEN_SHIFT: u32 = 8;
    pub const RED_SHIFT: u32 = 16;
    pub const ALPHA_SHIFT: u32 = 24;

    /// Mask covering the three color lanes of a packed pixel.
    pub const RGB_MASK: PackedPixel = 0x00FF_FFFF;

    /// A single pixel with its channels unpacked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel::new(red, green, blue, 0xFF)
        }

        pub fn pack(self) -> PackedPixel {
            pack(self.blue, self.green, self.red, self.alpha)
        }

        pub fn is_gray(&self) -> bool {
            self.red == self.green && self.green == self.blue
        }
    }

    impl From<PackedPixel> for Pixel {
        fn from(packed: PackedPixel) -> Self {
            Pixel {
                blue: lane(packed, BLUE_SHIFT),
                green: lane(packed, GREEN_SHIFT),
                red: lane(packed, RED_SHIFT),
                alpha: lane(packed, ALPHA_SHIFT),
            }
        }
    }

    impl From<Pixel> for PackedPixel {
        fn from(pixel: Pixel) -> Self {
            pixel.pack()
        }
    }

    /// Packs four channels in B, G, R, A order (low byte first).
    #[inline]
    pub fn pack(blue: Channel, green: Channel, red: Channel, alpha: Channel) -> PackedPixel {
        (blue as u32) << BLUE_SHIFT
            | (green as u32) << GREEN_SHIFT
            | (red as u32) << RED_SHIFT
            | (alpha as u32) << ALPHA_SHIFT
    }

    /// Reads the byte lane starting at `shift`.
    #[inline]
    pub fn lane(packed: PackedPixel, shift: u32) -> Channel {
        ((packed >> shift) & 0xFF) as Channel
    }

    /// Reads component `index` (0 = B, 1 = G, 2 = R, 3 = A).
    #[inline]
    pub fn component(packed: PackedPixel, index: usize) -> Channel {
        lane(packed, (index as u32) * 8)
    }
}
