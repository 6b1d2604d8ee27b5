// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// A pixel memory layout understood by the load, store and gather stages.
///
/// Multi-byte channels are little-endian unless the name says otherwise.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PixelFormat {
    A8,
    G8,
    Rgb565,
    Argb4444,
    Rgba8888,
    Bgra8888,
    Rgba1010102,
    Rg88,
    Rg1616,
    Rgba16161616,
    RgbaU16Be,
    RgbU16Be,
    RgbaF16,
    RgbaF32,
}

impl PixelFormat {
    /// Returns the number of bytes a single pixel occupies.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::A8 | PixelFormat::G8 => 1,
            PixelFormat::Rgb565 | PixelFormat::Argb4444 | PixelFormat::Rg88 => 2,
            PixelFormat::Rgba8888
            | PixelFormat::Bgra8888
            | PixelFormat::Rgba1010102
            | PixelFormat::Rg1616 => 4,
            PixelFormat::RgbU16Be => 6,
            PixelFormat::Rgba16161616 | PixelFormat::RgbaU16Be | PixelFormat::RgbaF16 => 8,
            PixelFormat::RgbaF32 => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(PixelFormat::A8.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::RgbU16Be.bytes_per_pixel(), 6);
        assert_eq!(PixelFormat::RgbaF32.bytes_per_pixel(), 16);
    }
}
