// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Stage contexts.
//!
//! Every stage reads at most one context. The context is chosen when the stage
//! is pushed into a builder and checked against `Stage::context_kind`, so
//! the interpreter never has to guess what a stage expects.

use alloc::vec::Vec;
use core::cell::Cell;

use strict_num::NormalizedF32;

use crate::scalar::Scalar;
use crate::{Color, PremultipliedColor, PremultipliedColorU8};

/// The kind of context a stage reads.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ContextKind {
    None,
    Memory,
    Gather,
    Sampler,
    UniformColor,
    Value,
    Tile,
    Decal,
    Matrix,
    Gradient,
    TwoStopGradient,
    TwoPointConical,
    TransferFunction,
    Table,
    ByteTables,
    ColorLut,
}

/// A stage context.
///
/// Contexts are borrowed. They are owned by the caller and must outlive
/// the pipeline they were pushed into.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug)]
pub enum Context<'a> {
    None,
    Memory(&'a MemoryCtx<'a>),
    Gather(&'a GatherCtx<'a>),
    Sampler(&'a SamplerCtx<'a>),
    UniformColor(&'a UniformColorCtx),
    /// A single number: coverage, dither rate or gamma exponent.
    Value(f32),
    Tile(&'a TileCtx),
    Decal(&'a DecalCtx),
    /// Matrix coefficients in column-major order.
    Matrix(&'a [f32]),
    Gradient(&'a GradientCtx),
    TwoStopGradient(&'a EvenlySpaced2StopGradientCtx),
    TwoPointConical(&'a TwoPointConicalCtx),
    TransferFunction(&'a TransferFunction),
    Table(&'a [f32]),
    ByteTables(&'a ByteTablesCtx),
    ColorLut(&'a ColorLutCtx<'a>),
}

impl Context<'_> {
    /// Returns the context kind.
    pub fn kind(&self) -> ContextKind {
        match self {
            Context::None => ContextKind::None,
            Context::Memory(_) => ContextKind::Memory,
            Context::Gather(_) => ContextKind::Gather,
            Context::Sampler(_) => ContextKind::Sampler,
            Context::UniformColor(_) => ContextKind::UniformColor,
            Context::Value(_) => ContextKind::Value,
            Context::Tile(_) => ContextKind::Tile,
            Context::Decal(_) => ContextKind::Decal,
            Context::Matrix(_) => ContextKind::Matrix,
            Context::Gradient(_) => ContextKind::Gradient,
            Context::TwoStopGradient(_) => ContextKind::TwoStopGradient,
            Context::TwoPointConical(_) => ContextKind::TwoPointConical,
            Context::TransferFunction(_) => ContextKind::TransferFunction,
            Context::Table(_) => ContextKind::Table,
            Context::ByteTables(_) => ContextKind::ByteTables,
            Context::ColorLut(_) => ContextKind::ColorLut,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Pixels<'a> {
    ReadOnly(&'a [u8]),
    Writable(&'a [Cell<u8>]),
}

/// A row-major pixel buffer.
///
/// The same context can be shared by a load and a store stage,
/// which is why a writable buffer is kept as a slice of cells.
#[derive(Copy, Clone, Debug)]
pub struct MemoryCtx<'a> {
    pixels: Pixels<'a>,
    stride: usize,
}

impl<'a> MemoryCtx<'a> {
    /// Creates a writable memory context.
    ///
    /// `stride` is in pixels, not bytes.
    pub fn new(pixels: &'a mut [u8], stride: usize) -> Self {
        MemoryCtx {
            pixels: Pixels::Writable(Cell::from_mut(pixels).as_slice_of_cells()),
            stride,
        }
    }

    /// Creates a memory context that can only be read from.
    pub fn new_read_only(pixels: &'a [u8], stride: usize) -> Self {
        MemoryCtx {
            pixels: Pixels::ReadOnly(pixels),
            stride,
        }
    }

    /// Returns the row stride in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        match self.pixels {
            Pixels::ReadOnly(p) => p.len(),
            Pixels::Writable(p) => p.len(),
        }
    }

    /// Checks that the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that store stages can use this context.
    pub fn is_writable(&self) -> bool {
        matches!(self.pixels, Pixels::Writable(_))
    }

    #[inline]
    fn offset(&self, dx: usize, dy: usize, bpp: usize) -> usize {
        (dy * self.stride + dx) * bpp
    }

    /// Copies `dst.len()` bytes starting at pixel `(dx, dy)`.
    #[inline]
    pub(crate) fn read(&self, dx: usize, dy: usize, bpp: usize, dst: &mut [u8]) {
        let offset = self.offset(dx, dy, bpp);
        let len = dst.len();
        match self.pixels {
            Pixels::ReadOnly(p) => dst.copy_from_slice(&p[offset..offset + len]),
            Pixels::Writable(p) => {
                for (d, s) in dst.iter_mut().zip(&p[offset..offset + len]) {
                    *d = s.get();
                }
            }
        }
    }

    /// Writes `src` starting at pixel `(dx, dy)`.
    ///
    /// A read-only buffer is left untouched. `run` rejects such programs anyway.
    #[inline]
    pub(crate) fn write(&self, dx: usize, dy: usize, bpp: usize, src: &[u8]) {
        let offset = self.offset(dx, dy, bpp);
        if let Pixels::Writable(p) = self.pixels {
            for (d, s) in p[offset..offset + src.len()].iter().zip(src) {
                d.set(*s);
            }
        }
    }
}

/// An image that can be sampled at arbitrary coordinates.
///
/// Every gathered coordinate is clamped to `[0, width) x [0, height)`
/// before it is turned into an index.
#[derive(Copy, Clone, Debug)]
pub struct GatherCtx<'a> {
    pixels: &'a [u8],
    stride: usize,
    width: u32,
    height: u32,
}

impl<'a> GatherCtx<'a> {
    /// Creates a new gather context.
    ///
    /// `stride` is in pixels and must be >= `width`.
    /// Returns `None` when the size is zero or too big to be indexed with `i32`.
    pub fn new(pixels: &'a [u8], stride: usize, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || stride < width as usize {
            return None;
        }

        let last = (height as usize - 1)
            .checked_mul(stride)?
            .checked_add(width as usize)?;
        if last > i32::MAX as usize {
            return None;
        }

        Some(GatherCtx { pixels, stride, width, height })
    }

    /// Returns the image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the row stride in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The largest coordinate that still maps into the image horizontally.
    #[inline]
    pub(crate) fn max_x(&self) -> f32 {
        ulp_sub(self.width as f32)
    }

    /// The largest coordinate that still maps into the image vertically.
    #[inline]
    pub(crate) fn max_y(&self) -> f32 {
        ulp_sub(self.height as f32)
    }

    /// Number of pixels that an index can address.
    pub(crate) fn pixels_count(&self) -> usize {
        (self.height as usize - 1) * self.stride + self.width as usize
    }

    /// Returns the bytes of the pixel at a linear index, clamping the index
    /// to the image once more.
    #[inline]
    pub(crate) fn pixel(&self, index: i32, bpp: usize) -> &[u8] {
        let last = self.pixels_count() - 1;
        let index = (index.max(0) as usize).min(last);
        &self.pixels[index * bpp..index * bpp + bpp]
    }

    pub(crate) fn buffer_len(&self) -> usize {
        self.pixels.len()
    }
}

// Exclusive -> inclusive. Somewhat similar to `v - f32::EPSILON`.
#[inline]
fn ulp_sub(v: f32) -> f32 {
    bytemuck::cast::<u32, f32>(bytemuck::cast::<f32, u32>(v) - 1)
}

/// A spread mode used by the fused image samplers.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum SpreadMode {
    Pad,
    Repeat,
    Reflect,
}

impl Default for SpreadMode {
    fn default() -> Self {
        SpreadMode::Pad
    }
}

/// An `Rgba8888` image for the `Bilinear` and `Bicubic` stages.
#[derive(Copy, Clone, Debug)]
pub struct SamplerCtx<'a> {
    /// The source image.
    pub gather: GatherCtx<'a>,
    /// How coordinates outside the image are tiled.
    pub spread_mode: SpreadMode,
    pub(crate) inv_width: f32,
    pub(crate) inv_height: f32,
}

impl<'a> SamplerCtx<'a> {
    /// Creates a new sampler context.
    pub fn new(gather: GatherCtx<'a>, spread_mode: SpreadMode) -> Self {
        SamplerCtx {
            gather,
            spread_mode,
            inv_width: 1.0 / gather.width as f32,
            inv_height: 1.0 / gather.height as f32,
        }
    }
}

/// A solid color.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct UniformColorCtx {
    pub(crate) r: f32,
    pub(crate) g: f32,
    pub(crate) b: f32,
    pub(crate) a: f32,
    pub(crate) rgba: [u16; 4], // [0,255] in a 16-bit lane.
}

impl UniformColorCtx {
    /// Creates a new context.
    pub fn new(c: PremultipliedColor) -> Self {
        let u = c.to_color_u8();
        UniformColorCtx {
            r: c.red(),
            g: c.green(),
            b: c.blue(),
            a: c.alpha(),
            rgba: [
                u16::from(u.red()),
                u16::from(u.green()),
                u16::from(u.blue()),
                u16::from(u.alpha()),
            ],
        }
    }

    /// Creates a new context from a byte color.
    ///
    /// Both tiers see exactly the given bytes.
    pub fn from_color_u8(c: PremultipliedColorU8) -> Self {
        let rgba = [
            u16::from(c.red()),
            u16::from(c.green()),
            u16::from(c.blue()),
            u16::from(c.alpha()),
        ];

        UniformColorCtx {
            r: f32::from(rgba[0]) / 255.0,
            g: f32::from(rgba[1]) / 255.0,
            b: f32::from(rgba[2]) / 255.0,
            a: f32::from(rgba[3]) / 255.0,
            rgba,
        }
    }
}

/// A repeat or mirror tile size.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct TileCtx {
    pub(crate) scale: f32,
    pub(crate) inv_scale: f32, // cache of 1/scale
}

impl TileCtx {
    /// Creates a new context.
    ///
    /// Returns `None` when `size` is not a positive finite number.
    pub fn new(size: f32) -> Option<Self> {
        if !(size.is_finite() && size > 0.0) {
            return None;
        }

        Some(TileCtx { scale: size, inv_scale: 1.0 / size })
    }
}

/// Image bounds for decal tiling.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct DecalCtx {
    pub(crate) limit_x: f32,
    pub(crate) limit_y: f32,
}

impl DecalCtx {
    /// Creates a new context.
    pub fn new(width: f32, height: f32) -> Self {
        DecalCtx { limit_x: width, limit_y: height }
    }
}

/// A gradient color.
///
/// Unlike `Color`, components are not limited to a 0..1 range.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct GradientColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl GradientColor {
    /// Creates a new color.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        GradientColor { r, g, b, a }
    }

    fn sub(self, other: Self) -> Self {
        GradientColor::new(self.r - other.r, self.g - other.g, self.b - other.b, self.a - other.a)
    }

    fn scale(self, k: f32) -> Self {
        GradientColor::new(self.r * k, self.g * k, self.b * k, self.a * k)
    }
}

impl From<Color> for GradientColor {
    fn from(c: Color) -> Self {
        GradientColor {
            r: c.red(),
            g: c.green(),
            b: c.blue(),
            a: c.alpha(),
        }
    }
}

/// A gradient stop.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GradientStop {
    /// Stop position. Positions must be increasing, otherwise they are clamped.
    pub position: NormalizedF32,
    /// Stop color.
    pub color: Color,
}

impl GradientStop {
    /// Creates a new stop. `position` is clamped to 0..1.
    pub fn new(position: f32, color: Color) -> Self {
        GradientStop {
            position: NormalizedF32::new_clamped(position),
            color,
        }
    }
}

/// A color ramp.
///
/// The color of interval `i` at `t` is `t * factors[i] + biases[i]`.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct GradientCtx {
    pub(crate) factors: Vec<GradientColor>,
    pub(crate) biases: Vec<GradientColor>,
    /// Start position of each interval. Only used by the `Gradient` stage.
    pub(crate) t_values: Vec<NormalizedF32>,
    pub(crate) premultiplied: bool,
}

impl GradientCtx {
    /// Creates a ramp from precomputed coefficients.
    ///
    /// `t_values` may be empty when the ramp is used only by
    /// the `EvenlySpacedGradient` stage.
    ///
    /// `premultiplied` tells lowp stages that colors were interpolated
    /// premultiplied and rgb must be clamped to alpha.
    pub fn new(
        factors: Vec<GradientColor>,
        biases: Vec<GradientColor>,
        t_values: Vec<NormalizedF32>,
        premultiplied: bool,
    ) -> Option<Self> {
        if factors.is_empty() || factors.len() != biases.len() {
            return None;
        }

        if !t_values.is_empty() && t_values.len() != factors.len() {
            return None;
        }

        Some(GradientCtx { factors, biases, t_values, premultiplied })
    }

    /// Builds a ramp for the `Gradient` stage from arbitrary stops.
    pub fn from_stops(stops: &[GradientStop], premultiplied: bool) -> Option<Self> {
        if stops.is_empty() {
            return None;
        }

        let mut points: Vec<(f32, GradientColor)> = Vec::with_capacity(stops.len() + 2);

        // Stops must cover the whole 0..1 range.
        if stops[0].position.get() != 0.0 {
            points.push((0.0, stops[0].color.into()));
        }

        let mut prev = 0.0;
        for stop in stops {
            let pos = stop.position.get().bound(prev, 1.0);
            points.push((pos, stop.color.into()));
            prev = pos;
        }

        if prev != 1.0 {
            points.push((1.0, stops[stops.len() - 1].color.into()));
        }

        let mut ctx = GradientCtx { premultiplied, ..GradientCtx::default() };

        // The first and the last stops are redundant when they repeat
        // the color of their neighbour.
        let mut first = 0;
        let mut last = points.len() - 1;
        if points.len() > 2 && points[0].1 == points[1].1 {
            first = 1;
        }
        if last > first + 1 && points[last].1 == points[last - 1].1 {
            last -= 1;
        }

        ctx.push_const_color(points[first].1, 0.0);
        for i in first..last {
            let (t_l, c_l) = points[i];
            let (t_r, c_r) = points[i + 1];
            debug_assert!(t_l <= t_r);
            if t_l < t_r {
                let f = c_r.sub(c_l).scale(1.0 / (t_r - t_l));
                ctx.factors.push(f);
                ctx.biases.push(c_l.sub(f.scale(t_l)));
                ctx.t_values.push(NormalizedF32::new_clamped(t_l));
            }
        }

        ctx.push_const_color(points[last].1, points[last].0);

        Some(ctx)
    }

    /// Builds a ramp for the `EvenlySpacedGradient` stage.
    ///
    /// Color `i` is placed at `i / (n - 1)`.
    pub fn evenly_spaced(colors: &[GradientColor], premultiplied: bool) -> Option<Self> {
        if colors.len() < 2 {
            return None;
        }

        let n = colors.len();
        let k = (n - 1) as f32;
        let mut ctx = GradientCtx { premultiplied, ..GradientCtx::default() };
        for i in 0..n - 1 {
            let f = colors[i + 1].sub(colors[i]).scale(k);
            ctx.factors.push(f);
            ctx.biases.push(colors[i].sub(f.scale(i as f32 / k)));
            ctx.t_values.push(NormalizedF32::new_clamped(i as f32 / k));
        }

        ctx.push_const_color(colors[n - 1], 1.0);

        Some(ctx)
    }

    fn push_const_color(&mut self, color: GradientColor, t: f32) {
        self.factors.push(GradientColor::default());
        self.biases.push(color);
        self.t_values.push(NormalizedF32::new_clamped(t));
    }

    /// Returns the number of ramp intervals.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Checks that the ramp is empty. A valid ramp never is.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// A two-stop gradient: `t * factor + bias`.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct EvenlySpaced2StopGradientCtx {
    pub factor: GradientColor,
    pub bias: GradientColor,
}

impl EvenlySpaced2StopGradientCtx {
    /// Creates a gradient from `c0` at `t = 0` to `c1` at `t = 1`.
    pub fn new(c0: GradientColor, c1: GradientColor) -> Self {
        EvenlySpaced2StopGradientCtx {
            factor: c1.sub(c0),
            bias: c0,
        }
    }
}

/// Precomputed two-point conical gradient coefficients.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct TwoPointConicalCtx {
    /// `r0 * r0` for the strip variant, `1 / r1` for the focal variants.
    pub p0: f32,
    /// Focal offset added by `Alter2PtConicalCompensateFocal`.
    pub p1: f32,
}

/// A 7-parameter transfer function.
///
/// `v <= d ? c * v + f : (a * v + b)^g + e`
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct TransferFunction {
    pub g: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

/// Per-channel 8-bit lookup tables.
#[allow(missing_docs)]
#[derive(Copy, Clone)]
pub struct ByteTablesCtx {
    pub r: [u8; 256],
    pub g: [u8; 256],
    pub b: [u8; 256],
    pub a: [u8; 256],
}

impl ByteTablesCtx {
    /// Creates identity tables.
    pub fn identity() -> Self {
        let mut t = [0; 256];
        for (i, v) in t.iter_mut().enumerate() {
            *v = i as u8;
        }

        ByteTablesCtx { r: t, g: t, b: t, a: t }
    }
}

impl core::fmt::Debug for ByteTablesCtx {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("ByteTablesCtx").finish()
    }
}

/// A 3D or 4D color lookup table.
///
/// Entries are rgb triples. The last input dimension varies fastest,
/// so for a 3D table `b` is the innermost one.
#[derive(Copy, Clone, Debug)]
pub struct ColorLutCtx<'a> {
    pub(crate) table: &'a [f32],
    pub(crate) limits: [u32; 4],
}

impl<'a> ColorLutCtx<'a> {
    /// Creates a new context.
    ///
    /// `limits` are grid sizes for `r`, `g`, `b` and `a` (the K channel
    /// of a 4D table). A 3D table must set the last limit to 1.
    pub fn new(table: &'a [f32], limits: [u32; 4]) -> Option<Self> {
        let mut count = 3usize;
        for limit in limits.iter() {
            if *limit == 0 {
                return None;
            }

            count = count.checked_mul(*limit as usize)?;
        }

        // Entries are addressed with 32-bit lanes.
        if table.len() < count || count > i32::MAX as usize {
            return None;
        }

        Some(ColorLutCtx { table, limits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_ctx_validation() {
        let pixels = [0u8; 16];
        assert!(GatherCtx::new(&pixels, 2, 2, 2).is_some());
        assert!(GatherCtx::new(&pixels, 1, 2, 2).is_none());
        assert!(GatherCtx::new(&pixels, 2, 0, 2).is_none());
        assert!(GatherCtx::new(&pixels, 2, 2, 0).is_none());
    }

    #[test]
    fn gather_ctx_clamps_index() {
        let pixels = [1, 2, 3, 4];
        let ctx = GatherCtx::new(&pixels, 2, 2, 2).unwrap();
        assert_eq!(ctx.pixel(-5, 1), &[1]);
        assert_eq!(ctx.pixel(100, 1), &[4]);
    }

    #[test]
    fn memory_ctx_read_write() {
        let mut pixels = [0u8; 8];
        let ctx = MemoryCtx::new(&mut pixels, 2);
        ctx.write(1, 1, 2, &[7, 8]);
        let mut out = [0; 2];
        ctx.read(1, 1, 2, &mut out);
        assert_eq!(out, [7, 8]);
        assert!(ctx.is_writable());
        assert_eq!(pixels, [0, 0, 0, 0, 0, 0, 7, 8]);
    }

    #[test]
    fn read_only_memory_ctx_ignores_writes() {
        let pixels = [1u8; 4];
        let ctx = MemoryCtx::new_read_only(&pixels, 4);
        ctx.write(0, 0, 1, &[9]);
        assert!(!ctx.is_writable());
        let mut out = [0; 1];
        ctx.read(0, 0, 1, &mut out);
        assert_eq!(out, [1]);
    }

    #[test]
    fn tile_ctx_rejects_bad_sizes() {
        assert!(TileCtx::new(0.0).is_none());
        assert!(TileCtx::new(-1.0).is_none());
        assert!(TileCtx::new(f32::NAN).is_none());
        assert_eq!(TileCtx::new(4.0).unwrap().inv_scale, 0.25);
    }

    #[test]
    fn uniform_color_rounding() {
        let c = Color::from_rgba8(220, 140, 75, 180).premultiply();
        let ctx = UniformColorCtx::new(c);
        assert_eq!(ctx.rgba, [155, 99, 53, 180]);
    }

    #[test]
    fn uniform_color_from_bytes() {
        let c = PremultipliedColorU8::from_rgba(155, 99, 53, 180).unwrap();
        let ctx = UniformColorCtx::from_color_u8(c);
        assert_eq!(ctx.rgba, [155, 99, 53, 180]);
        assert_eq!(ctx.a, 180.0 / 255.0);
        assert_eq!(ctx.r, 155.0 / 255.0);
    }

    #[test]
    fn two_stop_ramp() {
        let ctx = EvenlySpaced2StopGradientCtx::new(
            GradientColor::new(1.0, 0.0, 0.0, 1.0),
            GradientColor::new(0.0, 0.0, 1.0, 1.0),
        );
        assert_eq!(ctx.factor, GradientColor::new(-1.0, 0.0, 1.0, 0.0));
        assert_eq!(ctx.bias, GradientColor::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn ramp_from_stops() {
        let stops = [
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(0.5, Color::WHITE),
            GradientStop::new(1.0, Color::BLACK),
        ];
        let ctx = GradientCtx::from_stops(&stops, false).unwrap();
        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.t_values[1].get(), 0.0);
        assert_eq!(ctx.t_values[2].get(), 0.5);
        assert_eq!(ctx.factors[1].r, 2.0);
        assert_eq!(ctx.biases[2].r, 2.0);
        assert_eq!(ctx.factors[3], GradientColor::default());
        assert_eq!(ctx.biases[3], GradientColor::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn ramp_inserts_missing_end_stops() {
        let stops = [
            GradientStop::new(0.25, Color::BLACK),
            GradientStop::new(0.75, Color::WHITE),
        ];
        let ctx = GradientCtx::from_stops(&stops, false).unwrap();
        // Flat black up to 0.25, a ramp and flat white after 0.75.
        assert_eq!(ctx.t_values.len(), ctx.len());
        assert_eq!(ctx.t_values[1].get(), 0.25);
        assert_eq!(ctx.factors[1].r, 2.0);
        assert_eq!(ctx.biases[ctx.len() - 1], GradientColor::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn evenly_spaced_ramp() {
        let colors = [
            GradientColor::new(0.0, 0.0, 0.0, 1.0),
            GradientColor::new(1.0, 0.0, 0.0, 1.0),
            GradientColor::new(1.0, 1.0, 0.0, 1.0),
        ];
        let ctx = GradientCtx::evenly_spaced(&colors, false).unwrap();
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.factors[0].r, 2.0);
        assert_eq!(ctx.biases[0].r, 0.0);
        assert_eq!(ctx.factors[1].g, 2.0);
        assert_eq!(ctx.biases[1].g, -1.0);
    }

    #[test]
    fn color_lut_validation() {
        let table = [0.0; 3 * 8];
        assert!(ColorLutCtx::new(&table, [2, 2, 2, 1]).is_some());
        assert!(ColorLutCtx::new(&table, [2, 2, 3, 1]).is_none());
        assert!(ColorLutCtx::new(&table, [2, 2, 2, 0]).is_none());
    }
}
