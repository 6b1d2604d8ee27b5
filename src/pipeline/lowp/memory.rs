// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! 8-bit pixel formats, coverage masks and the fused bilinear sampler.

use arrayref::{array_mut_ref, array_ref};

use crate::pipeline::{GatherCtx, MemoryCtx};
use crate::wide::{f32x16, u16x16};
use crate::PixelFormat;

use super::{div255, inv, lerp, Pipeline, STAGE_WIDTH};

// Enough for 16 Rgba8888 pixels.
const CHUNK_BYTES: usize = STAGE_WIDTH * 4;

type Chunk = [u8; CHUNK_BYTES];

type Rgba = (u16x16, u16x16, u16x16, u16x16);

#[inline(always)]
fn load_chunk(p: &Pipeline, ctx: &MemoryCtx, bpp: usize) -> Chunk {
    // Pixels past the tail stay zeroed.
    let mut chunk = [0; CHUNK_BYTES];
    ctx.read(p.dx, p.dy, bpp, &mut chunk[..p.lanes() * bpp]);
    chunk
}

#[inline(always)]
fn store_chunk(p: &Pipeline, ctx: &MemoryCtx, bpp: usize, chunk: &Chunk) {
    ctx.write(p.dx, p.dy, bpp, &chunk[..p.lanes() * bpp]);
}

#[inline(always)]
fn gather_chunk(ctx: &GatherCtx, ix: &[i32; STAGE_WIDTH], bpp: usize) -> Chunk {
    let mut chunk = [0; CHUNK_BYTES];
    for (i, index) in ix.iter().enumerate() {
        chunk[i * bpp..(i + 1) * bpp].copy_from_slice(ctx.pixel(*index, bpp));
    }

    chunk
}

/// Turns coordinates into linear pixel indices, clamping them to the image.
#[inline(always)]
fn gather_ix(ctx: &GatherCtx, x: f32x16, y: f32x16) -> [i32; STAGE_WIDTH] {
    let zero = f32x16::splat(0.0);
    let x: [f32; STAGE_WIDTH] = x.max(&zero).min(&f32x16::splat(ctx.max_x())).into();
    let y: [f32; STAGE_WIDTH] = y.max(&zero).min(&f32x16::splat(ctx.max_y())).into();

    let stride = ctx.stride() as i32;
    let mut ix = [0; STAGE_WIDTH];
    for (i, (x, y)) in ix.iter_mut().zip(x.iter().zip(y.iter())) {
        *i = (*y as i32) * stride + (*x as i32);
    }

    ix
}

#[inline(always)]
fn read_lanes(chunk: &Chunk, bpp: usize, offset: usize, f: impl Fn(&[u8]) -> u16) -> u16x16 {
    let mut v = u16x16::default();
    for (i, lane) in v.0.iter_mut().enumerate() {
        *lane = f(&chunk[i * bpp + offset..]);
    }

    v
}

#[inline(always)]
fn write_lanes(chunk: &mut Chunk, bpp: usize, offset: usize, v: &u16x16, f: impl Fn(&mut [u8], u16)) {
    for (i, n) in v.0.iter().enumerate() {
        f(&mut chunk[i * bpp + offset..], *n);
    }
}

fn read_u8(b: &[u8]) -> u16 {
    u16::from(b[0])
}

fn read_u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes(*array_ref!(b, 0, 2))
}

// Registers can hold more than 8 bits after a sloppy stage.
// Only the low byte is kept, like a plain cast would.
fn write_u8(b: &mut [u8], n: u16) {
    b[0] = n as u8;
}

fn write_u16_le(b: &mut [u8], n: u16) {
    *array_mut_ref!(b, 0, 2) = n.to_le_bytes();
}

fn decode_a8(chunk: &Chunk, bpp: usize) -> Rgba {
    let zero = u16x16::splat(0);
    (zero, zero, zero, read_lanes(chunk, bpp, 0, read_u8))
}

fn decode_g8(chunk: &Chunk, bpp: usize) -> Rgba {
    let v = read_lanes(chunk, bpp, 0, read_u8);
    (v, v, v, u16x16::splat(255))
}

#[inline(always)]
fn from_565(rgb: u16x16) -> (u16x16, u16x16, u16x16) {
    // Format for 565 buffers: 15|rrrrr gggggg bbbbb|0
    let r = rgb.shr(11) & u16x16::splat(31);
    let g = rgb.shr(5) & u16x16::splat(63);
    let b = rgb & u16x16::splat(31);

    // These bit replications are the same as multiplying by 255/31 or 255/63 to scale to 8-bit.
    (r.shl(3) | r.shr(2), g.shl(2) | g.shr(4), b.shl(3) | b.shr(2))
}

fn decode_565(chunk: &Chunk, bpp: usize) -> Rgba {
    let (r, g, b) = from_565(read_lanes(chunk, bpp, 0, read_u16_le));
    (r, g, b, u16x16::splat(255))
}

fn decode_4444(chunk: &Chunk, bpp: usize) -> Rgba {
    // Format for 4444 buffers: 15|rrrr gggg bbbb aaaa|0.
    let px = read_lanes(chunk, bpp, 0, read_u16_le);
    let nibble = |shift: u16| {
        let v = px.shr(shift) & u16x16::splat(15);
        v | v.shl(4)
    };

    (nibble(12), nibble(8), nibble(4), nibble(0))
}

fn decode_8888(chunk: &Chunk, bpp: usize) -> Rgba {
    (
        read_lanes(chunk, bpp, 0, read_u8),
        read_lanes(chunk, bpp, 1, read_u8),
        read_lanes(chunk, bpp, 2, read_u8),
        read_lanes(chunk, bpp, 3, read_u8),
    )
}

fn decode_bgra(chunk: &Chunk, bpp: usize) -> Rgba {
    let (b, g, r, a) = decode_8888(chunk, bpp);
    (r, g, b, a)
}

fn decode_rg88(chunk: &Chunk, bpp: usize) -> Rgba {
    (
        read_lanes(chunk, bpp, 0, read_u8),
        read_lanes(chunk, bpp, 1, read_u8),
        u16x16::splat(0),
        u16x16::splat(255),
    )
}

fn encode_a8(chunk: &mut Chunk, bpp: usize, (_, _, _, a): Rgba) {
    write_lanes(chunk, bpp, 0, &a, write_u8);
}

fn encode_565(chunk: &mut Chunk, bpp: usize, (r, g, b, _): Rgba) {
    let r = (r * u16x16::splat(9) + u16x16::splat(36)) / u16x16::splat(74); //  9/74 ≈ 31/255, plus 36/74, about half.
    let g = (g * u16x16::splat(21) + u16x16::splat(42)) / u16x16::splat(85); // 21/85 = 63/255 exactly.
    let b = (b * u16x16::splat(9) + u16x16::splat(36)) / u16x16::splat(74);
    write_lanes(chunk, bpp, 0, &(r.shl(11) | g.shl(5) | b), write_u16_le);
}

fn encode_4444(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba) {
    let nibble = |v: u16x16| (v + u16x16::splat(8)) / u16x16::splat(17); // 1/17 = 15/255
    let px = nibble(r).shl(12) | nibble(g).shl(8) | nibble(b).shl(4) | nibble(a);
    write_lanes(chunk, bpp, 0, &px, write_u16_le);
}

fn encode_8888(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba) {
    write_lanes(chunk, bpp, 0, &r, write_u8);
    write_lanes(chunk, bpp, 1, &g, write_u8);
    write_lanes(chunk, bpp, 2, &b, write_u8);
    write_lanes(chunk, bpp, 3, &a, write_u8);
}

fn encode_bgra(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba) {
    encode_8888(chunk, bpp, (b, g, r, a));
}

fn encode_rg88(chunk: &mut Chunk, bpp: usize, (r, g, _, _): Rgba) {
    write_lanes(chunk, bpp, 0, &r, write_u8);
    write_lanes(chunk, bpp, 1, &g, write_u8);
}

macro_rules! load_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name(p: &mut Pipeline, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let (r, g, b, a) = $decode(&load_chunk(p, ctx, bpp), bpp);
            p.r = r;
            p.g = g;
            p.b = b;
            p.a = a;
        }
    };
}

macro_rules! load_dst_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name(p: &mut Pipeline, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let (r, g, b, a) = $decode(&load_chunk(p, ctx, bpp), bpp);
            p.dr = r;
            p.dg = g;
            p.db = b;
            p.da = a;
        }
    };
}

macro_rules! gather_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name(p: &mut Pipeline, ctx: &GatherCtx) {
            let bpp = $format.bytes_per_pixel();
            let ix = gather_ix(ctx, p.x(), p.y());
            let (r, g, b, a) = $decode(&gather_chunk(ctx, &ix, bpp), bpp);
            p.r = r;
            p.g = g;
            p.b = b;
            p.a = a;
        }
    };
}

macro_rules! store_stage {
    ($name:ident, $format:expr, $encode:ident) => {
        pub(super) fn $name(p: &mut Pipeline, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let mut chunk = [0; CHUNK_BYTES];
            $encode(&mut chunk, bpp, (p.r, p.g, p.b, p.a));
            store_chunk(p, ctx, bpp, &chunk);
        }
    };
}

load_stage!(load_a8, PixelFormat::A8, decode_a8);
load_dst_stage!(load_a8_dst, PixelFormat::A8, decode_a8);
gather_stage!(gather_a8, PixelFormat::A8, decode_a8);
store_stage!(store_a8, PixelFormat::A8, encode_a8);

load_stage!(load_g8, PixelFormat::G8, decode_g8);
load_dst_stage!(load_g8_dst, PixelFormat::G8, decode_g8);
gather_stage!(gather_g8, PixelFormat::G8, decode_g8);

load_stage!(load_565, PixelFormat::Rgb565, decode_565);
load_dst_stage!(load_565_dst, PixelFormat::Rgb565, decode_565);
gather_stage!(gather_565, PixelFormat::Rgb565, decode_565);
store_stage!(store_565, PixelFormat::Rgb565, encode_565);

load_stage!(load_4444, PixelFormat::Argb4444, decode_4444);
load_dst_stage!(load_4444_dst, PixelFormat::Argb4444, decode_4444);
gather_stage!(gather_4444, PixelFormat::Argb4444, decode_4444);
store_stage!(store_4444, PixelFormat::Argb4444, encode_4444);

load_stage!(load_8888, PixelFormat::Rgba8888, decode_8888);
load_dst_stage!(load_8888_dst, PixelFormat::Rgba8888, decode_8888);
gather_stage!(gather_8888, PixelFormat::Rgba8888, decode_8888);
store_stage!(store_8888, PixelFormat::Rgba8888, encode_8888);

load_stage!(load_bgra, PixelFormat::Bgra8888, decode_bgra);
load_dst_stage!(load_bgra_dst, PixelFormat::Bgra8888, decode_bgra);
gather_stage!(gather_bgra, PixelFormat::Bgra8888, decode_bgra);
store_stage!(store_bgra, PixelFormat::Bgra8888, encode_bgra);

load_stage!(load_rg88, PixelFormat::Rg88, decode_rg88);
load_dst_stage!(load_rg88_dst, PixelFormat::Rg88, decode_rg88);
gather_stage!(gather_rg88, PixelFormat::Rg88, decode_rg88);
store_stage!(store_rg88, PixelFormat::Rg88, encode_rg88);

pub(super) fn source_over_rgba_8888(p: &mut Pipeline, ctx: &MemoryCtx) {
    source_over_8888(p, ctx, decode_8888, encode_8888);
}

pub(super) fn source_over_bgra_8888(p: &mut Pipeline, ctx: &MemoryCtx) {
    source_over_8888(p, ctx, decode_bgra, encode_bgra);
}

// Fused load_dst, source_over and store.
#[inline(always)]
fn source_over_8888(
    p: &mut Pipeline,
    ctx: &MemoryCtx,
    decode: fn(&Chunk, usize) -> Rgba,
    encode: fn(&mut Chunk, usize, Rgba),
) {
    let bpp = PixelFormat::Rgba8888.bytes_per_pixel();
    let mut chunk = load_chunk(p, ctx, bpp);
    let (dr, dg, db, da) = decode(&chunk, bpp);
    p.dr = dr;
    p.dg = dg;
    p.db = db;
    p.da = da;

    let inv_a = inv(p.a);
    p.r = p.r + div255(p.dr * inv_a);
    p.g = p.g + div255(p.dg * inv_a);
    p.b = p.b + div255(p.db * inv_a);
    p.a = p.a + div255(p.da * inv_a);

    encode(&mut chunk, bpp, (p.r, p.g, p.b, p.a));
    store_chunk(p, ctx, bpp, &chunk);
}

#[inline(always)]
fn coverage_u8(p: &Pipeline, ctx: &MemoryCtx) -> u16x16 {
    let bpp = PixelFormat::A8.bytes_per_pixel();
    read_lanes(&load_chunk(p, ctx, bpp), bpp, 0, read_u8)
}

#[inline(always)]
fn coverage_565(p: &Pipeline, ctx: &MemoryCtx) -> Rgba {
    let bpp = PixelFormat::Rgb565.bytes_per_pixel();
    let (cr, cg, cb) = from_565(read_lanes(&load_chunk(p, ctx, bpp), bpp, 0, read_u16_le));
    let ca = p
        .a
        .cmp_lt(&p.da)
        .blend(cr.min(&cg).min(&cb), cr.max(&cg).max(&cb));
    (cr, cg, cb, ca)
}

pub(super) fn scale_u8(p: &mut Pipeline, ctx: &MemoryCtx) {
    let c = coverage_u8(p, ctx);
    p.r = div255(p.r * c);
    p.g = div255(p.g * c);
    p.b = div255(p.b * c);
    p.a = div255(p.a * c);
}

pub(super) fn lerp_u8(p: &mut Pipeline, ctx: &MemoryCtx) {
    let c = coverage_u8(p, ctx);
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);
}

pub(super) fn scale_565(p: &mut Pipeline, ctx: &MemoryCtx) {
    let (cr, cg, cb, ca) = coverage_565(p, ctx);
    p.r = div255(p.r * cr);
    p.g = div255(p.g * cg);
    p.b = div255(p.b * cb);
    p.a = div255(p.a * ca);
}

pub(super) fn lerp_565(p: &mut Pipeline, ctx: &MemoryCtx) {
    let (cr, cg, cb, ca) = coverage_565(p, ctx);
    p.r = lerp(p.dr, p.r, cr);
    p.g = lerp(p.dg, p.g, cg);
    p.b = lerp(p.db, p.b, cb);
    p.a = lerp(p.da, p.a, ca);
}

/// A fused bilinear sampler for clamped `Rgba8888` images.
pub(super) fn bilerp_clamp_8888(p: &mut Pipeline, ctx: &GatherCtx) {
    // (cx,cy) are the center of our sample.
    let cx: [f32; STAGE_WIDTH] = p.x().into();
    let cy: [f32; STAGE_WIDTH] = p.y().into();

    // All sample points are at the same fractional offset (fx,fy).
    let fract = |v: f32| {
        let v = v + 0.5;
        v - v.floor()
    };

    let mut fx = [0.0; STAGE_WIDTH];
    let mut fy = [0.0; STAGE_WIDTH];
    for i in 0..STAGE_WIDTH {
        fx[i] = fract(cx[i]);
        fy[i] = fract(cy[i]);
    }

    // The first three sample points calculate their area like the float code does,
    // but the fourth one takes all the rest. This way opaque stays opaque.
    // We can keep up to 8 bits of fractional precision without overflowing 16-bit,
    // so our "1.0" area is 256.
    const BIAS: u16 = 256;
    let mut remaining = u16x16::splat(BIAS);

    let bpp = PixelFormat::Rgba8888.bytes_per_pixel();
    let (mut r, mut g, mut b, mut a) = (u16x16::default(), u16x16::default(), u16x16::default(), u16x16::default());
    for &dy in &[-0.5f32, 0.5] {
        for &dx in &[-0.5f32, 0.5] {
            let mut x = [0.0; STAGE_WIDTH];
            let mut y = [0.0; STAGE_WIDTH];
            let mut area = u16x16::default();
            for i in 0..STAGE_WIDTH {
                x[i] = cx[i] + dx;
                y[i] = cy[i] + dy;

                // At positive offsets, the x-axis contribution is fx, or (1-fx) at negative x.
                let sx = if dx > 0.0 { fx[i] } else { 1.0 - fx[i] };
                let sy = if dy > 0.0 { fy[i] } else { 1.0 - fy[i] };
                area.0[i] = (sx * sy * f32::from(BIAS)) as u16;
            }

            if dx > 0.0 && dy > 0.0 {
                area = remaining;
            }
            remaining = remaining - area;

            // Every sample point is clamped to the image on its own.
            let ix = gather_ix(ctx, f32x16::from(x), f32x16::from(y));
            let (sr, sg, sb, sa) = decode_8888(&gather_chunk(ctx, &ix, bpp), bpp);
            r = r + sr * area;
            g = g + sg * area;
            b = b + sb * area;
            a = a + sa * area;
        }
    }

    let half = u16x16::splat(BIAS / 2);
    p.r = (r + half).shr(8);
    p.g = (g + half).shr(8);
    p.b = (b + half).shr(8);
    p.a = (a + half).shr(8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ChunkState;

    fn chunk(dx: usize, tail: usize) -> Pipeline {
        let mut p = Pipeline::default();
        p.reset(dx, 0, tail);
        p
    }

    #[test]
    fn expands_565_by_bit_replication() {
        let mut pixels = [0u8; 2 * STAGE_WIDTH];
        pixels[0..2].copy_from_slice(&0xFFFFu16.to_le_bytes());
        pixels[2..4].copy_from_slice(&0b10000_100000_10000u16.to_le_bytes());
        let ctx = MemoryCtx::new_read_only(&pixels, STAGE_WIDTH);

        let mut p = chunk(0, 0);
        load_565(&mut p, &ctx);
        assert_eq!(&p.r.0[..2], &[255, 132]);
        assert_eq!(&p.g.0[..2], &[255, 130]);
        assert_eq!(&p.b.0[..2], &[255, 132]);
        assert_eq!(p.a, u16x16::splat(255));
    }

    #[test]
    fn narrows_565_and_4444() {
        let mut pixels = [0u8; 2 * STAGE_WIDTH];
        let ctx = MemoryCtx::new(&mut pixels, STAGE_WIDTH);

        let mut p = chunk(0, 1);
        p.r = u16x16::splat(255);
        p.g = u16x16::splat(128);
        p.b = u16x16::splat(0);
        p.a = u16x16::splat(255);
        store_565(&mut p, &ctx);
        let mut out = [0u8; 2];
        ctx.read(0, 0, 2, &mut out);
        // r = 31, g = (128 * 21 + 42) / 85 = 32, b = 0
        assert_eq!(u16::from_le_bytes(out), 31 << 11 | 32 << 5);

        store_4444(&mut p, &ctx);
        ctx.read(0, 0, 2, &mut out);
        // (128 + 8) / 17 = 8
        assert_eq!(u16::from_le_bytes(out), 0xF80F);
    }

    #[test]
    fn tail_store_touches_live_pixels_only() {
        let mut pixels = [7u8; 4 * STAGE_WIDTH];
        {
            let ctx = MemoryCtx::new(&mut pixels, STAGE_WIDTH);
            let mut p = chunk(0, 3);
            p.r = u16x16::splat(1);
            p.g = u16x16::splat(2);
            p.b = u16x16::splat(3);
            p.a = u16x16::splat(4);
            store_bgra(&mut p, &ctx);
        }

        assert_eq!(&pixels[..12], &[3, 2, 1, 4, 3, 2, 1, 4, 3, 2, 1, 4]);
        assert!(pixels[12..].iter().all(|v| *v == 7));
    }

    #[test]
    fn source_over_opaque_replaces() {
        let mut pixels = [50u8; 4 * STAGE_WIDTH];
        let ctx = MemoryCtx::new(&mut pixels, STAGE_WIDTH);
        let mut p = chunk(0, 0);
        p.r = u16x16::splat(200);
        p.g = u16x16::splat(100);
        p.b = u16x16::splat(0);
        p.a = u16x16::splat(255);
        source_over_rgba_8888(&mut p, &ctx);

        let mut out = [0u8; 4];
        ctx.read(15, 0, 4, &mut out);
        assert_eq!(out, [200, 100, 0, 255]);
    }

    #[test]
    fn bilerp_weights_sum_to_one() {
        // Opaque pixels must stay opaque whatever the fraction.
        let pixels = [255u8; 4 * 4];
        let ctx = GatherCtx::new(&pixels, 2, 2, 2).unwrap();

        let mut x = [0.0; STAGE_WIDTH];
        for (i, v) in x.iter_mut().enumerate() {
            *v = i as f32 * 0.137;
        }

        let mut p = chunk(0, 0);
        p.set_x(&f32x16::from(x));
        p.set_y(&f32x16::splat(0.33));
        bilerp_clamp_8888(&mut p, &ctx);
        assert_eq!(p.a, u16x16::splat(255));
        assert_eq!(p.r, u16x16::splat(255));
    }

    #[test]
    fn gather_clamps_to_image() {
        // 2x2 image in a buffer with a stride of 3 pixels.
        let pixels = [1, 2, 99, 3, 4];
        let ctx = GatherCtx::new(&pixels, 3, 2, 2).unwrap();

        let mut x = [0.0; STAGE_WIDTH];
        let mut y = [0.0; STAGE_WIDTH];
        x[..4].copy_from_slice(&[-5.0, 1.5, 2.0, 100.0]);
        y[..4].copy_from_slice(&[0.0, 0.0, 1.0, 100.0]);

        let mut p = chunk(0, 0);
        p.set_x(&f32x16::from(x));
        p.set_y(&f32x16::from(y));
        gather_a8(&mut p, &ctx);
        assert_eq!(&p.a.0[..4], &[1, 2, 4, 4]);
    }
}
