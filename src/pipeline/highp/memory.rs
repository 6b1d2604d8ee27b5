// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Load, store and gather stages.
//!
//! Pixels are copied into a stack chunk first, so a tail never reads or writes
//! past the last live pixel. Inactive lanes of a loaded chunk are zero.

use crate::pipeline::{GatherCtx, MemoryCtx};
use crate::wide::{F32Lanes, I32Lanes, U32Lanes};
use crate::PixelFormat;

use super::{inv, lerp, mad, to_unorm, Pipeline};

// Enough for 8 RgbaF32 pixels.
const CHUNK_BYTES: usize = 16 * 8;

type Chunk = [u8; CHUNK_BYTES];

type Rgba<F> = (F, F, F, F);

#[inline(always)]
fn load_chunk<F: F32Lanes>(p: &Pipeline<F>, ctx: &MemoryCtx, bpp: usize) -> Chunk {
    let mut chunk = [0; CHUNK_BYTES];
    ctx.read(p.dx, p.dy, bpp, &mut chunk[..p.lanes() * bpp]);
    chunk
}

#[inline(always)]
fn store_chunk<F: F32Lanes>(p: &Pipeline<F>, ctx: &MemoryCtx, bpp: usize, chunk: &Chunk) {
    ctx.write(p.dx, p.dy, bpp, &chunk[..p.lanes() * bpp]);
}

#[inline(always)]
fn gather_chunk<F: F32Lanes>(ctx: &GatherCtx, ix: F::I32, bpp: usize) -> Chunk {
    let mut chunk = [0; CHUNK_BYTES];
    let ix = ix.to_array();
    for (i, index) in ix.as_ref().iter().enumerate() {
        chunk[i * bpp..(i + 1) * bpp].copy_from_slice(ctx.pixel(*index, bpp));
    }

    chunk
}

/// Turns coordinates into linear pixel indices, clamping them to the image.
#[inline(always)]
pub(super) fn gather_ix<F: F32Lanes>(ctx: &GatherCtx, x: F, y: F) -> F::I32 {
    let x = x.max(F::default()).min(F::splat(ctx.max_x()));
    let y = y.max(F::default()).min(F::splat(ctx.max_y()));

    y.trunc_int() * F::I32::splat(ctx.stride() as i32) + x.trunc_int()
}

/// Samples an `Rgba8888` image. Used by the fused samplers.
#[inline(always)]
pub(super) fn gather_8888_at<F: F32Lanes>(ctx: &GatherCtx, x: F, y: F) -> Rgba<F> {
    let bpp = PixelFormat::Rgba8888.bytes_per_pixel();
    let chunk = gather_chunk::<F>(ctx, gather_ix(ctx, x, y), bpp);
    decode_8888(&chunk, bpp)
}

#[inline(always)]
fn read_lanes<F: F32Lanes>(chunk: &Chunk, bpp: usize, offset: usize, f: impl Fn(&[u8]) -> u32) -> F::U32 {
    let mut v = <F::U32 as U32Lanes>::Array::default();
    for (i, lane) in v.as_mut().iter_mut().enumerate() {
        *lane = f(&chunk[i * bpp + offset..]);
    }

    F::U32::from_array(v)
}

#[inline(always)]
fn write_lanes<F: F32Lanes>(
    chunk: &mut Chunk,
    bpp: usize,
    offset: usize,
    v: F::U32,
    f: impl Fn(&mut [u8], u32),
) {
    let v = v.to_array();
    for (i, n) in v.as_ref().iter().enumerate() {
        f(&mut chunk[i * bpp + offset..], *n);
    }
}

fn read_u8(b: &[u8]) -> u32 {
    u32::from(b[0])
}

fn read_u16_le(b: &[u8]) -> u32 {
    u32::from(u16::from_le_bytes(*arrayref::array_ref!(b, 0, 2)))
}

fn read_u16_be(b: &[u8]) -> u32 {
    u32::from(u16::from_be_bytes(*arrayref::array_ref!(b, 0, 2)))
}

fn read_u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes(*arrayref::array_ref!(b, 0, 4))
}

fn write_u8(b: &mut [u8], n: u32) {
    b[0] = n as u8;
}

fn write_u16_le(b: &mut [u8], n: u32) {
    *arrayref::array_mut_ref!(b, 0, 2) = (n as u16).to_le_bytes();
}

fn write_u16_be(b: &mut [u8], n: u32) {
    *arrayref::array_mut_ref!(b, 0, 2) = (n as u16).to_be_bytes();
}

fn write_u32_le(b: &mut [u8], n: u32) {
    *arrayref::array_mut_ref!(b, 0, 4) = n.to_le_bytes();
}

/// Converts lanes that are known to fit into 31 bits.
#[inline(always)]
fn cast<F: F32Lanes>(v: F::U32) -> F {
    v.to_i32_bitcast().to_f32()
}

#[inline(always)]
fn from_byte<F: F32Lanes>(v: F::U32) -> F {
    cast::<F>(v) * F::splat(1.0 / 255.0)
}

#[inline(always)]
fn from_short<F: F32Lanes>(v: F::U32) -> F {
    cast::<F>(v) * F::splat(1.0 / 65535.0)
}

#[inline(always)]
fn bits<F: F32Lanes>(px: F::U32, shift: u32, mask: u32) -> F::U32 {
    px.shr(shift) & F::U32::splat(mask)
}

#[inline(always)]
fn from_half<F: F32Lanes>(h: F::U32) -> F {
    // Remember, a half is 1-5-10 (sign-exponent-mantissa) with 15 exponent bias.
    let s = h & F::U32::splat(0x8000);
    let em = h ^ s;

    // Convert to 1-8-23 float with 127 bias, flushing denorm halfs (including zero) to zero.
    let is_denorm = em.to_i32_bitcast().cmp_lt(F::I32::splat(0x0400));
    let f = s.shl(16) + em.shl(13) + F::U32::splat((127 - 15) << 23);
    is_denorm.blend(F::I32::default(), f.to_i32_bitcast()).to_f32_bitcast()
}

#[inline(always)]
fn to_half<F: F32Lanes>(f: F) -> F::U32 {
    // Remember, a float is 1-8-23 (sign-exponent-mantissa) with 127 exponent bias.
    let sem = f.to_u32_bitcast();
    let s = sem & F::U32::splat(0x8000_0000);
    let em = sem ^ s;

    // Convert to 1-5-10 half with 15 bias, flushing denorm halfs (including zero) to zero.
    // The mantissa is truncated.
    let is_denorm = em.to_i32_bitcast().cmp_lt(F::I32::splat(0x3880_0000));
    let h = s.shr(16) + em.shr(13) - F::U32::splat((127 - 15) << 10);
    is_denorm.blend(F::I32::default(), h.to_i32_bitcast()).to_u32_bitcast()
}

fn decode_a8<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let a = from_byte(read_lanes::<F>(chunk, bpp, 0, read_u8));
    (F::default(), F::default(), F::default(), a)
}

fn decode_g8<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let g = from_byte(read_lanes::<F>(chunk, bpp, 0, read_u8));
    (g, g, g, F::splat(1.0))
}

#[inline(always)]
fn from_565<F: F32Lanes>(px: F::U32) -> (F, F, F) {
    let r = cast::<F>(px & F::U32::splat(31 << 11)) * F::splat(1.0 / (31 << 11) as f32);
    let g = cast::<F>(px & F::U32::splat(63 << 5)) * F::splat(1.0 / (63 << 5) as f32);
    let b = cast::<F>(px & F::U32::splat(31)) * F::splat(1.0 / 31.0);
    (r, g, b)
}

fn decode_565<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let (r, g, b) = from_565(read_lanes::<F>(chunk, bpp, 0, read_u16_le));
    (r, g, b, F::splat(1.0))
}

fn decode_4444<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let px = read_lanes::<F>(chunk, bpp, 0, read_u16_le);
    let channel = |shift: u32| {
        cast::<F>(px & F::U32::splat(15 << shift)) * F::splat(1.0 / (15 << shift) as f32)
    };

    (channel(12), channel(8), channel(4), channel(0))
}

fn decode_8888<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let px = read_lanes::<F>(chunk, bpp, 0, read_u32_le);
    (
        from_byte(bits::<F>(px, 0, 0xff)),
        from_byte(bits::<F>(px, 8, 0xff)),
        from_byte(bits::<F>(px, 16, 0xff)),
        from_byte(px.shr(24)),
    )
}

fn decode_bgra<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let (b, g, r, a) = decode_8888(chunk, bpp);
    (r, g, b, a)
}

fn decode_1010102<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let px = read_lanes::<F>(chunk, bpp, 0, read_u32_le);
    let s = F::splat(1.0 / 1023.0);
    (
        cast::<F>(bits::<F>(px, 0, 0x3ff)) * s,
        cast::<F>(bits::<F>(px, 10, 0x3ff)) * s,
        cast::<F>(bits::<F>(px, 20, 0x3ff)) * s,
        cast::<F>(px.shr(30)) * F::splat(1.0 / 3.0),
    )
}

fn decode_rg88<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let px = read_lanes::<F>(chunk, bpp, 0, read_u16_le);
    (
        from_byte(bits::<F>(px, 0, 0xff)),
        from_byte(px.shr(8)),
        F::default(),
        F::splat(1.0),
    )
}

fn decode_rg1616<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    (
        from_short(read_lanes::<F>(chunk, bpp, 0, read_u16_le)),
        from_short(read_lanes::<F>(chunk, bpp, 2, read_u16_le)),
        F::default(),
        F::splat(1.0),
    )
}

fn decode_16161616<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let channel = |i: usize| from_short(read_lanes::<F>(chunk, bpp, i * 2, read_u16_le));
    (channel(0), channel(1), channel(2), channel(3))
}

fn decode_u16_be<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let channel = |i: usize| from_short(read_lanes::<F>(chunk, bpp, i * 2, read_u16_be));
    (channel(0), channel(1), channel(2), channel(3))
}

fn decode_rgb_u16_be<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let channel = |i: usize| from_short(read_lanes::<F>(chunk, bpp, i * 2, read_u16_be));
    (channel(0), channel(1), channel(2), F::splat(1.0))
}

fn decode_f16<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let channel = |i: usize| from_half(read_lanes::<F>(chunk, bpp, i * 2, read_u16_le));
    (channel(0), channel(1), channel(2), channel(3))
}

fn decode_f32<F: F32Lanes>(chunk: &Chunk, bpp: usize) -> Rgba<F> {
    let channel = |i: usize| read_lanes::<F>(chunk, bpp, i * 4, read_u32_le).to_f32_bitcast();
    (channel(0), channel(1), channel(2), channel(3))
}

#[inline(always)]
fn unorm<F: F32Lanes>(v: F, scale: f32) -> F::U32 {
    to_unorm(v, scale).to_u32_bitcast()
}

fn encode_a8<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (_, _, _, a): Rgba<F>) {
    write_lanes::<F>(chunk, bpp, 0, unorm(a, 255.0), write_u8);
}

fn encode_565<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, _): Rgba<F>) {
    let px = unorm(r, 31.0).shl(11) | unorm(g, 63.0).shl(5) | unorm(b, 31.0);
    write_lanes::<F>(chunk, bpp, 0, px, write_u16_le);
}

fn encode_4444<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    let px = unorm(r, 15.0).shl(12) | unorm(g, 15.0).shl(8) | unorm(b, 15.0).shl(4) | unorm(a, 15.0);
    write_lanes::<F>(chunk, bpp, 0, px, write_u16_le);
}

fn encode_8888<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    let px = unorm(r, 255.0) | unorm(g, 255.0).shl(8) | unorm(b, 255.0).shl(16) | unorm(a, 255.0).shl(24);
    write_lanes::<F>(chunk, bpp, 0, px, write_u32_le);
}

fn encode_bgra<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    encode_8888(chunk, bpp, (b, g, r, a));
}

fn encode_1010102<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    let px = unorm(r, 1023.0)
        | unorm(g, 1023.0).shl(10)
        | unorm(b, 1023.0).shl(20)
        | unorm(a, 3.0).shl(30);
    write_lanes::<F>(chunk, bpp, 0, px, write_u32_le);
}

fn encode_rg88<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, _, _): Rgba<F>) {
    let px = unorm(r, 255.0) | unorm(g, 255.0).shl(8);
    write_lanes::<F>(chunk, bpp, 0, px, write_u16_le);
}

fn encode_rg1616<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, _, _): Rgba<F>) {
    write_lanes::<F>(chunk, bpp, 0, unorm(r, 65535.0), write_u16_le);
    write_lanes::<F>(chunk, bpp, 2, unorm(g, 65535.0), write_u16_le);
}

fn encode_16161616<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    for (i, c) in [r, g, b, a].iter().enumerate() {
        write_lanes::<F>(chunk, bpp, i * 2, unorm(*c, 65535.0), write_u16_le);
    }
}

fn encode_u16_be<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    for (i, c) in [r, g, b, a].iter().enumerate() {
        write_lanes::<F>(chunk, bpp, i * 2, unorm(*c, 65535.0), write_u16_be);
    }
}

fn encode_f16<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    for (i, c) in [r, g, b, a].iter().enumerate() {
        write_lanes::<F>(chunk, bpp, i * 2, to_half(*c), write_u16_le);
    }
}

fn encode_f32<F: F32Lanes>(chunk: &mut Chunk, bpp: usize, (r, g, b, a): Rgba<F>) {
    for (i, c) in [r, g, b, a].iter().enumerate() {
        write_lanes::<F>(chunk, bpp, i * 4, c.to_u32_bitcast(), write_u32_le);
    }
}

macro_rules! load_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let chunk = load_chunk(p, ctx, bpp);
            let (r, g, b, a) = $decode::<F>(&chunk, bpp);
            p.r = r;
            p.g = g;
            p.b = b;
            p.a = a;
        }
    };
}

macro_rules! load_dst_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let chunk = load_chunk(p, ctx, bpp);
            let (r, g, b, a) = $decode::<F>(&chunk, bpp);
            p.dr = r;
            p.dg = g;
            p.db = b;
            p.da = a;
        }
    };
}

macro_rules! gather_stage {
    ($name:ident, $format:expr, $decode:ident) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &GatherCtx) {
            let bpp = $format.bytes_per_pixel();
            let ix = gather_ix(ctx, p.r, p.g);
            let chunk = gather_chunk::<F>(ctx, ix, bpp);
            let (r, g, b, a) = $decode::<F>(&chunk, bpp);
            p.r = r;
            p.g = g;
            p.b = b;
            p.a = a;
        }
    };
}

macro_rules! store_stage {
    ($name:ident, $format:expr, $encode:ident) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
            let bpp = $format.bytes_per_pixel();
            let mut chunk = [0; CHUNK_BYTES];
            $encode::<F>(&mut chunk, bpp, (p.r, p.g, p.b, p.a));
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

load_stage!(load_1010102, PixelFormat::Rgba1010102, decode_1010102);
load_dst_stage!(load_1010102_dst, PixelFormat::Rgba1010102, decode_1010102);
gather_stage!(gather_1010102, PixelFormat::Rgba1010102, decode_1010102);
store_stage!(store_1010102, PixelFormat::Rgba1010102, encode_1010102);

load_stage!(load_rg88, PixelFormat::Rg88, decode_rg88);
load_dst_stage!(load_rg88_dst, PixelFormat::Rg88, decode_rg88);
gather_stage!(gather_rg88, PixelFormat::Rg88, decode_rg88);
store_stage!(store_rg88, PixelFormat::Rg88, encode_rg88);

load_stage!(load_rg1616, PixelFormat::Rg1616, decode_rg1616);
load_dst_stage!(load_rg1616_dst, PixelFormat::Rg1616, decode_rg1616);
gather_stage!(gather_rg1616, PixelFormat::Rg1616, decode_rg1616);
store_stage!(store_rg1616, PixelFormat::Rg1616, encode_rg1616);

load_stage!(load_16161616, PixelFormat::Rgba16161616, decode_16161616);
load_dst_stage!(load_16161616_dst, PixelFormat::Rgba16161616, decode_16161616);
gather_stage!(gather_16161616, PixelFormat::Rgba16161616, decode_16161616);
store_stage!(store_16161616, PixelFormat::Rgba16161616, encode_16161616);

load_stage!(load_u16_be, PixelFormat::RgbaU16Be, decode_u16_be);
store_stage!(store_u16_be, PixelFormat::RgbaU16Be, encode_u16_be);
load_stage!(load_rgb_u16_be, PixelFormat::RgbU16Be, decode_rgb_u16_be);

load_stage!(load_f16, PixelFormat::RgbaF16, decode_f16);
load_dst_stage!(load_f16_dst, PixelFormat::RgbaF16, decode_f16);
gather_stage!(gather_f16, PixelFormat::RgbaF16, decode_f16);
store_stage!(store_f16, PixelFormat::RgbaF16, encode_f16);

load_stage!(load_f32, PixelFormat::RgbaF32, decode_f32);
load_dst_stage!(load_f32_dst, PixelFormat::RgbaF32, decode_f32);
gather_stage!(gather_f32, PixelFormat::RgbaF32, decode_f32);
store_stage!(store_f32, PixelFormat::RgbaF32, encode_f32);

pub(super) fn source_over_rgba_8888<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    source_over_8888(p, ctx, false);
}

pub(super) fn source_over_bgra_8888<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    source_over_8888(p, ctx, true);
}

// Fused load_dst, source_over and store.
//
// Destination channels stay in a 0..255 range afterwards.
#[inline(always)]
fn source_over_8888<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx, bgra: bool) {
    let bpp = PixelFormat::Rgba8888.bytes_per_pixel();
    let mut chunk = load_chunk(p, ctx, bpp);
    let px = read_lanes::<F>(&chunk, bpp, 0, read_u32_le);
    p.dr = cast::<F>(bits::<F>(px, 0, 0xff));
    p.dg = cast::<F>(bits::<F>(px, 8, 0xff));
    p.db = cast::<F>(bits::<F>(px, 16, 0xff));
    p.da = cast::<F>(px.shr(24));
    if bgra {
        core::mem::swap(&mut p.dr, &mut p.db);
    }

    let k = F::splat(255.0);
    let inv_a = inv(p.a);
    p.r = mad(p.dr, inv_a, p.r * k);
    p.g = mad(p.dg, inv_a, p.g * k);
    p.b = mad(p.db, inv_a, p.b * k);
    p.a = mad(p.da, inv_a, p.a * k);

    // Values are already scaled, so clamp to 255 and round.
    let round = |v: F| (v.max(F::default()).min(k) + F::splat(0.5)).trunc_int().to_u32_bitcast();
    let (r, b) = if bgra { (p.b, p.r) } else { (p.r, p.b) };
    let px = round(r) | round(p.g).shl(8) | round(b).shl(16) | round(p.a).shl(24);
    write_lanes::<F>(&mut chunk, bpp, 0, px, write_u32_le);
    store_chunk(p, ctx, bpp, &chunk);
}

#[inline(always)]
fn coverage_u8<F: F32Lanes>(p: &Pipeline<F>, ctx: &MemoryCtx) -> F {
    let bpp = PixelFormat::A8.bytes_per_pixel();
    from_byte(read_lanes::<F>(&load_chunk(p, ctx, bpp), bpp, 0, read_u8))
}

#[inline(always)]
fn coverage_565<F: F32Lanes>(p: &Pipeline<F>, ctx: &MemoryCtx) -> Rgba<F> {
    let bpp = PixelFormat::Rgb565.bytes_per_pixel();
    let px = read_lanes::<F>(&load_chunk(p, ctx, bpp), bpp, 0, read_u16_le);
    let (cr, cg, cb) = from_565::<F>(px);
    let ca = alpha_coverage_from_rgb_coverage(p.a, p.da, cr, cg, cb);
    (cr, cg, cb, ca)
}

#[inline(always)]
fn alpha_coverage_from_rgb_coverage<F: F32Lanes>(a: F, da: F, cr: F, cg: F, cb: F) -> F {
    a.cmp_lt(da).blend(cr.min(cg).min(cb), cr.max(cg).max(cb))
}

pub(super) fn scale_u8<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    let c = coverage_u8(p, ctx);
    p.r *= c;
    p.g *= c;
    p.b *= c;
    p.a *= c;
}

pub(super) fn lerp_u8<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    let c = coverage_u8(p, ctx);
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);
}

pub(super) fn scale_565<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    let (cr, cg, cb, ca) = coverage_565(p, ctx);
    p.r *= cr;
    p.g *= cg;
    p.b *= cb;
    p.a *= ca;
}

pub(super) fn lerp_565<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &MemoryCtx) {
    let (cr, cg, cb, ca) = coverage_565(p, ctx);
    p.r = lerp(p.dr, p.r, cr);
    p.g = lerp(p.dg, p.g, cg);
    p.b = lerp(p.db, p.b, cb);
    p.a = lerp(p.da, p.a, ca);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ChunkState;
    use crate::wide::f32x4;

    #[test]
    fn half_conversion_matches_half_crate() {
        let values = [0.0f32, 1.0, -2.5, 0.333251953125];
        let h = to_half(<f32x4 as F32Lanes>::from_array(values)).to_array();
        for (v, h) in values.iter().zip(h.iter()) {
            assert_eq!(*h as u16, half::f16::from_f32(*v).to_bits());
        }

        let bits = [0x3c00u32, 0xc100, 0x7bff, 0x0001];
        let f: f32x4 = from_half(<f32x4 as F32Lanes>::U32::from_array(bits));
        assert_eq!(f.to_array(), [1.0, -2.5, 65504.0, 0.0]); // denorms are flushed
    }

    #[test]
    fn gather_index_is_clamped() {
        let pixels = [0u8; 4 * 6];
        let ctx = GatherCtx::new(&pixels, 3, 2, 2).unwrap();
        let x = f32x4::from([-1.0, 0.5, 1.99, 100.0]);
        let y = f32x4::from([0.0, 1.5, f32::NAN, 2.0]);
        assert_eq!(gather_ix(&ctx, x, y).to_array(), [0, 3, 1, 4]);
    }

    #[test]
    fn tail_store_touches_live_pixels_only() {
        let mut pixels = [0xAAu8; 4 * 4];
        let ctx = MemoryCtx::new(&mut pixels, 4);
        let mut p = Pipeline::<f32x4>::default();
        p.reset(1, 0, 2);
        p.r = f32x4::splat(1.0);
        p.a = f32x4::splat(1.0);
        store_8888(&mut p, &ctx);
        assert_eq!(
            pixels,
            [
                0xAA, 0xAA, 0xAA, 0xAA,
                255, 0, 0, 255,
                255, 0, 0, 255,
                0xAA, 0xAA, 0xAA, 0xAA,
            ]
        );
    }

    #[test]
    fn rgb565_channels() {
        let mut p = Pipeline::<f32x4>::default();
        let pixels = [0x1F, 0x00, 0xE0, 0x07, 0x00, 0xF8, 0xFF, 0xFF];
        let ctx = MemoryCtx::new_read_only(&pixels, 4);
        p.reset(0, 0, 0);
        let mut chunk = [0; CHUNK_BYTES];
        chunk[..8].copy_from_slice(&pixels);
        let (r, g, b, a): Rgba<f32x4> = super::decode_565(&chunk, 2);
        assert_eq!(r.to_array(), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(g.to_array(), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(b.to_array(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.to_array(), [1.0; 4]);

        // The same through the stage.
        load_565(&mut p, &ctx);
        assert_eq!(p.r.to_array(), [0.0, 0.0, 1.0, 1.0]);
    }
}
