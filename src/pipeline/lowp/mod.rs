// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
A low precision raster pipeline implementation.

A lowp pipeline uses u16 instead of f32 for math.
Colors are stored in a 0..=255 range and every product is divided by 255 with `div255`.
Because of that, it doesn't implement stages that require high precision.
The pipeline compiler will automatically decide which one to use.

Skia uses u16x8 (128bit) types for a generic CPU and u16x16 (256bit) for modern x86 CPUs.
We are using scalar u16x16 everywhere and relying on rustc/llvm auto vectorization instead,
with explicit Neon calls for the hot arithmetic on AArch64.

Coordinates are still floats. An `f32x16` doesn't fit into a single u16x16 register,
so x is stored bit-for-bit in `r` and `g`, and y in `b` and `a`.
*/

use crate::pipeline::{
    EvenlySpaced2StopGradientCtx, GradientColor, GradientCtx, Stage, StageFn, TileCtx,
    UniformColorCtx, ChunkState, STAGES_COUNT,
};
use crate::wide::{f32x16, f32x8, u16x16};

mod memory;

pub(crate) const STAGE_WIDTH: usize = 16;

#[derive(Default, Debug)]
pub(crate) struct Pipeline {
    r: u16x16,
    g: u16x16,
    b: u16x16,
    a: u16x16,
    dr: u16x16,
    dg: u16x16,
    db: u16x16,
    da: u16x16,

    dx: usize,
    dy: usize,
    tail: usize,
}

impl ChunkState for Pipeline {
    const WIDTH: usize = STAGE_WIDTH;

    #[inline(always)]
    fn reset(&mut self, dx: usize, dy: usize, tail: usize) {
        *self = Pipeline {
            dx,
            dy,
            tail,
            ..Pipeline::default()
        };
    }
}

impl Pipeline {
    /// Number of live pixels in the current chunk.
    #[inline(always)]
    fn lanes(&self) -> usize {
        if self.tail == 0 {
            STAGE_WIDTH
        } else {
            self.tail
        }
    }

    #[inline(always)]
    fn x(&self) -> f32x16 {
        join(&self.r, &self.g)
    }

    #[inline(always)]
    fn y(&self) -> f32x16 {
        join(&self.b, &self.a)
    }

    #[inline(always)]
    fn set_x(&mut self, x: &f32x16) {
        split(x, &mut self.r, &mut self.g);
    }

    #[inline(always)]
    fn set_y(&mut self, y: &f32x16) {
        split(y, &mut self.b, &mut self.a);
    }
}

pub(crate) const fn stages_table() -> [StageFn<Pipeline>; STAGES_COUNT] {
    let mut table = [StageFn::Unsupported; STAGES_COUNT];
    let mut i = 0;
    while i < STAGES_COUNT {
        table[i] = stage_fn(Stage::ALL[i]);
        i += 1;
    }

    table
}

const fn stage_fn(stage: Stage) -> StageFn<Pipeline> {
    use StageFn::{Memory, Gather, Value, Matrix};

    match stage {
        Stage::SeedShader => StageFn::None(seed_shader),
        Stage::UniformColor => StageFn::UniformColor(uniform_color),
        Stage::BlackColor => StageFn::None(black_color),
        Stage::WhiteColor => StageFn::None(white_color),

        Stage::LoadA8 => Memory(memory::load_a8),
        Stage::LoadA8Dst => Memory(memory::load_a8_dst),
        Stage::GatherA8 => Gather(memory::gather_a8),
        Stage::StoreA8 => Memory(memory::store_a8),
        Stage::LoadG8 => Memory(memory::load_g8),
        Stage::LoadG8Dst => Memory(memory::load_g8_dst),
        Stage::GatherG8 => Gather(memory::gather_g8),
        Stage::Load565 => Memory(memory::load_565),
        Stage::Load565Dst => Memory(memory::load_565_dst),
        Stage::Gather565 => Gather(memory::gather_565),
        Stage::Store565 => Memory(memory::store_565),
        Stage::Load4444 => Memory(memory::load_4444),
        Stage::Load4444Dst => Memory(memory::load_4444_dst),
        Stage::Gather4444 => Gather(memory::gather_4444),
        Stage::Store4444 => Memory(memory::store_4444),
        Stage::Load8888 => Memory(memory::load_8888),
        Stage::Load8888Dst => Memory(memory::load_8888_dst),
        Stage::Gather8888 => Gather(memory::gather_8888),
        Stage::Store8888 => Memory(memory::store_8888),
        Stage::LoadBgra => Memory(memory::load_bgra),
        Stage::LoadBgraDst => Memory(memory::load_bgra_dst),
        Stage::GatherBgra => Gather(memory::gather_bgra),
        Stage::StoreBgra => Memory(memory::store_bgra),
        Stage::LoadRg88 => Memory(memory::load_rg88),
        Stage::LoadRg88Dst => Memory(memory::load_rg88_dst),
        Stage::GatherRg88 => Gather(memory::gather_rg88),
        Stage::StoreRg88 => Memory(memory::store_rg88),
        Stage::SourceOverRgba8888 => Memory(memory::source_over_rgba_8888),
        Stage::SourceOverBgra8888 => Memory(memory::source_over_bgra_8888),

        Stage::MoveSourceToDestination => StageFn::None(move_source_to_destination),
        Stage::MoveDestinationToSource => StageFn::None(move_destination_to_source),
        Stage::SwapRb => StageFn::None(swap_rb),
        Stage::Invert => StageFn::None(invert),
        // Unsigned and already in a 0..=255 range.
        Stage::Clamp0 => StageFn::None(noop),
        Stage::Clamp1 => StageFn::None(noop),
        Stage::ClampA => StageFn::None(clamp_a),
        Stage::ClampADst => StageFn::None(clamp_a_dst),
        Stage::Premultiply => StageFn::None(premultiply),
        Stage::PremultiplyDst => StageFn::None(premultiply_dst),
        Stage::ForceOpaque => StageFn::None(force_opaque),
        Stage::ForceOpaqueDst => StageFn::None(force_opaque_dst),
        Stage::LuminanceToAlpha => StageFn::None(luminance_to_alpha),

        Stage::Scale1Float => Value(scale_1_float),
        Stage::ScaleU8 => Memory(memory::scale_u8),
        Stage::Scale565 => Memory(memory::scale_565),
        Stage::Lerp1Float => Value(lerp_1_float),
        Stage::LerpU8 => Memory(memory::lerp_u8),
        Stage::Lerp565 => Memory(memory::lerp_565),

        Stage::Clear => StageFn::None(clear),
        Stage::Source => StageFn::None(noop),
        Stage::Destination => StageFn::None(move_destination_to_source),
        Stage::SourceOver => StageFn::None(source_over),
        Stage::DestinationOver => StageFn::None(destination_over),
        Stage::SourceIn => StageFn::None(source_in),
        Stage::DestinationIn => StageFn::None(destination_in),
        Stage::SourceOut => StageFn::None(source_out),
        Stage::DestinationOut => StageFn::None(destination_out),
        Stage::SourceAtop => StageFn::None(source_atop),
        Stage::DestinationAtop => StageFn::None(destination_atop),
        Stage::Xor => StageFn::None(xor),
        Stage::Plus => StageFn::None(plus),
        Stage::Modulate => StageFn::None(modulate),
        Stage::Screen => StageFn::None(screen),
        Stage::Overlay => StageFn::None(overlay),
        Stage::Darken => StageFn::None(darken),
        Stage::Lighten => StageFn::None(lighten),
        Stage::HardLight => StageFn::None(hard_light),
        Stage::Difference => StageFn::None(difference),
        Stage::Exclusion => StageFn::None(exclusion),
        Stage::Multiply => StageFn::None(multiply),

        Stage::MatrixTranslate => Matrix(matrix_translate),
        Stage::MatrixScaleTranslate => Matrix(matrix_scale_translate),
        Stage::Matrix2x3 => Matrix(matrix_2x3),
        Stage::MatrixPerspective => Matrix(matrix_perspective),

        Stage::RepeatX => StageFn::Tile(repeat_x),
        Stage::RepeatY => StageFn::Tile(repeat_y),
        Stage::ClampX1 => StageFn::None(clamp_x_1),
        Stage::RepeatX1 => StageFn::None(repeat_x_1),
        Stage::MirrorX1 => StageFn::None(mirror_x_1),

        Stage::EvenlySpacedGradient => StageFn::Gradient(evenly_spaced_gradient),
        Stage::Gradient => StageFn::Gradient(gradient),
        Stage::EvenlySpaced2StopGradient => {
            StageFn::TwoStopGradient(evenly_spaced_2_stop_gradient)
        }
        Stage::XyToRadius => StageFn::None(xy_to_radius),

        Stage::BilerpClamp8888 => Gather(memory::bilerp_clamp_8888),

        _ => StageFn::Unsupported,
    }
}

fn noop(_: &mut Pipeline) {}

fn seed_shader(p: &mut Pipeline) {
    let iota = f32x16(
        f32x8::from([0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5]),
        f32x8::from([8.5, 9.5, 10.5, 11.5, 12.5, 13.5, 14.5, 15.5]),
    );

    let x = f32x16::splat(p.dx as f32) + iota;
    let y = f32x16::splat(p.dy as f32 + 0.5);
    p.set_x(&x);
    p.set_y(&y);

    p.dr = u16x16::default();
    p.dg = u16x16::default();
    p.db = u16x16::default();
    p.da = u16x16::default();
}

fn uniform_color(p: &mut Pipeline, ctx: &UniformColorCtx) {
    p.r = u16x16::splat(ctx.rgba[0]);
    p.g = u16x16::splat(ctx.rgba[1]);
    p.b = u16x16::splat(ctx.rgba[2]);
    p.a = u16x16::splat(ctx.rgba[3]);
}

fn black_color(p: &mut Pipeline) {
    p.r = u16x16::splat(0);
    p.g = u16x16::splat(0);
    p.b = u16x16::splat(0);
    p.a = u16x16::splat(255);
}

fn white_color(p: &mut Pipeline) {
    p.r = u16x16::splat(255);
    p.g = u16x16::splat(255);
    p.b = u16x16::splat(255);
    p.a = u16x16::splat(255);
}

fn move_source_to_destination(p: &mut Pipeline) {
    p.dr = p.r;
    p.dg = p.g;
    p.db = p.b;
    p.da = p.a;
}

fn move_destination_to_source(p: &mut Pipeline) {
    p.r = p.dr;
    p.g = p.dg;
    p.b = p.db;
    p.a = p.da;
}

fn swap_rb(p: &mut Pipeline) {
    core::mem::swap(&mut p.r, &mut p.b);
}

fn invert(p: &mut Pipeline) {
    p.r = inv(p.r);
    p.g = inv(p.g);
    p.b = inv(p.b);
    p.a = inv(p.a);
}

fn clamp_a(p: &mut Pipeline) {
    p.r = p.r.min(&p.a);
    p.g = p.g.min(&p.a);
    p.b = p.b.min(&p.a);
}

fn clamp_a_dst(p: &mut Pipeline) {
    p.dr = p.dr.min(&p.da);
    p.dg = p.dg.min(&p.da);
    p.db = p.db.min(&p.da);
}

fn premultiply(p: &mut Pipeline) {
    p.r = div255(p.r * p.a);
    p.g = div255(p.g * p.a);
    p.b = div255(p.b * p.a);
}

fn premultiply_dst(p: &mut Pipeline) {
    p.dr = div255(p.dr * p.da);
    p.dg = div255(p.dg * p.da);
    p.db = div255(p.db * p.da);
}

fn force_opaque(p: &mut Pipeline) {
    p.a = u16x16::splat(255);
}

fn force_opaque_dst(p: &mut Pipeline) {
    p.da = u16x16::splat(255);
}

fn luminance_to_alpha(p: &mut Pipeline) {
    // 54 + 183 + 19 == 256
    p.a = (p.r * u16x16::splat(54) + p.g * u16x16::splat(183) + p.b * u16x16::splat(19)).shr(8);
    p.r = u16x16::splat(0);
    p.g = u16x16::splat(0);
    p.b = u16x16::splat(0);
}

fn scale_1_float(p: &mut Pipeline, c: f32) {
    let c = from_float(c);
    p.r = div255(p.r * c);
    p.g = div255(p.g * c);
    p.b = div255(p.b * c);
    p.a = div255(p.a * c);
}

fn lerp_1_float(p: &mut Pipeline, c: f32) {
    let c = from_float(c);
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);
}

macro_rules! blend_fn {
    ($name:ident, $f:expr) => {
        fn $name(p: &mut Pipeline) {
            p.r = $f(p.r, p.dr, p.a, p.da);
            p.g = $f(p.g, p.dg, p.a, p.da);
            p.b = $f(p.b, p.db, p.a, p.da);
            p.a = $f(p.a, p.da, p.a, p.da);
        }
    };
}

blend_fn!(clear,            |_, _,  _,  _| u16x16::splat(0));
blend_fn!(source_atop,      |s, d, sa, da| div255(s * da + d * inv(sa)));
blend_fn!(destination_atop, |s, d, sa, da| div255(d * sa + s * inv(da)));
blend_fn!(source_in,        |s, _,  _, da| div255(s * da));
blend_fn!(destination_in,   |_, d, sa,  _| div255(d * sa));
blend_fn!(source_out,       |s, _,  _, da| div255(s * inv(da)));
blend_fn!(destination_out,  |_, d, sa,  _| div255(d * inv(sa)));
blend_fn!(source_over,      |s, d, sa,  _| s + div255(d * inv(sa)));
blend_fn!(destination_over, |s, d,  _, da| d + div255(s * inv(da)));
blend_fn!(modulate,         |s, d,  _,  _| div255(s * d));
blend_fn!(multiply,         |s, d, sa, da| div255(s * inv(da) + d * inv(sa) + s * d));
blend_fn!(screen,           |s, d,  _,  _| s + d - div255(s * d));
blend_fn!(xor,              |s, d, sa, da| div255(s * inv(da) + d * inv(sa)));

// Wants a type for some reason.
blend_fn!(plus, |s: u16x16, d, _, _| (s + d).min(&u16x16::splat(255)));

macro_rules! blend_fn2 {
    ($name:ident, $f:expr) => {
        fn $name(p: &mut Pipeline) {
            // The same logic applied to color, and source_over for alpha.
            p.r = $f(p.r, p.dr, p.a, p.da);
            p.g = $f(p.g, p.dg, p.a, p.da);
            p.b = $f(p.b, p.db, p.a, p.da);
            p.a = p.a + div255(p.da * inv(p.a));
        }
    };
}

blend_fn2!(darken,      |s: u16x16, d, sa, da| s + d - div255((s * da).max(&(d * sa))));
blend_fn2!(lighten,     |s: u16x16, d, sa, da| s + d - div255((s * da).min(&(d * sa))));
blend_fn2!(exclusion,   |s: u16x16, d,  _,  _| s + d - u16x16::splat(2) * div255(s * d));

blend_fn2!(difference,  |s: u16x16, d, sa, da|
    s + d - u16x16::splat(2) * div255((s * da).min(&(d * sa))));

// Intermediate products may wrap around, but the sum is always back in range.
blend_fn2!(hard_light, |s: u16x16, d: u16x16, sa, da| {
    div255(s * inv(da) + d * inv(sa)
        + (s + s).cmp_le(&sa).blend(
            u16x16::splat(2) * s * d,
            sa * da - u16x16::splat(2) * (sa - s) * (da - d)
        )
    )
});

blend_fn2!(overlay, |s: u16x16, d: u16x16, sa, da| {
    div255(s * inv(da) + d * inv(sa)
        + (d + d).cmp_le(&da).blend(
            u16x16::splat(2) * s * d,
            sa * da - u16x16::splat(2) * (sa - s) * (da - d)
        )
    )
});

// Matrices are column-major, except the perspective one.

fn matrix_translate(p: &mut Pipeline, m: &[f32]) {
    let x = p.x() + f32x16::splat(m[0]);
    let y = p.y() + f32x16::splat(m[1]);
    p.set_x(&x);
    p.set_y(&y);
}

fn matrix_scale_translate(p: &mut Pipeline, m: &[f32]) {
    let x = mad(p.x(), f32x16::splat(m[0]), f32x16::splat(m[2]));
    let y = mad(p.y(), f32x16::splat(m[1]), f32x16::splat(m[3]));
    p.set_x(&x);
    p.set_y(&y);
}

fn matrix_2x3(p: &mut Pipeline, m: &[f32]) {
    let s = |i: usize| f32x16::splat(m[i]);
    let (x, y) = (p.x(), p.y());
    let nx = mad(x, s(0), mad(y, s(2), s(4)));
    let ny = mad(x, s(1), mad(y, s(3), s(5)));
    p.set_x(&nx);
    p.set_y(&ny);
}

fn matrix_perspective(p: &mut Pipeline, m: &[f32]) {
    let s = |i: usize| f32x16::splat(m[i]);
    let (x, y) = (p.x(), p.y());
    let nx = mad(x, s(0), mad(y, s(1), s(2)));
    let ny = mad(x, s(3), mad(y, s(4), s(5)));
    let z = mad(x, s(6), mad(y, s(7), s(8)));
    p.set_x(&(nx / z));
    p.set_y(&(ny / z));
}

fn repeat_x(p: &mut Pipeline, ctx: &TileCtx) {
    let x = exclusive_repeat(p.x(), ctx);
    p.set_x(&x);
}

fn repeat_y(p: &mut Pipeline, ctx: &TileCtx) {
    let y = exclusive_repeat(p.y(), ctx);
    p.set_y(&y);
}

#[inline(always)]
fn exclusive_repeat(v: f32x16, ctx: &TileCtx) -> f32x16 {
    v - (v * f32x16::splat(ctx.inv_scale)).floor() * f32x16::splat(ctx.scale)
}

fn clamp_x_1(p: &mut Pipeline) {
    let x = p.x().normalize();
    p.set_x(&x);
}

fn repeat_x_1(p: &mut Pipeline) {
    let x = p.x();
    let x = (x - x.floor()).normalize();
    p.set_x(&x);
}

fn mirror_x_1(p: &mut Pipeline) {
    let x = p.x();
    let one = f32x16::splat(1.0);
    let two = |x| x + x;
    let x = ((x - one) - two(((x - one) * f32x16::splat(0.5)).floor()) - one)
        .abs()
        .normalize();
    p.set_x(&x);
}

fn evenly_spaced_gradient(p: &mut Pipeline, ctx: &GradientCtx) {
    let t = p.x();
    let last = ctx.len() - 1;
    let scaled: [f32; STAGE_WIDTH] = (t * f32x16::splat(last as f32)).into();

    // NaN turns into zero.
    let mut idx = [0; STAGE_WIDTH];
    for (i, v) in idx.iter_mut().zip(scaled.iter()) {
        *i = (v.max(0.0) as usize).min(last);
    }

    gradient_lookup(p, ctx, &idx, t);
}

fn gradient(p: &mut Pipeline, ctx: &GradientCtx) {
    let t = p.x();
    let lanes: [f32; STAGE_WIDTH] = t.into();

    // N.B. The loop starts at 1 because idx 0 is the color to use before the first stop.
    let mut idx = [0; STAGE_WIDTH];
    for tt in ctx.t_values.iter().skip(1) {
        let tt = tt.get();
        for (i, t) in idx.iter_mut().zip(lanes.iter()) {
            *i += (*t >= tt) as usize;
        }
    }

    gradient_lookup(p, ctx, &idx, t);
}

// The gradient compiler never produces more intervals than `t_values`,
// but indices are clamped anyway.
#[inline(always)]
fn gradient_lookup(p: &mut Pipeline, ctx: &GradientCtx, idx: &[usize; STAGE_WIDTH], t: f32x16) {
    let last = ctx.len() - 1;

    macro_rules! gather {
        ($d:expr, $c:ident) => {{
            let mut v = [0.0; STAGE_WIDTH];
            for (n, i) in v.iter_mut().zip(idx.iter()) {
                *n = $d[(*i).min(last)].$c;
            }

            f32x16::from(v)
        }};
    }

    let r = mad(t, gather!(ctx.factors, r), gather!(ctx.biases, r));
    let g = mad(t, gather!(ctx.factors, g), gather!(ctx.biases, g));
    let b = mad(t, gather!(ctx.factors, b), gather!(ctx.biases, b));
    let a = mad(t, gather!(ctx.factors, a), gather!(ctx.biases, a));
    round_f32_to_u16(p, r, g, b, a, ctx.premultiplied);
}

fn evenly_spaced_2_stop_gradient(p: &mut Pipeline, ctx: &EvenlySpaced2StopGradientCtx) {
    let t = p.x();
    let ramp = |f: f32, b: f32| mad(t, f32x16::splat(f), f32x16::splat(b));
    let GradientColor { r: fr, g: fg, b: fb, a: fa } = ctx.factor;
    let GradientColor { r: br, g: bg, b: bb, a: ba } = ctx.bias;
    round_f32_to_u16(p, ramp(fr, br), ramp(fg, bg), ramp(fb, bb), ramp(fa, ba), false);
}

#[inline(always)]
fn round_f32_to_u16(p: &mut Pipeline, r: f32x16, g: f32x16, b: f32x16, a: f32x16, premultiplied: bool) {
    let a = a.normalize();
    let limit = if premultiplied { a } else { f32x16::splat(1.0) };

    let scale = |v: f32x16| v * f32x16::splat(255.0) + f32x16::splat(0.5);
    scale(r.normalize().min(&limit)).save_to_u16x16(&mut p.r);
    scale(g.normalize().min(&limit)).save_to_u16x16(&mut p.g);
    scale(b.normalize().min(&limit)).save_to_u16x16(&mut p.b);
    scale(a).save_to_u16x16(&mut p.a);
}

fn xy_to_radius(p: &mut Pipeline) {
    let (x, y) = (p.x(), p.y());
    let x = (x * x + y * y).sqrt();
    p.set_x(&x);
}

#[inline(always)]
fn div255(v: u16x16) -> u16x16 {
    // Same as `(v + 127) / 255` for any product of two 8-bit values.
    let k = u16x16::splat(128);
    (v + (v + k).shr(8) + k).shr(8)
}

#[inline(always)]
fn inv(v: u16x16) -> u16x16 {
    u16x16::splat(255) - v
}

#[inline(always)]
fn from_float(f: f32) -> u16x16 {
    u16x16::splat((f.max(0.0).min(1.0) * 255.0 + 0.5) as u16)
}

#[inline(always)]
fn lerp(from: u16x16, to: u16x16, t: u16x16) -> u16x16 {
    div255(from * inv(t) + to * t)
}

#[inline(always)]
fn split(v: &f32x16, lo: &mut u16x16, hi: &mut u16x16) {
    // We're splitting f32x16 (512bit) into two u16x16 (256 bit).
    let data: [u8; 64] = bytemuck::cast(*v);
    let d0: &mut [u8; 32] = bytemuck::cast_mut(&mut lo.0);
    let d1: &mut [u8; 32] = bytemuck::cast_mut(&mut hi.0);

    d0.copy_from_slice(&data[0..32]);
    d1.copy_from_slice(&data[32..64]);
}

#[inline(always)]
fn join(lo: &u16x16, hi: &u16x16) -> f32x16 {
    // We're joining two u16x16 (256 bit) into f32x16 (512bit).
    let d0: [u8; 32] = bytemuck::cast(lo.0);
    let d1: [u8; 32] = bytemuck::cast(hi.0);

    let mut v = f32x16::default();
    let data: &mut [u8; 64] = bytemuck::cast_mut(&mut v);

    data[0..32].copy_from_slice(&d0);
    data[32..64].copy_from_slice(&d1);

    v
}

#[inline(always)]
fn mad(f: f32x16, m: f32x16, a: f32x16) -> f32x16 {
    f * m + a
}
