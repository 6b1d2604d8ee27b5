// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
A high precision raster pipeline implementation.

Unlike lowp, this one implements all stages.

Stages are generic over the lane type, so the same code is instantiated
for `f32x4` (SSE2, SSE4.1, Neon and the portable fallback) and for `f32x8` (AVX and HSW).
On x86 the `x86` module builds extra tables where every stage is compiled
with the extension enabled.
*/

use crate::pipeline::{
    DecalCtx, EvenlySpaced2StopGradientCtx, GradientCtx, Stage, StageFn, TileCtx,
    TwoPointConicalCtx, UniformColorCtx, ChunkState, STAGES_COUNT,
};
use crate::wide::{F32Lanes, I32Lanes};

mod blend;
mod color;
mod memory;
mod sample;

#[derive(Default, Debug)]
pub(crate) struct Pipeline<F: F32Lanes> {
    r: F,
    g: F,
    b: F,
    a: F,
    dr: F,
    dg: F,
    db: F,
    da: F,

    dx: usize,
    dy: usize,
    tail: usize,

    // Set by the decal and two-point conical stages.
    decal_mask: F,
    vector_mask: F,

    // Scratch of the bilinear and bicubic building blocks.
    x: F,
    y: F,
    fx: F,
    fy: F,
    scalex: F,
    scaley: F,
}

impl<F: F32Lanes> ChunkState for Pipeline<F> {
    const WIDTH: usize = F::LEN;

    #[inline(always)]
    fn reset(&mut self, dx: usize, dy: usize, tail: usize) {
        *self = Pipeline {
            dx,
            dy,
            tail,
            decal_mask: !F::default(),
            vector_mask: !F::default(),
            ..Pipeline::default()
        };
    }
}

impl<F: F32Lanes> Pipeline<F> {
    /// Number of live pixels in the current chunk.
    #[inline(always)]
    fn lanes(&self) -> usize {
        if self.tail == 0 {
            F::LEN
        } else {
            self.tail
        }
    }
}

// Every highp stage, with the context kind its function takes.
//
// `$wrap` turns a kind and a function path into a `StageFn`.
macro_rules! stage_match {
    ($stage:expr, $wrap:ident) => {
        match $stage {
            Stage::SeedShader => $wrap!(None, seed_shader),
            Stage::Dither => $wrap!(Value, dither),
            Stage::UniformColor => $wrap!(UniformColor, uniform_color),
            Stage::BlackColor => $wrap!(None, black_color),
            Stage::WhiteColor => $wrap!(None, white_color),

            Stage::LoadA8 => $wrap!(Memory, memory::load_a8),
            Stage::LoadA8Dst => $wrap!(Memory, memory::load_a8_dst),
            Stage::GatherA8 => $wrap!(Gather, memory::gather_a8),
            Stage::StoreA8 => $wrap!(Memory, memory::store_a8),
            Stage::LoadG8 => $wrap!(Memory, memory::load_g8),
            Stage::LoadG8Dst => $wrap!(Memory, memory::load_g8_dst),
            Stage::GatherG8 => $wrap!(Gather, memory::gather_g8),
            Stage::Load565 => $wrap!(Memory, memory::load_565),
            Stage::Load565Dst => $wrap!(Memory, memory::load_565_dst),
            Stage::Gather565 => $wrap!(Gather, memory::gather_565),
            Stage::Store565 => $wrap!(Memory, memory::store_565),
            Stage::Load4444 => $wrap!(Memory, memory::load_4444),
            Stage::Load4444Dst => $wrap!(Memory, memory::load_4444_dst),
            Stage::Gather4444 => $wrap!(Gather, memory::gather_4444),
            Stage::Store4444 => $wrap!(Memory, memory::store_4444),
            Stage::Load8888 => $wrap!(Memory, memory::load_8888),
            Stage::Load8888Dst => $wrap!(Memory, memory::load_8888_dst),
            Stage::Gather8888 => $wrap!(Gather, memory::gather_8888),
            Stage::Store8888 => $wrap!(Memory, memory::store_8888),
            Stage::LoadBgra => $wrap!(Memory, memory::load_bgra),
            Stage::LoadBgraDst => $wrap!(Memory, memory::load_bgra_dst),
            Stage::GatherBgra => $wrap!(Gather, memory::gather_bgra),
            Stage::StoreBgra => $wrap!(Memory, memory::store_bgra),
            Stage::Load1010102 => $wrap!(Memory, memory::load_1010102),
            Stage::Load1010102Dst => $wrap!(Memory, memory::load_1010102_dst),
            Stage::Gather1010102 => $wrap!(Gather, memory::gather_1010102),
            Stage::Store1010102 => $wrap!(Memory, memory::store_1010102),
            Stage::LoadRg88 => $wrap!(Memory, memory::load_rg88),
            Stage::LoadRg88Dst => $wrap!(Memory, memory::load_rg88_dst),
            Stage::GatherRg88 => $wrap!(Gather, memory::gather_rg88),
            Stage::StoreRg88 => $wrap!(Memory, memory::store_rg88),
            Stage::LoadRg1616 => $wrap!(Memory, memory::load_rg1616),
            Stage::LoadRg1616Dst => $wrap!(Memory, memory::load_rg1616_dst),
            Stage::GatherRg1616 => $wrap!(Gather, memory::gather_rg1616),
            Stage::StoreRg1616 => $wrap!(Memory, memory::store_rg1616),
            Stage::Load16161616 => $wrap!(Memory, memory::load_16161616),
            Stage::Load16161616Dst => $wrap!(Memory, memory::load_16161616_dst),
            Stage::Gather16161616 => $wrap!(Gather, memory::gather_16161616),
            Stage::Store16161616 => $wrap!(Memory, memory::store_16161616),
            Stage::LoadU16Be => $wrap!(Memory, memory::load_u16_be),
            Stage::StoreU16Be => $wrap!(Memory, memory::store_u16_be),
            Stage::LoadRgbU16Be => $wrap!(Memory, memory::load_rgb_u16_be),
            Stage::LoadF16 => $wrap!(Memory, memory::load_f16),
            Stage::LoadF16Dst => $wrap!(Memory, memory::load_f16_dst),
            Stage::GatherF16 => $wrap!(Gather, memory::gather_f16),
            Stage::StoreF16 => $wrap!(Memory, memory::store_f16),
            Stage::LoadF32 => $wrap!(Memory, memory::load_f32),
            Stage::LoadF32Dst => $wrap!(Memory, memory::load_f32_dst),
            Stage::GatherF32 => $wrap!(Gather, memory::gather_f32),
            Stage::StoreF32 => $wrap!(Memory, memory::store_f32),
            Stage::SourceOverRgba8888 => $wrap!(Memory, memory::source_over_rgba_8888),
            Stage::SourceOverBgra8888 => $wrap!(Memory, memory::source_over_bgra_8888),

            Stage::MoveSourceToDestination => $wrap!(None, move_source_to_destination),
            Stage::MoveDestinationToSource => $wrap!(None, move_destination_to_source),
            Stage::SwapRb => $wrap!(None, swap_rb),
            Stage::Invert => $wrap!(None, invert),
            Stage::Clamp0 => $wrap!(None, clamp_0),
            Stage::Clamp1 => $wrap!(None, clamp_1),
            Stage::ClampA => $wrap!(None, clamp_a),
            Stage::ClampADst => $wrap!(None, clamp_a_dst),
            Stage::Premultiply => $wrap!(None, premultiply),
            Stage::PremultiplyDst => $wrap!(None, premultiply_dst),
            Stage::Unpremultiply => $wrap!(None, unpremultiply),
            Stage::ForceOpaque => $wrap!(None, force_opaque),
            Stage::ForceOpaqueDst => $wrap!(None, force_opaque_dst),
            Stage::LuminanceToAlpha => $wrap!(None, luminance_to_alpha),

            Stage::FromSrgb => $wrap!(None, color::from_srgb),
            Stage::FromSrgbDst => $wrap!(None, color::from_srgb_dst),
            Stage::ToSrgb => $wrap!(None, color::to_srgb),
            Stage::RgbToHsl => $wrap!(None, color::rgb_to_hsl),
            Stage::HslToRgb => $wrap!(None, color::hsl_to_rgb),
            Stage::LabToXyz => $wrap!(None, color::lab_to_xyz),
            Stage::ParametricR => $wrap!(TransferFunction, color::parametric_r),
            Stage::ParametricG => $wrap!(TransferFunction, color::parametric_g),
            Stage::ParametricB => $wrap!(TransferFunction, color::parametric_b),
            Stage::ParametricA => $wrap!(TransferFunction, color::parametric_a),
            Stage::Gamma => $wrap!(Value, color::gamma),
            Stage::GammaDst => $wrap!(Value, color::gamma_dst),
            Stage::TableR => $wrap!(Table, color::table_r),
            Stage::TableG => $wrap!(Table, color::table_g),
            Stage::TableB => $wrap!(Table, color::table_b),
            Stage::TableA => $wrap!(Table, color::table_a),
            Stage::ByteTables => $wrap!(ByteTables, color::byte_tables),
            Stage::ByteTablesRgb => $wrap!(ByteTables, color::byte_tables_rgb),
            Stage::Clut3D => $wrap!(ColorLut, color::clut_3d),
            Stage::Clut4D => $wrap!(ColorLut, color::clut_4d),
            Stage::GaussAToRgba => $wrap!(None, color::gauss_a_to_rgba),

            Stage::Scale1Float => $wrap!(Value, scale_1_float),
            Stage::ScaleU8 => $wrap!(Memory, memory::scale_u8),
            Stage::Scale565 => $wrap!(Memory, memory::scale_565),
            Stage::Lerp1Float => $wrap!(Value, lerp_1_float),
            Stage::LerpU8 => $wrap!(Memory, memory::lerp_u8),
            Stage::Lerp565 => $wrap!(Memory, memory::lerp_565),

            Stage::Clear => $wrap!(None, blend::clear),
            Stage::Source => $wrap!(None, blend::source),
            Stage::Destination => $wrap!(None, move_destination_to_source),
            Stage::SourceOver => $wrap!(None, blend::source_over),
            Stage::DestinationOver => $wrap!(None, blend::destination_over),
            Stage::SourceIn => $wrap!(None, blend::source_in),
            Stage::DestinationIn => $wrap!(None, blend::destination_in),
            Stage::SourceOut => $wrap!(None, blend::source_out),
            Stage::DestinationOut => $wrap!(None, blend::destination_out),
            Stage::SourceAtop => $wrap!(None, blend::source_atop),
            Stage::DestinationAtop => $wrap!(None, blend::destination_atop),
            Stage::Xor => $wrap!(None, blend::xor),
            Stage::Plus => $wrap!(None, blend::plus),
            Stage::Modulate => $wrap!(None, blend::modulate),
            Stage::Screen => $wrap!(None, blend::screen),
            Stage::Overlay => $wrap!(None, blend::overlay),
            Stage::Darken => $wrap!(None, blend::darken),
            Stage::Lighten => $wrap!(None, blend::lighten),
            Stage::ColorDodge => $wrap!(None, blend::color_dodge),
            Stage::ColorBurn => $wrap!(None, blend::color_burn),
            Stage::HardLight => $wrap!(None, blend::hard_light),
            Stage::SoftLight => $wrap!(None, blend::soft_light),
            Stage::Difference => $wrap!(None, blend::difference),
            Stage::Exclusion => $wrap!(None, blend::exclusion),
            Stage::Multiply => $wrap!(None, blend::multiply),
            Stage::Hue => $wrap!(None, blend::hue),
            Stage::Saturation => $wrap!(None, blend::saturation),
            Stage::Color => $wrap!(None, blend::color),
            Stage::Luminosity => $wrap!(None, blend::luminosity),

            Stage::MatrixTranslate => $wrap!(Matrix, matrix_translate),
            Stage::MatrixScaleTranslate => $wrap!(Matrix, matrix_scale_translate),
            Stage::Matrix2x3 => $wrap!(Matrix, matrix_2x3),
            Stage::MatrixPerspective => $wrap!(Matrix, matrix_perspective),
            Stage::Matrix3x4 => $wrap!(Matrix, matrix_3x4),
            Stage::Matrix4x5 => $wrap!(Matrix, matrix_4x5),
            Stage::Matrix4x3 => $wrap!(Matrix, matrix_4x3),

            Stage::RepeatX => $wrap!(Tile, repeat_x),
            Stage::RepeatY => $wrap!(Tile, repeat_y),
            Stage::MirrorX => $wrap!(Tile, mirror_x),
            Stage::MirrorY => $wrap!(Tile, mirror_y),
            Stage::DecalX => $wrap!(Decal, decal_x),
            Stage::DecalY => $wrap!(Decal, decal_y),
            Stage::DecalXAndY => $wrap!(Decal, decal_x_and_y),
            Stage::CheckDecalMask => $wrap!(None, check_decal_mask),
            Stage::ClampX1 => $wrap!(None, clamp_x_1),
            Stage::RepeatX1 => $wrap!(None, repeat_x_1),
            Stage::MirrorX1 => $wrap!(None, mirror_x_1),

            Stage::EvenlySpacedGradient => $wrap!(Gradient, evenly_spaced_gradient),
            Stage::Gradient => $wrap!(Gradient, gradient),
            Stage::EvenlySpaced2StopGradient => {
                $wrap!(TwoStopGradient, evenly_spaced_2_stop_gradient)
            }
            Stage::XyToUnitAngle => $wrap!(None, xy_to_unit_angle),
            Stage::XyToRadius => $wrap!(None, xy_to_radius),
            Stage::NegateX => $wrap!(None, negate_x),

            Stage::XyTo2PtConicalStrip => $wrap!(TwoPointConical, xy_to_2pt_conical_strip),
            Stage::XyTo2PtConicalFocalOnCircle => $wrap!(None, xy_to_2pt_conical_focal_on_circle),
            Stage::XyTo2PtConicalWellBehaved => {
                $wrap!(TwoPointConical, xy_to_2pt_conical_well_behaved)
            }
            Stage::XyTo2PtConicalGreater => $wrap!(TwoPointConical, xy_to_2pt_conical_greater),
            Stage::XyTo2PtConicalSmaller => $wrap!(TwoPointConical, xy_to_2pt_conical_smaller),
            Stage::Alter2PtConicalCompensateFocal => {
                $wrap!(TwoPointConical, alter_2pt_conical_compensate_focal)
            }
            Stage::Alter2PtConicalUnswap => $wrap!(None, alter_2pt_conical_unswap),
            Stage::Mask2PtConicalNan => $wrap!(None, mask_2pt_conical_nan),
            Stage::Mask2PtConicalDegenerates => $wrap!(None, mask_2pt_conical_degenerates),
            Stage::ApplyVectorMask => $wrap!(None, apply_vector_mask),

            Stage::SaveXy => $wrap!(None, sample::save_xy),
            Stage::Accumulate => $wrap!(None, sample::accumulate),
            Stage::BilinearNx => $wrap!(None, sample::bilinear_nx),
            Stage::BilinearPx => $wrap!(None, sample::bilinear_px),
            Stage::BilinearNy => $wrap!(None, sample::bilinear_ny),
            Stage::BilinearPy => $wrap!(None, sample::bilinear_py),
            Stage::BicubicN3x => $wrap!(None, sample::bicubic_n3x),
            Stage::BicubicN1x => $wrap!(None, sample::bicubic_n1x),
            Stage::BicubicP1x => $wrap!(None, sample::bicubic_p1x),
            Stage::BicubicP3x => $wrap!(None, sample::bicubic_p3x),
            Stage::BicubicN3y => $wrap!(None, sample::bicubic_n3y),
            Stage::BicubicN1y => $wrap!(None, sample::bicubic_n1y),
            Stage::BicubicP1y => $wrap!(None, sample::bicubic_p1y),
            Stage::BicubicP3y => $wrap!(None, sample::bicubic_p3y),
            Stage::Bilinear => $wrap!(Sampler, sample::bilinear),
            Stage::Bicubic => $wrap!(Sampler, sample::bicubic),
            Stage::BilerpClamp8888 => $wrap!(Gather, sample::bilerp_clamp_8888),
        }
    };
}

macro_rules! direct {
    ($kind:ident, $($f:ident)::+) => {
        StageFn::$kind($($f)::+::<F>)
    };
}

pub(crate) const fn stages_table<F: F32Lanes>() -> [StageFn<Pipeline<F>>; STAGES_COUNT] {
    let mut table = [StageFn::Unsupported; STAGES_COUNT];
    let mut i = 0;
    while i < STAGES_COUNT {
        table[i] = stage_match!(Stage::ALL[i], direct);
        i += 1;
    }

    table
}

#[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]
pub(crate) mod x86;

fn seed_shader<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = F::splat(p.dx as f32) + iota(0.5);
    p.g = F::splat(p.dy as f32 + 0.5);
    p.b = F::splat(1.0);
    p.a = F::default();

    p.dr = F::default();
    p.dg = F::default();
    p.db = F::default();
    p.da = F::default();
}

// An 8x8 ordered dither matrix, interleaving the low bits of x and y.
fn dither<F: F32Lanes>(p: &mut Pipeline<F>, rate: f32) {
    let x = (F::splat(p.dx as f32) + iota(0.0)).trunc_int();
    let y = F::I32::splat(p.dy as i32) ^ x;

    let bit = |v: F::I32, mask: i32| v & F::I32::splat(mask);
    let m = bit(y, 1).shl(5)
        | bit(x, 1).shl(4)
        | bit(y, 2).shl(2)
        | bit(x, 2).shl(1)
        | bit(y, 4).shr(1)
        | bit(x, 4).shr(2);

    // Map [0, 63] to [-63/128, +63/128].
    let dither = m.to_f32() * F::splat(2.0 / 128.0) - F::splat(63.0 / 128.0);
    let rate = F::splat(rate);

    p.r = mad(dither, rate, p.r);
    p.g = mad(dither, rate, p.g);
    p.b = mad(dither, rate, p.b);

    // Keep colors premultiplied.
    p.r = p.r.min(p.a).max(F::default());
    p.g = p.g.min(p.a).max(F::default());
    p.b = p.b.min(p.a).max(F::default());
}

fn uniform_color<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &UniformColorCtx) {
    p.r = F::splat(ctx.r);
    p.g = F::splat(ctx.g);
    p.b = F::splat(ctx.b);
    p.a = F::splat(ctx.a);
}

fn black_color<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = F::default();
    p.g = F::default();
    p.b = F::default();
    p.a = F::splat(1.0);
}

fn white_color<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = F::splat(1.0);
    p.g = F::splat(1.0);
    p.b = F::splat(1.0);
    p.a = F::splat(1.0);
}

fn move_source_to_destination<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.dr = p.r;
    p.dg = p.g;
    p.db = p.b;
    p.da = p.a;
}

fn move_destination_to_source<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.dr;
    p.g = p.dg;
    p.b = p.db;
    p.a = p.da;
}

fn swap_rb<F: F32Lanes>(p: &mut Pipeline<F>) {
    core::mem::swap(&mut p.r, &mut p.b);
}

fn invert<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = inv(p.r);
    p.g = inv(p.g);
    p.b = inv(p.b);
    p.a = inv(p.a);
}

fn clamp_0<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.r.max(F::default());
    p.g = p.g.max(F::default());
    p.b = p.b.max(F::default());
    p.a = p.a.max(F::default());
}

fn clamp_1<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.r.min(F::splat(1.0));
    p.g = p.g.min(F::splat(1.0));
    p.b = p.b.min(F::splat(1.0));
    p.a = p.a.min(F::splat(1.0));
}

fn clamp_a<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.a = p.a.min(F::splat(1.0));
    p.r = p.r.min(p.a);
    p.g = p.g.min(p.a);
    p.b = p.b.min(p.a);
}

fn clamp_a_dst<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.da = p.da.min(F::splat(1.0));
    p.dr = p.dr.min(p.da);
    p.dg = p.dg.min(p.da);
    p.db = p.db.min(p.da);
}

fn premultiply<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r *= p.a;
    p.g *= p.a;
    p.b *= p.a;
}

fn premultiply_dst<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.dr *= p.da;
    p.dg *= p.da;
    p.db *= p.da;
}

fn unpremultiply<F: F32Lanes>(p: &mut Pipeline<F>) {
    // Zero alpha gives an infinite scale, which turns into zero.
    let scale = F::splat(1.0) / p.a;
    let scale = scale.cmp_lt(F::splat(f32::INFINITY)).blend(scale, F::default());
    p.r *= scale;
    p.g *= scale;
    p.b *= scale;
}

fn force_opaque<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.a = F::splat(1.0);
}

fn force_opaque_dst<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.da = F::splat(1.0);
}

fn luminance_to_alpha<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.a = p.r * F::splat(0.2126) + p.g * F::splat(0.7152) + p.b * F::splat(0.0722);
    p.r = F::default();
    p.g = F::default();
    p.b = F::default();
}

fn scale_1_float<F: F32Lanes>(p: &mut Pipeline<F>, c: f32) {
    let c = F::splat(c);
    p.r *= c;
    p.g *= c;
    p.b *= c;
    p.a *= c;
}

fn lerp_1_float<F: F32Lanes>(p: &mut Pipeline<F>, c: f32) {
    let c = F::splat(c);
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);
}

// Matrices are column-major, except the perspective one.

fn matrix_translate<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    p.r += F::splat(m[0]);
    p.g += F::splat(m[1]);
}

fn matrix_scale_translate<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    p.r = mad(p.r, F::splat(m[0]), F::splat(m[2]));
    p.g = mad(p.g, F::splat(m[1]), F::splat(m[3]));
}

fn matrix_2x3<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    let s = |i: usize| F::splat(m[i]);
    let r = mad(p.r, s(0), mad(p.g, s(2), s(4)));
    let g = mad(p.r, s(1), mad(p.g, s(3), s(5)));
    p.r = r;
    p.g = g;
}

fn matrix_perspective<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    let s = |i: usize| F::splat(m[i]);
    let r = mad(p.r, s(0), mad(p.g, s(1), s(2)));
    let g = mad(p.r, s(3), mad(p.g, s(4), s(5)));
    let z = mad(p.r, s(6), mad(p.g, s(7), s(8)));
    let z = F::splat(1.0) / z;
    p.r = r * z;
    p.g = g * z;
}

fn matrix_3x4<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    let s = |i: usize| F::splat(m[i]);
    let (r, g, b) = (p.r, p.g, p.b);
    p.r = mad(r, s(0), mad(g, s(3), mad(b, s(6), s(9))));
    p.g = mad(r, s(1), mad(g, s(4), mad(b, s(7), s(10))));
    p.b = mad(r, s(2), mad(g, s(5), mad(b, s(8), s(11))));
}

fn matrix_4x5<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    let s = |i: usize| F::splat(m[i]);
    let (r, g, b, a) = (p.r, p.g, p.b, p.a);
    p.r = mad(r, s(0), mad(g, s(4), mad(b, s(8), mad(a, s(12), s(16)))));
    p.g = mad(r, s(1), mad(g, s(5), mad(b, s(9), mad(a, s(13), s(17)))));
    p.b = mad(r, s(2), mad(g, s(6), mad(b, s(10), mad(a, s(14), s(18)))));
    p.a = mad(r, s(3), mad(g, s(7), mad(b, s(11), mad(a, s(15), s(19)))));
}

// Maps x and y to four channels, e.g. for sampling a gradient-like field.
fn matrix_4x3<F: F32Lanes>(p: &mut Pipeline<F>, m: &[f32]) {
    let s = |i: usize| F::splat(m[i]);
    let (x, y) = (p.r, p.g);
    p.r = mad(x, s(0), mad(y, s(4), s(8)));
    p.g = mad(x, s(1), mad(y, s(5), s(9)));
    p.b = mad(x, s(2), mad(y, s(6), s(10)));
    p.a = mad(x, s(3), mad(y, s(7), s(11)));
}

// Tile x or y to [0,limit) == [0,limit - 1 ulp] (think, sampling from images).
// The gather stages will hard clamp the output of these stages to [0,limit)...
// we just need to do the basic repeat or mirroring.

fn repeat_x<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TileCtx) {
    p.r = exclusive_repeat(p.r, ctx.scale, ctx.inv_scale);
}

fn repeat_y<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TileCtx) {
    p.g = exclusive_repeat(p.g, ctx.scale, ctx.inv_scale);
}

fn mirror_x<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TileCtx) {
    p.r = exclusive_mirror(p.r, ctx.scale, ctx.inv_scale);
}

fn mirror_y<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TileCtx) {
    p.g = exclusive_mirror(p.g, ctx.scale, ctx.inv_scale);
}

#[inline(always)]
fn exclusive_repeat<F: F32Lanes>(v: F, limit: f32, inv_limit: f32) -> F {
    v - (v * F::splat(inv_limit)).floor() * F::splat(limit)
}

#[inline(always)]
fn exclusive_mirror<F: F32Lanes>(v: F, limit: f32, inv_limit: f32) -> F {
    let limit = F::splat(limit);
    let inv_limit = F::splat(inv_limit);
    ((v - limit) - (limit + limit) * ((v - limit) * (inv_limit * F::splat(0.5))).floor() - limit).abs()
}

fn decal_x<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &DecalCtx) {
    p.decal_mask = in_range(p.r, ctx.limit_x);
}

fn decal_y<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &DecalCtx) {
    p.decal_mask = in_range(p.g, ctx.limit_y);
}

fn decal_x_and_y<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &DecalCtx) {
    p.decal_mask = in_range(p.r, ctx.limit_x) & in_range(p.g, ctx.limit_y);
}

#[inline(always)]
fn in_range<F: F32Lanes>(v: F, limit: f32) -> F {
    v.cmp_ge(F::default()) & v.cmp_lt(F::splat(limit))
}

fn check_decal_mask<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.r & p.decal_mask;
    p.g = p.g & p.decal_mask;
    p.b = p.b & p.decal_mask;
    p.a = p.a & p.decal_mask;
}

fn clamp_x_1<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.r.normalize();
}

fn repeat_x_1<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = (p.r - p.r.floor()).normalize();
}

fn mirror_x_1<F: F32Lanes>(p: &mut Pipeline<F>) {
    let one = F::splat(1.0);
    p.r = ((p.r - one) - two(((p.r - one) * F::splat(0.5)).floor()) - one).abs().normalize();
}

fn evenly_spaced_gradient<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &GradientCtx) {
    let t = p.r;
    let last = ctx.len() as i32 - 1;
    let idx = (t * F::splat(last as f32)).trunc_int();
    let idx = idx.max(F::I32::default()).min(F::I32::splat(last));
    gradient_lookup(p, ctx, idx, t);
}

fn gradient<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &GradientCtx) {
    let t = p.r;

    // N.B. The loop starts at 1 because idx 0 is the color to use before the first stop.
    let one = F::I32::splat(1);
    let mut idx = F::I32::default();
    for tt in ctx.t_values.iter().skip(1) {
        idx = idx + (t.cmp_ge(F::splat(tt.get())).to_i32_bitcast() & one);
    }

    gradient_lookup(p, ctx, idx, t);
}

#[inline(always)]
fn gradient_lookup<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &GradientCtx, idx: F::I32, t: F) {
    let last = ctx.len() - 1;

    macro_rules! gather {
        ($d:expr, $c:ident) => {
            lookup::<F>(idx, |i| $d[i.min(last)].$c)
        };
    }

    p.r = mad(t, gather!(ctx.factors, r), gather!(ctx.biases, r));
    p.g = mad(t, gather!(ctx.factors, g), gather!(ctx.biases, g));
    p.b = mad(t, gather!(ctx.factors, b), gather!(ctx.biases, b));
    p.a = mad(t, gather!(ctx.factors, a), gather!(ctx.biases, a));
}

fn evenly_spaced_2_stop_gradient<F: F32Lanes>(
    p: &mut Pipeline<F>,
    ctx: &EvenlySpaced2StopGradientCtx,
) {
    let t = p.r;
    p.r = mad(t, F::splat(ctx.factor.r), F::splat(ctx.bias.r));
    p.g = mad(t, F::splat(ctx.factor.g), F::splat(ctx.bias.g));
    p.b = mad(t, F::splat(ctx.factor.b), F::splat(ctx.bias.b));
    p.a = mad(t, F::splat(ctx.factor.a), F::splat(ctx.bias.a));
}

fn xy_to_unit_angle<F: F32Lanes>(p: &mut Pipeline<F>) {
    let x = p.r;
    let y = p.g;
    let x_abs = x.abs();
    let y_abs = y.abs();

    let slope = x_abs.min(y_abs) / x_abs.max(y_abs);
    let s = slope * slope;

    // Use a 7th degree polynomial to approximate atan.
    // This was generated using sollya.gforge.inria.fr.
    // A float optimized polynomial was generated using the following command.
    // P1 = fpminimax((1/(2*Pi))*atan(x),[|1,3,5,7|],[|24...|],[2^(-40),1],relative);
    let mut phi = slope
        * (F::splat(0.15912117063999176025390625)
            + s * (F::splat(-5.185396969318389892578125e-2)
                + s * (F::splat(2.476101927459239959716796875e-2)
                    + s * F::splat(-7.0547382347285747528076171875e-3))));

    phi = x_abs.cmp_lt(y_abs).blend(F::splat(1.0 / 4.0) - phi, phi);
    phi = x.cmp_lt(F::default()).blend(F::splat(1.0 / 2.0) - phi, phi);
    phi = y.cmp_lt(F::default()).blend(F::splat(1.0) - phi, phi);
    phi = phi.cmp_ne(phi).blend(F::default(), phi);
    p.r = phi;
}

fn xy_to_radius<F: F32Lanes>(p: &mut Pipeline<F>) {
    let x2 = p.r * p.r;
    let y2 = p.g * p.g;
    p.r = (x2 + y2).sqrt();
}

fn negate_x<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = -p.r;
}

fn xy_to_2pt_conical_strip<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TwoPointConicalCtx) {
    let x = p.r;
    let y = p.g;
    p.r = x + (F::splat(ctx.p0) - y * y).sqrt();
}

fn xy_to_2pt_conical_focal_on_circle<F: F32Lanes>(p: &mut Pipeline<F>) {
    let x = p.r;
    let y = p.g;
    p.r = x + y * y / x;
}

fn xy_to_2pt_conical_well_behaved<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TwoPointConicalCtx) {
    let x = p.r;
    let y = p.g;
    p.r = (x * x + y * y).sqrt() - x * F::splat(ctx.p0);
}

fn xy_to_2pt_conical_greater<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TwoPointConicalCtx) {
    let x = p.r;
    let y = p.g;
    p.r = (x * x - y * y).sqrt() - x * F::splat(ctx.p0);
}

fn xy_to_2pt_conical_smaller<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TwoPointConicalCtx) {
    let x = p.r;
    let y = p.g;
    p.r = -(x * x - y * y).sqrt() - x * F::splat(ctx.p0);
}

fn alter_2pt_conical_compensate_focal<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &TwoPointConicalCtx) {
    p.r += F::splat(ctx.p1);
}

fn alter_2pt_conical_unswap<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = F::splat(1.0) - p.r;
}

fn mask_2pt_conical_nan<F: F32Lanes>(p: &mut Pipeline<F>) {
    let t = p.r;
    let is_degenerate = t.cmp_ne(t);
    p.r = is_degenerate.blend(F::default(), t);
    p.vector_mask = !is_degenerate;
}

fn mask_2pt_conical_degenerates<F: F32Lanes>(p: &mut Pipeline<F>) {
    let t = p.r;
    let is_degenerate = t.cmp_le(F::default()) | t.cmp_ne(t);
    p.r = is_degenerate.blend(F::default(), t);
    p.vector_mask = !is_degenerate;
}

fn apply_vector_mask<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.r & p.vector_mask;
    p.g = p.g & p.vector_mask;
    p.b = p.b & p.vector_mask;
    p.a = p.a & p.vector_mask;
}

/// Lane offsets starting at `start`: `start, start + 1, ...`.
#[inline(always)]
fn iota<F: F32Lanes>(start: f32) -> F {
    let mut v = F::Array::default();
    for (i, n) in v.as_mut().iter_mut().enumerate() {
        *n = start + i as f32;
    }

    F::from_array(v)
}

/// Builds lanes from per-lane indices.
///
/// Negative indices are treated as zero. The callback must clamp the upper bound.
#[inline(always)]
fn lookup<F: F32Lanes>(idx: F::I32, mut f: impl FnMut(usize) -> f32) -> F {
    let idx = idx.to_array();
    let mut v = F::Array::default();
    for (lane, i) in v.as_mut().iter_mut().zip(idx.as_ref()) {
        *lane = f((*i).max(0) as usize);
    }

    F::from_array(v)
}

/// Clamps to 0..1, scales and rounds.
///
/// NaN becomes zero.
#[inline(always)]
fn to_unorm<F: F32Lanes>(v: F, scale: f32) -> F::I32 {
    (v.normalize() * F::splat(scale) + F::splat(0.5)).trunc_int()
}

#[inline(always)]
fn mad<F: F32Lanes>(f: F, m: F, a: F) -> F {
    f * m + a
}

#[inline(always)]
fn inv<F: F32Lanes>(v: F) -> F {
    F::splat(1.0) - v
}

#[inline(always)]
fn two<F: F32Lanes>(v: F) -> F {
    v + v
}

#[inline(always)]
fn lerp<F: F32Lanes>(from: F, to: F, t: F) -> F {
    mad(to - from, t, from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide::{f32x4, f32x8, U32Lanes};

    fn run<F: F32Lanes>(stage: fn(&mut Pipeline<F>), p: &mut Pipeline<F>) -> [f32; 4] {
        stage(p);
        let r = p.r.to_array();
        [r.as_ref()[0], r.as_ref()[1], r.as_ref()[2], r.as_ref()[3]]
    }

    #[test]
    fn reset_opens_masks() {
        let mut p = Pipeline::<f32x4>::default();
        p.reset(3, 2, 1);
        assert_eq!(p.lanes(), 1);
        assert_eq!(p.decal_mask.to_u32_bitcast().to_array(), [u32::MAX; 4]);
        p.reset(0, 0, 0);
        assert_eq!(p.lanes(), 4);
    }

    #[test]
    fn seed_shader_centers() {
        let mut p = Pipeline::<f32x8>::default();
        p.reset(16, 3, 0);
        seed_shader(&mut p);
        assert_eq!(p.r.to_array(), [16.5, 17.5, 18.5, 19.5, 20.5, 21.5, 22.5, 23.5]);
        assert_eq!(p.g.to_array(), [3.5; 8]);
        assert_eq!(p.b.to_array(), [1.0; 8]);
        assert_eq!(p.a.to_array(), [0.0; 8]);
    }

    #[test]
    fn dither_keeps_premultiplied() {
        let mut p = Pipeline::<f32x4>::default();
        p.reset(0, 0, 0);
        p.r = f32x4::splat(0.5);
        p.a = f32x4::splat(0.5);
        dither(&mut p, 1.0 / 255.0);
        for v in p.r.to_array().iter() {
            assert!(*v <= 0.5 && *v >= 0.5 - 0.5 / 255.0);
        }

        // Matrix entry at (0, 0) is zero, so the first pixel gets the lowest offset.
        let mut p = Pipeline::<f32x4>::default();
        p.reset(0, 0, 0);
        p.r = f32x4::splat(0.5);
        p.a = f32x4::splat(1.0);
        dither(&mut p, 1.0);
        assert_eq!(p.r.to_array()[0], 0.5 - 63.0 / 128.0);
    }

    #[test]
    fn unpremultiply_zero_alpha() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([0.25, 0.5, 0.0, 0.3]);
        p.a = f32x4::from([0.5, 1.0, 0.0, 0.0]);
        assert_eq!(run(unpremultiply, &mut p), [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn mirror_x_1_folds() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([0.25, 1.25, -0.25, 2.5]);
        assert_eq!(run(mirror_x_1, &mut p), [0.25, 0.75, 0.25, 0.5]);
    }

    #[test]
    fn repeat_x_1_wraps() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([0.25, 1.25, -0.25, 3.0]);
        assert_eq!(run(repeat_x_1, &mut p), [0.25, 0.25, 0.75, 0.0]);
    }

    #[test]
    fn exclusive_tiling() {
        let v = f32x4::from([-1.0, 0.0, 5.0, 11.0]);
        assert_eq!(exclusive_repeat(v, 4.0, 0.25).to_array(), [3.0, 0.0, 1.0, 3.0]);
        assert_eq!(exclusive_mirror(v, 4.0, 0.25).to_array(), [1.0, 0.0, 3.0, 3.0]);
    }

    #[test]
    fn unit_angle_quadrants() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([1.0, 0.0, -1.0, 0.0]);
        p.g = f32x4::from([0.0, 1.0, 0.0, -1.0]);
        let v = run(xy_to_unit_angle, &mut p);
        let expected = [0.0, 0.25, 0.5, 0.75];
        for (v, e) in v.iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-6, "{} != {}", v, e);
        }

        // 0/0 is NaN.
        p.r = f32x4::default();
        p.g = f32x4::default();
        assert_eq!(run(xy_to_unit_angle, &mut p), [0.0; 4]);
    }

    #[test]
    fn conical_degenerates_are_masked() {
        let mut p = Pipeline::<f32x4>::default();
        p.reset(0, 0, 0);
        p.r = f32x4::from([0.5, -0.5, f32::NAN, 0.0]);
        mask_2pt_conical_degenerates(&mut p);
        assert_eq!(p.r.to_array(), [0.5, 0.0, 0.0, 0.0]);

        p.r = f32x4::splat(1.0);
        p.g = f32x4::splat(1.0);
        p.b = f32x4::splat(1.0);
        p.a = f32x4::splat(1.0);
        apply_vector_mask(&mut p);
        assert_eq!(p.a.to_array(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn decal_bounds() {
        let mut p = Pipeline::<f32x4>::default();
        p.reset(0, 0, 0);
        p.r = f32x4::from([-0.5, 0.0, 9.99, 10.0]);
        p.a = f32x4::splat(1.0);
        decal_x(&mut p, &DecalCtx::new(10.0, 10.0));
        check_decal_mask(&mut p);
        assert_eq!(p.a.to_array(), [0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn perspective_divides() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::splat(2.0);
        p.g = f32x4::splat(4.0);
        // z = x
        matrix_perspective(&mut p, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(p.r.to_array(), [1.0; 4]);
        assert_eq!(p.g.to_array(), [2.0; 4]);
    }

    #[test]
    fn unorm_rounding() {
        let v = f32x4::from([f32::NAN, -1.0, 0.5, 2.0]);
        assert_eq!(to_unorm(v, 255.0).to_array(), [0, 0, 128, 255]);
    }
}
