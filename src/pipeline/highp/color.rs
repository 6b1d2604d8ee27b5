// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Color space, transfer function and lookup table stages.

use crate::pipeline::{ByteTablesCtx, ColorLutCtx, TransferFunction};
use crate::wide::{approx_powf, F32Lanes, I32Lanes};

use super::{lerp, lookup, mad, to_unorm, Pipeline};

// `to_srgb` uses approximate reciprocals, so constants are fitted per instruction set.
cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
        const TO_SRGB_C: f32 = 1.130048394203;
        const TO_SRGB_D: f32 = 0.141357362270;
    } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
        const TO_SRGB_C: f32 = 1.129999995232;
        const TO_SRGB_D: f32 = 0.141381442547;
    } else {
        const TO_SRGB_C: f32 = 1.129999995232;
        const TO_SRGB_D: f32 = 0.141377761960;
    }
}

#[inline(always)]
fn from_srgb_channel<F: F32Lanes>(s: F) -> F {
    let lo = s * F::splat(1.0 / 12.92);
    let hi = mad(s * s, mad(s, F::splat(0.3), F::splat(0.6975)), F::splat(0.0025));
    s.cmp_lt(F::splat(0.055)).blend(lo, hi)
}

#[inline(always)]
fn to_srgb_channel<F: F32Lanes>(l: F) -> F {
    // Zero gives an infinite `t`, but then `lo` is selected anyway.
    let t = l.recip_sqrt();
    let lo = l * F::splat(12.92);
    let hi = mad(t, mad(t, F::splat(-0.0024542345), F::splat(0.013832027)), F::splat(TO_SRGB_C))
        * (F::splat(TO_SRGB_D) + t).recip_fast();
    l.cmp_lt(F::splat(0.00465985)).blend(lo, hi)
}

pub(super) fn from_srgb<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = from_srgb_channel(p.r);
    p.g = from_srgb_channel(p.g);
    p.b = from_srgb_channel(p.b);
}

pub(super) fn from_srgb_dst<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.dr = from_srgb_channel(p.dr);
    p.dg = from_srgb_channel(p.dg);
    p.db = from_srgb_channel(p.db);
}

pub(super) fn to_srgb<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = to_srgb_channel(p.r);
    p.g = to_srgb_channel(p.g);
    p.b = to_srgb_channel(p.b);
}

pub(super) fn rgb_to_hsl<F: F32Lanes>(p: &mut Pipeline<F>) {
    let (r, g, b) = (p.r, p.g, p.b);
    let s = |n: f32| F::splat(n);

    let mx = r.max(g.max(b));
    let mn = r.min(g.min(b));
    let d = mx - mn;
    let d_rcp = s(1.0) / d;

    let h = s(1.0 / 6.0)
        * mx.cmp_eq(mn).blend(
            F::default(),
            mx.cmp_eq(r).blend(
                (g - b) * d_rcp + g.cmp_lt(b).blend(s(6.0), F::default()),
                mx.cmp_eq(g).blend((b - r) * d_rcp + s(2.0), (r - g) * d_rcp + s(4.0)),
            ),
        );

    let l = (mx + mn) * s(0.5);
    let sat = mx.cmp_eq(mn).blend(
        F::default(),
        d / l.cmp_gt(s(0.5)).blend(s(2.0) - mx - mn, mx + mn),
    );

    p.r = h;
    p.g = sat;
    p.b = l;
}

pub(super) fn hsl_to_rgb<F: F32Lanes>(p: &mut Pipeline<F>) {
    let (h, sat, l) = (p.r, p.g, p.b);
    let s = |n: f32| F::splat(n);

    let q = l + l.cmp_ge(s(0.5)).blend(sat - l * sat, l * sat);
    let pp = (l + l) - q;

    let hue_to_rgb = |t: F| {
        let t = t.fract();
        let mut c = pp;
        c = t.cmp_ge(s(4.0 / 6.0)).blend(c, pp + (q - pp) * (s(4.0) - s(6.0) * t));
        c = t.cmp_ge(s(3.0 / 6.0)).blend(c, q);
        c = t.cmp_ge(s(1.0 / 6.0)).blend(c, pp + (q - pp) * (s(6.0) * t));
        c
    };

    let gray = sat.cmp_eq(F::default());
    p.r = gray.blend(l, hue_to_rgb(h + s(1.0 / 3.0)));
    p.g = gray.blend(l, hue_to_rgb(h));
    p.b = gray.blend(l, hue_to_rgb(h - s(1.0 / 3.0)));
}

pub(super) fn lab_to_xyz<F: F32Lanes>(p: &mut Pipeline<F>) {
    let s = |n: f32| F::splat(n);

    let l = p.r * s(100.0);
    let a = p.g * s(255.0) - s(128.0);
    let b = p.b * s(255.0) - s(128.0);

    let y = (l + s(16.0)) * s(1.0 / 116.0);
    let x = y + a * s(1.0 / 500.0);
    let z = y - b * s(1.0 / 200.0);

    let f = |v: F| {
        let v3 = v * v * v;
        v3.cmp_gt(s(0.008856)).blend(v3, (v - s(16.0 / 116.0)) * s(1.0 / 7.787))
    };

    // Adjust to D50 illuminant.
    p.r = f(x) * s(0.96422);
    p.g = f(y);
    p.b = f(z) * s(0.82521);
}

#[inline(always)]
fn parametric<F: F32Lanes>(v: F, tf: &TransferFunction) -> F {
    let s = |n: f32| F::splat(n);
    let r = v.cmp_le(s(tf.d)).blend(
        mad(s(tf.c), v, s(tf.f)),
        approx_powf(mad(s(tf.a), v, s(tf.b)), s(tf.g)) + s(tf.e),
    );

    r.normalize()
}

pub(super) fn parametric_r<F: F32Lanes>(p: &mut Pipeline<F>, tf: &TransferFunction) {
    p.r = parametric(p.r, tf);
}

pub(super) fn parametric_g<F: F32Lanes>(p: &mut Pipeline<F>, tf: &TransferFunction) {
    p.g = parametric(p.g, tf);
}

pub(super) fn parametric_b<F: F32Lanes>(p: &mut Pipeline<F>, tf: &TransferFunction) {
    p.b = parametric(p.b, tf);
}

pub(super) fn parametric_a<F: F32Lanes>(p: &mut Pipeline<F>, tf: &TransferFunction) {
    p.a = parametric(p.a, tf);
}

pub(super) fn gamma<F: F32Lanes>(p: &mut Pipeline<F>, g: f32) {
    let g = F::splat(g);
    p.r = approx_powf(p.r, g);
    p.g = approx_powf(p.g, g);
    p.b = approx_powf(p.b, g);
}

pub(super) fn gamma_dst<F: F32Lanes>(p: &mut Pipeline<F>, g: f32) {
    let g = F::splat(g);
    p.dr = approx_powf(p.dr, g);
    p.dg = approx_powf(p.dg, g);
    p.db = approx_powf(p.db, g);
}

#[inline(always)]
fn table<F: F32Lanes>(v: F, t: &[f32]) -> F {
    let last = t.len() - 1;
    lookup::<F>(to_unorm(v, last as f32), |i| t[i.min(last)])
}

pub(super) fn table_r<F: F32Lanes>(p: &mut Pipeline<F>, t: &[f32]) {
    p.r = table(p.r, t);
}

pub(super) fn table_g<F: F32Lanes>(p: &mut Pipeline<F>, t: &[f32]) {
    p.g = table(p.g, t);
}

pub(super) fn table_b<F: F32Lanes>(p: &mut Pipeline<F>, t: &[f32]) {
    p.b = table(p.b, t);
}

pub(super) fn table_a<F: F32Lanes>(p: &mut Pipeline<F>, t: &[f32]) {
    p.a = table(p.a, t);
}

#[inline(always)]
fn byte_table<F: F32Lanes>(v: F, t: &[u8; 256]) -> F {
    lookup::<F>(to_unorm(v, 255.0), |i| f32::from(t[i.min(255)])) * F::splat(1.0 / 255.0)
}

pub(super) fn byte_tables<F: F32Lanes>(p: &mut Pipeline<F>, tables: &ByteTablesCtx) {
    byte_tables_rgb(p, tables);
    p.a = byte_table(p.a, &tables.a);
}

pub(super) fn byte_tables_rgb<F: F32Lanes>(p: &mut Pipeline<F>, tables: &ByteTablesCtx) {
    p.r = byte_table(p.r, &tables.r);
    p.g = byte_table(p.g, &tables.g);
    p.b = byte_table(p.b, &tables.b);
}

pub(super) fn clut_3d<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &ColorLutCtx) {
    clut(p, ctx, 3);
}

pub(super) fn clut_4d<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &ColorLutCtx) {
    clut(p, ctx, 4);
    // Inputs were CMYK, so alpha is gone.
    p.a = F::splat(1.0);
}

#[inline(always)]
fn clut<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &ColorLutCtx, dims: usize) {
    let src = [p.r, p.g, p.b, p.a];
    let (r, g, b) = clut_sample(ctx, &src, dims, F::I32::default(), 1);
    p.r = r;
    p.g = g;
    p.b = b;
}

// Linear interpolation over `dim` dimensions, starting from the innermost one.
// A grid point is `index` in rgb triples.
fn clut_sample<F: F32Lanes>(
    ctx: &ColorLutCtx,
    src: &[F; 4],
    dim: usize,
    index: F::I32,
    stride: i32,
) -> (F, F, F) {
    if dim == 0 {
        let last = ctx.table.len() - 1;
        let index = index + index + index;
        let channel = |offset: usize| lookup::<F>(index, |i| ctx.table[(i + offset).min(last)]);
        return (channel(0), channel(1), channel(2));
    }

    let limit = ctx.limits[dim - 1];
    let x = src[dim - 1].normalize() * F::splat((limit - 1) as f32);
    let lo = x.trunc_int();
    let hi = (x + F::splat(0.9999)).trunc_int();

    let s = F::I32::splat(stride);
    let next_stride = stride.wrapping_mul(limit as i32);
    let (lr, lg, lb) = clut_sample(ctx, src, dim - 1, s * lo + index, next_stride);
    let (hr, hg, hb) = clut_sample(ctx, src, dim - 1, s * hi + index, next_stride);

    let t = x - lo.to_f32();
    (lerp(lr, hr, t), lerp(lg, hg, t), lerp(lb, hb, t))
}

pub(super) fn gauss_a_to_rgba<F: F32Lanes>(p: &mut Pipeline<F>) {
    // x = 1 - x;
    // exp(-x * x * 4) - 0.018f;
    // ... now approximate with quartic
    let c4 = F::splat(-2.26661229133605957031);
    let c3 = F::splat(2.89795351028442382812);
    let c2 = F::splat(0.21345567703247070312);
    let c1 = F::splat(0.15489584207534790039);
    let c0 = F::splat(0.00030726194381713867);

    let a = p.a;
    p.a = mad(a, mad(a, mad(a, mad(a, c4, c3), c2), c1), c0);
    p.r = p.a;
    p.g = p.a;
    p.b = p.a;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide::f32x4;

    #[test]
    fn srgb_round_trip() {
        let mut p = Pipeline::<f32x4>::default();
        let v = f32x4::from([0.0, 0.01, 0.5, 1.0]);
        p.r = v;
        from_srgb(&mut p);
        to_srgb(&mut p);
        for (a, b) in p.r.to_array().iter().zip(v.to_array().iter()) {
            assert!((a - b).abs() < 3e-3, "{} != {}", a, b);
        }
    }

    #[test]
    fn hsl_round_trip() {
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([1.0, 0.2, 0.5, 0.3]);
        p.g = f32x4::from([0.0, 0.6, 0.5, 0.9]);
        p.b = f32x4::from([0.0, 0.4, 0.5, 0.1]);
        let (r, g, b) = (p.r.to_array(), p.g.to_array(), p.b.to_array());

        rgb_to_hsl(&mut p);
        // Pure red: hue 0, full saturation, half lightness.
        assert_eq!([p.r.to_array()[0], p.g.to_array()[0], p.b.to_array()[0]], [0.0, 1.0, 0.5]);
        // Gray has no saturation.
        assert_eq!(p.g.to_array()[2], 0.0);

        hsl_to_rgb(&mut p);
        for i in 0..4 {
            assert!((p.r.to_array()[i] - r[i]).abs() < 1e-5);
            assert!((p.g.to_array()[i] - g[i]).abs() < 1e-5);
            assert!((p.b.to_array()[i] - b[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn table_lookup() {
        let mut p = Pipeline::<f32x4>::default();
        p.g = f32x4::from([0.0, 0.3, 0.7, 2.0]);
        table_g(&mut p, &[10.0, 20.0, 30.0]);
        // 0.3 * 2 + 0.5 = 1.1 and 0.7 * 2 + 0.5 = 1.9
        assert_eq!(p.g.to_array(), [10.0, 20.0, 20.0, 30.0]);
    }

    #[test]
    fn parametric_linear_segment() {
        let tf = TransferFunction { g: 2.0, a: 1.0, b: 0.0, c: 0.5, d: 0.5, e: 0.0, f: 0.0 };
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([-1.0, 0.0, 0.5, 0.25]);
        parametric_r(&mut p, &tf);
        assert_eq!(p.r.to_array(), [0.0, 0.0, 0.25, 0.125]);
    }

    #[test]
    fn clut_corners() {
        // 2x2x2 table, where each entry stores its own coordinates.
        let mut table = [0.0; 2 * 2 * 2 * 3];
        for r in 0..2 {
            for g in 0..2 {
                for b in 0..2 {
                    let i = (r * 4 + g * 2 + b) * 3;
                    table[i] = r as f32;
                    table[i + 1] = g as f32;
                    table[i + 2] = b as f32;
                }
            }
        }

        let ctx = ColorLutCtx::new(&table, [2, 2, 2, 1]).unwrap();
        let mut p = Pipeline::<f32x4>::default();
        p.r = f32x4::from([0.0, 1.0, 0.5, 0.25]);
        p.g = f32x4::from([0.0, 0.0, 1.0, 0.5]);
        p.b = f32x4::from([1.0, 0.0, 0.5, 0.75]);
        p.a = f32x4::splat(0.5);
        clut_3d(&mut p, &ctx);
        assert_eq!(p.r.to_array(), [0.0, 1.0, 0.5, 0.25]);
        assert_eq!(p.g.to_array(), [0.0, 0.0, 1.0, 0.5]);
        assert_eq!(p.b.to_array(), [1.0, 0.0, 0.5, 0.75]);
        assert_eq!(p.a.to_array(), [0.5; 4]);
    }

    #[test]
    fn gauss_endpoints() {
        let mut p = Pipeline::<f32x4>::default();
        p.a = f32x4::from([0.0, 1.0, 0.0, 1.0]);
        gauss_a_to_rgba(&mut p);
        let a = p.a.to_array();
        assert!(a[0].abs() < 1e-3);
        assert!((a[1] - 1.0).abs() < 1e-3);
        assert_eq!(p.r.to_array(), a);
    }
}
