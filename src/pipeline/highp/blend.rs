// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Blend modes. Source is `r, g, b, a`, destination is `dr, dg, db, da`.

use crate::wide::F32Lanes;

use super::{inv, mad, two, Pipeline};

pub(super) fn source<F: F32Lanes>(_: &mut Pipeline<F>) {}

macro_rules! blend_fn {
    ($name:ident, |$s:pat, $d:pat, $sa:pat, $da:pat| $body:expr) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>) {
            #[inline(always)]
            fn f<F: F32Lanes>($s: F, $d: F, $sa: F, $da: F) -> F {
                $body
            }

            p.r = f(p.r, p.dr, p.a, p.da);
            p.g = f(p.g, p.dg, p.a, p.da);
            p.b = f(p.b, p.db, p.a, p.da);
            p.a = f(p.a, p.da, p.a, p.da);
        }
    };
}

blend_fn!(clear,            |_, _,  _,  _| F::default());
blend_fn!(source_atop,      |s, d, sa, da| s * da + d * inv(sa));
blend_fn!(destination_atop, |s, d, sa, da| d * sa + s * inv(da));
blend_fn!(source_in,        |s, _,  _, da| s * da);
blend_fn!(destination_in,   |_, d, sa,  _| d * sa);
blend_fn!(source_out,       |s, _,  _, da| s * inv(da));
blend_fn!(destination_out,  |_, d, sa,  _| d * inv(sa));
blend_fn!(source_over,      |s, d, sa,  _| mad(d, inv(sa), s));
blend_fn!(destination_over, |s, d,  _, da| mad(s, inv(da), d));
blend_fn!(modulate,         |s, d,  _,  _| s * d);
blend_fn!(multiply,         |s, d, sa, da| s * inv(da) + d * inv(sa) + s * d);
blend_fn!(plus,             |s, d,  _,  _| (s + d).min(F::splat(1.0)));
blend_fn!(screen,           |s, d,  _,  _| s + d - s * d);
blend_fn!(xor,              |s, d, sa, da| s * inv(da) + d * inv(sa));

macro_rules! blend_fn2 {
    ($name:ident, |$s:pat, $d:pat, $sa:pat, $da:pat| $body:expr) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>) {
            #[inline(always)]
            fn f<F: F32Lanes>($s: F, $d: F, $sa: F, $da: F) -> F {
                $body
            }

            // The same logic applied to color, and source_over for alpha.
            p.r = f(p.r, p.dr, p.a, p.da);
            p.g = f(p.g, p.dg, p.a, p.da);
            p.b = f(p.b, p.db, p.a, p.da);
            p.a = mad(p.da, inv(p.a), p.a);
        }
    };
}

blend_fn2!(darken,     |s, d, sa, da| s + d - (s * da).max(d * sa));
blend_fn2!(lighten,    |s, d, sa, da| s + d - (s * da).min(d * sa));
blend_fn2!(difference, |s, d, sa, da| s + d - two((s * da).min(d * sa)));
blend_fn2!(exclusion,  |s, d,  _,  _| s + d - two(s * d));

blend_fn2!(color_burn, |s, d, sa, da|
    d.cmp_eq(da).blend(
        d + s * inv(da),
        s.cmp_eq(F::default()).blend(
            d * inv(sa),
            sa * (da - da.min((da - d) * sa / s)) + s * inv(da) + d * inv(sa)
        )
    )
);

blend_fn2!(color_dodge, |s, d, sa, da|
    d.cmp_eq(F::default()).blend(
        s * inv(da),
        s.cmp_eq(sa).blend(
            s + d * inv(sa),
            sa * da.min((d * sa) / (sa - s)) + s * inv(da) + d * inv(sa)
        )
    )
);

blend_fn2!(hard_light, |s, d, sa, da|
    s * inv(da) + d * inv(sa) + two(s).cmp_le(sa).blend(
        two(s * d),
        sa * da - two((da - d) * (sa - s))
    )
);

blend_fn2!(overlay, |s, d, sa, da|
    s * inv(da) + d * inv(sa) + two(d).cmp_le(da).blend(
        two(s * d),
        sa * da - two((da - d) * (sa - s))
    )
);

blend_fn2!(soft_light, |s, d, sa, da| {
    let m  = da.cmp_gt(F::default()).blend(d / da, F::default());
    let s2 = two(s);
    let m4 = two(two(m));

    // The logic forks three ways:
    //    1. dark src?
    //    2. light src, dark dst?
    //    3. light src, light dst?
    let dark_src = d * (sa + (s2 - sa) * (F::splat(1.0) - m));
    let dark_dst = (m4 * m4 + m4) * (m - F::splat(1.0)) + F::splat(7.0) * m;
    let lite_dst = m.sqrt() - m;
    let lite_src = d * sa + da * (s2 - sa)
        * two(two(d)).cmp_le(da).blend(dark_dst, lite_dst); // 2 or 3?

    s * inv(da) + d * inv(sa) + s2.cmp_le(sa).blend(dark_src, lite_src) // 1 or (2 or 3)?
});

// We're basing our implementation of non-separable blend modes on
//   https://www.w3.org/TR/compositing-1/#blendingnonseparable.
// and
//   https://www.khronos.org/registry/OpenGL/specs/es/3.2/es_spec_3.2.pdf
// They're equivalent, but ES' math has been better simplified.
//
// Anything extra we add beyond that is to make the math work with premul inputs.

macro_rules! blend_fn3 {
    ($name:ident, $f:ident) => {
        pub(super) fn $name<F: F32Lanes>(p: &mut Pipeline<F>) {
            let (mut rr, mut gg, mut bb) = $f(p);
            clip_color(&mut rr, &mut gg, &mut bb, p.a * p.da);

            let (a, da) = (p.a, p.da);
            p.r = p.r * inv(da) + p.dr * inv(a) + rr;
            p.g = p.g * inv(da) + p.dg * inv(a) + gg;
            p.b = p.b * inv(da) + p.db * inv(a) + bb;
            p.a = a + da - a * da;
        }
    };
}

blend_fn3!(hue, hue_k);
blend_fn3!(saturation, saturation_k);
blend_fn3!(color, color_k);
blend_fn3!(luminosity, luminosity_k);

#[inline(always)]
fn hue_k<F: F32Lanes>(p: &Pipeline<F>) -> (F, F, F) {
    let (mut r, mut g, mut b) = (p.r * p.a, p.g * p.a, p.b * p.a);
    set_sat(&mut r, &mut g, &mut b, sat(p.dr, p.dg, p.db) * p.a);
    set_lum(&mut r, &mut g, &mut b, lum(p.dr, p.dg, p.db) * p.a);
    (r, g, b)
}

#[inline(always)]
fn saturation_k<F: F32Lanes>(p: &Pipeline<F>) -> (F, F, F) {
    let (mut r, mut g, mut b) = (p.dr * p.a, p.dg * p.a, p.db * p.a);
    set_sat(&mut r, &mut g, &mut b, sat(p.r, p.g, p.b) * p.da);
    set_lum(&mut r, &mut g, &mut b, lum(p.dr, p.dg, p.db) * p.a); // (This is not redundant.)
    (r, g, b)
}

#[inline(always)]
fn color_k<F: F32Lanes>(p: &Pipeline<F>) -> (F, F, F) {
    let (mut r, mut g, mut b) = (p.r * p.da, p.g * p.da, p.b * p.da);
    set_lum(&mut r, &mut g, &mut b, lum(p.dr, p.dg, p.db) * p.a);
    (r, g, b)
}

#[inline(always)]
fn luminosity_k<F: F32Lanes>(p: &Pipeline<F>) -> (F, F, F) {
    let (mut r, mut g, mut b) = (p.dr * p.a, p.dg * p.a, p.db * p.a);
    set_lum(&mut r, &mut g, &mut b, lum(p.r, p.g, p.b) * p.da);
    (r, g, b)
}

#[inline(always)]
fn sat<F: F32Lanes>(r: F, g: F, b: F) -> F {
    r.max(g.max(b)) - r.min(g.min(b))
}

#[inline(always)]
fn lum<F: F32Lanes>(r: F, g: F, b: F) -> F {
    r * F::splat(0.30) + g * F::splat(0.59) + b * F::splat(0.11)
}

#[inline(always)]
fn set_sat<F: F32Lanes>(r: &mut F, g: &mut F, b: &mut F, s: F) {
    let mn  = (*r).min((*g).min(*b));
    let mx  = (*r).max((*g).max(*b));
    let sat = mx - mn;

    // Map min channel to 0, max channel to s, and scale the middle proportionally.
    let scale = |c: F| sat.cmp_eq(F::default()).blend(F::default(), (c - mn) * s / sat);

    *r = scale(*r);
    *g = scale(*g);
    *b = scale(*b);
}

#[inline(always)]
fn set_lum<F: F32Lanes>(r: &mut F, g: &mut F, b: &mut F, l: F) {
    let diff = l - lum(*r, *g, *b);
    *r += diff;
    *g += diff;
    *b += diff;
}

#[inline(always)]
fn clip_color<F: F32Lanes>(r: &mut F, g: &mut F, b: &mut F, a: F) {
    let mn = (*r).min((*g).min(*b));
    let mx = (*r).max((*g).max(*b));
    let l  = lum(*r, *g, *b);

    let clip = |mut c: F| {
        c = mn.cmp_ge(F::default()).blend(c, l + (c - l) * l / (l - mn));
        c = mx.cmp_gt(a).blend(l + (c - l) * (a - l) / (mx - l), c);
        c.max(F::default()) // Sometimes without this we may dip just a little negative.
    };

    *r = clip(*r);
    *g = clip(*g);
    *b = clip(*b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide::f32x4;

    fn pipeline(s: [f32; 4], d: [f32; 4]) -> Pipeline<f32x4> {
        let mut p = Pipeline::default();
        p.r = f32x4::splat(s[0]);
        p.g = f32x4::splat(s[1]);
        p.b = f32x4::splat(s[2]);
        p.a = f32x4::splat(s[3]);
        p.dr = f32x4::splat(d[0]);
        p.dg = f32x4::splat(d[1]);
        p.db = f32x4::splat(d[2]);
        p.da = f32x4::splat(d[3]);
        p
    }

    fn first(p: &Pipeline<f32x4>) -> [f32; 4] {
        [p.r.to_array()[0], p.g.to_array()[0], p.b.to_array()[0], p.a.to_array()[0]]
    }

    #[test]
    fn transparent_source_over_keeps_destination() {
        let mut p = pipeline([0.0; 4], [0.2, 0.4, 0.6, 0.8]);
        source_over(&mut p);
        assert_eq!(first(&p), [0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn plus_saturates() {
        let mut p = pipeline([0.75; 4], [0.5; 4]);
        plus(&mut p);
        assert_eq!(first(&p), [1.0; 4]);
    }

    #[test]
    fn separable_alpha_is_source_over() {
        let mut p = pipeline([0.1, 0.2, 0.3, 0.5], [0.25, 0.25, 0.25, 0.5]);
        darken(&mut p);
        assert_eq!(first(&p)[3], 0.75);
    }

    #[test]
    fn hue_of_gray_is_gray() {
        // A gray source has no hue, so the result keeps destination luminosity without color.
        let mut p = pipeline([0.5, 0.5, 0.5, 1.0], [0.5, 0.5, 0.5, 1.0]);
        hue(&mut p);
        let c = first(&p);
        assert!((c[0] - 0.5).abs() < 1e-6);
        assert!((c[1] - 0.5).abs() < 1e-6);
        assert!((c[2] - 0.5).abs() < 1e-6);
        assert_eq!(c[3], 1.0);
    }
}
