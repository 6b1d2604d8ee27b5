// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Image sampling.
//!
//! There are two flavors. The building blocks (`save_xy`, `bilinear_*`, `bicubic_*`
//! and `accumulate`) are interleaved with regular tiling and gather stages by the caller,
//! while `bilinear`, `bicubic` and `bilerp_clamp_8888` do everything in a single stage.

use crate::pipeline::{GatherCtx, SamplerCtx, SpreadMode};
use crate::wide::F32Lanes;

use super::{exclusive_mirror, exclusive_repeat, mad, memory, Pipeline};

pub(super) fn save_xy<F: F32Lanes>(p: &mut Pipeline<F>) {
    // Whether bilinear or bicubic, all sample points are at the same fractional offset (fx,fy).
    // They're either the 4 corners of a logical 1x1 pixel or the 16 corners of a 3x3 grid
    // surrounding (x,y) at (0.5,0.5) off-center.
    let half = F::splat(0.5);
    p.fx = (p.r + half).fract();
    p.fy = (p.g + half).fract();
    p.x = p.r;
    p.y = p.g;
}

pub(super) fn accumulate<F: F32Lanes>(p: &mut Pipeline<F>) {
    let scale = p.scalex * p.scaley;
    p.dr = mad(scale, p.r, p.dr);
    p.dg = mad(scale, p.g, p.dg);
    p.db = mad(scale, p.b, p.db);
    p.da = mad(scale, p.a, p.da);
}

// In bilinear interpolation, the 4 pixels at +/- 0.5 offsets from the sample pixel center
// are combined in direct proportion to their area overlapping that logical query pixel.
// At positive offsets, the x-axis contribution to that rectangle is fx, or (1-fx) at negative x.
// Same deal for y.

pub(super) fn bilinear_nx<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x - F::splat(0.5);
    p.scalex = F::splat(1.0) - p.fx;
}

pub(super) fn bilinear_px<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x + F::splat(0.5);
    p.scalex = p.fx;
}

pub(super) fn bilinear_ny<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y - F::splat(0.5);
    p.scaley = F::splat(1.0) - p.fy;
}

pub(super) fn bilinear_py<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y + F::splat(0.5);
    p.scaley = p.fy;
}

// In bicubic interpolation, the 16 pixels at +/- 0.5 and +/- 1.5 offsets from the sample
// pixel center are combined with a non-uniform cubic filter, with higher values near the center.
//
// We break this function into two parts, one for near 0.5 offsets and one for far 1.5 offsets.

#[inline(always)]
fn bicubic_near<F: F32Lanes>(t: F) -> F {
    // 1/18 + 9/18t + 27/18t^2 - 21/18t^3 == t ( t ( -21/18t + 27/18) + 9/18) + 1/18
    mad(
        t,
        mad(t, mad(F::splat(-21.0 / 18.0), t, F::splat(27.0 / 18.0)), F::splat(9.0 / 18.0)),
        F::splat(1.0 / 18.0),
    )
}

#[inline(always)]
fn bicubic_far<F: F32Lanes>(t: F) -> F {
    // 0/18 + 0/18*t - 6/18t^2 + 7/18t^3 == t^2 (7/18t - 6/18)
    (t * t) * mad(F::splat(7.0 / 18.0), t, F::splat(-6.0 / 18.0))
}

pub(super) fn bicubic_n3x<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x - F::splat(1.5);
    p.scalex = bicubic_far(F::splat(1.0) - p.fx);
}

pub(super) fn bicubic_n1x<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x - F::splat(0.5);
    p.scalex = bicubic_near(F::splat(1.0) - p.fx);
}

pub(super) fn bicubic_p1x<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x + F::splat(0.5);
    p.scalex = bicubic_near(p.fx);
}

pub(super) fn bicubic_p3x<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.r = p.x + F::splat(1.5);
    p.scalex = bicubic_far(p.fx);
}

pub(super) fn bicubic_n3y<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y - F::splat(1.5);
    p.scaley = bicubic_far(F::splat(1.0) - p.fy);
}

pub(super) fn bicubic_n1y<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y - F::splat(0.5);
    p.scaley = bicubic_near(F::splat(1.0) - p.fy);
}

pub(super) fn bicubic_p1y<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y + F::splat(0.5);
    p.scaley = bicubic_near(p.fy);
}

pub(super) fn bicubic_p3y<F: F32Lanes>(p: &mut Pipeline<F>) {
    p.g = p.y + F::splat(1.5);
    p.scaley = bicubic_far(p.fy);
}

pub(super) fn bilinear<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &SamplerCtx) {
    let one = F::splat(1.0);
    let half = F::splat(0.5);
    let fx = (p.r + half).fract();
    let fy = (p.g + half).fract();
    let wx = [one - fx, fx];
    let wy = [one - fy, fy];

    let (r, g, b, a) = sample_grid(ctx, p.r, p.g, -0.5, &wx, &wy);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;
}

pub(super) fn bicubic<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &SamplerCtx) {
    let one = F::splat(1.0);
    let half = F::splat(0.5);
    let fx = (p.r + half).fract();
    let fy = (p.g + half).fract();
    let wx = [bicubic_far(one - fx), bicubic_near(one - fx), bicubic_near(fx), bicubic_far(fx)];
    let wy = [bicubic_far(one - fy), bicubic_near(one - fy), bicubic_near(fy), bicubic_far(fy)];

    let (r, g, b, a) = sample_grid(ctx, p.r, p.g, -1.5, &wx, &wy);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;
}

/// Accumulates an NxN grid of texels starting at `(cx + start, cy + start)`.
#[inline(always)]
fn sample_grid<F: F32Lanes>(
    ctx: &SamplerCtx,
    cx: F,
    cy: F,
    start: f32,
    wx: &[F],
    wy: &[F],
) -> (F, F, F, F) {
    let (mut r, mut g, mut b, mut a) = (F::default(), F::default(), F::default(), F::default());

    let one = F::splat(1.0);
    let mut y = cy + F::splat(start);
    for wy in wy {
        let mut x = cx + F::splat(start);
        for wx in wx {
            let (sr, sg, sb, sa) = sample(ctx, x, y);
            let w = *wx * *wy;
            r = mad(w, sr, r);
            g = mad(w, sg, g);
            b = mad(w, sb, b);
            a = mad(w, sa, a);

            x += one;
        }

        y += one;
    }

    (r, g, b, a)
}

#[inline(always)]
fn sample<F: F32Lanes>(ctx: &SamplerCtx, x: F, y: F) -> (F, F, F, F) {
    let x = tile(x, ctx.spread_mode, ctx.gather.width() as f32, ctx.inv_width);
    let y = tile(y, ctx.spread_mode, ctx.gather.height() as f32, ctx.inv_height);
    memory::gather_8888_at(&ctx.gather, x, y)
}

#[inline(always)]
fn tile<F: F32Lanes>(v: F, mode: SpreadMode, limit: f32, inv_limit: f32) -> F {
    match mode {
        // Gather clamps for us.
        SpreadMode::Pad => v,
        SpreadMode::Repeat => exclusive_repeat(v, limit, inv_limit),
        SpreadMode::Reflect => exclusive_mirror(v, limit, inv_limit),
    }
}

/// A fused bilinear sampler for clamped `Rgba8888` images.
pub(super) fn bilerp_clamp_8888<F: F32Lanes>(p: &mut Pipeline<F>, ctx: &GatherCtx) {
    // (cx,cy) are the center of our sample.
    let cx = p.r;
    let cy = p.g;

    let one = F::splat(1.0);
    let half = F::splat(0.5);
    let fx = (cx + half).fract();
    let fy = (cy + half).fract();

    let (mut r, mut g, mut b, mut a) = (F::default(), F::default(), F::default(), F::default());
    for &(dy, sy) in &[(-0.5, one - fy), (0.5, fy)] {
        for &(dx, sx) in &[(-0.5, one - fx), (0.5, fx)] {
            // Every sample point is clamped to the image on its own.
            let (sr, sg, sb, sa) = memory::gather_8888_at(ctx, cx + F::splat(dx), cy + F::splat(dy));
            let area = sx * sy;
            r = mad(sr, area, r);
            g = mad(sg, area, g);
            b = mad(sb, area, b);
            a = mad(sa, area, a);
        }
    }

    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;
}
