// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
Highp stage tables for x86 extensions.

Lane intrinsics are picked at compile time, so a plain build only uses the
baseline. Here each stage is wrapped into a `#[target_feature]` function,
which lets the inlined lane code use the wider encodings.

The tables must only be used on a CPU where the features were detected.
See `Isa::is_available`.
*/

use super::*;

use crate::pipeline::{
    ByteTablesCtx, ColorLutCtx, GatherCtx, MemoryCtx, SamplerCtx, TransferFunction,
};

macro_rules! ctx_type {
    (Memory) => { &MemoryCtx<'_> };
    (Gather) => { &GatherCtx<'_> };
    (Sampler) => { &SamplerCtx<'_> };
    (UniformColor) => { &UniformColorCtx };
    (Value) => { f32 };
    (Tile) => { &TileCtx };
    (Decal) => { &DecalCtx };
    (Matrix) => { &[f32] };
    (Gradient) => { &GradientCtx };
    (TwoStopGradient) => { &EvenlySpaced2StopGradientCtx };
    (TwoPointConical) => { &TwoPointConicalCtx };
    (TransferFunction) => { &TransferFunction };
    (Table) => { &[f32] };
    (ByteTables) => { &ByteTablesCtx };
    (ColorLut) => { &ColorLutCtx<'_> };
}

macro_rules! shim {
    ($feature:literal, None, $($f:ident)::+) => {{
        #[target_feature(enable = $feature)]
        unsafe fn imp<F: F32Lanes>(p: &mut Pipeline<F>) {
            $($f)::+::<F>(p)
        }

        fn call<F: F32Lanes>(p: &mut Pipeline<F>) {
            // SAFETY: the table is selected only when the features were detected.
            unsafe { imp::<F>(p) }
        }

        StageFn::None(call::<F>)
    }};
    ($feature:literal, $kind:ident, $($f:ident)::+) => {{
        #[target_feature(enable = $feature)]
        unsafe fn imp<F: F32Lanes>(p: &mut Pipeline<F>, ctx: ctx_type!($kind)) {
            $($f)::+::<F>(p, ctx)
        }

        fn call<F: F32Lanes>(p: &mut Pipeline<F>, ctx: ctx_type!($kind)) {
            // SAFETY: the table is selected only when the features were detected.
            unsafe { imp::<F>(p, ctx) }
        }

        StageFn::$kind(call::<F>)
    }};
}

macro_rules! sse41 {
    ($($t:tt)*) => { shim!("sse4.1", $($t)*) };
}

macro_rules! avx {
    ($($t:tt)*) => { shim!("avx", $($t)*) };
}

macro_rules! hsw {
    ($($t:tt)*) => { shim!("avx2,fma", $($t)*) };
}

pub(crate) const fn sse41_table<F: F32Lanes>() -> [StageFn<Pipeline<F>>; STAGES_COUNT] {
    let mut table = [StageFn::Unsupported; STAGES_COUNT];
    let mut i = 0;
    while i < STAGES_COUNT {
        table[i] = stage_match!(Stage::ALL[i], sse41);
        i += 1;
    }

    table
}

pub(crate) const fn avx_table<F: F32Lanes>() -> [StageFn<Pipeline<F>>; STAGES_COUNT] {
    let mut table = [StageFn::Unsupported; STAGES_COUNT];
    let mut i = 0;
    while i < STAGES_COUNT {
        table[i] = stage_match!(Stage::ALL[i], avx);
        i += 1;
    }

    table
}

pub(crate) const fn hsw_table<F: F32Lanes>() -> [StageFn<Pipeline<F>>; STAGES_COUNT] {
    let mut table = [StageFn::Unsupported; STAGES_COUNT];
    let mut i = 0;
    while i < STAGES_COUNT {
        table[i] = stage_match!(Stage::ALL[i], hsw);
        i += 1;
    }

    table
}
