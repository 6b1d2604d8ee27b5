// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
`tiny-skia-pipeline` is a Skia-style raster pipeline.

A program is an ordered list of small pixel stages (loads, stores, blend modes,
gradients, color space conversions, samplers), which is executed over
a rectangular region of pixels in vector-width chunks.

Each stage has a high precision (`f32`) implementation and many stages also have
a low precision (`u16`, implicit `/255` scale) one. When every stage of a program
has a low precision implementation, the faster lowp tier is used.

```no_run
use tiny_skia_pipeline::*;

let mut pixels = vec![0u8; 4 * 4 * 4];
let ctx = MemoryCtx::new(&mut pixels, 4);
let mut p = RasterPipelineBuilder::new();
p.push_with_context(Stage::Load8888, Context::Memory(&ctx)).unwrap();
p.push(Stage::SwapRb).unwrap();
p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
p.compile().run(0, 0, 4, 4).unwrap();
```
*/

#![no_std]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![allow(clippy::approx_constant)]
#![allow(clippy::clone_on_copy)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::eq_op)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::float_cmp)]
#![allow(clippy::identity_op)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

#[cfg(not(any(feature = "std", feature = "no-std-float")))]
compile_error!("You have to activate either the `std` or the `no-std-float` feature.");

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod color;
mod error;
mod format;
mod isa;
mod pipeline;
mod scalar;
mod transform;
mod wide;

pub use color::{Color, PremultipliedColor, PremultipliedColorU8};
pub use color::{ALPHA_OPAQUE, ALPHA_TRANSPARENT};
pub use error::PipelineError;
pub use format::PixelFormat;
pub use isa::{memset16, memset32, memset64, Isa};
pub use pipeline::{
    ByteTablesCtx, ColorLutCtx, Context, ContextKind, DecalCtx, EvenlySpaced2StopGradientCtx,
    GatherCtx, GradientColor, GradientCtx, GradientStop, MemoryCtx, RasterPipeline,
    RasterPipelineBuilder, SamplerCtx, SpreadMode, Stage, TileCtx, TransferFunction,
    TwoPointConicalCtx, UniformColorCtx, MAX_STAGES, STAGES_COUNT,
};
pub use transform::Transform;

pub use strict_num::NormalizedF32;
