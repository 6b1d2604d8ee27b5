// Copyright 2016 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
A raster pipeline implementation.

The core principles are the same as in `SkRasterPipeline`:

1. A pipeline consists of stages.
1. Each stage has its own, possibly shared, context.
   Contexts are typed and checked when a stage is pushed.
1. Each stage has a high precision implementation. See `highp/`.
1. Some stages have a low precision implementation. See `lowp/`.
1. During pipeline "compilation", if **all** stages have a lowp implementation,
   the lowp pipeline will be used. Otherwise, the highp variant will be used.
1. Running a pipeline binds every stage function to its context
   and calls them in order for each chunk of pixels.

Unlike Skia, stages do not tail-call each other. The driver loops over
a list of bound stage functions, passing a single `&mut Pipeline` state.
This state holds color registers, coordinates, the tail and per-chunk scratch.

Also, since this module is all about performance, any kind of branching on pixel
values is strictly forbidden. All conditionals are lane masks passed to `blend`.
Loops over lanes and over stops are fine, since they do not depend on pixel values.
*/

use arrayvec::ArrayVec;

use crate::isa::{self, Isa};
use crate::{PipelineError, PixelFormat, PremultipliedColor, PremultipliedColorU8, Transform};

pub use context::*;

mod context;
pub(crate) mod highp;
pub(crate) mod lowp;

/// The maximum number of stages in a single pipeline.
pub const MAX_STAGES: usize = 32; // More than enough.

const MAX_MATRIX_LEN: usize = 20;

macro_rules! stages {
    ($($name:ident: $kind:ident,)+) => {
        /// A pipeline stage.
        ///
        /// Each stage reads a context of the kind returned by `Stage::context_kind`.
        #[allow(missing_docs)]
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub enum Stage {
            $($name,)+
        }

        impl Stage {
            /// All stages in declaration order.
            pub const ALL: &'static [Stage] = &[$(Stage::$name,)+];

            /// Returns the kind of context this stage reads.
            pub const fn context_kind(self) -> ContextKind {
                match self {
                    $(Stage::$name => ContextKind::$kind,)+
                }
            }
        }
    };
}

stages! {
    SeedShader: None,
    Dither: Value,
    UniformColor: UniformColor,
    BlackColor: None,
    WhiteColor: None,

    LoadA8: Memory,
    LoadA8Dst: Memory,
    GatherA8: Gather,
    StoreA8: Memory,
    LoadG8: Memory,
    LoadG8Dst: Memory,
    GatherG8: Gather,
    Load565: Memory,
    Load565Dst: Memory,
    Gather565: Gather,
    Store565: Memory,
    Load4444: Memory,
    Load4444Dst: Memory,
    Gather4444: Gather,
    Store4444: Memory,
    Load8888: Memory,
    Load8888Dst: Memory,
    Gather8888: Gather,
    Store8888: Memory,
    LoadBgra: Memory,
    LoadBgraDst: Memory,
    GatherBgra: Gather,
    StoreBgra: Memory,
    Load1010102: Memory,
    Load1010102Dst: Memory,
    Gather1010102: Gather,
    Store1010102: Memory,
    LoadRg88: Memory,
    LoadRg88Dst: Memory,
    GatherRg88: Gather,
    StoreRg88: Memory,
    LoadRg1616: Memory,
    LoadRg1616Dst: Memory,
    GatherRg1616: Gather,
    StoreRg1616: Memory,
    Load16161616: Memory,
    Load16161616Dst: Memory,
    Gather16161616: Gather,
    Store16161616: Memory,
    LoadU16Be: Memory,
    StoreU16Be: Memory,
    LoadRgbU16Be: Memory,
    LoadF16: Memory,
    LoadF16Dst: Memory,
    GatherF16: Gather,
    StoreF16: Memory,
    LoadF32: Memory,
    LoadF32Dst: Memory,
    GatherF32: Gather,
    StoreF32: Memory,
    SourceOverRgba8888: Memory,
    SourceOverBgra8888: Memory,

    MoveSourceToDestination: None,
    MoveDestinationToSource: None,
    SwapRb: None,
    Invert: None,
    Clamp0: None,
    Clamp1: None,
    ClampA: None,
    ClampADst: None,
    Premultiply: None,
    PremultiplyDst: None,
    Unpremultiply: None,
    ForceOpaque: None,
    ForceOpaqueDst: None,
    LuminanceToAlpha: None,

    FromSrgb: None,
    FromSrgbDst: None,
    ToSrgb: None,
    RgbToHsl: None,
    HslToRgb: None,
    LabToXyz: None,
    ParametricR: TransferFunction,
    ParametricG: TransferFunction,
    ParametricB: TransferFunction,
    ParametricA: TransferFunction,
    Gamma: Value,
    GammaDst: Value,
    TableR: Table,
    TableG: Table,
    TableB: Table,
    TableA: Table,
    ByteTables: ByteTables,
    ByteTablesRgb: ByteTables,
    Clut3D: ColorLut,
    Clut4D: ColorLut,
    GaussAToRgba: None,

    Scale1Float: Value,
    ScaleU8: Memory,
    Scale565: Memory,
    Lerp1Float: Value,
    LerpU8: Memory,
    Lerp565: Memory,

    Clear: None,
    Source: None,
    Destination: None,
    SourceOver: None,
    DestinationOver: None,
    SourceIn: None,
    DestinationIn: None,
    SourceOut: None,
    DestinationOut: None,
    SourceAtop: None,
    DestinationAtop: None,
    Xor: None,
    Plus: None,
    Modulate: None,
    Screen: None,
    Overlay: None,
    Darken: None,
    Lighten: None,
    ColorDodge: None,
    ColorBurn: None,
    HardLight: None,
    SoftLight: None,
    Difference: None,
    Exclusion: None,
    Multiply: None,
    Hue: None,
    Saturation: None,
    Color: None,
    Luminosity: None,

    MatrixTranslate: Matrix,
    MatrixScaleTranslate: Matrix,
    Matrix2x3: Matrix,
    MatrixPerspective: Matrix,
    Matrix3x4: Matrix,
    Matrix4x5: Matrix,
    Matrix4x3: Matrix,

    RepeatX: Tile,
    RepeatY: Tile,
    MirrorX: Tile,
    MirrorY: Tile,
    DecalX: Decal,
    DecalY: Decal,
    DecalXAndY: Decal,
    CheckDecalMask: None,
    ClampX1: None,
    RepeatX1: None,
    MirrorX1: None,

    EvenlySpacedGradient: Gradient,
    Gradient: Gradient,
    EvenlySpaced2StopGradient: TwoStopGradient,
    XyToUnitAngle: None,
    XyToRadius: None,
    NegateX: None,

    XyTo2PtConicalStrip: TwoPointConical,
    XyTo2PtConicalFocalOnCircle: None,
    XyTo2PtConicalWellBehaved: TwoPointConical,
    XyTo2PtConicalGreater: TwoPointConical,
    XyTo2PtConicalSmaller: TwoPointConical,
    Alter2PtConicalCompensateFocal: TwoPointConical,
    Alter2PtConicalUnswap: None,
    Mask2PtConicalNan: None,
    Mask2PtConicalDegenerates: None,
    ApplyVectorMask: None,

    SaveXy: None,
    Accumulate: None,
    BilinearNx: None,
    BilinearPx: None,
    BilinearNy: None,
    BilinearPy: None,
    BicubicN3x: None,
    BicubicN1x: None,
    BicubicP1x: None,
    BicubicP3x: None,
    BicubicN3y: None,
    BicubicN1y: None,
    BicubicP1y: None,
    BicubicP3y: None,
    Bilinear: Sampler,
    Bicubic: Sampler,
    BilerpClamp8888: Gather,
}

/// The number of stages.
pub const STAGES_COUNT: usize = Stage::ALL.len();

impl Stage {
    /// Returns the number of coefficients a matrix stage expects.
    ///
    /// Zero for non-matrix stages.
    pub const fn matrix_len(self) -> usize {
        match self {
            Stage::MatrixTranslate => 2,
            Stage::MatrixScaleTranslate => 4,
            Stage::Matrix2x3 => 6,
            Stage::MatrixPerspective => 9,
            Stage::Matrix3x4 | Stage::Matrix4x3 => 12,
            Stage::Matrix4x5 => 20,
            _ => 0,
        }
    }

    /// Returns the pixel format of a memory, gather or sampler stage.
    pub fn memory_format(self) -> Option<PixelFormat> {
        use Stage::*;

        let format = match self {
            LoadA8 | LoadA8Dst | GatherA8 | StoreA8 | ScaleU8 | LerpU8 => PixelFormat::A8,
            LoadG8 | LoadG8Dst | GatherG8 => PixelFormat::G8,
            Load565 | Load565Dst | Gather565 | Store565 | Scale565 | Lerp565 => PixelFormat::Rgb565,
            Load4444 | Load4444Dst | Gather4444 | Store4444 => PixelFormat::Argb4444,
            Load8888 | Load8888Dst | Gather8888 | Store8888 | SourceOverRgba8888 | Bilinear
            | Bicubic | BilerpClamp8888 => PixelFormat::Rgba8888,
            LoadBgra | LoadBgraDst | GatherBgra | StoreBgra | SourceOverBgra8888 => {
                PixelFormat::Bgra8888
            }
            Load1010102 | Load1010102Dst | Gather1010102 | Store1010102 => PixelFormat::Rgba1010102,
            LoadRg88 | LoadRg88Dst | GatherRg88 | StoreRg88 => PixelFormat::Rg88,
            LoadRg1616 | LoadRg1616Dst | GatherRg1616 | StoreRg1616 => PixelFormat::Rg1616,
            Load16161616 | Load16161616Dst | Gather16161616 | Store16161616 => {
                PixelFormat::Rgba16161616
            }
            LoadU16Be | StoreU16Be => PixelFormat::RgbaU16Be,
            LoadRgbU16Be => PixelFormat::RgbU16Be,
            LoadF16 | LoadF16Dst | GatherF16 | StoreF16 => PixelFormat::RgbaF16,
            LoadF32 | LoadF32Dst | GatherF32 | StoreF32 => PixelFormat::RgbaF32,
            _ => return None,
        };

        Some(format)
    }

    /// Checks that the stage writes into its memory context.
    pub fn writes_memory(self) -> bool {
        use Stage::*;

        matches!(
            self,
            StoreA8
                | Store565
                | Store4444
                | Store8888
                | StoreBgra
                | Store1010102
                | StoreRg88
                | StoreRg1616
                | Store16161616
                | StoreU16Be
                | StoreF16
                | StoreF32
                | SourceOverRgba8888
                | SourceOverBgra8888
        )
    }

    /// Checks that the stage has a low precision implementation.
    pub fn supports_lowp(self) -> bool {
        isa::LOWP[self as usize].is_supported()
    }
}

/// A stage function bound to nothing yet.
///
/// One variant per `ContextKind`, so a function can only be paired
/// with the context type it was written for.
pub(crate) enum StageFn<P> {
    Unsupported,
    None(fn(&mut P)),
    Memory(fn(&mut P, &MemoryCtx<'_>)),
    Gather(fn(&mut P, &GatherCtx<'_>)),
    Sampler(fn(&mut P, &SamplerCtx<'_>)),
    UniformColor(fn(&mut P, &UniformColorCtx)),
    Value(fn(&mut P, f32)),
    Tile(fn(&mut P, &TileCtx)),
    Decal(fn(&mut P, &DecalCtx)),
    Matrix(fn(&mut P, &[f32])),
    Gradient(fn(&mut P, &GradientCtx)),
    TwoStopGradient(fn(&mut P, &EvenlySpaced2StopGradientCtx)),
    TwoPointConical(fn(&mut P, &TwoPointConicalCtx)),
    TransferFunction(fn(&mut P, &TransferFunction)),
    Table(fn(&mut P, &[f32])),
    ByteTables(fn(&mut P, &ByteTablesCtx)),
    ColorLut(fn(&mut P, &ColorLutCtx<'_>)),
}

impl<P> Clone for StageFn<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for StageFn<P> {}

impl<P> StageFn<P> {
    pub(crate) fn is_supported(&self) -> bool {
        !matches!(self, StageFn::Unsupported)
    }
}

/// A stage function together with its context.
enum Op<'a, P> {
    None(fn(&mut P)),
    Memory(fn(&mut P, &MemoryCtx<'_>), &'a MemoryCtx<'a>),
    Gather(fn(&mut P, &GatherCtx<'_>), &'a GatherCtx<'a>),
    Sampler(fn(&mut P, &SamplerCtx<'_>), &'a SamplerCtx<'a>),
    UniformColor(fn(&mut P, &UniformColorCtx), &'a UniformColorCtx),
    Value(fn(&mut P, f32), f32),
    Tile(fn(&mut P, &TileCtx), &'a TileCtx),
    Decal(fn(&mut P, &DecalCtx), &'a DecalCtx),
    Matrix(fn(&mut P, &[f32]), &'a [f32]),
    Gradient(fn(&mut P, &GradientCtx), &'a GradientCtx),
    TwoStopGradient(fn(&mut P, &EvenlySpaced2StopGradientCtx), &'a EvenlySpaced2StopGradientCtx),
    TwoPointConical(fn(&mut P, &TwoPointConicalCtx), &'a TwoPointConicalCtx),
    TransferFunction(fn(&mut P, &TransferFunction), &'a TransferFunction),
    Table(fn(&mut P, &[f32]), &'a [f32]),
    ByteTables(fn(&mut P, &ByteTablesCtx), &'a ByteTablesCtx),
    ColorLut(fn(&mut P, &ColorLutCtx<'_>), &'a ColorLutCtx<'a>),
}

impl<'a, P> Op<'a, P> {
    fn bind(f: StageFn<P>, ctx: Context<'a>) -> Option<Self> {
        let op = match (f, ctx) {
            (StageFn::None(f), Context::None) => Op::None(f),
            (StageFn::Memory(f), Context::Memory(c)) => Op::Memory(f, c),
            (StageFn::Gather(f), Context::Gather(c)) => Op::Gather(f, c),
            (StageFn::Sampler(f), Context::Sampler(c)) => Op::Sampler(f, c),
            (StageFn::UniformColor(f), Context::UniformColor(c)) => Op::UniformColor(f, c),
            (StageFn::Value(f), Context::Value(v)) => Op::Value(f, v),
            (StageFn::Tile(f), Context::Tile(c)) => Op::Tile(f, c),
            (StageFn::Decal(f), Context::Decal(c)) => Op::Decal(f, c),
            (StageFn::Matrix(f), Context::Matrix(m)) => Op::Matrix(f, m),
            (StageFn::Gradient(f), Context::Gradient(c)) => Op::Gradient(f, c),
            (StageFn::TwoStopGradient(f), Context::TwoStopGradient(c)) => Op::TwoStopGradient(f, c),
            (StageFn::TwoPointConical(f), Context::TwoPointConical(c)) => Op::TwoPointConical(f, c),
            (StageFn::TransferFunction(f), Context::TransferFunction(c)) => {
                Op::TransferFunction(f, c)
            }
            (StageFn::Table(f), Context::Table(t)) => Op::Table(f, t),
            (StageFn::ByteTables(f), Context::ByteTables(c)) => Op::ByteTables(f, c),
            (StageFn::ColorLut(f), Context::ColorLut(c)) => Op::ColorLut(f, c),
            _ => return None,
        };

        Some(op)
    }

    #[inline(always)]
    fn call(&self, p: &mut P) {
        match *self {
            Op::None(f) => f(p),
            Op::Memory(f, c) => f(p, c),
            Op::Gather(f, c) => f(p, c),
            Op::Sampler(f, c) => f(p, c),
            Op::UniformColor(f, c) => f(p, c),
            Op::Value(f, v) => f(p, v),
            Op::Tile(f, c) => f(p, c),
            Op::Decal(f, c) => f(p, c),
            Op::Matrix(f, m) => f(p, m),
            Op::Gradient(f, c) => f(p, c),
            Op::TwoStopGradient(f, c) => f(p, c),
            Op::TwoPointConical(f, c) => f(p, c),
            Op::TransferFunction(f, c) => f(p, c),
            Op::Table(f, t) => f(p, t),
            Op::ByteTables(f, c) => f(p, c),
            Op::ColorLut(f, c) => f(p, c),
        }
    }
}

/// Per-chunk pipeline state.
pub(crate) trait ChunkState: Default {
    /// Number of pixels processed at once.
    const WIDTH: usize;

    /// Prepares the state for a new chunk.
    ///
    /// `tail` is the number of live pixels, where zero means all of them.
    fn reset(&mut self, dx: usize, dy: usize, tail: usize);
}

#[derive(Copy, Clone, Debug)]
enum Arg<'a> {
    Context(Context<'a>),
    // Matrices and uniform colors are stored inline,
    // so `push_transform` and `push_uniform_color` don't need a caller-owned context.
    Matrix { m: [f32; MAX_MATRIX_LEN], len: usize },
    UniformColor(UniformColorCtx),
}

impl<'a> Arg<'a> {
    fn context(&self) -> Context<'_> {
        match self {
            Arg::Context(c) => *c,
            Arg::Matrix { m, len } => Context::Matrix(&m[..*len]),
            Arg::UniformColor(c) => Context::UniformColor(c),
        }
    }
}

/// A raster pipeline builder.
#[derive(Debug)]
pub struct RasterPipelineBuilder<'a> {
    stages: ArrayVec<(Stage, Arg<'a>), MAX_STAGES>,
    force_hq_pipeline: bool,
    isa: Option<Isa>,
}

impl Default for RasterPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RasterPipelineBuilder<'a> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        RasterPipelineBuilder {
            stages: ArrayVec::new(),
            force_hq_pipeline: false,
            isa: None,
        }
    }

    /// Forces the high precision pipeline even when every stage has a lowp variant.
    pub fn set_force_hq_pipeline(&mut self, hq: bool) {
        self.force_hq_pipeline = hq;
    }

    /// Overrides the detected instruction set.
    pub fn set_isa(&mut self, isa: Isa) {
        self.isa = Some(isa);
    }

    /// Returns the number of pushed stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Checks that no stages were pushed.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Pushes a stage that doesn't read a context.
    pub fn push(&mut self, stage: Stage) -> Result<(), PipelineError> {
        self.push_with_context(stage, Context::None)
    }

    /// Pushes a stage with its context.
    pub fn push_with_context(&mut self, stage: Stage, ctx: Context<'a>) -> Result<(), PipelineError> {
        check_context_kind(stage, ctx.kind())?;

        let arg = match ctx {
            Context::Matrix(m) => matrix_arg(stage, m)?,
            Context::Table(t) if t.is_empty() => return Err(PipelineError::EmptyTable(stage)),
            Context::Gradient(g) if g.is_empty() => return Err(PipelineError::EmptyTable(stage)),
            _ => Arg::Context(ctx),
        };

        self.push_arg(stage, arg)
    }

    /// Pushes a matrix stage. The matrix is copied.
    pub fn push_matrix(&mut self, stage: Stage, m: &[f32]) -> Result<(), PipelineError> {
        check_context_kind(stage, ContextKind::Matrix)?;
        let arg = matrix_arg(stage, m)?;
        self.push_arg(stage, arg)
    }

    /// Pushes the cheapest matrix stage that can apply `ts` to the coordinates.
    ///
    /// An identity transform pushes nothing. A non-finite one is skipped.
    pub fn push_transform(&mut self, ts: Transform) -> Result<(), PipelineError> {
        if !ts.is_finite() {
            log::warn!("non-finite transform {:?} was skipped", ts);
            return Ok(());
        }

        if ts.is_identity() {
            Ok(())
        } else if ts.is_translate() {
            self.push_matrix(Stage::MatrixTranslate, &[ts.tx, ts.ty])
        } else if ts.is_scale_translate() {
            self.push_matrix(Stage::MatrixScaleTranslate, &[ts.sx, ts.sy, ts.tx, ts.ty])
        } else {
            self.push_matrix(Stage::Matrix2x3, &[ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty])
        }
    }

    /// Pushes a `UniformColor` stage. The color is copied.
    pub fn push_uniform_color(&mut self, c: PremultipliedColor) -> Result<(), PipelineError> {
        self.push_arg(Stage::UniformColor, Arg::UniformColor(UniformColorCtx::new(c)))
    }

    /// Pushes a `UniformColor` stage from a byte color.
    pub fn push_uniform_color_u8(&mut self, c: PremultipliedColorU8) -> Result<(), PipelineError> {
        self.push_arg(Stage::UniformColor, Arg::UniformColor(UniformColorCtx::from_color_u8(c)))
    }

    fn push_arg(&mut self, stage: Stage, arg: Arg<'a>) -> Result<(), PipelineError> {
        self.stages
            .try_push((stage, arg))
            .map_err(|_| PipelineError::TooManyStages(MAX_STAGES))
    }

    /// Selects a precision tier and an instruction set.
    pub fn compile(self) -> RasterPipeline<'a> {
        let isa = self.isa.unwrap_or_else(Isa::current);
        if !isa.is_available() {
            log::debug!("{:?} is not available on this CPU, using portable stage code", isa);
        }

        let highp_only = self.stages.iter().map(|(s, _)| *s).find(|s| !s.supports_lowp());
        let kind = if self.force_hq_pipeline || highp_only.is_some() {
            if let Some(stage) = highp_only {
                log::debug!("{:?} has no lowp implementation, using highp", stage);
            }

            if isa.highp_lanes() == 8 {
                RasterPipelineKind::High8
            } else {
                RasterPipelineKind::High4
            }
        } else {
            RasterPipelineKind::Low
        };

        RasterPipeline { stages: self.stages, kind, isa }
    }
}

fn check_context_kind(stage: Stage, found: ContextKind) -> Result<(), PipelineError> {
    let expected = stage.context_kind();
    if found != expected {
        return Err(PipelineError::ContextMismatch { stage, expected, found });
    }

    Ok(())
}

// Copies the coefficients, so the caller's slice can be a temporary.
fn matrix_arg(stage: Stage, m: &[f32]) -> Result<Arg<'static>, PipelineError> {
    let expected = stage.matrix_len();
    if m.len() != expected {
        return Err(PipelineError::InvalidMatrix { stage, expected, found: m.len() });
    }

    let mut inline = [0.0; MAX_MATRIX_LEN];
    inline[..m.len()].copy_from_slice(m);
    Ok(Arg::Matrix { m: inline, len: m.len() })
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum RasterPipelineKind {
    High4,
    High8,
    Low,
}

/// A compiled raster pipeline.
#[derive(Debug)]
pub struct RasterPipeline<'a> {
    stages: ArrayVec<(Stage, Arg<'a>), MAX_STAGES>,
    kind: RasterPipelineKind,
    isa: Isa,
}

impl RasterPipeline<'_> {
    /// Checks that the low precision tier was selected.
    pub fn is_lowp(&self) -> bool {
        self.kind == RasterPipelineKind::Low
    }

    /// Returns the instruction set the pipeline was compiled for.
    pub fn isa(&self) -> Isa {
        self.isa
    }

    /// Runs the pipeline over pixels `[x0, xlimit) x [y0, ylimit)`.
    ///
    /// Every memory and gather context is checked against the region first,
    /// so no pixel is touched when an error is returned.
    pub fn run(&self, x0: usize, y0: usize, xlimit: usize, ylimit: usize) -> Result<(), PipelineError> {
        if xlimit < x0 || ylimit < y0 {
            log::warn!("invalid pipeline region: {}x{} to {}x{}", x0, y0, xlimit, ylimit);
            return Err(PipelineError::InvalidRegion);
        }

        if xlimit == x0 || ylimit == y0 {
            return Ok(());
        }

        for (stage, arg) in &self.stages {
            if let Err(e) = check_buffer(*stage, arg.context(), xlimit, ylimit) {
                log::warn!("pipeline rejected: {}", e);
                return Err(e);
            }
        }

        let rect = (x0, y0, xlimit, ylimit);
        match self.kind {
            RasterPipelineKind::High4 => execute(isa::highp_x4(self.isa), &self.stages, rect),
            RasterPipelineKind::High8 => execute(isa::highp_x8(self.isa), &self.stages, rect),
            RasterPipelineKind::Low => execute(&isa::LOWP, &self.stages, rect),
        }
    }
}

fn check_buffer(stage: Stage, ctx: Context, xlimit: usize, ylimit: usize) -> Result<(), PipelineError> {
    let bpp = match stage.memory_format() {
        Some(format) => format.bytes_per_pixel(),
        None => return Ok(()),
    };

    let (required, available) = match ctx {
        Context::Memory(m) => {
            if stage.writes_memory() && !m.is_writable() {
                return Err(PipelineError::ReadOnlyBuffer(stage));
            }

            let required = (ylimit - 1)
                .checked_mul(m.stride())
                .and_then(|n| n.checked_add(xlimit))
                .and_then(|n| n.checked_mul(bpp));
            (required, m.len())
        }
        Context::Gather(g) => (g.pixels_count().checked_mul(bpp), g.buffer_len()),
        Context::Sampler(s) => (s.gather.pixels_count().checked_mul(bpp), s.gather.buffer_len()),
        _ => return Ok(()),
    };

    let required = required.unwrap_or(usize::MAX);
    if required > available {
        return Err(PipelineError::BufferTooSmall { stage, required, available });
    }

    Ok(())
}

fn execute<P: ChunkState>(
    table: &[StageFn<P>; STAGES_COUNT],
    stages: &[(Stage, Arg)],
    rect: (usize, usize, usize, usize),
) -> Result<(), PipelineError> {
    let mut ops: ArrayVec<Op<P>, MAX_STAGES> = ArrayVec::new();
    for (stage, arg) in stages {
        let ctx = arg.context();
        let op = Op::bind(table[*stage as usize], ctx).ok_or(PipelineError::ContextMismatch {
            stage: *stage,
            expected: stage.context_kind(),
            found: ctx.kind(),
        })?;
        ops.push(op);
    }

    let (x0, y0, xlimit, ylimit) = rect;
    let mut p = P::default();
    for dy in y0..ylimit {
        let mut dx = x0;
        while xlimit - dx >= P::WIDTH {
            p.reset(dx, dy, 0);
            for op in &ops {
                op.call(&mut p);
            }

            dx += P::WIDTH;
        }

        let tail = xlimit - dx;
        if tail != 0 {
            p.reset(dx, dy, tail);
            for op in &ops {
                op.call(&mut p);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod blend_tests {
    // Test blending modes.
    //
    // Skia has two kinds of a raster pipeline: high and low precision.
    // "High" uses f32 and "low" uses u16.
    // And for basic operations we don't need f32 and u16 simply faster.
    // But those modes are not identical. They can produce slightly different results
    // due rounding.

    use super::*;
    use crate::{Color, PremultipliedColorU8};

    macro_rules! test_blend {
        ($name:ident, $stage:expr, $is_highp:expr, $r:expr, $g:expr, $b:expr, $a:expr) => {
            #[test]
            fn $name() {
                // Color::from_rgba8(50, 127, 150, 200) premultiplied.
                let mut pixels = [39, 100, 118, 200];
                {
                    let ctx = MemoryCtx::new(&mut pixels, 1);

                    let mut p = RasterPipelineBuilder::new();
                    p.set_force_hq_pipeline($is_highp);
                    p.push_uniform_color(Color::from_rgba8(220, 140, 75, 180).premultiply()).unwrap();
                    p.push_with_context(Stage::Load8888Dst, Context::Memory(&ctx)).unwrap();
                    p.push($stage).unwrap();
                    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
                    let p = p.compile();
                    assert_eq!(p.is_lowp(), !$is_highp);
                    p.run(0, 0, 1, 1).unwrap();
                }

                assert_eq!(
                    PremultipliedColorU8::from_rgba(pixels[0], pixels[1], pixels[2], pixels[3]),
                    PremultipliedColorU8::from_rgba($r, $g, $b, $a)
                );
            }
        };
    }

    macro_rules! test_blend_lowp {
        ($name:ident, $stage:expr, $r:expr, $g:expr, $b:expr, $a:expr) => (
            test_blend!{$name, $stage, false, $r, $g, $b, $a}
        )
    }

    macro_rules! test_blend_highp {
        ($name:ident, $stage:expr, $r:expr, $g:expr, $b:expr, $a:expr) => (
            test_blend!{$name, $stage, true, $r, $g, $b, $a}
        )
    }

    test_blend_lowp!(clear_lowp,              Stage::Clear,                 0,   0,   0,   0);
    test_blend_lowp!(source_lowp,             Stage::Source,              155,  99,  53, 180);
    test_blend_lowp!(destination_lowp,        Stage::Destination,          39, 100, 118, 200);
    test_blend_lowp!(source_over_lowp,        Stage::SourceOver,          166, 128,  88, 239);
    test_blend_lowp!(destination_over_lowp,   Stage::DestinationOver,      72, 121, 129, 239);
    test_blend_lowp!(source_in_lowp,          Stage::SourceIn,            122,  78,  42, 141);
    test_blend_lowp!(destination_in_lowp,     Stage::DestinationIn,        28,  71,  83, 141);
    test_blend_lowp!(source_out_lowp,         Stage::SourceOut,            33,  21,  11,  39);
    test_blend_lowp!(destination_out_lowp,    Stage::DestinationOut,       11,  29,  35,  59);
    test_blend_lowp!(source_atop_lowp,        Stage::SourceAtop,          133, 107,  76, 200);
    test_blend_lowp!(destination_atop_lowp,   Stage::DestinationAtop,      61,  92,  95, 180);
    test_blend_lowp!(xor_lowp,                Stage::Xor,                  45,  51,  46,  98);
    test_blend_lowp!(plus_lowp,               Stage::Plus,                194, 199, 171, 255);
    test_blend_lowp!(modulate_lowp,           Stage::Modulate,             24,  39,  25, 141);
    test_blend_lowp!(screen_lowp,             Stage::Screen,              170, 160, 146, 239);
    test_blend_lowp!(overlay_lowp,            Stage::Overlay,              92, 128, 106, 239);
    test_blend_lowp!(darken_lowp,             Stage::Darken,               72, 121,  88, 239);
    test_blend_lowp!(lighten_lowp,            Stage::Lighten,             166, 128, 129, 239);
    // ColorDodge in not available for lowp.
    // ColorBurn in not available for lowp.
    test_blend_lowp!(hard_light_lowp,         Stage::HardLight,           155, 128,  95, 239);
    // SoftLight in not available for lowp.
    test_blend_lowp!(difference_lowp,         Stage::Difference,          138,  57,  87, 239);
    test_blend_lowp!(exclusion_lowp,          Stage::Exclusion,           146, 121, 121, 239);
    test_blend_lowp!(multiply_lowp,           Stage::Multiply,             69,  90,  71, 239);
    // Hue in not available for lowp.
    // Saturation in not available for lowp.
    // Color in not available for lowp.
    // Luminosity in not available for lowp.

    test_blend_highp!(clear_highp,            Stage::Clear,                 0,   0,   0,   0);
    test_blend_highp!(source_highp,           Stage::Source,              155,  99,  53, 180);
    test_blend_highp!(destination_highp,      Stage::Destination,          39, 100, 118, 200);
    test_blend_highp!(source_over_highp,      Stage::SourceOver,          167, 128,  88, 239);
    test_blend_highp!(destination_over_highp, Stage::DestinationOver,      72, 121, 129, 239);
    test_blend_highp!(source_in_highp,        Stage::SourceIn,            122,  78,  42, 141);
    test_blend_highp!(destination_in_highp,   Stage::DestinationIn,        28,  71,  83, 141);
    test_blend_highp!(source_out_highp,       Stage::SourceOut,            33,  21,  11,  39);
    test_blend_highp!(destination_out_highp,  Stage::DestinationOut,       11,  29,  35,  59);
    test_blend_highp!(source_atop_highp,      Stage::SourceAtop,          133, 107,  76, 200);
    test_blend_highp!(destination_atop_highp, Stage::DestinationAtop,      61,  92,  95, 180);
    test_blend_highp!(xor_highp,              Stage::Xor,                  45,  51,  46,  98);
    test_blend_highp!(plus_highp,             Stage::Plus,                194, 199, 171, 255);
    test_blend_highp!(modulate_highp,         Stage::Modulate,             24,  39,  24, 141);
    test_blend_highp!(screen_highp,           Stage::Screen,              171, 160, 146, 239);
    test_blend_highp!(overlay_highp,          Stage::Overlay,              92, 128, 106, 239);
    test_blend_highp!(darken_highp,           Stage::Darken,               72, 121,  88, 239);
    test_blend_highp!(lighten_highp,          Stage::Lighten,             167, 128, 129, 239);
    test_blend_highp!(color_dodge_highp,      Stage::ColorDodge,          186, 192, 164, 239);
    test_blend_highp!(color_burn_highp,       Stage::ColorBurn,            54,  63,  46, 239);
    test_blend_highp!(hard_light_highp,       Stage::HardLight,           155, 128,  95, 239);
    test_blend_highp!(soft_light_highp,       Stage::SoftLight,            98, 124, 115, 239);
    test_blend_highp!(difference_highp,       Stage::Difference,          139,  58,  88, 239);
    test_blend_highp!(exclusion_highp,        Stage::Exclusion,           147, 121, 122, 239);
    test_blend_highp!(multiply_highp,         Stage::Multiply,             69,  89,  71, 239);
    test_blend_highp!(hue_highp,              Stage::Hue,                 128, 103,  74, 239);
    test_blend_highp!(saturation_highp,       Stage::Saturation,           59, 126, 140, 239);
    test_blend_highp!(color_highp,            Stage::Color,               139, 100,  60, 239);
    test_blend_highp!(luminosity_highp,       Stage::Luminosity,          100, 149, 157, 239);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_consistent() {
        assert_eq!(STAGES_COUNT, Stage::ALL.len());
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(*stage as usize, i);

            let has_memory = matches!(
                stage.context_kind(),
                ContextKind::Memory | ContextKind::Gather | ContextKind::Sampler
            );
            assert_eq!(stage.memory_format().is_some(), has_memory, "{:?}", stage);
            assert_eq!(stage.matrix_len() != 0, stage.context_kind() == ContextKind::Matrix);
        }
    }

    #[test]
    fn every_stage_has_highp() {
        for stage in Stage::ALL {
            assert!(isa::HIGHP_X4[*stage as usize].is_supported(), "{:?}", stage);
            assert!(isa::HIGHP_X8[*stage as usize].is_supported(), "{:?}", stage);
        }
    }

    #[test]
    fn lowp_coverage() {
        assert!(Stage::Load8888.supports_lowp());
        assert!(Stage::SourceOverRgba8888.supports_lowp());
        assert!(Stage::EvenlySpaced2StopGradient.supports_lowp());
        assert!(!Stage::ColorBurn.supports_lowp());
        assert!(!Stage::LoadF16.supports_lowp());
        assert!(!Stage::Hue.supports_lowp());
    }

    #[test]
    fn context_mismatch() {
        let mut p = RasterPipelineBuilder::new();
        assert_eq!(
            p.push(Stage::Load8888),
            Err(PipelineError::ContextMismatch {
                stage: Stage::Load8888,
                expected: ContextKind::Memory,
                found: ContextKind::None,
            })
        );
        assert!(p.is_empty());
    }

    #[test]
    fn invalid_matrix() {
        let mut p = RasterPipelineBuilder::new();
        assert_eq!(
            p.push_matrix(Stage::Matrix2x3, &[1.0, 0.0, 0.0, 1.0]),
            Err(PipelineError::InvalidMatrix { stage: Stage::Matrix2x3, expected: 6, found: 4 })
        );
    }

    #[test]
    fn matrix_is_copied() {
        let mut p = RasterPipelineBuilder::new();
        {
            let m = alloc::vec![1.0, 2.0];
            p.push_matrix(Stage::MatrixTranslate, &m).unwrap();
        }

        assert_eq!(p.stages[0].1.context().kind(), ContextKind::Matrix);
        match p.stages[0].1.context() {
            Context::Matrix(m) => assert_eq!(m, &[1.0, 2.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn matrix_for_non_matrix_stage() {
        let mut p = RasterPipelineBuilder::new();
        assert_eq!(
            p.push_matrix(Stage::SwapRb, &[1.0, 2.0]),
            Err(PipelineError::ContextMismatch {
                stage: Stage::SwapRb,
                expected: ContextKind::None,
                found: ContextKind::Matrix,
            })
        );
        assert!(p.is_empty());
    }

    #[test]
    fn empty_table() {
        let mut p = RasterPipelineBuilder::new();
        assert_eq!(
            p.push_with_context(Stage::TableR, Context::Table(&[])),
            Err(PipelineError::EmptyTable(Stage::TableR))
        );
    }

    #[test]
    fn too_many_stages() {
        let mut p = RasterPipelineBuilder::new();
        for _ in 0..MAX_STAGES {
            p.push(Stage::Clamp0).unwrap();
        }

        assert_eq!(p.push(Stage::Clamp0), Err(PipelineError::TooManyStages(MAX_STAGES)));
    }

    #[test]
    fn transform_selection() {
        let mut p = RasterPipelineBuilder::new();
        p.push_transform(Transform::identity()).unwrap();
        assert_eq!(p.len(), 0);
        p.push_transform(Transform::from_translate(1.0, 2.0)).unwrap();
        p.push_transform(Transform::from_scale(2.0, 3.0)).unwrap();
        p.push_transform(Transform::from_row(1.0, 0.5, 0.0, 1.0, 0.0, 0.0)).unwrap();
        p.push_transform(Transform::from_translate(f32::NAN, 0.0)).unwrap();

        let stages: ArrayVec<Stage, 4> = p.stages.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages.as_slice(),
            &[Stage::MatrixTranslate, Stage::MatrixScaleTranslate, Stage::Matrix2x3]
        );
    }
}
