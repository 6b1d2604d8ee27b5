// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::pipeline::{ContextKind, Stage};

/// Errors reported while assembling or running a pipeline.
///
/// Stages themselves never fail. Everything here is detected either when
/// a stage is pushed or once per `run`, before any pixel is touched.
#[derive(Clone, Copy, PartialEq, Debug, thiserror::Error)]
pub enum PipelineError {
    /// The program has more stages than `MAX_STAGES`.
    #[error("a pipeline cannot have more than {0} stages")]
    TooManyStages(usize),

    /// A stage was pushed with a context of the wrong kind.
    #[error("stage {stage:?} expects a {expected:?} context, got {found:?}")]
    ContextMismatch {
        /// The pushed stage.
        stage: Stage,
        /// The context kind the stage reads.
        expected: ContextKind,
        /// The context kind that was provided.
        found: ContextKind,
    },

    /// A matrix stage got the wrong number of coefficients.
    #[error("stage {stage:?} expects {expected} matrix coefficients, got {found}")]
    InvalidMatrix {
        /// The pushed stage.
        stage: Stage,
        /// Required number of coefficients.
        expected: usize,
        /// Provided number of coefficients.
        found: usize,
    },

    /// A table stage got an empty table.
    #[error("stage {0:?} got an empty lookup table")]
    EmptyTable(Stage),

    /// A memory or gather buffer doesn't cover the requested region.
    #[error("buffer of stage {stage:?} is too small: {required} bytes required, {available} available")]
    BufferTooSmall {
        /// The stage that reads or writes the buffer.
        stage: Stage,
        /// Number of bytes the region needs.
        required: usize,
        /// Number of bytes the buffer has.
        available: usize,
    },

    /// A store stage was bound to a read-only buffer.
    #[error("stage {0:?} writes into a read-only buffer")]
    ReadOnlyBuffer(Stage),

    /// `xlimit < x0` or `ylimit < y0`.
    #[error("invalid pipeline region")]
    InvalidRegion,
}
