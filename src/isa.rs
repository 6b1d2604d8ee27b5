// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Instruction set selection and stage dispatch tables.
//!
//! Intrinsics inside lane types are selected at compile time by target features.
//! At runtime we choose how wide the highp lanes are, `f32x4` or `f32x8`,
//! and on x86 which `#[target_feature]` table the stages come from.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::pipeline::{StageFn, STAGES_COUNT};
use crate::pipeline::{highp, lowp};
use crate::wide::{f32x4, f32x8};

/// An instruction set tier.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Isa {
    Portable,
    Sse2,
    Sse41,
    Avx,
    /// AVX2 + FMA (Haswell).
    Hsw,
    Neon,
}

// Zero means "not detected yet".
static DETECTED: AtomicU8 = AtomicU8::new(0);

impl Isa {
    const ALL: [Isa; 6] = [Isa::Portable, Isa::Sse2, Isa::Sse41, Isa::Avx, Isa::Hsw, Isa::Neon];

    /// Probes the CPU.
    ///
    /// Without the `std` feature only compile-time target features are used.
    pub fn detect() -> Isa {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "std", any(target_arch = "x86", target_arch = "x86_64")))] {
                if std::is_x86_feature_detected!("avx2") && std::is_x86_feature_detected!("fma") {
                    Isa::Hsw
                } else if std::is_x86_feature_detected!("avx") {
                    Isa::Avx
                } else if std::is_x86_feature_detected!("sse4.1") {
                    Isa::Sse41
                } else if std::is_x86_feature_detected!("sse2") {
                    Isa::Sse2
                } else {
                    Isa::Portable
                }
            } else if #[cfg(all(target_feature = "avx2", target_feature = "fma"))] {
                Isa::Hsw
            } else if #[cfg(target_feature = "avx")] {
                Isa::Avx
            } else if #[cfg(target_feature = "sse4.1")] {
                Isa::Sse41
            } else if #[cfg(target_feature = "sse2")] {
                Isa::Sse2
            } else if #[cfg(all(target_arch = "aarch64", target_feature = "neon"))] {
                Isa::Neon
            } else {
                Isa::Portable
            }
        }
    }

    /// Returns the detected instruction set.
    ///
    /// The CPU is probed once per process.
    pub fn current() -> Isa {
        let n = DETECTED.load(Ordering::Relaxed);
        if n != 0 {
            return Isa::ALL[usize::from(n - 1)];
        }

        let isa = Isa::detect();
        log::debug!("detected instruction set: {:?}", isa);
        DETECTED.store(isa as u8 + 1, Ordering::Relaxed);
        isa
    }

    /// Checks that code compiled for this instruction set can run on the current CPU.
    ///
    /// A pipeline forced to an unavailable set keeps its lane width
    /// but runs the portable stage code.
    pub fn is_available(self) -> bool {
        let current = Isa::current();
        match (self, current) {
            (Isa::Portable, _) => true,
            (Isa::Neon, _) => current == Isa::Neon,
            (_, Isa::Neon) => false,
            // x86 sets are ordered, each one includes the previous.
            _ => self as u8 <= current as u8,
        }
    }

    /// Returns the number of highp lanes.
    pub(crate) fn highp_lanes(self) -> usize {
        match self {
            Isa::Avx | Isa::Hsw => 8,
            Isa::Portable | Isa::Sse2 | Isa::Sse41 | Isa::Neon => 4,
        }
    }
}

pub(crate) static HIGHP_X4: [StageFn<highp::Pipeline<f32x4>>; STAGES_COUNT] =
    highp::stages_table::<f32x4>();

pub(crate) static HIGHP_X8: [StageFn<highp::Pipeline<f32x8>>; STAGES_COUNT] =
    highp::stages_table::<f32x8>();

pub(crate) static LOWP: [StageFn<lowp::Pipeline>; STAGES_COUNT] = lowp::stages_table();

#[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]
static HIGHP_SSE41_X4: [StageFn<highp::Pipeline<f32x4>>; STAGES_COUNT] =
    highp::x86::sse41_table::<f32x4>();

#[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]
static HIGHP_AVX_X8: [StageFn<highp::Pipeline<f32x8>>; STAGES_COUNT] =
    highp::x86::avx_table::<f32x8>();

#[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]
static HIGHP_HSW_X8: [StageFn<highp::Pipeline<f32x8>>; STAGES_COUNT] =
    highp::x86::hsw_table::<f32x8>();

/// Returns the 4-lane highp table for an instruction set.
pub(crate) fn highp_x4(isa: Isa) -> &'static [StageFn<highp::Pipeline<f32x4>>; STAGES_COUNT] {
    cfg_if::cfg_if! {
        if #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))] {
            if isa == Isa::Sse41 && isa.is_available() {
                return &HIGHP_SSE41_X4;
            }
        } else {
            let _ = isa;
        }
    }

    &HIGHP_X4
}

/// Returns the 8-lane highp table for an instruction set.
pub(crate) fn highp_x8(isa: Isa) -> &'static [StageFn<highp::Pipeline<f32x8>>; STAGES_COUNT] {
    cfg_if::cfg_if! {
        if #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))] {
            if isa.is_available() {
                match isa {
                    Isa::Hsw => return &HIGHP_HSW_X8,
                    Isa::Avx => return &HIGHP_AVX_X8,
                    _ => {}
                }
            }
        } else {
            let _ = isa;
        }
    }

    &HIGHP_X8
}

/// Fills a row of 16-bit pixels.
pub fn memset16(buf: &mut [u16], v: u16) {
    buf.fill(v);
}

/// Fills a row of 32-bit pixels.
pub fn memset32(buf: &mut [u32], v: u32) {
    buf.fill(v);
}

/// Fills a row of 64-bit pixels.
pub fn memset64(buf: &mut [u64], v: u64) {
    buf.fill(v);
}
