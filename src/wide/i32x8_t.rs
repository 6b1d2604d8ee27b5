// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

use super::{f32x8, i32x4, u32x8};

// Integer lanes stay as two halves even on AVX, since 256-bit integer
// arithmetic needs AVX2.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(32))]
pub struct i32x8(pub i32x4, pub i32x4);

unsafe impl bytemuck::Zeroable for i32x8 {}
unsafe impl bytemuck::Pod for i32x8 {}

impl Default for i32x8 {
    fn default() -> Self {
        Self::splat(0)
    }
}

impl i32x8 {
    pub fn splat(n: i32) -> Self {
        Self(i32x4::splat(n), i32x4::splat(n))
    }

    pub fn blend(self, t: Self, f: Self) -> Self {
        Self(self.0.blend(t.0, f.0), self.1.blend(t.1, f.1))
    }

    pub fn cmp_lt(self, rhs: Self) -> Self {
        Self(self.0.cmp_lt(rhs.0), self.1.cmp_lt(rhs.1))
    }

    pub fn min(self, rhs: Self) -> Self {
        Self(self.0.min(rhs.0), self.1.min(rhs.1))
    }

    pub fn max(self, rhs: Self) -> Self {
        Self(self.0.max(rhs.0), self.1.max(rhs.1))
    }

    pub fn shl(self, n: u32) -> Self {
        Self(self.0.shl(n), self.1.shl(n))
    }

    pub fn shr(self, n: u32) -> Self {
        Self(self.0.shr(n), self.1.shr(n))
    }

    pub fn to_f32x8(self) -> f32x8 {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx"))] {
                #[cfg(target_arch = "x86")]
                use core::arch::x86::*;
                #[cfg(target_arch = "x86_64")]
                use core::arch::x86_64::*;

                let v: __m256i = cast(self);
                cast(unsafe { _mm256_cvtepi32_ps(v) })
            } else {
                f32x8(self.0.to_f32x4(), self.1.to_f32x4())
            }
        }
    }

    pub fn to_u32x8_bitcast(self) -> u32x8 {
        cast(self)
    }

    pub fn to_f32x8_bitcast(self) -> f32x8 {
        cast(self)
    }
}

impl From<[i32; 8]> for i32x8 {
    fn from(v: [i32; 8]) -> Self {
        cast(v)
    }
}

impl From<i32x8> for [i32; 8] {
    fn from(v: i32x8) -> Self {
        cast(v)
    }
}

impl core::ops::Add for i32x8 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl core::ops::Sub for i32x8 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl core::ops::Mul for i32x8 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0, self.1 * rhs.1)
    }
}

impl core::ops::BitAnd for i32x8 {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0, self.1 & rhs.1)
    }
}

impl core::ops::BitOr for i32x8 {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0, self.1 | rhs.1)
    }
}

impl core::ops::BitXor for i32x8 {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0, self.1 ^ rhs.1)
    }
}

impl core::ops::Not for i32x8 {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0, !self.1)
    }
}

impl core::cmp::PartialEq for i32x8 {
    fn eq(&self, rhs: &Self) -> bool {
        self.0 == rhs.0 && self.1 == rhs.1
    }
}
