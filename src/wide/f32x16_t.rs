// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{f32x8, u16x16};

/// Sixteen floats used by lowp stages for coordinates and gradient parameters.
#[derive(Copy, Clone, Debug)]
#[repr(C, align(32))]
pub struct f32x16(pub f32x8, pub f32x8);

unsafe impl bytemuck::Zeroable for f32x16 {}
unsafe impl bytemuck::Pod for f32x16 {}

impl Default for f32x16 {
    fn default() -> Self {
        Self::splat(0.0)
    }
}

impl f32x16 {
    pub fn splat(n: f32) -> Self {
        Self(f32x8::splat(n), f32x8::splat(n))
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs(), self.1.abs())
    }

    pub fn cmp_gt(&self, rhs: &Self) -> Self {
        Self(self.0.cmp_gt(rhs.0), self.1.cmp_gt(rhs.1))
    }

    pub fn cmp_lt(&self, rhs: &Self) -> Self {
        Self(self.0.cmp_lt(rhs.0), self.1.cmp_lt(rhs.1))
    }

    pub fn blend(self, t: Self, f: Self) -> Self {
        Self(self.0.blend(t.0, f.0), self.1.blend(t.1, f.1))
    }

    pub fn normalize(&self) -> Self {
        Self(self.0.normalize(), self.1.normalize())
    }

    pub fn floor(&self) -> Self {
        Self(self.0.floor(), self.1.floor())
    }

    pub fn sqrt(&self) -> Self {
        Self(self.0.sqrt(), self.1.sqrt())
    }

    pub fn min(&self, rhs: &Self) -> Self {
        Self(self.0.min(rhs.0), self.1.min(rhs.1))
    }

    pub fn max(&self, rhs: &Self) -> Self {
        Self(self.0.max(rhs.0), self.1.max(rhs.1))
    }

    pub fn recip_fast(&self) -> Self {
        Self(self.0.recip_fast(), self.1.recip_fast())
    }

    /// Widens every lane of `v`.
    pub fn from_u16x16(v: &u16x16) -> Self {
        let mut n0 = [0.0; 8];
        let mut n1 = [0.0; 8];
        for i in 0..8 {
            n0[i] = f32::from(v.0[i]);
            n1[i] = f32::from(v.0[i + 8]);
        }

        Self(f32x8::from(n0), f32x8::from(n1))
    }

    /// Narrows into `u16x16` by truncation. Callers must keep lanes in range.
    // This method is too heavy and shouldn't be inlined.
    pub fn save_to_u16x16(&self, dst: &mut u16x16) {
        // Do not use rounding here, Skia truncates as well.
        let n0: [f32; 8] = self.0.into();
        let n1: [f32; 8] = self.1.into();

        for i in 0..8 {
            dst.0[i] = n0[i] as u16;
            dst.0[i + 8] = n1[i] as u16;
        }
    }
}

impl From<[f32; 16]> for f32x16 {
    fn from(v: [f32; 16]) -> Self {
        bytemuck::cast(v)
    }
}

impl From<f32x16> for [f32; 16] {
    fn from(v: f32x16) -> Self {
        bytemuck::cast(v)
    }
}

impl core::ops::Add<f32x16> for f32x16 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl core::ops::Sub<f32x16> for f32x16 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl core::ops::Mul<f32x16> for f32x16 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0, self.1 * rhs.1)
    }
}

impl core::ops::Div<f32x16> for f32x16 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self(self.0 / rhs.0, self.1 / rhs.1)
    }
}
