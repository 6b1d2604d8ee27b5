// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

use super::{f32x8, i32x8, u32x4};

#[derive(Clone, Copy, Debug)]
#[repr(C, align(32))]
pub struct u32x8(pub u32x4, pub u32x4);

unsafe impl bytemuck::Zeroable for u32x8 {}
unsafe impl bytemuck::Pod for u32x8 {}

impl Default for u32x8 {
    fn default() -> Self {
        Self::splat(0)
    }
}

impl u32x8 {
    pub fn splat(n: u32) -> Self {
        Self(u32x4::splat(n), u32x4::splat(n))
    }

    pub fn shl(self, n: u32) -> Self {
        Self(self.0.shl(n), self.1.shl(n))
    }

    pub fn shr(self, n: u32) -> Self {
        Self(self.0.shr(n), self.1.shr(n))
    }

    pub fn to_i32x8_bitcast(self) -> i32x8 {
        cast(self)
    }

    pub fn to_f32x8_bitcast(self) -> f32x8 {
        cast(self)
    }
}

impl From<[u32; 8]> for u32x8 {
    fn from(v: [u32; 8]) -> Self {
        cast(v)
    }
}

impl From<u32x8> for [u32; 8] {
    fn from(v: u32x8) -> Self {
        cast(v)
    }
}

impl core::ops::Add for u32x8 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl core::ops::Sub for u32x8 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl core::ops::BitAnd for u32x8 {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0, self.1 & rhs.1)
    }
}

impl core::ops::BitOr for u32x8 {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0, self.1 | rhs.1)
    }
}

impl core::ops::BitXor for u32x8 {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0, self.1 ^ rhs.1)
    }
}

impl core::ops::Not for u32x8 {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0, !self.1)
    }
}

impl core::cmp::PartialEq for u32x8 {
    fn eq(&self, rhs: &Self) -> bool {
        self.0 == rhs.0 && self.1 == rhs.1
    }
}
