// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

use super::{f32x4, u32x4};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct i32x4(pub __m128i);
    } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
        use core::arch::aarch64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct i32x4(pub int32x4_t);
    } else {
        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct i32x4([i32; 4]);
    }
}

unsafe impl bytemuck::Zeroable for i32x4 {}
unsafe impl bytemuck::Pod for i32x4 {}

impl Default for i32x4 {
    fn default() -> Self {
        Self::splat(0)
    }
}

#[allow(unused_macros)]
macro_rules! per_lane {
    ($a:expr, $b:expr, |$x:ident, $y:ident| $e:expr) => {{
        let a: [i32; 4] = cast($a);
        let b: [i32; 4] = cast($b);
        let f = |$x: i32, $y: i32| -> i32 { $e };
        cast([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }};
}

impl i32x4 {
    pub fn splat(n: i32) -> Self {
        cast([n, n, n, n])
    }

    pub fn blend(self, t: Self, f: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse4.1"))] {
                Self(unsafe { _mm_blendv_epi8(f.0, t.0, self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vbslq_s32(vreinterpretq_u32_s32(self.0), t.0, f.0) })
            } else {
                super::generic_bit_blend(self, t, f)
            }
        }
    }

    pub fn cmp_gt(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmpgt_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_s32_u32(vcgtq_s32(self.0, rhs.0)) })
            } else {
                per_lane!(self, rhs, |a, b| if a > b { -1 } else { 0 })
            }
        }
    }

    pub fn cmp_lt(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmplt_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_s32_u32(vcltq_s32(self.0, rhs.0)) })
            } else {
                per_lane!(self, rhs, |a, b| if a < b { -1 } else { 0 })
            }
        }
    }

    pub fn min(self, rhs: Self) -> Self {
        self.cmp_lt(rhs).blend(self, rhs)
    }

    pub fn max(self, rhs: Self) -> Self {
        self.cmp_gt(rhs).blend(self, rhs)
    }

    /// Shifts each lane left by `n` bits.
    pub fn shl(self, n: u32) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sll_epi32(self.0, _mm_cvtsi32_si128(n as i32)) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vshlq_s32(self.0, vdupq_n_s32(n as i32)) })
            } else {
                let a: [i32; 4] = cast(self);
                cast([a[0] << n, a[1] << n, a[2] << n, a[3] << n])
            }
        }
    }

    /// Arithmetic right shift.
    pub fn shr(self, n: u32) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sra_epi32(self.0, _mm_cvtsi32_si128(n as i32)) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vshlq_s32(self.0, vdupq_n_s32(-(n as i32))) })
            } else {
                let a: [i32; 4] = cast(self);
                cast([a[0] >> n, a[1] >> n, a[2] >> n, a[3] >> n])
            }
        }
    }

    pub fn to_f32x4(self) -> f32x4 {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                cast(unsafe { _mm_cvtepi32_ps(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                cast(unsafe { vcvtq_f32_s32(self.0) })
            } else {
                let arr: [i32; 4] = cast(self);
                cast([arr[0] as f32, arr[1] as f32, arr[2] as f32, arr[3] as f32])
            }
        }
    }

    pub fn to_u32x4_bitcast(self) -> u32x4 {
        cast(self)
    }

    pub fn to_f32x4_bitcast(self) -> f32x4 {
        cast(self)
    }
}

impl From<[i32; 4]> for i32x4 {
    fn from(v: [i32; 4]) -> Self {
        cast(v)
    }
}

impl From<i32x4> for [i32; 4] {
    fn from(v: i32x4) -> Self {
        cast(v)
    }
}

impl core::ops::Add for i32x4 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_add_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vaddq_s32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a.wrapping_add(b))
            }
        }
    }
}

impl core::ops::Sub for i32x4 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sub_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vsubq_s32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a.wrapping_sub(b))
            }
        }
    }
}

impl core::ops::Mul for i32x4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse4.1"))] {
                Self(unsafe { _mm_mullo_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vmulq_s32(self.0, rhs.0) })
            } else {
                // Cast is required, since we have to use scalar multiplication on SSE2.
                per_lane!(self, rhs, |a, b| a.wrapping_mul(b))
            }
        }
    }
}

impl core::ops::BitAnd for i32x4 {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_and_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vandq_s32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a & b)
            }
        }
    }
}

impl core::ops::BitOr for i32x4 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_or_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vorrq_s32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a | b)
            }
        }
    }
}

impl core::ops::BitXor for i32x4 {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_xor_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { veorq_s32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a ^ b)
            }
        }
    }
}

impl core::ops::Not for i32x4 {
    type Output = Self;

    fn not(self) -> Self {
        self ^ Self::splat(-1)
    }
}

impl core::cmp::PartialEq for i32x4 {
    fn eq(&self, rhs: &Self) -> bool {
        let a: [i32; 4] = cast(*self);
        let b: [i32; 4] = cast(*rhs);
        a == b
    }
}
