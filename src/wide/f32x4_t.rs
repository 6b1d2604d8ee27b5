// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

#[cfg(all(not(feature = "std"), feature = "no-std-float"))]
use crate::scalar::NoStdFloat;

use super::{i32x4, u32x4};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct f32x4(__m128);
    } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
        use core::arch::aarch64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct f32x4(float32x4_t);
    } else {
        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct f32x4([f32; 4]);
    }
}

unsafe impl bytemuck::Zeroable for f32x4 {}
unsafe impl bytemuck::Pod for f32x4 {}

impl Default for f32x4 {
    fn default() -> Self {
        Self::splat(0.0)
    }
}

// Applies a scalar method to each lane. Used by the portable backend.
#[allow(unused_macros)]
macro_rules! per_lane {
    ($a:expr, |$x:ident| $e:expr) => {{
        let arr: [f32; 4] = cast($a);
        let f = |$x: f32| $e;
        cast([f(arr[0]), f(arr[1]), f(arr[2]), f(arr[3])])
    }};
    ($a:expr, $b:expr, |$x:ident, $y:ident| $e:expr) => {{
        let a: [f32; 4] = cast($a);
        let b: [f32; 4] = cast($b);
        let f = |$x: f32, $y: f32| $e;
        cast([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }};
}

#[allow(unused_macros)]
macro_rules! mask_lane {
    ($a:expr, $b:expr, $op:tt) => {{
        let a: [f32; 4] = cast($a);
        let b: [f32; 4] = cast($b);
        let m = |c: bool| if c { u32::MAX } else { 0 };
        cast([m(a[0] $op b[0]), m(a[1] $op b[1]), m(a[2] $op b[2]), m(a[3] $op b[3])])
    }};
}

impl f32x4 {
    pub fn splat(n: f32) -> Self {
        cast([n, n, n, n])
    }

    pub fn floor(self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse4.1"))] {
                Self(unsafe { _mm_floor_ps(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vrndmq_f32(self.0) })
            } else {
                let roundtrip: f32x4 = self.trunc_int().to_f32x4();
                roundtrip - roundtrip.cmp_gt(self).blend(f32x4::splat(1.0), f32x4::default())
            }
        }
    }

    pub fn fract(self) -> Self {
        self - self.floor()
    }

    pub fn normalize(self) -> Self {
        self.max(f32x4::default()).min(f32x4::splat(1.0))
    }

    pub fn abs(self) -> Self {
        let non_sign_bits = f32x4::splat(f32::from_bits(i32::MAX as u32));
        self & non_sign_bits
    }

    pub fn max(self, rhs: Self) -> Self {
        // These technically don't have the same semantics for NaN and 0, but it
        // doesn't seem to matter as Skia does it the same way.
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_max_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vmaxq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| if a > b { a } else { b })
            }
        }
    }

    pub fn min(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_min_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vminq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| if a < b { a } else { b })
            }
        }
    }

    pub fn cmp_eq(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmpeq_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vceqq_f32(self.0, rhs.0)) })
            } else {
                mask_lane!(self, rhs, ==)
            }
        }
    }

    pub fn cmp_ne(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmpneq_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vmvnq_u32(vceqq_f32(self.0, rhs.0))) })
            } else {
                mask_lane!(self, rhs, !=)
            }
        }
    }

    pub fn cmp_ge(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmpge_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vcgeq_f32(self.0, rhs.0)) })
            } else {
                mask_lane!(self, rhs, >=)
            }
        }
    }

    pub fn cmp_gt(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmpgt_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vcgtq_f32(self.0, rhs.0)) })
            } else {
                mask_lane!(self, rhs, >)
            }
        }
    }

    pub fn cmp_le(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmple_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vcleq_f32(self.0, rhs.0)) })
            } else {
                mask_lane!(self, rhs, <=)
            }
        }
    }

    pub fn cmp_lt(self, rhs: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_cmplt_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vreinterpretq_f32_u32(vcltq_f32(self.0, rhs.0)) })
            } else {
                mask_lane!(self, rhs, <)
            }
        }
    }

    /// Selects `t` where `self` has all bits set and `f` elsewhere.
    #[inline]
    pub fn blend(self, t: Self, f: Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse4.1"))] {
                Self(unsafe { _mm_blendv_ps(f.0, t.0, self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vbslq_f32(vreinterpretq_u32_f32(self.0), t.0, f.0) })
            } else {
                super::generic_bit_blend(self, t, f)
            }
        }
    }

    pub fn trunc_int(self) -> i32x4 {
        // These technically don't have the same semantics for NaN and out of
        // range values, but it doesn't seem to matter as Skia does it the same
        // way.
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                i32x4(unsafe { _mm_cvttps_epi32(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                i32x4(unsafe { vcvtq_s32_f32(self.0) })
            } else {
                let arr: [f32; 4] = cast(self);
                i32x4::from([arr[0] as i32, arr[1] as i32, arr[2] as i32, arr[3] as i32])
            }
        }
    }

    pub fn recip_fast(self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_rcp_ps(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                unsafe {
                    let e = vrecpeq_f32(self.0);
                    Self(vmulq_f32(vrecpsq_f32(self.0, e), e))
                }
            } else {
                per_lane!(self, |x| 1.0 / x)
            }
        }
    }

    pub fn recip_sqrt(self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_rsqrt_ps(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                unsafe {
                    let e = vrsqrteq_f32(self.0);
                    Self(vmulq_f32(vrsqrtsq_f32(self.0, vmulq_f32(e, e)), e))
                }
            } else {
                per_lane!(self, |x| 1.0 / x.sqrt())
            }
        }
    }

    pub fn sqrt(self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sqrt_ps(self.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vsqrtq_f32(self.0) })
            } else {
                per_lane!(self, |x| x.sqrt())
            }
        }
    }

    pub fn to_i32x4_bitcast(self) -> i32x4 {
        cast(self)
    }

    pub fn to_u32x4_bitcast(self) -> u32x4 {
        cast(self)
    }
}

impl From<[f32; 4]> for f32x4 {
    fn from(v: [f32; 4]) -> Self {
        cast(v)
    }
}

impl From<f32x4> for [f32; 4] {
    fn from(v: f32x4) -> Self {
        cast(v)
    }
}

impl core::ops::Add for f32x4 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_add_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vaddq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a + b)
            }
        }
    }
}

impl core::ops::AddAssign for f32x4 {
    fn add_assign(&mut self, rhs: f32x4) {
        *self = *self + rhs;
    }
}

impl core::ops::Sub for f32x4 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sub_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vsubq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a - b)
            }
        }
    }
}

impl core::ops::SubAssign for f32x4 {
    fn sub_assign(&mut self, rhs: f32x4) {
        *self = *self - rhs;
    }
}

impl core::ops::Mul for f32x4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_mul_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vmulq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a * b)
            }
        }
    }
}

impl core::ops::MulAssign for f32x4 {
    fn mul_assign(&mut self, rhs: f32x4) {
        *self = *self * rhs;
    }
}

impl core::ops::Div for f32x4 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_div_ps(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vdivq_f32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a / b)
            }
        }
    }
}

impl core::ops::BitAnd for f32x4 {
    type Output = Self;

    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_and_ps(self.0, rhs.0) })
            } else {
                cast(self.to_u32x4_bitcast() & rhs.to_u32x4_bitcast())
            }
        }
    }
}

impl core::ops::BitOr for f32x4 {
    type Output = Self;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_or_ps(self.0, rhs.0) })
            } else {
                cast(self.to_u32x4_bitcast() | rhs.to_u32x4_bitcast())
            }
        }
    }
}

impl core::ops::BitXor for f32x4 {
    type Output = Self;

    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_xor_ps(self.0, rhs.0) })
            } else {
                cast(self.to_u32x4_bitcast() ^ rhs.to_u32x4_bitcast())
            }
        }
    }
}

impl core::ops::Neg for f32x4 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::default() - self
    }
}

impl core::ops::Not for f32x4 {
    type Output = Self;

    fn not(self) -> Self {
        cast(!self.to_u32x4_bitcast())
    }
}

impl core::cmp::PartialEq for f32x4 {
    fn eq(&self, rhs: &Self) -> bool {
        let a: [f32; 4] = cast(*self);
        let b: [f32; 4] = cast(*rhs);
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_negative() {
        let v = f32x4::from([-1.5, -0.0, 0.5, 2.0]).floor();
        assert_eq!(<[f32; 4]>::from(v), [-2.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn blend_selects_by_mask() {
        let a = f32x4::from([1.0, 5.0, 3.0, 7.0]);
        let b = f32x4::splat(4.0);
        let v = a.cmp_lt(b).blend(f32x4::splat(1.0), f32x4::splat(2.0));
        assert_eq!(<[f32; 4]>::from(v), [1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn trunc_towards_zero() {
        let v = f32x4::from([-1.7, 1.7, 2.5, 255.9]).trunc_int();
        assert_eq!(<[i32; 4]>::from(v), [-1, 1, 2, 255]);
    }
}
