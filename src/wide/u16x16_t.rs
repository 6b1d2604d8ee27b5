// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// No need to use explicit 256bit AVX2 SIMD.
// `-C target-cpu=native` will autovectorize it better than us.
//
// On AArch64 we get up to 2x boost by using Neon for the hot arithmetic,
// so those methods are dispatched explicitly.
//
// All methods are inlined. They are large, but lowp stages are tiny wrappers
// around them and calls would dominate.

#[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))]
use bytemuck::cast;
#[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))]
use core::arch::aarch64::uint16x8_t;

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct u16x16(pub [u16; 16]);

macro_rules! impl_u16x16_op {
    ($a:expr, |$x:ident, $y:ident| $e:expr, $b:expr) => {{
        let f = |$x: u16, $y: u16| -> u16 { $e };
        let (a, b) = (&$a.0, &$b.0);
        u16x16([
            f(a[0], b[0]),
            f(a[1], b[1]),
            f(a[2], b[2]),
            f(a[3], b[3]),
            f(a[4], b[4]),
            f(a[5], b[5]),
            f(a[6], b[6]),
            f(a[7], b[7]),
            f(a[8], b[8]),
            f(a[9], b[9]),
            f(a[10], b[10]),
            f(a[11], b[11]),
            f(a[12], b[12]),
            f(a[13], b[13]),
            f(a[14], b[14]),
            f(a[15], b[15]),
        ])
    }};
}

#[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))]
macro_rules! impl_aarch64_call {
    ($f:ident, $a:expr, $b:expr) => {{
        let a = $a.split();
        let b = $b.split();
        u16x16(cast([
            unsafe { core::arch::aarch64::$f(a.0, b.0) },
            unsafe { core::arch::aarch64::$f(a.1, b.1) },
        ]))
    }};
}

impl u16x16 {
    #[inline]
    pub fn splat(n: u16) -> Self {
        Self([n; 16])
    }

    #[inline]
    pub fn min(&self, rhs: &Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vminq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a.min(b), rhs)
            }
        }
    }

    #[inline]
    pub fn max(&self, rhs: &Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vmaxq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a.max(b), rhs)
            }
        }
    }

    #[inline]
    pub fn cmp_le(&self, rhs: &Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vcleq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| if a <= b { !0 } else { 0 }, rhs)
            }
        }
    }

    #[inline]
    pub fn cmp_lt(&self, rhs: &Self) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vcltq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| if a < b { !0 } else { 0 }, rhs)
            }
        }
    }

    #[inline]
    pub fn blend(self, t: Self, e: Self) -> Self {
        (t & self) | (e & !self)
    }

    /// Shifts each lane right by `n` bits.
    #[inline]
    pub fn shr(self, n: u16) -> Self {
        impl_u16x16_op!(self, |a, _b| a >> n, self)
    }

    /// Shifts each lane left by `n` bits.
    #[inline]
    pub fn shl(self, n: u16) -> Self {
        impl_u16x16_op!(self, |a, _b| a << n, self)
    }

    #[inline]
    #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))]
    pub fn split(&self) -> (uint16x8_t, uint16x8_t) {
        let pair: [uint16x8_t; 2] = cast(self.0);
        (pair[0], pair[1])
    }
}

impl core::ops::Add<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vaddq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a.wrapping_add(b), rhs)
            }
        }
    }
}

impl core::ops::Sub<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vsubq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a.wrapping_sub(b), rhs)
            }
        }
    }
}

impl core::ops::Mul<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vmulq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a.wrapping_mul(b), rhs)
            }
        }
    }
}

impl core::ops::Div<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self::Output {
        impl_u16x16_op!(self, |a, b| a / b, rhs)
    }
}

impl core::ops::BitAnd<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vandq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a & b, rhs)
            }
        }
    }
}

impl core::ops::BitOr<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                impl_aarch64_call!(vorrq_u16, self, rhs)
            } else {
                impl_u16x16_op!(self, |a, b| a | b, rhs)
            }
        }
    }
}

impl core::ops::BitXor<u16x16> for u16x16 {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        impl_u16x16_op!(self, |a, b| a ^ b, rhs)
    }
}

impl core::ops::Not for u16x16 {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        self ^ u16x16::splat(!0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_by_mask() {
        let a = u16x16::splat(3);
        let b = u16x16::splat(200);
        let m = a.cmp_lt(&b);
        assert_eq!(m.blend(a, b), a);
        assert_eq!((!m).blend(a, b), b);
    }

    #[test]
    fn shifts() {
        let v = u16x16::splat(0xF0F0);
        assert_eq!(v.shr(4), u16x16::splat(0x0F0F));
        assert_eq!(v.shl(4), u16x16::splat(0x0F00));
    }
}
