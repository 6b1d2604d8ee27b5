// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// This module was written from scratch, therefore there is no Google copyright.

// f32x8, i32x8 and u32x8 are either a single AVX register or two 128-bit
// halves. This way we still can use SSE2/Neon on targets without AVX.
//
// We don't use #[inline] that much in this module.
// The compiler will inline most of the methods automatically.
// The only exception is u16x16, were we have to force inlining,
// otherwise the performance will be horrible.

#![allow(non_camel_case_types)]

use core::fmt::Debug;
use core::ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Div, Mul, MulAssign, Neg, Not, Sub, SubAssign};

mod f32x16_t;
mod f32x4_t;
mod f32x8_t;
mod i32x4_t;
mod i32x8_t;
mod u16x16_t;
mod u32x4_t;
mod u32x8_t;

pub use f32x16_t::f32x16;
pub use f32x4_t::f32x4;
pub use f32x8_t::f32x8;
pub use i32x4_t::i32x4;
pub use i32x8_t::i32x8;
pub use u16x16_t::u16x16;
pub use u32x4_t::u32x4;
pub use u32x8_t::u32x8;

/// A float vector the highp stages are generic over.
///
/// Every method is branch-free: comparisons produce all-ones/all-zeros lane
/// masks and `blend` selects between two fully computed values.
pub trait F32Lanes:
    Copy
    + Default
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Number of pixels processed per chunk.
    const LEN: usize;

    type Array: Copy + Default + AsRef<[f32]> + AsMut<[f32]>;
    type I32: I32Lanes<F32 = Self, U32 = Self::U32>;
    type U32: U32Lanes<F32 = Self, I32 = Self::I32>;

    fn splat(n: f32) -> Self;
    fn from_array(v: Self::Array) -> Self;
    fn to_array(self) -> Self::Array;

    fn floor(self) -> Self;
    fn fract(self) -> Self;
    fn normalize(self) -> Self;
    fn abs(self) -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    fn sqrt(self) -> Self;
    fn recip_fast(self) -> Self;
    fn recip_sqrt(self) -> Self;

    fn cmp_eq(self, rhs: Self) -> Self;
    fn cmp_ne(self, rhs: Self) -> Self;
    fn cmp_ge(self, rhs: Self) -> Self;
    fn cmp_gt(self, rhs: Self) -> Self;
    fn cmp_le(self, rhs: Self) -> Self;
    fn cmp_lt(self, rhs: Self) -> Self;
    fn blend(self, t: Self, f: Self) -> Self;

    fn trunc_int(self) -> Self::I32;
    fn to_i32_bitcast(self) -> Self::I32;
    fn to_u32_bitcast(self) -> Self::U32;
}

pub trait I32Lanes:
    Copy
    + Default
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    type Array: Copy + Default + AsRef<[i32]> + AsMut<[i32]>;
    type F32;
    type U32;

    fn splat(n: i32) -> Self;
    fn to_array(self) -> Self::Array;

    fn cmp_lt(self, rhs: Self) -> Self;
    fn blend(self, t: Self, f: Self) -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    fn shl(self, n: u32) -> Self;
    fn shr(self, n: u32) -> Self;

    fn to_f32(self) -> Self::F32;
    fn to_f32_bitcast(self) -> Self::F32;
    fn to_u32_bitcast(self) -> Self::U32;
}

pub trait U32Lanes:
    Copy
    + Default
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    type Array: Copy + Default + AsRef<[u32]> + AsMut<[u32]>;
    type F32;
    type I32;

    fn splat(n: u32) -> Self;
    fn from_array(v: Self::Array) -> Self;
    fn to_array(self) -> Self::Array;

    fn shl(self, n: u32) -> Self;
    fn shr(self, n: u32) -> Self;

    fn to_f32_bitcast(self) -> Self::F32;
    fn to_i32_bitcast(self) -> Self::I32;
}

macro_rules! impl_lanes {
    ($len:literal, $f:ident, $i:ident, $u:ident, $f_to_i:ident, $f_to_u:ident,
     $i_to_f:ident, $i_to_fb:ident, $i_to_ub:ident, $u_to_fb:ident, $u_to_ib:ident) => {
        impl F32Lanes for $f {
            const LEN: usize = $len;

            type Array = [f32; $len];
            type I32 = $i;
            type U32 = $u;

            #[inline(always)]
            fn splat(n: f32) -> Self {
                $f::splat(n)
            }

            #[inline(always)]
            fn from_array(v: Self::Array) -> Self {
                $f::from(v)
            }

            #[inline(always)]
            fn to_array(self) -> Self::Array {
                self.into()
            }

            #[inline(always)]
            fn floor(self) -> Self {
                $f::floor(self)
            }

            #[inline(always)]
            fn fract(self) -> Self {
                $f::fract(self)
            }

            #[inline(always)]
            fn normalize(self) -> Self {
                $f::normalize(self)
            }

            #[inline(always)]
            fn abs(self) -> Self {
                $f::abs(self)
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                $f::min(self, rhs)
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                $f::max(self, rhs)
            }

            #[inline(always)]
            fn sqrt(self) -> Self {
                $f::sqrt(self)
            }

            #[inline(always)]
            fn recip_fast(self) -> Self {
                $f::recip_fast(self)
            }

            #[inline(always)]
            fn recip_sqrt(self) -> Self {
                $f::recip_sqrt(self)
            }

            #[inline(always)]
            fn cmp_eq(self, rhs: Self) -> Self {
                $f::cmp_eq(self, rhs)
            }

            #[inline(always)]
            fn cmp_ne(self, rhs: Self) -> Self {
                $f::cmp_ne(self, rhs)
            }

            #[inline(always)]
            fn cmp_ge(self, rhs: Self) -> Self {
                $f::cmp_ge(self, rhs)
            }

            #[inline(always)]
            fn cmp_gt(self, rhs: Self) -> Self {
                $f::cmp_gt(self, rhs)
            }

            #[inline(always)]
            fn cmp_le(self, rhs: Self) -> Self {
                $f::cmp_le(self, rhs)
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                $f::cmp_lt(self, rhs)
            }

            #[inline(always)]
            fn blend(self, t: Self, f: Self) -> Self {
                $f::blend(self, t, f)
            }

            #[inline(always)]
            fn trunc_int(self) -> Self::I32 {
                $f::trunc_int(self)
            }

            #[inline(always)]
            fn to_i32_bitcast(self) -> Self::I32 {
                $f::$f_to_i(self)
            }

            #[inline(always)]
            fn to_u32_bitcast(self) -> Self::U32 {
                $f::$f_to_u(self)
            }
        }

        impl I32Lanes for $i {
            type Array = [i32; $len];
            type F32 = $f;
            type U32 = $u;

            #[inline(always)]
            fn splat(n: i32) -> Self {
                $i::splat(n)
            }

            #[inline(always)]
            fn to_array(self) -> Self::Array {
                self.into()
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                $i::cmp_lt(self, rhs)
            }

            #[inline(always)]
            fn blend(self, t: Self, f: Self) -> Self {
                $i::blend(self, t, f)
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                $i::min(self, rhs)
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                $i::max(self, rhs)
            }

            #[inline(always)]
            fn shl(self, n: u32) -> Self {
                $i::shl(self, n)
            }

            #[inline(always)]
            fn shr(self, n: u32) -> Self {
                $i::shr(self, n)
            }

            #[inline(always)]
            fn to_f32(self) -> Self::F32 {
                $i::$i_to_f(self)
            }

            #[inline(always)]
            fn to_f32_bitcast(self) -> Self::F32 {
                $i::$i_to_fb(self)
            }

            #[inline(always)]
            fn to_u32_bitcast(self) -> Self::U32 {
                $i::$i_to_ub(self)
            }
        }

        impl U32Lanes for $u {
            type Array = [u32; $len];
            type F32 = $f;
            type I32 = $i;

            #[inline(always)]
            fn splat(n: u32) -> Self {
                $u::splat(n)
            }

            #[inline(always)]
            fn from_array(v: Self::Array) -> Self {
                $u::from(v)
            }

            #[inline(always)]
            fn to_array(self) -> Self::Array {
                self.into()
            }

            #[inline(always)]
            fn shl(self, n: u32) -> Self {
                $u::shl(self, n)
            }

            #[inline(always)]
            fn shr(self, n: u32) -> Self {
                $u::shr(self, n)
            }

            #[inline(always)]
            fn to_f32_bitcast(self) -> Self::F32 {
                $u::$u_to_fb(self)
            }

            #[inline(always)]
            fn to_i32_bitcast(self) -> Self::I32 {
                $u::$u_to_ib(self)
            }
        }
    };
}

impl_lanes!(
    4, f32x4, i32x4, u32x4, to_i32x4_bitcast, to_u32x4_bitcast,
    to_f32x4, to_f32x4_bitcast, to_u32x4_bitcast, to_f32x4_bitcast, to_i32x4_bitcast
);
impl_lanes!(
    8, f32x8, i32x8, u32x8, to_i32x8_bitcast, to_u32x8_bitcast,
    to_f32x8, to_f32x8_bitcast, to_u32x8_bitcast, to_f32x8_bitcast, to_i32x8_bitcast
);

#[allow(dead_code)]
#[inline]
pub fn generic_bit_blend<T>(mask: T, y: T, n: T) -> T
where
    T: Copy + BitXor<Output = T> + BitAnd<Output = T>,
{
    n ^ ((n ^ y) & mask)
}

/// Converts lanes holding unsigned 32-bit values to floats.
#[inline]
pub fn u32_to_f32<F: F32Lanes>(v: F::U32) -> F {
    // There is no unsigned conversion on SSE2, so split off the low bit.
    let hi: F = v.shr(1).to_i32_bitcast().to_f32();
    let lo: F = (v & F::U32::splat(1)).to_i32_bitcast().to_f32();
    hi * F::splat(2.0) + lo
}

#[inline]
pub fn approx_log2<F: F32Lanes>(x: F) -> F {
    // e - 127 is a fair approximation of log2(x) in its own right,
    // but using the mantissa to refine its error is much better.
    let bits = x.to_u32_bitcast();
    let e: F = u32_to_f32::<F>(bits) * F::splat(1.0 / (1 << 23) as f32);
    let m: F = ((bits & F::U32::splat(0x007fffff)) | F::U32::splat(0x3f000000)).to_f32_bitcast();
    e - F::splat(124.225514990)
        - F::splat(1.498030302) * m
        - F::splat(1.725879990) / (F::splat(0.3520887068) + m)
}

#[inline]
pub fn approx_pow2<F: F32Lanes>(x: F) -> F {
    let f = x.fract();
    let v = x + F::splat(121.274057500) - F::splat(1.490129070) * f
        + F::splat(27.728023300) / (F::splat(4.84252568) - f);
    (v * F::splat((1 << 23) as f32) + F::splat(0.5)).trunc_int().to_f32_bitcast()
}

#[inline]
pub fn approx_powf<F: F32Lanes>(x: F, y: F) -> F {
    x.cmp_eq(F::default())
        .blend(F::default(), approx_pow2(approx_log2(x) * y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_conversion() {
        let v = u32x4::from([0, 1, 0x8000_0001, u32::MAX]);
        let f: [f32; 4] = u32_to_f32::<f32x4>(v).into();
        assert_eq!(f, [0.0, 1.0, 2147483649.0, 4294967295.0]);
    }

    #[test]
    fn powf_is_close() {
        let x = f32x4::from([0.0, 0.25, 0.5, 1.0]);
        let v: [f32; 4] = approx_powf(x, f32x4::splat(2.2)).into();
        assert_eq!(v[0], 0.0);
        assert!((v[1] - 0.25f32.powf(2.2)).abs() < 1e-3);
        assert!((v[2] - 0.5f32.powf(2.2)).abs() < 1e-3);
        assert!((v[3] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lanes_are_consistent() {
        let a: [f32; 8] = [-2.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 300.7];
        let v8 = <f32x8 as F32Lanes>::from_array(a).floor().to_array();
        let lo = <f32x4 as F32Lanes>::from_array([a[0], a[1], a[2], a[3]]).floor().to_array();
        let hi = <f32x4 as F32Lanes>::from_array([a[4], a[5], a[6], a[7]]).floor().to_array();
        assert_eq!(&v8[..4], &lo[..]);
        assert_eq!(&v8[4..], &hi[..]);
        assert_eq!(v8, [-3.0, -1.0, -1.0, 0.0, 0.0, 1.0, 1.0, 300.0]);
    }

    fn clamp_ints<I: I32Lanes>(v: I, lo: i32, hi: i32) -> I {
        v.max(I::splat(lo)).min(I::splat(hi))
    }

    #[test]
    fn int_lanes_are_consistent() {
        let a: [f32; 8] = [-7.0, -1.0, 0.0, 2.0, 3.0, 9.0, 40.0, -300.0];
        let v8 = clamp_ints(<f32x8 as F32Lanes>::from_array(a).trunc_int(), 0, 8).to_array();
        let lo = clamp_ints(<f32x4 as F32Lanes>::from_array([a[0], a[1], a[2], a[3]]).trunc_int(), 0, 8);
        let hi = clamp_ints(<f32x4 as F32Lanes>::from_array([a[4], a[5], a[6], a[7]]).trunc_int(), 0, 8);
        assert_eq!(&v8[..4], &lo.to_array()[..]);
        assert_eq!(&v8[4..], &hi.to_array()[..]);
        assert_eq!(v8, [0, 0, 0, 2, 3, 8, 8, 0]);
    }
}
