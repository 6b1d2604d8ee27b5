// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

use super::{f32x4, i32x4};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct u32x4(__m128i);
    } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
        use core::arch::aarch64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct u32x4(uint32x4_t);
    } else {
        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(16))]
        pub struct u32x4([u32; 4]);
    }
}

unsafe impl bytemuck::Zeroable for u32x4 {}
unsafe impl bytemuck::Pod for u32x4 {}

impl Default for u32x4 {
    fn default() -> Self {
        Self::splat(0)
    }
}

#[allow(unused_macros)]
macro_rules! per_lane {
    ($a:expr, $b:expr, |$x:ident, $y:ident| $e:expr) => {{
        let a: [u32; 4] = cast($a);
        let b: [u32; 4] = cast($b);
        let f = |$x: u32, $y: u32| -> u32 { $e };
        cast([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }};
}

impl u32x4 {
    pub fn splat(n: u32) -> Self {
        cast([n, n, n, n])
    }

    /// Logical left shift.
    pub fn shl(self, n: u32) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sll_epi32(self.0, _mm_cvtsi32_si128(n as i32)) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vshlq_u32(self.0, vdupq_n_s32(n as i32)) })
            } else {
                let a: [u32; 4] = cast(self);
                cast([a[0] << n, a[1] << n, a[2] << n, a[3] << n])
            }
        }
    }

    /// Logical right shift.
    pub fn shr(self, n: u32) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_srl_epi32(self.0, _mm_cvtsi32_si128(n as i32)) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vshlq_u32(self.0, vdupq_n_s32(-(n as i32))) })
            } else {
                let a: [u32; 4] = cast(self);
                cast([a[0] >> n, a[1] >> n, a[2] >> n, a[3] >> n])
            }
        }
    }

    pub fn to_i32x4_bitcast(self) -> i32x4 {
        cast(self)
    }

    pub fn to_f32x4_bitcast(self) -> f32x4 {
        cast(self)
    }
}

impl From<[u32; 4]> for u32x4 {
    fn from(v: [u32; 4]) -> Self {
        cast(v)
    }
}

impl From<u32x4> for [u32; 4] {
    fn from(v: u32x4) -> Self {
        cast(v)
    }
}

impl core::ops::Add for u32x4 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_add_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vaddq_u32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a.wrapping_add(b))
            }
        }
    }
}

impl core::ops::Sub for u32x4 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_sub_epi32(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vsubq_u32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a.wrapping_sub(b))
            }
        }
    }
}

impl core::ops::BitAnd for u32x4 {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_and_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vandq_u32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a & b)
            }
        }
    }
}

impl core::ops::BitOr for u32x4 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_or_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { vorrq_u32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a | b)
            }
        }
    }
}

impl core::ops::BitXor for u32x4 {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "sse2"))] {
                Self(unsafe { _mm_xor_si128(self.0, rhs.0) })
            } else if #[cfg(all(feature = "simd", target_arch = "aarch64", target_feature = "neon"))] {
                Self(unsafe { veorq_u32(self.0, rhs.0) })
            } else {
                per_lane!(self, rhs, |a, b| a ^ b)
            }
        }
    }
}

impl core::ops::Not for u32x4 {
    type Output = Self;

    fn not(self) -> Self {
        self ^ Self::splat(u32::MAX)
    }
}

impl core::cmp::PartialEq for u32x4 {
    fn eq(&self, rhs: &Self) -> bool {
        let a: [u32; 4] = cast(*self);
        let b: [u32; 4] = cast(*rhs);
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_shift_right() {
        let v = u32x4::from([0x8000_0000, 0xFF00, 3, u32::MAX]);
        assert_eq!(<[u32; 4]>::from(v.shr(8)), [0x0080_0000, 0xFF, 0, 0x00FF_FFFF]);
        assert_eq!(<[u32; 4]>::from(v.shl(24)), [0, 0, 0x0300_0000, 0xFF00_0000]);
    }
}
