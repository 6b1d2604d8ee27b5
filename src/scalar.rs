// Copyright 2006 The Android Open Source Project
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Float number extension methods.
pub trait Scalar {
    fn bound(self, min: Self, max: Self) -> Self;
}

impl Scalar for f32 {
    // Returns `max` for NaN and `min` for negative infinity.
    fn bound(self, min: Self, max: Self) -> Self {
        max.min(self).max(min)
    }
}

#[cfg(all(not(feature = "std"), feature = "no-std-float"))]
pub trait NoStdFloat {
    fn sqrt(self) -> Self;
    fn abs(self) -> Self;
    fn floor(self) -> Self;
}

#[cfg(all(not(feature = "std"), feature = "no-std-float"))]
impl NoStdFloat for f32 {
    fn sqrt(self) -> Self {
        libm::sqrtf(self)
    }
    fn abs(self) -> Self {
        libm::fabsf(self)
    }
    fn floor(self) -> Self {
        libm::floorf(self)
    }
}
