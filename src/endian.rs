/*
 Copyright (c) 2023 clone206

 This file is part of wavconvolve

 wavconvolve is free software: you can redistribute it and/or modify it
 under the terms of the GNU General Public License as published by the
 Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 wavconvolve is distributed in the hope that it will be useful, but
 WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.
 You should have received a copy of the GNU General Public License
 along with wavconvolve. If not, see <https://www.gnu.org/licenses/>.
*/

//! Runtime byte order handling.
//!
//! The host byte order is detected once, on first use, and cached for the
//! life of the process. Conversions go through an [`EndianAdapter`] value
//! which is selected from that cached order and handed to whoever needs it
//! (the WAVE codec, mostly), so there is no mutable global dispatch table.

use std::fmt;
use std::sync::OnceLock;

use crate::error::Error;

/// Byte order of a machine or of a serialized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Big,
    Little,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Big => f.write_str("big-endian"),
            Order::Little => f.write_str("little-endian"),
        }
    }
}

static NATIVE_ORDER: OnceLock<Order> = OnceLock::new();

/// Return the byte order of the running host.
///
/// The probe runs exactly once; every later call returns the cached value.
pub fn native_order() -> Order {
    *NATIVE_ORDER.get_or_init(|| {
        let probe: u16 = 1;
        if probe.to_ne_bytes()[0] == 0 {
            Order::Big
        } else {
            Order::Little
        }
    })
}

/// Reverse the byte sequence of a 2, 3, 4, 8 or 16 byte value.
///
/// Any other width fails to compile.
#[inline]
pub fn flip_endian<const N: usize>(bytes: [u8; N]) -> [u8; N] {
    const {
        assert!(
            N == 2 || N == 3 || N == 4 || N == 8 || N == 16,
            "flip_endian only supports widths of 2, 3, 4, 8 and 16 bytes"
        );
    }
    let mut swapped = bytes;
    swapped.reverse();
    swapped
}

/// Widest value [`flip_endian_slice`] can reverse.
pub const MAX_FLIP_WIDTH: usize = 16;

/// Byte-reversed copy of a field, returned by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlippedBytes {
    bytes: [u8; MAX_FLIP_WIDTH],
    len: usize,
}

impl FlippedBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Runtime counterpart of [`flip_endian`] for field widths only known
/// while parsing.
pub fn flip_endian_slice(bytes: &[u8]) -> Result<FlippedBytes, Error> {
    match bytes.len() {
        2 | 3 | 4 | 8 | 16 => {
            let mut out = [0u8; MAX_FLIP_WIDTH];
            for (dst, src) in out.iter_mut().zip(bytes.iter().rev()) {
                *dst = *src;
            }
            Ok(FlippedBytes {
                bytes: out,
                len: bytes.len(),
            })
        }
        width => Err(Error::UnsupportedFlipWidth(width)),
    }
}

/// Plain values whose in-memory representation can be byte-reversed.
pub trait Flip: Copy {
    fn flip(self) -> Self;
}

macro_rules! impl_flip {
    ($($t:ty),*) => {
        $(
            impl Flip for $t {
                #[inline]
                fn flip(self) -> Self {
                    <$t>::from_ne_bytes(flip_endian(self.to_ne_bytes()))
                }
            }
        )*
    };
}

impl_flip!(u16, i16, u32, i32, u64, i64, u128, i128, f32, f64);

/// Conversion strategy between host order and a fixed serialized order.
///
/// `to_big`/`to_little` are symmetric: applying one to a host value yields
/// the serialized representation, and applying it to a value read raw from
/// a stream yields the host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndianAdapter {
    NativeIsBig,
    NativeIsLittle,
}

impl EndianAdapter {
    /// Adapter matching the host.
    pub fn native() -> Self {
        Self::for_order(native_order())
    }

    /// Adapter for a host of the given order. Mostly useful in tests.
    pub fn for_order(order: Order) -> Self {
        match order {
            Order::Big => EndianAdapter::NativeIsBig,
            Order::Little => EndianAdapter::NativeIsLittle,
        }
    }

    pub fn order(&self) -> Order {
        match self {
            EndianAdapter::NativeIsBig => Order::Big,
            EndianAdapter::NativeIsLittle => Order::Little,
        }
    }

    #[inline]
    pub fn to_big<T: Flip>(&self, value: T) -> T {
        match self {
            EndianAdapter::NativeIsBig => value,
            EndianAdapter::NativeIsLittle => value.flip(),
        }
    }

    #[inline]
    pub fn to_little<T: Flip>(&self, value: T) -> T {
        match self {
            EndianAdapter::NativeIsBig => value.flip(),
            EndianAdapter::NativeIsLittle => value,
        }
    }

    /// Interpret four raw stream bytes as a big-endian `u32`.
    #[inline]
    pub fn read_big_u32(&self, raw: [u8; 4]) -> u32 {
        self.to_big(u32::from_ne_bytes(raw))
    }

    /// Interpret four raw stream bytes as a little-endian `u32`.
    #[inline]
    pub fn read_little_u32(&self, raw: [u8; 4]) -> u32 {
        self.to_little(u32::from_ne_bytes(raw))
    }

    /// Interpret two raw stream bytes as a little-endian `u16`.
    #[inline]
    pub fn read_little_u16(&self, raw: [u8; 2]) -> u16 {
        self.to_little(u16::from_ne_bytes(raw))
    }

    /// Interpret two raw stream bytes as a little-endian `i16`.
    #[inline]
    pub fn read_little_i16(&self, raw: [u8; 2]) -> i16 {
        self.to_little(i16::from_ne_bytes(raw))
    }

    /// Serialize a `u32` in big-endian order.
    #[inline]
    pub fn big_u32_bytes(&self, value: u32) -> [u8; 4] {
        self.to_big(value).to_ne_bytes()
    }

    /// Serialize a `u32` in little-endian order.
    #[inline]
    pub fn little_u32_bytes(&self, value: u32) -> [u8; 4] {
        self.to_little(value).to_ne_bytes()
    }

    /// Serialize a `u16` in little-endian order.
    #[inline]
    pub fn little_u16_bytes(&self, value: u16) -> [u8; 2] {
        self.to_little(value).to_ne_bytes()
    }

    /// Serialize an `i16` in little-endian order.
    #[inline]
    pub fn little_i16_bytes(&self, value: i16) -> [u8; 2] {
        self.to_little(value).to_ne_bytes()
    }
}

impl Default for EndianAdapter {
    fn default() -> Self {
        Self::native()
    }
}
