//! # Supported curves
//!
//! Parameters of the two NIST prime curves the driver supports. All values are
//! stored as little-endian 32-bit words, the representation the coprocessor
//! RAM uses, zero-extended to [`MAX_ELEMENT_WORDS`].

use crate::{ecc::Error, layout::MAX_ELEMENT_WORDS};

/// Represents supported elliptic curves for cryptographic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EllipticCurve {
    /// The P-256 elliptic curve, a 256-bit curve.
    P256 = 0,
    /// The P-192 elliptic curve, a 192-bit curve.
    P192 = 1,
}

impl EllipticCurve {
    /// Size of one element (coordinate, scalar or hash) in bytes.
    pub const fn element_bytes(self) -> usize {
        self.info().words * 4
    }

    pub(crate) const fn info(self) -> &'static Curve {
        match self {
            EllipticCurve::P256 => &NIST_P_256,
            EllipticCurve::P192 => &NIST_P_192,
        }
    }
}

impl TryFrom<u8> for EllipticCurve {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(EllipticCurve::P256),
            1 => Ok(EllipticCurve::P192),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

/// Immutable parameter set of one curve `y^2 = x^3 + ax + b (mod p)`.
#[derive(Debug)]
pub(crate) struct Curve {
    pub name: &'static str,
    /// Element width in 32-bit words.
    pub words: usize,
    pub p: [u32; MAX_ELEMENT_WORDS],
    pub a: [u32; MAX_ELEMENT_WORDS],
    pub b: [u32; MAX_ELEMENT_WORDS],
    pub x: [u32; MAX_ELEMENT_WORDS],
    pub y: [u32; MAX_ELEMENT_WORDS],
    pub n: [u32; MAX_ELEMENT_WORDS],
    /// `p + 1`, the exponent source of the modular square root.
    pub p_plus_one: [u32; MAX_ELEMENT_WORDS],
    /// Bit length of `p + 1`.
    pub binary_length_of_p_plus_one: usize,
}

impl Curve {
    /// Tells if bit `bit` of `p + 1` is set; bit 0 is the least significant.
    pub fn p_plus_one_bit(&self, bit: usize) -> bool {
        self.p_plus_one[bit >> 5] & (1 << (bit & 0x1f)) != 0
    }
}

pub(crate) const NIST_P_256: Curve = Curve {
    name: "NIST P-256",
    words: 8,
    p: [
        0xffffffff, 0xffffffff, 0xffffffff, 0x00000000, 0x00000000, 0x00000000, 0x00000001,
        0xffffffff,
    ],
    a: [
        0xfffffffc, 0xffffffff, 0xffffffff, 0x00000000, 0x00000000, 0x00000000, 0x00000001,
        0xffffffff,
    ],
    b: [
        0x27d2604b, 0x3bce3c3e, 0xcc53b0f6, 0x651d06b0, 0x769886bc, 0xb3ebbd55, 0xaa3a93e7,
        0x5ac635d8,
    ],
    x: [
        0xd898c296, 0xf4a13945, 0x2deb33a0, 0x77037d81, 0x63a440f2, 0xf8bce6e5, 0xe12c4247,
        0x6b17d1f2,
    ],
    y: [
        0x37bf51f5, 0xcbb64068, 0x6b315ece, 0x2bce3357, 0x7c0f9e16, 0x8ee7eb4a, 0xfe1a7f9b,
        0x4fe342e2,
    ],
    n: [
        0xfc632551, 0xf3b9cac2, 0xa7179e84, 0xbce6faad, 0xffffffff, 0xffffffff, 0x00000000,
        0xffffffff,
    ],
    p_plus_one: [
        0x00000000, 0x00000000, 0x00000000, 0x00000001, 0x00000000, 0x00000000, 0x00000001,
        0xffffffff,
    ],
    binary_length_of_p_plus_one: 256,
};

pub(crate) const NIST_P_192: Curve = Curve {
    name: "NIST P-192",
    words: 6,
    p: [
        0xffffffff, 0xffffffff, 0xfffffffe, 0xffffffff, 0xffffffff, 0xffffffff, 0, 0,
    ],
    a: [
        0xfffffffc, 0xffffffff, 0xfffffffe, 0xffffffff, 0xffffffff, 0xffffffff, 0, 0,
    ],
    b: [
        0xc146b9b1, 0xfeb8deec, 0x72243049, 0x0fa7e9ab, 0xe59c80e7, 0x64210519, 0, 0,
    ],
    x: [
        0x82ff1012, 0xf4ff0afd, 0x43a18800, 0x7cbf20eb, 0xb03090f6, 0x188da80e, 0, 0,
    ],
    y: [
        0x1e794811, 0x73f977a1, 0x6b24cdd5, 0x631011ed, 0xffc8da78, 0x07192b95, 0, 0,
    ],
    n: [
        0xb4d22831, 0x146bc9b1, 0x99def836, 0xffffffff, 0xffffffff, 0xffffffff, 0, 0,
    ],
    p_plus_one: [
        0x00000000, 0x00000000, 0xffffffff, 0xffffffff, 0xffffffff, 0xffffffff, 0, 0,
    ],
    binary_length_of_p_plus_one: 192,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn is_odd_and_3_mod_4(p: &[u32]) -> bool {
        p[0] & 0b11 == 0b11
    }

    #[test]
    fn element_widths() {
        assert_eq!(EllipticCurve::P256.element_bytes(), 32);
        assert_eq!(EllipticCurve::P192.element_bytes(), 24);
    }

    #[test]
    fn raw_identifiers() {
        assert_eq!(EllipticCurve::try_from(0), Ok(EllipticCurve::P256));
        assert_eq!(EllipticCurve::try_from(1), Ok(EllipticCurve::P192));
        assert_eq!(EllipticCurve::try_from(2), Err(Error::UnsupportedCurve));
    }

    #[test]
    fn square_root_shortcut_applies() {
        for curve in [&NIST_P_256, &NIST_P_192] {
            assert!(is_odd_and_3_mod_4(&curve.p), "{}", curve.name);
            assert!(curve.p_plus_one_bit(curve.binary_length_of_p_plus_one - 1));
            assert!(!curve.p_plus_one_bit(0));
            assert!(!curve.p_plus_one_bit(1));
        }
    }

    #[test]
    fn p_plus_one_matches_p() {
        for curve in [&NIST_P_256, &NIST_P_192] {
            let mut carry = 1u64;
            for (p, p1) in curve.p.iter().zip(curve.p_plus_one.iter()).take(curve.words) {
                let sum = *p as u64 + carry;
                assert_eq!(sum as u32, *p1);
                carry = sum >> 32;
            }
            assert_eq!(carry, 0);
        }
    }
}
