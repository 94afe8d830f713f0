//! # PKA RAM layout
//!
//! ## Overview
//! The coprocessor works exclusively on vectors stored in its own RAM, which
//! is addressed in 32-bit words. This module assigns a fixed region to every
//! constant and every scratch area the driver needs.
//!
//! All regions are sized for the widest supported element
//! ([`MAX_ELEMENT_WORDS`]), so the same layout serves every curve; a curve
//! with narrower elements only uses the leading words of each region. Every
//! region starts on an even word, as required for the coprocessor's 64-bit
//! vector accesses.
//!
//! Each algorithm places its temporaries behind [`VARIABLES_OFFSET`]. Only one
//! algorithm runs at a time, so they all share that base.

/// Size of the coprocessor RAM in 32-bit words.
pub const PKA_RAM_WORDS: usize = 512;

/// Widest element of any supported curve, in 32-bit words.
pub const MAX_ELEMENT_WORDS: usize = 8;

/// Widest element of any supported curve, in bytes.
pub const MAX_ELEMENT_BYTES: usize = MAX_ELEMENT_WORDS * 4;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Space taken by one point coordinate. The coprocessor expects two spare
/// words behind every coordinate, plus padding to an even length.
pub const fn coordinate_space(words: usize) -> usize {
    words + 2 + (words & 1)
}

/// Space taken by an affine point: the x coordinate followed by y.
pub const fn point_space(words: usize) -> usize {
    2 * coordinate_space(words)
}

/// Space written by a MODULO operation, which produces one word more than the
/// modulus.
pub const fn remainder_space(words: usize) -> usize {
    words + 1
}

/// Working set of a raw MULTIPLY.
pub const fn multiply_scratchpad_space(a_words: usize, b_words: usize) -> usize {
    a_words + b_words + 6
}

/// Working set of a raw ADD.
pub const fn add_scratchpad_space(a_words: usize, b_words: usize) -> usize {
    max(a_words, b_words) + 1
}

/// Working set of a raw SUBTRACT.
pub const fn subtract_scratchpad_space(a_words: usize, b_words: usize) -> usize {
    max(a_words, b_words)
}

/// Working set of the ECC-ADD sequencer operation.
pub const fn ecc_add_scratchpad_space(words: usize) -> usize {
    3 * coordinate_space(words)
}

/// Working set of the ECC-MUL sequencer operation.
pub const fn ecc_mul_scratchpad_space(words: usize) -> usize {
    6 * coordinate_space(words)
}

/// Working set of the modular-inversion sequencer operation.
pub const fn mod_inv_scratchpad_space(a_words: usize, b_words: usize) -> usize {
    max(a_words, b_words) + 1
}

/// Returns the first even word behind a region of `space` words that starts
/// at `offset`.
pub const fn next_offset(offset: usize, space: usize) -> usize {
    let end = offset + space;
    end + (end & 1)
}

const MAX_COORDINATE_SPACE: usize = coordinate_space(MAX_ELEMENT_WORDS);
const MAX_POINT_SPACE: usize = point_space(MAX_ELEMENT_WORDS);

const SCRATCHPAD_SPACE: usize = max(
    multiply_scratchpad_space(MAX_ELEMENT_WORDS, MAX_ELEMENT_WORDS),
    max(
        add_scratchpad_space(MAX_ELEMENT_WORDS, MAX_ELEMENT_WORDS),
        max(
            subtract_scratchpad_space(MAX_ELEMENT_WORDS, MAX_ELEMENT_WORDS),
            max(
                ecc_add_scratchpad_space(MAX_ELEMENT_WORDS),
                max(
                    ecc_mul_scratchpad_space(MAX_ELEMENT_WORDS),
                    mod_inv_scratchpad_space(MAX_ELEMENT_WORDS, MAX_ELEMENT_WORDS),
                ),
            ),
        ),
    ),
);

/// The all-zero element.
pub const NULL_OFFSET: usize = 0;
/// The element `1`.
pub const ONE_OFFSET: usize = next_offset(NULL_OFFSET, MAX_ELEMENT_WORDS);
/// The generator point `G`.
pub const G_OFFSET: usize = next_offset(ONE_OFFSET, MAX_ELEMENT_WORDS);
/// The `(p, a, b)` triple, laid out with coordinate spacing as the point
/// operations expect it.
pub const PAB_OFFSET: usize = next_offset(G_OFFSET, MAX_POINT_SPACE);
/// The curve order `n`.
pub const N_OFFSET: usize = next_offset(PAB_OFFSET, 3 * MAX_COORDINATE_SPACE);
/// A packed copy of the coefficient `a`.
pub const A_OFFSET: usize = next_offset(N_OFFSET, MAX_ELEMENT_WORDS);
/// A packed copy of the coefficient `b`.
pub const B_OFFSET: usize = next_offset(A_OFFSET, MAX_ELEMENT_WORDS);
/// Working area handed to the coprocessor as its result/scratch vector.
pub const SCRATCHPAD_OFFSET: usize = next_offset(B_OFFSET, MAX_ELEMENT_WORDS);
/// Base of the per-algorithm temporaries.
pub const VARIABLES_OFFSET: usize = next_offset(SCRATCHPAD_OFFSET, SCRATCHPAD_SPACE);
/// The prime `p` is the head of the `(p, a, b)` triple.
pub const PRIME_OFFSET: usize = PAB_OFFSET;

/// Slots used while validating a public key.
pub(crate) mod validate {
    use super::*;

    pub const X: usize = VARIABLES_OFFSET;
    pub const Y: usize = next_offset(X, MAX_ELEMENT_WORDS);
    pub const LHS: usize = next_offset(Y, MAX_ELEMENT_WORDS);
    pub const RHS: usize = next_offset(LHS, remainder_space(MAX_ELEMENT_WORDS));
    pub const END: usize = next_offset(RHS, remainder_space(MAX_ELEMENT_WORDS));
}

/// Slots used while decompressing a public key.
pub(crate) mod decompress {
    use super::*;

    pub const X: usize = VARIABLES_OFFSET;
    pub const Y: usize = next_offset(X, MAX_ELEMENT_WORDS);
    pub const ROOT: usize = next_offset(Y, remainder_space(MAX_ELEMENT_WORDS));
    pub const END: usize = next_offset(ROOT, remainder_space(MAX_ELEMENT_WORDS));
}

/// Slots used while signing.
pub(crate) mod sign {
    use super::*;

    pub const E: usize = VARIABLES_OFFSET;
    pub const D: usize = next_offset(E, MAX_ELEMENT_WORDS);
    pub const K: usize = next_offset(D, MAX_ELEMENT_WORDS);
    /// Receives the whole point `k x G`; `r` is its x coordinate.
    pub const R: usize = next_offset(K, MAX_COORDINATE_SPACE);
    pub const S: usize = next_offset(R, MAX_POINT_SPACE);
    pub const END: usize = next_offset(S, remainder_space(MAX_ELEMENT_WORDS));
}

/// Slots used while verifying.
pub(crate) mod verify {
    use super::*;

    const SCALAR_SPACE: usize = max(remainder_space(MAX_ELEMENT_WORDS), MAX_COORDINATE_SPACE);

    pub const E: usize = VARIABLES_OFFSET;
    pub const R: usize = next_offset(E, MAX_ELEMENT_WORDS);
    pub const S: usize = next_offset(R, MAX_ELEMENT_WORDS);
    pub const Q: usize = next_offset(S, MAX_ELEMENT_WORDS);
    pub const U1: usize = next_offset(Q, MAX_POINT_SPACE);
    pub const U2: usize = next_offset(U1, SCALAR_SPACE);
    pub const P1: usize = next_offset(U2, SCALAR_SPACE);
    pub const P2: usize = next_offset(P1, MAX_POINT_SPACE);
    pub const END: usize = next_offset(P2, MAX_POINT_SPACE);
}

/// Slots used while generating a key pair.
pub(crate) mod key_pair {
    use super::*;

    pub const PRIVATE_KEY: usize = VARIABLES_OFFSET;
    pub const PUBLIC_KEY: usize = next_offset(PRIVATE_KEY, MAX_COORDINATE_SPACE);
    pub const END: usize = next_offset(PUBLIC_KEY, MAX_POINT_SPACE);
}

/// Slots used while deriving a shared secret.
pub(crate) mod shared_secret {
    use super::*;

    pub const PRIVATE_KEY: usize = VARIABLES_OFFSET;
    pub const PUBLIC_KEY: usize = next_offset(PRIVATE_KEY, MAX_COORDINATE_SPACE);
    pub const PRODUCT: usize = next_offset(PUBLIC_KEY, MAX_POINT_SPACE);
    pub const END: usize = next_offset(PRODUCT, MAX_POINT_SPACE);
}

const _: () = {
    assert!(SCRATCHPAD_OFFSET + SCRATCHPAD_SPACE <= VARIABLES_OFFSET);
    assert!(validate::END <= PKA_RAM_WORDS);
    assert!(decompress::END <= PKA_RAM_WORDS);
    assert!(sign::END <= PKA_RAM_WORDS);
    assert!(verify::END <= PKA_RAM_WORDS);
    assert!(key_pair::END <= PKA_RAM_WORDS);
    assert!(shared_secret::END <= PKA_RAM_WORDS);
};
