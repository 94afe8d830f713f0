//! # Elliptic Curve Cryptography (ECC) on the PKA
//!
//! ## Overview
//!
//! [`Ecc`] implements ECDSA signing and verification, ECDH shared secrets,
//! key-pair generation and public-key validation, compression and
//! decompression for the NIST P-256 and P-192 curves, on top of a PKA
//! [`Coprocessor`].
//!
//! Each operation is a sequence of coprocessor functions. The driver starts
//! one function, then suspends until the engine reports completion, so the
//! operations are `async`: they can be awaited on an executor, or resumed by
//! hand from an event loop with [`Coroutine`](crate::driver::Coroutine).
//!
//! ## Configuration
//! Call [`Ecc::enable`] to select a curve before running any operation. This
//! resets the coprocessor and loads the curve constants into its RAM.
//! [`Ecc::disable`] powers the coprocessor down again.
//!
//! Inputs and outputs are big-endian byte strings whose width is fixed by the
//! enabled curve: an element is [`EllipticCurve::element_bytes`] long, an
//! uncompressed public key or a signature twice that, and a compressed
//! public key one byte more than an element.
//!
//! ## Random numbers
//! `sign` and `generate_key_pair` draw scalars from the random source given
//! to [`Ecc::new`] and reject the ones that are out of range or lead to
//! degenerate intermediate values. A failing random source aborts the
//! operation with [`Error::RandomSource`].

use rand_core::{CryptoRng, RngCore};

use crate::{
    config::Config,
    curve::{Curve, EllipticCurve},
    layout,
    pka::Coprocessor,
};

mod ecdsa;
mod keys;
pub(crate) mod primitives;

use primitives::Engine;

/// ECC interface error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The operation failed: a check on the inputs did not pass, or the
    /// coprocessor reported an error.
    Failure,
    /// An intermediate result was zero.
    ResultIsZero,
    /// A point operation resulted in the point at infinity.
    PointAtInfinity,
    /// A buffer does not have the size the enabled curve requires.
    SizeMismatchCurve,
    /// No curve is enabled.
    NotEnabled,
    /// The curve identifier is not supported.
    UnsupportedCurve,
    /// The random source failed.
    RandomSource,
    /// The configured number of retries was exhausted.
    RetryLimit,
}

impl Error {
    /// Tells if the error is a degenerate intermediate result, which
    /// rejection sampling resolves by drawing a new random scalar.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Error::ResultIsZero | Error::PointAtInfinity)
    }

    /// Turns degenerate results into plain failures for operations that do
    /// not retry.
    pub(crate) const fn into_hard(self) -> Self {
        if self.is_retryable() {
            Error::Failure
        } else {
            self
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let message = match self {
            Error::Failure => "operation failed",
            Error::ResultIsZero => "intermediate result is zero",
            Error::PointAtInfinity => "result is the point at infinity",
            Error::SizeMismatchCurve => "buffer size does not match the curve",
            Error::NotEnabled => "no curve enabled",
            Error::UnsupportedCurve => "unsupported curve",
            Error::RandomSource => "random source failed",
            Error::RetryLimit => "retry limit reached",
        };
        f.write_str(message)
    }
}

impl core::error::Error for Error {}

/// The ECC driver instance
pub struct Ecc<C, R> {
    pka: C,
    rng: R,
    curve: Option<EllipticCurve>,
    config: Config,
}

impl<C, R> Ecc<C, R>
where
    C: Coprocessor,
    R: RngCore + CryptoRng,
{
    /// Creates a new driver with the default [`Config`]. No curve is enabled
    /// yet.
    pub fn new(pka: C, rng: R) -> Self {
        Self::new_with_config(pka, rng, Config::default())
    }

    /// Creates a new driver with the given configuration.
    pub fn new_with_config(pka: C, rng: R, config: Config) -> Self {
        Self {
            pka,
            rng,
            curve: None,
            config,
        }
    }

    /// Releases the coprocessor and the random source.
    pub fn free(self) -> (C, R) {
        (self.pka, self.rng)
    }

    /// The configuration the driver was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The curve currently enabled, if any.
    pub fn curve(&self) -> Option<EllipticCurve> {
        self.curve
    }

    /// Resets the coprocessor and loads the constants of `curve` into its
    /// RAM.
    pub fn enable(&mut self, curve: EllipticCurve) {
        let info = curve.info();
        debug!("enabling ECC for {}", info.name);

        self.pka.init();
        load_curve(&mut self.pka, info);
        self.curve = Some(curve);
    }

    /// Powers down the coprocessor. Calling this with no curve enabled does
    /// nothing.
    pub fn disable(&mut self) {
        if self.curve.take().is_some() {
            debug!("disabling ECC");
            self.pka.disable();
        }
    }

    /// Compresses an uncompressed public key: the parity of y followed by x.
    ///
    /// Nothing is checked beyond the buffer sizes, see
    /// [`Ecc::validate_public_key`].
    pub fn compress_public_key(
        &self,
        public_key: &[u8],
        compressed_public_key: &mut [u8],
    ) -> Result<(), Error> {
        let curve = self.enabled()?;
        check_len(public_key, 2 * curve.element_bytes())?;
        check_len(compressed_public_key, curve.element_bytes() + 1)?;

        crate::reg_access::compress(public_key, compressed_public_key);
        Ok(())
    }

    fn enabled(&self) -> Result<EllipticCurve, Error> {
        self.curve.ok_or_else(|| {
            error!("no curve enabled");
            Error::NotEnabled
        })
    }

    /// Splits the driver into the coprocessor session of the enabled curve,
    /// the random source and a fresh retry budget.
    fn session(&mut self) -> Result<(Engine<'_, C>, &mut R, RetryBudget), Error> {
        let curve = self.enabled()?;
        Ok((
            Engine::new(&mut self.pka, curve.info()),
            &mut self.rng,
            RetryBudget::new(self.config.retry_limit),
        ))
    }
}

pub(crate) fn load_curve<C: Coprocessor>(pka: &mut C, curve: &Curve) {
    let words = curve.words;
    let coordinate = layout::coordinate_space(words);

    let mut one = [0u32; layout::MAX_ELEMENT_WORDS];
    one[0] = 1;

    pka.write_ram(layout::NULL_OFFSET, &[0; layout::MAX_ELEMENT_WORDS][..words]);
    pka.write_ram(layout::ONE_OFFSET, &one[..words]);
    pka.write_ram(layout::G_OFFSET, &curve.x[..words]);
    pka.write_ram(layout::G_OFFSET + coordinate, &curve.y[..words]);
    pka.write_ram(layout::PAB_OFFSET, &curve.p[..words]);
    pka.write_ram(layout::PAB_OFFSET + coordinate, &curve.a[..words]);
    pka.write_ram(layout::PAB_OFFSET + 2 * coordinate, &curve.b[..words]);
    pka.write_ram(layout::N_OFFSET, &curve.n[..words]);
    pka.write_ram(layout::A_OFFSET, &curve.a[..words]);
    pka.write_ram(layout::B_OFFSET, &curve.b[..words]);
}

pub(crate) fn check_len(buffer: &[u8], expected: usize) -> Result<(), Error> {
    if buffer.len() == expected {
        Ok(())
    } else {
        error!("buffer of {} bytes, expected {}", buffer.len(), expected);
        Err(Error::SizeMismatchCurve)
    }
}

/// Counts the rejected rounds of a rejection-sampling loop.
pub(crate) struct RetryBudget {
    remaining: Option<u32>,
}

impl RetryBudget {
    pub(crate) fn new(limit: Option<u32>) -> Self {
        Self { remaining: limit }
    }

    /// Accounts for one rejected round.
    pub(crate) fn spend(&mut self) -> Result<(), Error> {
        match &mut self.remaining {
            None => Ok(()),
            Some(0) => {
                error!("retry limit reached");
                Err(Error::RetryLimit)
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
        }
    }
}

/// Outcome of one round of rejection sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Round {
    Accepted,
    Rejected,
}

/// Maps a degenerate result to a rejected round and passes every other
/// error on.
pub(crate) fn reject_degenerate(result: Result<(), Error>) -> Result<Round, Error> {
    match result {
        Ok(()) => Ok(Round::Accepted),
        Err(e) if e.is_retryable() => Ok(Round::Rejected),
        Err(e) => Err(e),
    }
}

/// Fills `buffer` from the random source.
pub(crate) fn fill_random<R: RngCore>(rng: &mut R, buffer: &mut [u8]) -> Result<(), Error> {
    rng.try_fill_bytes(buffer).map_err(|_| {
        error!("random source failed");
        Error::RandomSource
    })
}
