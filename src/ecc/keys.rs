//! Public-key checks, key pairs and ECDH.

use rand_core::{CryptoRng, RngCore};

use super::{check_len, fill_random, reject_degenerate, Ecc, Error, Round};
use crate::{
    ecc::primitives::Engine,
    layout::{self, MAX_ELEMENT_BYTES},
    pka::{Coprocessor, Function},
};

impl<C, R> Ecc<C, R>
where
    C: Coprocessor,
    R: RngCore + CryptoRng,
{
    /// Checks that an uncompressed public key is a point on the enabled
    /// curve: `0 < x < p`, `0 < y < p` and `y^2 = x^3 + ax + b (mod p)`.
    pub async fn validate_public_key(&mut self, public_key: &[u8]) -> Result<(), Error> {
        let (mut engine, _, _) = self.session()?;
        check_len(public_key, 2 * engine.curve().words * 4)?;

        validate(&mut engine, public_key).await
    }

    /// Recovers the uncompressed public key from its compressed form, the
    /// parity of y followed by x.
    ///
    /// Only the lowest bit of the prefix byte is examined, so SEC1 prefixes
    /// (`0x02`, `0x03`) work as well.
    pub async fn decompress_public_key(
        &mut self,
        compressed_public_key: &[u8],
        public_key: &mut [u8],
    ) -> Result<(), Error> {
        use layout::decompress::*;

        let (mut engine, _, _) = self.session()?;
        let curve = engine.curve();
        let element_bytes = curve.words * 4;
        check_len(compressed_public_key, element_bytes + 1)?;
        check_len(public_key, 2 * element_bytes)?;

        let parity = compressed_public_key[0] & 0x01;
        engine.element_to_ram(&compressed_public_key[1..], X);

        // y = x^3 + ax + b
        right_hand_side(&mut engine, X, Y).await;

        // Square root by exponentiation with (p + 1) / 4, which is valid for
        // p = 3 (mod 4).
        engine.copy(layout::ONE_OFFSET, ROOT, curve.words).await;
        for bit in (2..curve.binary_length_of_p_plus_one).rev() {
            engine
                .field_add_or_multiply(Function::Multiply, ROOT, ROOT, ROOT)
                .await;
            if curve.p_plus_one_bit(bit) {
                engine
                    .field_add_or_multiply(Function::Multiply, ROOT, Y, ROOT)
                    .await;
            }
        }

        if engine.word_from_ram(ROOT) & 0x01 != u32::from(parity) {
            engine.subtract(layout::PRIME_OFFSET, ROOT, ROOT).await;
        }

        let (x, y) = public_key.split_at_mut(element_bytes);
        engine.element_from_ram(x, X);
        engine.element_from_ram(y, ROOT);
        Ok(())
    }

    /// Generates a new key pair: a random private key in `[1, n - 1]` and the
    /// matching uncompressed public key.
    ///
    /// The outputs are written only if the operation succeeds.
    pub async fn generate_key_pair(
        &mut self,
        private_key: &mut [u8],
        public_key: &mut [u8],
    ) -> Result<(), Error> {
        use layout::key_pair::*;

        let (mut engine, rng, mut budget) = self.session()?;
        let element_bytes = engine.curve().words * 4;
        check_len(private_key, element_bytes)?;
        check_len(public_key, 2 * element_bytes)?;

        let mut scalar = [0u8; MAX_ELEMENT_BYTES];
        let scalar = &mut scalar[..element_bytes];
        loop {
            fill_random(rng, scalar)?;
            engine.element_to_ram(scalar, PRIVATE_KEY);

            if engine
                .check_bounds(PRIVATE_KEY, layout::NULL_OFFSET, layout::N_OFFSET)
                .await
                .is_err()
            {
                warn!("private key was not in [1, n - 1]");
                budget.spend()?;
                continue;
            }

            let product = engine
                .add_or_multiply_point(Function::EccMul, PRIVATE_KEY, layout::G_OFFSET, PUBLIC_KEY)
                .await;
            if reject_degenerate(product)? == Round::Rejected {
                warn!("public key at infinity");
                budget.spend()?;
                continue;
            }
            break;
        }

        private_key.copy_from_slice(scalar);
        engine.point_from_ram(public_key, PUBLIC_KEY);
        Ok(())
    }

    /// Derives the ECDH shared secret, the x coordinate of
    /// `private_key x public_key`.
    ///
    /// The public key is not validated here, see
    /// [`Ecc::validate_public_key`].
    pub async fn generate_shared_secret(
        &mut self,
        private_key: &[u8],
        public_key: &[u8],
        shared_secret: &mut [u8],
    ) -> Result<(), Error> {
        use layout::shared_secret::*;

        let (mut engine, _, _) = self.session()?;
        let element_bytes = engine.curve().words * 4;
        check_len(private_key, element_bytes)?;
        check_len(public_key, 2 * element_bytes)?;
        check_len(shared_secret, element_bytes)?;

        engine.element_to_ram(private_key, PRIVATE_KEY);
        engine.point_to_ram(public_key, PUBLIC_KEY);

        engine
            .add_or_multiply_point(Function::EccMul, PRIVATE_KEY, PUBLIC_KEY, PRODUCT)
            .await
            .map_err(|e| {
                error!("ECDH failed: {:?}", e);
                e.into_hard()
            })?;

        engine.element_from_ram(shared_secret, PRODUCT);
        Ok(())
    }
}

async fn validate<C: Coprocessor>(engine: &mut Engine<'_, C>, public_key: &[u8]) -> Result<(), Error> {
    use layout::validate::*;

    let element_bytes = engine.curve().words * 4;
    engine.element_to_ram(&public_key[..element_bytes], X);
    engine.element_to_ram(&public_key[element_bytes..], Y);

    engine
        .check_bounds(X, layout::NULL_OFFSET, layout::PRIME_OFFSET)
        .await?;
    engine
        .check_bounds(Y, layout::NULL_OFFSET, layout::PRIME_OFFSET)
        .await?;

    // y^2
    engine
        .field_add_or_multiply(Function::Multiply, Y, Y, LHS)
        .await;
    right_hand_side(engine, X, RHS).await;

    if engine.compare(LHS, RHS).await.is_eq() {
        Ok(())
    } else {
        Err(Error::Failure)
    }
}

/// `result = x^3 + ax + b (mod p)`, computed as `(x^2 + a) x + b`.
///
/// Intermediate values may be zero: `x^2 + a = 0` has solutions on curves
/// where `-a` is a square.
async fn right_hand_side<C: Coprocessor>(engine: &mut Engine<'_, C>, x: usize, result: usize) {
    use layout::{A_OFFSET, B_OFFSET};

    engine
        .field_add_or_multiply(Function::Multiply, x, x, result)
        .await;
    engine
        .field_add_or_multiply(Function::Add, result, A_OFFSET, result)
        .await;
    engine
        .field_add_or_multiply(Function::Multiply, result, x, result)
        .await;
    engine
        .field_add_or_multiply(Function::Add, result, B_OFFSET, result)
        .await;
}
