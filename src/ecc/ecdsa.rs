//! ECDSA signature generation and verification.

use rand_core::{CryptoRng, RngCore};

use super::{check_len, fill_random, reject_degenerate, Ecc, Error, Round};
use crate::{
    ecc::primitives::Engine,
    layout::{self, MAX_ELEMENT_BYTES},
    pka::{Coprocessor, Function},
    reg_access::hash_to_element,
};

impl<C, R> Ecc<C, R>
where
    C: Coprocessor,
    R: RngCore + CryptoRng,
{
    /// Signs `message_hash` with `private_key`, writing `r || s` into
    /// `signature`.
    ///
    /// A hash longer than an element is truncated to its leftmost bytes, a
    /// shorter one is left-padded with zeros. The signature is written only if
    /// the operation succeeds.
    pub async fn sign(
        &mut self,
        message_hash: &[u8],
        private_key: &[u8],
        signature: &mut [u8],
    ) -> Result<(), Error> {
        use layout::sign::*;

        let (mut engine, rng, mut budget) = self.session()?;
        let element_bytes = engine.curve().words * 4;
        check_hash(message_hash)?;
        check_len(private_key, element_bytes)?;
        check_len(signature, 2 * element_bytes)?;

        let mut e = [0u8; MAX_ELEMENT_BYTES];
        hash_to_element(message_hash, &mut e[..element_bytes]);
        engine.element_to_ram(&e, E);
        engine.element_to_ram(private_key, D);

        let mut k = [0u8; MAX_ELEMENT_BYTES];
        let k = &mut k[..element_bytes];
        loop {
            fill_random(rng, k)?;
            engine.element_to_ram(k, K);

            match sign_round(&mut engine).await? {
                Round::Accepted => break,
                Round::Rejected => budget.spend()?,
            }
        }

        let (r, s) = signature.split_at_mut(element_bytes);
        engine.element_from_ram(r, R);
        engine.element_from_ram(s, S);
        Ok(())
    }

    /// Verifies the signature `r || s` of `message_hash` against an
    /// uncompressed `public_key`.
    ///
    /// The hash is fitted to the element width as in [`Ecc::sign`]. Every
    /// mismatch or degenerate intermediate result is reported as
    /// [`Error::Failure`].
    pub async fn verify(
        &mut self,
        signature: &[u8],
        message_hash: &[u8],
        public_key: &[u8],
    ) -> Result<(), Error> {
        let (mut engine, _, _) = self.session()?;
        let element_bytes = engine.curve().words * 4;
        check_len(signature, 2 * element_bytes)?;
        check_hash(message_hash)?;
        check_len(public_key, 2 * element_bytes)?;

        verify(&mut engine, signature, message_hash, public_key)
            .await
            .map_err(|e| {
                debug!("signature rejected: {:?}", e);
                e.into_hard()
            })
    }
}

fn check_hash(message_hash: &[u8]) -> Result<(), Error> {
    if message_hash.is_empty() {
        error!("empty message hash");
        Err(Error::SizeMismatchCurve)
    } else {
        Ok(())
    }
}

/// One signing attempt with the nonce `k` already in RAM.
async fn sign_round<C: Coprocessor>(engine: &mut Engine<'_, C>) -> Result<Round, Error> {
    use layout::{sign::*, G_OFFSET, NULL_OFFSET, N_OFFSET};

    if engine.check_bounds(K, NULL_OFFSET, N_OFFSET).await.is_err() {
        warn!("k was not in [1, n - 1]");
        return Ok(Round::Rejected);
    }

    // (r, _) = k x G
    let point = engine
        .add_or_multiply_point(Function::EccMul, K, G_OFFSET, R)
        .await;
    if reject_degenerate(point)? == Round::Rejected {
        warn!("k x G is at infinity");
        return Ok(Round::Rejected);
    }

    if engine.compare(NULL_OFFSET, R).await.is_eq() {
        warn!("r is zero");
        return Ok(Round::Rejected);
    }

    // s = rd mod n
    let rd = engine
        .add_or_multiply_modulo(Function::Multiply, D, R, N_OFFSET, S)
        .await;
    if reject_degenerate(rd)? == Round::Rejected {
        warn!("rd mod n was zero");
        return Ok(Round::Rejected);
    }

    if engine.compare(E, S).await.is_eq() {
        warn!("rd and e coincide");
        return Ok(Round::Rejected);
    }

    // s = e + rd mod n
    let sum = engine
        .add_or_multiply_modulo(Function::Add, E, S, N_OFFSET, S)
        .await;
    if reject_degenerate(sum)? == Round::Rejected {
        warn!("e + rd mod n was zero");
        return Ok(Round::Rejected);
    }

    // k = 1 / k
    let inverse = engine.invert_modulo(K, N_OFFSET, K).await;
    if reject_degenerate(inverse)? == Round::Rejected {
        warn!("inverse of k was zero");
        return Ok(Round::Rejected);
    }

    // s = (e + rd) / k mod n
    let s = engine
        .add_or_multiply_modulo(Function::Multiply, K, S, N_OFFSET, S)
        .await;
    if reject_degenerate(s)? == Round::Rejected || engine.compare(NULL_OFFSET, S).await.is_eq() {
        warn!("s is zero");
        return Ok(Round::Rejected);
    }

    Ok(Round::Accepted)
}

async fn verify<C: Coprocessor>(
    engine: &mut Engine<'_, C>,
    signature: &[u8],
    message_hash: &[u8],
    public_key: &[u8],
) -> Result<(), Error> {
    use layout::{verify::*, G_OFFSET, NULL_OFFSET, N_OFFSET};

    let element_bytes = engine.curve().words * 4;
    let mut e = [0u8; MAX_ELEMENT_BYTES];
    hash_to_element(message_hash, &mut e[..element_bytes]);

    engine.point_to_ram(public_key, Q);
    engine.element_to_ram(&signature[..element_bytes], R);
    engine.element_to_ram(&signature[element_bytes..], S);
    engine.element_to_ram(&e, E);

    engine.check_bounds(R, NULL_OFFSET, N_OFFSET).await?;
    engine.check_bounds(S, NULL_OFFSET, N_OFFSET).await?;

    // s = 1 / s
    engine.invert_modulo(S, N_OFFSET, S).await?;
    // u1 = e / s mod n
    engine
        .add_or_multiply_modulo(Function::Multiply, S, E, N_OFFSET, U1)
        .await?;
    // p1 = u1 x G
    engine
        .add_or_multiply_point(Function::EccMul, U1, G_OFFSET, P1)
        .await?;
    // u2 = r / s mod n
    engine
        .add_or_multiply_modulo(Function::Multiply, S, R, N_OFFSET, U2)
        .await?;
    // p2 = u2 x Q
    engine
        .add_or_multiply_point(Function::EccMul, U2, Q, P2)
        .await?;
    // p1 = p1 + p2
    engine
        .add_or_multiply_point(Function::EccAdd, P1, P2, P1)
        .await?;

    if engine.compare(P1, R).await.is_eq() {
        Ok(())
    } else {
        Err(Error::Failure)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use p256::ecdsa::{
        signature::hazmat::{PrehashSigner, PrehashVerifier},
        Signature,
        SigningKey,
        VerifyingKey,
    };

    use super::*;
    use crate::{
        config::Config,
        curve::EllipticCurve,
        driver::Coroutine,
        ecc::test_support::{scripted_ecc, seeded_ecc},
    };

    fn run<F: core::future::Future>(future: F) -> F::Output {
        Coroutine::new(core::pin::pin!(future)).run_to_completion()
    }

    const HASH: [u8; 32] = hex!("af2bdbe1aa9b6ec1e2ade1d694f41fc71a831d0268e9891562113d8a62add1bf");

    const P256_G: [u8; 64] = hex!(
        "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"
        "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"
    );

    const P256_N: [u8; 32] =
        hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551");

    fn key_pair<C: Coprocessor, R: RngCore + CryptoRng>(
        ecc: &mut Ecc<C, R>,
        n: usize,
    ) -> ([u8; 32], [u8; 64]) {
        let mut private_key = [0u8; 32];
        let mut public_key = [0u8; 64];
        run(ecc.generate_key_pair(&mut private_key[..n], &mut public_key[..2 * n])).unwrap();
        (private_key, public_key)
    }

    #[test]
    fn sign_then_verify() {
        for curve in [EllipticCurve::P256, EllipticCurve::P192] {
            let mut ecc = seeded_ecc(curve, 21);
            let n = curve.element_bytes();
            let (private_key, public_key) = key_pair(&mut ecc, n);

            let mut signature = [0u8; 64];
            run(ecc.sign(&HASH[..n], &private_key[..n], &mut signature[..2 * n])).unwrap();
            assert_eq!(
                run(ecc.verify(&signature[..2 * n], &HASH[..n], &public_key[..2 * n])),
                Ok(())
            );
        }
    }

    #[test]
    fn signing_is_randomized() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 22);
        let (private_key, public_key) = key_pair(&mut ecc, 32);

        let mut first = [0u8; 64];
        let mut second = [0u8; 64];
        run(ecc.sign(&HASH, &private_key, &mut first)).unwrap();
        run(ecc.sign(&HASH, &private_key, &mut second)).unwrap();
        assert_ne!(first, second);
        assert_eq!(run(ecc.verify(&first, &HASH, &public_key)), Ok(()));
        assert_eq!(run(ecc.verify(&second, &HASH, &public_key)), Ok(()));
    }

    #[test]
    fn signature_verifies_with_reference() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 23);
        let (private_key, public_key) = key_pair(&mut ecc, 32);

        let mut signature = [0u8; 64];
        run(ecc.sign(&HASH, &private_key, &mut signature)).unwrap();

        let verifying_key =
            VerifyingKey::from_sec1_bytes(&[&[0x04][..], &public_key[..]].concat()).unwrap();
        let signature = Signature::from_slice(&signature).unwrap();
        verifying_key.verify_prehash(&HASH, &signature).unwrap();
    }

    #[test]
    fn reference_signature_verifies() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 24);
        let signing_key = SigningKey::from_slice(&hex!(
            "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721"
        ))
        .unwrap();
        let signature: Signature = signing_key.sign_prehash(&HASH).unwrap();
        let public_key = signing_key.verifying_key().to_encoded_point(false);

        assert_eq!(
            run(ecc.verify(&signature.to_bytes(), &HASH, &public_key.as_bytes()[1..])),
            Ok(())
        );
    }

    #[test]
    fn generator_key_scenario() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 25);
        let mut private_key = [0u8; 32];
        private_key[31] = 1;

        let mut signature = [0u8; 64];
        run(ecc.sign(&HASH, &private_key, &mut signature)).unwrap();
        assert_eq!(run(ecc.verify(&signature, &HASH, &P256_G)), Ok(()));

        let mut other = HASH;
        other[5] ^= 0x40;
        assert_eq!(
            run(ecc.verify(&signature, &other, &P256_G)),
            Err(Error::Failure)
        );
    }

    #[test]
    fn out_of_range_signatures_are_rejected() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 26);
        let (private_key, public_key) = key_pair(&mut ecc, 32);
        let mut signature = [0u8; 64];
        run(ecc.sign(&HASH, &private_key, &mut signature)).unwrap();

        for (offset, value) in [(0, [0u8; 32]), (0, P256_N), (32, [0u8; 32]), (32, P256_N), (32, [0xff; 32])] {
            let mut bad = signature;
            bad[offset..offset + 32].copy_from_slice(&value);
            assert_eq!(
                run(ecc.verify(&bad, &HASH, &public_key)),
                Err(Error::Failure)
            );
        }
    }

    #[test]
    fn bit_flips_are_rejected() {
        let mut ecc = seeded_ecc(EllipticCurve::P192, 27);
        let (private_key, public_key) = key_pair(&mut ecc, 24);
        let mut signature = [0u8; 48];
        run(ecc.sign(&HASH[..24], &private_key[..24], &mut signature)).unwrap();

        for bit in [0, 7, 100, 191, 200, 383] {
            let mut bad = signature;
            bad[bit / 8] ^= 1 << (bit % 8);
            assert_eq!(
                run(ecc.verify(&bad, &HASH[..24], &public_key[..48])),
                Err(Error::Failure)
            );
        }
    }

    #[test]
    fn long_hashes_are_truncated() {
        let mut ecc = seeded_ecc(EllipticCurve::P192, 28);
        let (private_key, public_key) = key_pair(&mut ecc, 24);

        let mut signature = [0u8; 48];
        run(ecc.sign(&HASH, &private_key[..24], &mut signature)).unwrap();
        assert_eq!(
            run(ecc.verify(&signature, &HASH[..24], &public_key[..48])),
            Ok(())
        );
    }

    #[test]
    fn rejected_nonces_are_redrawn() {
        let zero = [0u8; 32];
        let mut k = [0u8; 32];
        k[31] = 3;
        let mut ecc = scripted_ecc(
            EllipticCurve::P256,
            &[&zero, &P256_N, &k],
            Config::default(),
        );
        let mut private_key = [0u8; 32];
        private_key[31] = 1;

        let mut signature = [0u8; 64];
        run(ecc.sign(&HASH, &private_key, &mut signature)).unwrap();
        assert_eq!(run(ecc.verify(&signature, &HASH, &P256_G)), Ok(()));
        assert_eq!(ecc.free().1.consumed(), 3);
    }

    #[test]
    fn nonce_with_rd_equal_to_hash_is_redrawn() {
        // x(5G); with d = 1 and k = 5, rd mod n equals e
        const HASH_X_5G: [u8; 32] =
            hex!("51590b7a515140d2d784c85608668fdfef8c82fd1f5be52421554a0dc3d033ed");
        let mut first = [0u8; 32];
        first[31] = 5;
        let mut second = [0u8; 32];
        second[31] = 7;
        let mut ecc = scripted_ecc(
            EllipticCurve::P256,
            &[&first, &second],
            Config::default(),
        );
        let mut private_key = [0u8; 32];
        private_key[31] = 1;

        let mut signature = [0u8; 64];
        run(ecc.sign(&HASH_X_5G, &private_key, &mut signature)).unwrap();
        assert_eq!(run(ecc.verify(&signature, &HASH_X_5G, &P256_G)), Ok(()));
        assert_eq!(ecc.free().1.consumed(), 2);
    }

    #[test]
    fn signing_honors_the_retry_limit() {
        let zero = [0u8; 32];
        let mut ecc = scripted_ecc(
            EllipticCurve::P256,
            &[&zero, &zero],
            Config::default().retry_limit(1),
        );
        let mut private_key = [0u8; 32];
        private_key[31] = 1;

        let mut signature = [0x5au8; 64];
        assert_eq!(
            run(ecc.sign(&HASH, &private_key, &mut signature)),
            Err(Error::RetryLimit)
        );
        assert_eq!(signature, [0x5a; 64]);
    }

    #[test]
    fn random_source_failure_aborts_signing() {
        let mut ecc = scripted_ecc(EllipticCurve::P256, &[], Config::default());
        let mut private_key = [0u8; 32];
        private_key[31] = 1;
        let mut signature = [0x5au8; 64];
        assert_eq!(
            run(ecc.sign(&HASH, &private_key, &mut signature)),
            Err(Error::RandomSource)
        );
        assert_eq!(signature, [0x5a; 64]);
    }

    #[test]
    fn sizes_are_checked() {
        let mut ecc = seeded_ecc(EllipticCurve::P256, 29);
        let private_key = [1u8; 32];
        let mut signature = [0u8; 48];
        assert_eq!(
            run(ecc.sign(&HASH, &private_key, &mut signature)),
            Err(Error::SizeMismatchCurve)
        );
        assert_eq!(
            run(ecc.sign(&[], &private_key, &mut [0u8; 64])),
            Err(Error::SizeMismatchCurve)
        );
        assert_eq!(
            run(ecc.verify(&[0u8; 64], &HASH, &[0u8; 48])),
            Err(Error::SizeMismatchCurve)
        );
    }
}
