//! # ECC driver interface
//!
//! [`EccDriver`] is the contract callers program against, so that a
//! hardware-accelerated driver and a software implementation can be swapped
//! at build time. [`Ecc`] implements it on top of the PKA.
//!
//! Operations are futures. They can run on any executor, with the PKA
//! interrupt wired to [`crate::pka::on_interrupt`], or be resumed from a
//! plain event loop with [`Coroutine`]:
//!
//! ```rust, ignore
//! let mut operation = core::pin::pin!(ecc.sign(&hash, &private_key, &mut signature));
//! let mut coroutine = Coroutine::new(operation.as_mut());
//! loop {
//!     if let Poll::Ready(result) = coroutine.resume() {
//!         break result;
//!     }
//!     // other work
//! }
//! ```

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use embassy_sync::waitqueue::AtomicWaker;
use rand_core::{CryptoRng, RngCore};

use crate::{
    curve::EllipticCurve,
    ecc::{Ecc, Error},
    pka::{self, Coprocessor},
};

/// Elliptic-curve operations on a selectable curve.
///
/// Buffers are big-endian. Their sizes are fixed by the enabled curve; see
/// [`EllipticCurve::element_bytes`]. Only one operation may be in progress at
/// a time.
#[allow(async_fn_in_trait)]
pub trait EccDriver {
    /// Selects `curve` for the following operations.
    fn enable(&mut self, curve: EllipticCurve);

    /// Releases the resources of the driver. Idempotent.
    fn disable(&mut self);

    /// The wait queue signaled when a suspended operation can make progress.
    fn coroutine_handle(&self) -> &'static AtomicWaker;

    /// Checks that `public_key` is a point on the curve.
    async fn validate_public_key(&mut self, public_key: &[u8]) -> Result<(), Error>;

    /// Compresses `public_key` into `compressed_public_key`.
    fn compress_public_key(
        &self,
        public_key: &[u8],
        compressed_public_key: &mut [u8],
    ) -> Result<(), Error>;

    /// Recovers `public_key` from `compressed_public_key`.
    async fn decompress_public_key(
        &mut self,
        compressed_public_key: &[u8],
        public_key: &mut [u8],
    ) -> Result<(), Error>;

    /// Signs `message_hash` into `signature`.
    async fn sign(
        &mut self,
        message_hash: &[u8],
        private_key: &[u8],
        signature: &mut [u8],
    ) -> Result<(), Error>;

    /// Verifies `signature` of `message_hash`.
    async fn verify(
        &mut self,
        signature: &[u8],
        message_hash: &[u8],
        public_key: &[u8],
    ) -> Result<(), Error>;

    /// Generates a key pair.
    async fn generate_key_pair(
        &mut self,
        private_key: &mut [u8],
        public_key: &mut [u8],
    ) -> Result<(), Error>;

    /// Derives the ECDH shared secret.
    async fn generate_shared_secret(
        &mut self,
        private_key: &[u8],
        public_key: &[u8],
        shared_secret: &mut [u8],
    ) -> Result<(), Error>;
}

impl<C, R> EccDriver for Ecc<C, R>
where
    C: Coprocessor,
    R: RngCore + CryptoRng,
{
    fn enable(&mut self, curve: EllipticCurve) {
        Ecc::enable(self, curve)
    }

    fn disable(&mut self) {
        Ecc::disable(self)
    }

    fn coroutine_handle(&self) -> &'static AtomicWaker {
        pka::waker()
    }

    async fn validate_public_key(&mut self, public_key: &[u8]) -> Result<(), Error> {
        Ecc::validate_public_key(self, public_key).await
    }

    fn compress_public_key(
        &self,
        public_key: &[u8],
        compressed_public_key: &mut [u8],
    ) -> Result<(), Error> {
        Ecc::compress_public_key(self, public_key, compressed_public_key)
    }

    async fn decompress_public_key(
        &mut self,
        compressed_public_key: &[u8],
        public_key: &mut [u8],
    ) -> Result<(), Error> {
        Ecc::decompress_public_key(self, compressed_public_key, public_key).await
    }

    async fn sign(
        &mut self,
        message_hash: &[u8],
        private_key: &[u8],
        signature: &mut [u8],
    ) -> Result<(), Error> {
        Ecc::sign(self, message_hash, private_key, signature).await
    }

    async fn verify(
        &mut self,
        signature: &[u8],
        message_hash: &[u8],
        public_key: &[u8],
    ) -> Result<(), Error> {
        Ecc::verify(self, signature, message_hash, public_key).await
    }

    async fn generate_key_pair(
        &mut self,
        private_key: &mut [u8],
        public_key: &mut [u8],
    ) -> Result<(), Error> {
        Ecc::generate_key_pair(self, private_key, public_key).await
    }

    async fn generate_shared_secret(
        &mut self,
        private_key: &[u8],
        public_key: &[u8],
        shared_secret: &mut [u8],
    ) -> Result<(), Error> {
        Ecc::generate_shared_secret(self, private_key, public_key, shared_secret).await
    }
}

/// Drives an operation from an event loop, one step per [`resume`] call.
///
/// [`resume`]: Coroutine::resume
pub struct Coroutine<'a, F> {
    future: Pin<&'a mut F>,
    resumes: usize,
}

impl<'a, F: Future> Coroutine<'a, F> {
    /// Wraps a pinned operation.
    pub fn new(future: Pin<&'a mut F>) -> Self {
        Self { future, resumes: 0 }
    }

    /// Runs the operation until it completes or waits for the coprocessor.
    ///
    /// Must not be called again after it returned [`Poll::Ready`].
    pub fn resume(&mut self) -> Poll<F::Output> {
        self.resumes += 1;
        let mut cx = Context::from_waker(Waker::noop());
        self.future.as_mut().poll(&mut cx)
    }

    /// How many times the operation has been resumed.
    pub fn resumes(&self) -> usize {
        self.resumes
    }

    /// Resumes the operation until it completes.
    pub fn run_to_completion(mut self) -> F::Output {
        loop {
            if let Poll::Ready(output) = self.resume() {
                return output;
            }
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::sim::SimulatedPka;

    async fn round_trip<D: EccDriver>(driver: &mut D, curve: EllipticCurve) -> Result<(), Error> {
        let n = curve.element_bytes();
        let mut private_key = [0u8; 32];
        let mut public_key = [0u8; 64];
        let mut signature = [0u8; 64];
        let hash = [0x42u8; 32];

        driver.enable(curve);
        driver
            .generate_key_pair(&mut private_key[..n], &mut public_key[..2 * n])
            .await?;
        driver
            .sign(&hash[..n], &private_key[..n], &mut signature[..2 * n])
            .await?;
        let result = driver
            .verify(&signature[..2 * n], &hash[..n], &public_key[..2 * n])
            .await;
        driver.disable();
        result
    }

    #[test]
    fn drives_operations_through_the_trait() {
        let mut ecc = Ecc::new(SimulatedPka::new(), StdRng::seed_from_u64(31));
        for curve in [EllipticCurve::P192, EllipticCurve::P256] {
            let result = Coroutine::new(core::pin::pin!(round_trip(&mut ecc, curve))).run_to_completion();
            assert_eq!(result, Ok(()));
        }
    }

    #[test]
    fn operations_suspend_while_the_coprocessor_is_busy() {
        let mut ecc = Ecc::new(SimulatedPka::with_latency(3), StdRng::seed_from_u64(32));
        ecc.enable(EllipticCurve::P192);

        let mut public_key = [0u8; 48];
        let mut private_key = [0u8; 24];
        let mut operation = core::pin::pin!(ecc.generate_key_pair(&mut private_key, &mut public_key));
        let mut coroutine = Coroutine::new(operation.as_mut());

        assert!(coroutine.resume().is_pending());
        let result = loop {
            if let Poll::Ready(result) = coroutine.resume() {
                break result;
            }
        };
        assert_eq!(result, Ok(()));
        assert!(coroutine.resumes() > 3);
    }

    #[test]
    fn instant_coprocessor_completes_in_one_resume() {
        let mut ecc = Ecc::new(SimulatedPka::new(), StdRng::seed_from_u64(33));
        ecc.enable(EllipticCurve::P192);

        let mut public_key = [0u8; 48];
        let mut private_key = [0u8; 24];
        let mut operation = core::pin::pin!(ecc.generate_key_pair(&mut private_key, &mut public_key));
        let mut coroutine = Coroutine::new(operation.as_mut());
        assert_eq!(coroutine.resume(), Poll::Ready(Ok(())));
    }

    #[test]
    fn handle_is_the_interrupt_wait_queue() {
        let ecc = Ecc::new(SimulatedPka::new(), StdRng::seed_from_u64(34));
        assert!(core::ptr::eq(ecc.coroutine_handle(), pka::waker()));
    }
}
