//! # Elliptic-curve cryptography on the PKA coprocessor
//!
//! ## Overview
//! This crate drives the Public Key Accelerator (PKA) found on the CC2538 to
//! provide ECDSA, ECDH and public-key handling for the NIST P-256 and P-192
//! curves, without ever blocking on the coprocessor.
//!
//! - [`pka`] is the register-level interface to the coprocessor, with the
//!   memory-mapped [`pka::Pka`] and the interrupt hook
//!   [`pka::on_interrupt`].
//! - [`ecc::Ecc`] composes coprocessor functions into the cryptographic
//!   operations. Every operation is an `async fn` that suspends while the
//!   coprocessor works.
//! - [`driver::EccDriver`] is the interface shared with other ECC
//!   implementations, and [`driver::Coroutine`] resumes an operation from an
//!   event loop without an executor.
//!
//! ## Usage
//!
//! ```rust, ignore
//! use pka_ecc::{driver::Coroutine, ecc::Ecc, pka::Pka, EllipticCurve};
//!
//! let peripherals = cc2538_pac::Peripherals::take().unwrap();
//! let pka = Pka::new(peripherals.PKA, &peripherals.SYS_CTRL);
//! let mut ecc = Ecc::new(pka, rng);
//! ecc.enable(EllipticCurve::P256);
//!
//! let mut private_key = [0u8; 32];
//! let mut public_key = [0u8; 64];
//! Coroutine::new(core::pin::pin!(
//!     ecc.generate_key_pair(&mut private_key, &mut public_key)
//! ))
//! .run_to_completion()?;
//! ```
//!
//! ## Feature Flags
#![doc = document_features::document_features!()]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![allow(async_fn_in_trait)]
#![deny(missing_docs, rust_2018_idioms)]
#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

// MUST be the first module
mod fmt;

pub mod config;
pub mod curve;
pub mod driver;
pub mod ecc;
pub mod layout;
pub mod pka;
mod reg_access;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::Config;
pub use curve::EllipticCurve;
pub use ecc::{Ecc, Error};
