//! # Public Key Accelerator (PKA)
//!
//! ## Overview
//! The PKA is an asynchronous big-number engine. The CPU stores operands in
//! the PKA RAM, points the operand registers (`APTR`, `BPTR`, `CPTR`,
//! `DPTR`) and length registers at them, and starts one function by writing
//! the `FUNCTION` register with the `RUN` bit set. The engine clears `RUN`
//! once it is done and reports the outcome in the `COMPARE`, `MSW` and
//! `SHIFT` status registers.
//!
//! [`Coprocessor`] is the register-level seam the ECC driver is written
//! against: [`Pka`] drives the memory-mapped peripheral, and the simulated
//! engine in [`crate::sim`] stands in for it on the host.
//!
//! ## Waiting for completion
//! The driver never spins on the engine. Every function is awaited through a
//! future that yields until `RUN` reads back as clear. Wire the PKA interrupt
//! to [`on_interrupt`] so that executors are woken when a function finishes;
//! without it, the caller simply has to poll the operation again.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use embassy_sync::waitqueue::AtomicWaker;

mod cc2538;

pub use cc2538::Pka;

/// PKA registers, as seen through [`Coprocessor::read_register`] and
/// [`Coprocessor::write_register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Word offset of vector A.
    APtr,
    /// Word offset of vector B.
    BPtr,
    /// Word offset of vector C.
    CPtr,
    /// Word offset of vector D.
    DPtr,
    /// Length of vector A in words.
    ALength,
    /// Length of vector B in words.
    BLength,
    /// Shift amount, and result status of the sequencer operations.
    Shift,
    /// Function to run, plus the `RUN` flag.
    Function,
    /// Outcome of the last COMPARE.
    Compare,
    /// Address of the most significant word of the last result.
    Msw,
    /// Address of the most significant word of the last quotient.
    DivMsw,
}

/// Functions the driver runs on the PKA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Function {
    /// `C = A * B`
    Multiply,
    /// `C = A + B`
    Add,
    /// `C = A - B`
    Subtract,
    /// `C = A mod B`
    Modulo,
    /// Compares A with B and reports the outcome in `COMPARE`.
    Compare,
    /// `C = A`
    Copy,
    /// `D = A^-1 mod B`
    ModInv,
    /// `D = A + C` on the curve described at B.
    EccAdd,
    /// `D = A x C` on the curve described at B.
    EccMul,
}

/// Starts the function written along with it; cleared by the engine when done.
pub const FUNCTION_RUN: u32 = 1 << 15;

const FUNCTION_MULTIPLY: u32 = 1 << 0;
const FUNCTION_ADD: u32 = 1 << 4;
const FUNCTION_SUBTRACT: u32 = 1 << 5;
const FUNCTION_MODULO: u32 = 1 << 9;
const FUNCTION_COMPARE: u32 = 1 << 10;
const FUNCTION_COPY: u32 = 1 << 11;
const FUNCTION_SEQUENCER_MASK: u32 = 0b111 << 12;
const FUNCTION_ECC_ADD: u32 = 0b011 << 12;
const FUNCTION_ECC_MUL: u32 = 0b101 << 12;
const FUNCTION_MOD_INV: u32 = 0b111 << 12;

impl Function {
    /// Encoding of the function in the `FUNCTION` register, without `RUN`.
    pub const fn bits(self) -> u32 {
        match self {
            Function::Multiply => FUNCTION_MULTIPLY,
            Function::Add => FUNCTION_ADD,
            Function::Subtract => FUNCTION_SUBTRACT,
            Function::Modulo => FUNCTION_MODULO,
            Function::Compare => FUNCTION_COMPARE,
            Function::Copy => FUNCTION_COPY,
            Function::ModInv => FUNCTION_MOD_INV,
            Function::EccAdd => FUNCTION_ECC_ADD,
            Function::EccMul => FUNCTION_ECC_MUL,
        }
    }

    /// Decodes a `FUNCTION` register value. Sequencer operations take
    /// precedence over the basic arithmetic bits.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & FUNCTION_SEQUENCER_MASK {
            FUNCTION_ECC_ADD => return Some(Function::EccAdd),
            FUNCTION_ECC_MUL => return Some(Function::EccMul),
            FUNCTION_MOD_INV => return Some(Function::ModInv),
            0 => {}
            _ => return None,
        }

        if bits & FUNCTION_MULTIPLY != 0 {
            Some(Function::Multiply)
        } else if bits & FUNCTION_ADD != 0 {
            Some(Function::Add)
        } else if bits & FUNCTION_SUBTRACT != 0 {
            Some(Function::Subtract)
        } else if bits & FUNCTION_MODULO != 0 {
            Some(Function::Modulo)
        } else if bits & FUNCTION_COMPARE != 0 {
            Some(Function::Compare)
        } else if bits & FUNCTION_COPY != 0 {
            Some(Function::Copy)
        } else {
            None
        }
    }
}

/// `COMPARE`: A equals B.
pub const COMPARE_A_EQUALS_B: u32 = 1 << 0;
/// `COMPARE`: A is less than B.
pub const COMPARE_A_LESS_THAN_B: u32 = 1 << 1;
/// `COMPARE`: A is greater than B.
pub const COMPARE_A_GREATER_THAN_B: u32 = 1 << 2;

/// `MSW`: word address of the most significant non-zero result word.
pub const MSW_ADDRESS_MASK: u32 = 0x7ff;
/// `MSW`: the result is zero.
pub const MSW_RESULT_IS_ZERO: u32 = 1 << 15;

/// `SHIFT` after ECC-ADD/ECC-MUL: the result is a regular point.
pub const SHIFT_SUCCESS: u32 = 0;
/// `SHIFT` after ECC-ADD/ECC-MUL: the result is the point at infinity.
pub const SHIFT_POINT_AT_INFINITY: u32 = 7;

/// Register-level access to a PKA engine.
///
/// RAM offsets are in 32-bit words from the start of the PKA RAM.
pub trait Coprocessor {
    /// Powers up and resets the engine.
    fn init(&mut self);

    /// Powers down the engine.
    fn disable(&mut self);

    /// Reads a register.
    fn read_register(&self, register: Register) -> u32;

    /// Writes a register. Writing [`Register::Function`] with
    /// [`FUNCTION_RUN`] set starts a function. The status registers
    /// (`COMPARE`, `MSW`, `DIVMSW`) are read-only; writes to them are ignored.
    fn write_register(&mut self, register: Register, value: u32);

    /// Reads `words.len()` words starting at `offset`.
    fn read_ram(&self, offset: usize, words: &mut [u32]);

    /// Writes `words` starting at `offset`.
    fn write_ram(&mut self, offset: usize, words: &[u32]);

    /// Tells if a function is still running.
    fn is_busy(&self) -> bool {
        self.read_register(Register::Function) & FUNCTION_RUN != 0
    }
}

static WAKER: AtomicWaker = AtomicWaker::new();

/// Wakes the task waiting for the PKA. Call this from the PKA interrupt
/// handler.
pub fn on_interrupt() {
    WAKER.wake();
}

/// The wait queue the driver registers suspended operations on.
pub(crate) fn waker() -> &'static AtomicWaker {
    &WAKER
}

/// Resolves once the engine has finished the running function.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub(crate) struct PkaFuture<'a, C: Coprocessor> {
    pka: &'a C,
}

impl<'a, C: Coprocessor> PkaFuture<'a, C> {
    pub(crate) fn new(pka: &'a C) -> Self {
        Self { pka }
    }
}

impl<C: Coprocessor> Future for PkaFuture<'_, C> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        WAKER.register(cx.waker());
        if self.pka.is_busy() {
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}
