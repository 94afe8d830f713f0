//! # Simulated PKA
//!
//! A host-side model of the PKA: word-addressed RAM, the operand and status
//! registers, and every function the ECC driver uses, computed with
//! arbitrary-precision integers. Functions complete after a configurable
//! number of polls of the `FUNCTION` register, and [`crate::pka::on_interrupt`]
//! fires when they do, so the driver's suspension points get exercised.
//!
//! The model follows the register-level contract, not the engine's internal
//! algorithms: point operations use affine arithmetic, and scratch areas are
//! not clobbered beyond the result.

use alloc::vec::Vec;
use core::cell::Cell;

use num_bigint::BigUint;

use crate::{
    layout::{coordinate_space, PKA_RAM_WORDS},
    pka::{
        self,
        Coprocessor,
        Function,
        Register,
        COMPARE_A_EQUALS_B,
        COMPARE_A_GREATER_THAN_B,
        COMPARE_A_LESS_THAN_B,
        FUNCTION_RUN,
        MSW_RESULT_IS_ZERO,
        SHIFT_POINT_AT_INFINITY,
        SHIFT_SUCCESS,
    },
};

/// `SHIFT` value reported when a point operation gets invalid operands.
const SHIFT_FAILURE: u32 = 0x1f;

const REGISTER_COUNT: usize = Register::DivMsw as usize + 1;

type Point = Option<(BigUint, BigUint)>;

/// Software model of the PKA.
#[derive(Debug)]
pub struct SimulatedPka {
    ram: [u32; PKA_RAM_WORDS],
    registers: [u32; REGISTER_COUNT],
    latency: u32,
    busy: Cell<u32>,
    enabled: bool,
    functions: usize,
}

impl Default for SimulatedPka {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPka {
    /// Creates a coprocessor that completes every function immediately.
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    /// Creates a coprocessor that reports itself busy for `latency` polls
    /// after a function is started.
    pub fn with_latency(latency: u32) -> Self {
        Self {
            ram: [0; PKA_RAM_WORDS],
            registers: [0; REGISTER_COUNT],
            latency,
            busy: Cell::new(0),
            enabled: false,
            functions: 0,
        }
    }

    /// Tells if the coprocessor is powered.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of functions run since the last reset.
    pub fn functions(&self) -> usize {
        self.functions
    }

    fn register(&self, register: Register) -> u32 {
        self.registers[register as usize]
    }

    fn set_register(&mut self, register: Register, value: u32) {
        self.registers[register as usize] = value;
    }

    fn pointer(&self, register: Register) -> usize {
        self.register(register) as usize
    }

    fn vector(&self, offset: usize, words: usize) -> BigUint {
        BigUint::from_slice(&self.ram[offset..offset + words])
    }

    /// Stores `value` in `words` words at `offset`, dropping what does not
    /// fit, and updates `MSW`.
    fn store(&mut self, offset: usize, words: usize, value: &BigUint) {
        let digits = value.to_u32_digits();
        let region = &mut self.ram[offset..offset + words];
        region.fill(0);
        for (word, digit) in region.iter_mut().zip(digits.iter()) {
            *word = *digit;
        }

        let msw = match region.iter().rposition(|word| *word != 0) {
            Some(index) => (offset + index) as u32,
            None => MSW_RESULT_IS_ZERO | offset as u32,
        };
        self.set_register(Register::Msw, msw);
    }

    fn execute(&mut self, function: Function) {
        self.functions += 1;

        let a = self.pointer(Register::APtr);
        let b = self.pointer(Register::BPtr);
        let c = self.pointer(Register::CPtr);
        let d = self.pointer(Register::DPtr);
        let a_len = self.pointer(Register::ALength);
        let b_len = self.pointer(Register::BLength);

        match function {
            Function::Multiply => {
                let product = self.vector(a, a_len) * self.vector(b, b_len);
                self.store(c, a_len + b_len, &product);
            }
            Function::Add => {
                let sum = self.vector(a, a_len) + self.vector(b, b_len);
                self.store(c, a_len.max(b_len) + 1, &sum);
            }
            Function::Subtract => {
                let words = a_len.max(b_len);
                let minuend = self.vector(a, a_len);
                let subtrahend = self.vector(b, b_len);
                let difference = if minuend >= subtrahend {
                    minuend - subtrahend
                } else {
                    (BigUint::from(1u32) << (32 * words)) + minuend - subtrahend
                };
                self.store(c, words, &difference);
            }
            Function::Modulo => {
                let modulus = self.vector(b, b_len);
                let remainder = if modulus.bits() == 0 {
                    BigUint::default()
                } else {
                    self.vector(a, a_len) % modulus
                };
                self.store(c, b_len + 1, &remainder);
            }
            Function::Compare => {
                let outcome = match self.vector(a, a_len).cmp(&self.vector(b, a_len)) {
                    core::cmp::Ordering::Equal => COMPARE_A_EQUALS_B,
                    core::cmp::Ordering::Less => COMPARE_A_LESS_THAN_B,
                    core::cmp::Ordering::Greater => COMPARE_A_GREATER_THAN_B,
                };
                self.set_register(Register::Compare, outcome);
            }
            Function::Copy => {
                self.ram.copy_within(a..a + a_len, c);
            }
            Function::ModInv => {
                let modulus = self.vector(b, b_len);
                let number = self.vector(a, a_len);
                match number.modinv(&modulus) {
                    Some(inverse) if inverse.bits() != 0 => self.store(d, b_len, &inverse),
                    _ => self.store(d, b_len, &BigUint::default()),
                }
            }
            Function::EccAdd | Function::EccMul => self.point_operation(function),
        }
    }

    fn point_operation(&mut self, function: Function) {
        let a = self.pointer(Register::APtr);
        let b = self.pointer(Register::BPtr);
        let c = self.pointer(Register::CPtr);
        let d = self.pointer(Register::DPtr);
        let a_len = self.pointer(Register::ALength);
        let words = self.pointer(Register::BLength);
        let stride = coordinate_space(words);

        let curve = SimulatedCurve {
            p: self.vector(b, words),
            a: self.vector(b + stride, words),
        };
        let point = |offset: usize| (self.vector(offset, words), self.vector(offset + stride, words));

        let q = point(c);
        let result = match function {
            Function::EccMul => {
                let scalar = self.vector(a, a_len);
                curve.check(&q).map(|()| curve.multiply(&scalar, &q))
            }
            _ => {
                let p = point(a);
                curve
                    .check(&p)
                    .and_then(|()| curve.check(&q))
                    .map(|()| curve.add(&Some(p), &Some(q)))
            }
        };

        let shift = match result {
            None => SHIFT_FAILURE,
            Some(None) => SHIFT_POINT_AT_INFINITY,
            Some(Some((x, y))) => {
                self.store(d, stride, &x);
                self.store(d + stride, stride, &y);
                SHIFT_SUCCESS
            }
        };
        self.set_register(Register::Shift, shift);
    }
}

impl Coprocessor for SimulatedPka {
    fn init(&mut self) {
        self.ram.fill(0);
        self.registers.fill(0);
        self.busy.set(0);
        self.functions = 0;
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn read_register(&self, register: Register) -> u32 {
        let value = self.register(register);
        if register != Register::Function {
            return value;
        }

        match self.busy.get() {
            0 => value,
            busy => {
                self.busy.set(busy - 1);
                if busy == 1 {
                    pka::on_interrupt();
                }
                value | FUNCTION_RUN
            }
        }
    }

    fn write_register(&mut self, register: Register, value: u32) {
        if matches!(register, Register::Compare | Register::Msw | Register::DivMsw) {
            return;
        }
        if register != Register::Function || value & FUNCTION_RUN == 0 {
            self.set_register(register, value);
            return;
        }

        assert!(self.enabled, "PKA function started while powered down");
        assert_eq!(self.busy.get(), 0, "PKA function started while busy");

        let Some(function) = Function::from_bits(value) else {
            panic!("unsupported PKA function {value:#x}");
        };
        self.set_register(register, value & !FUNCTION_RUN);
        self.execute(function);

        self.busy.set(self.latency);
        if self.latency == 0 {
            pka::on_interrupt();
        }
    }

    fn read_ram(&self, offset: usize, words: &mut [u32]) {
        words.copy_from_slice(&self.ram[offset..offset + words.len()]);
    }

    fn write_ram(&mut self, offset: usize, words: &[u32]) {
        self.ram[offset..offset + words.len()].copy_from_slice(words);
    }
}

/// Short Weierstrass curve over `p`; `b` is not needed for the group law.
struct SimulatedCurve {
    p: BigUint,
    a: BigUint,
}

impl SimulatedCurve {
    fn check(&self, point: &(BigUint, BigUint)) -> Option<()> {
        (point.0 < self.p && point.1 < self.p).then_some(())
    }

    fn sub(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x + &self.p - y) % &self.p
    }

    fn mul(&self, x: &BigUint, y: &BigUint) -> BigUint {
        x * y % &self.p
    }

    fn div(&self, x: &BigUint, y: &BigUint) -> Option<BigUint> {
        y.modinv(&self.p).map(|inverse| self.mul(x, &inverse))
    }

    fn add(&self, p: &Point, q: &Point) -> Point {
        let (Some((x1, y1)), Some((x2, y2))) = (p, q) else {
            return p.clone().or_else(|| q.clone());
        };

        let slope = if x1 == x2 {
            if ((y1 + y2) % &self.p).bits() == 0 {
                return None;
            }
            let three_x_squared = self.mul(&BigUint::from(3u32), &self.mul(x1, x1));
            let numerator = (three_x_squared + &self.a) % &self.p;
            self.div(&numerator, &((y1 + y1) % &self.p))?
        } else {
            self.div(&self.sub(y2, y1), &self.sub(x2, x1))?
        };

        let x3 = self.sub(&self.sub(&self.mul(&slope, &slope), x1), x2);
        let y3 = self.sub(&self.mul(&slope, &self.sub(x1, &x3)), y1);
        Some((x3, y3))
    }

    fn multiply(&self, scalar: &BigUint, point: &(BigUint, BigUint)) -> Point {
        let mut result: Point = None;
        let bits: Vec<bool> = (0..scalar.bits()).rev().map(|i| scalar.bit(i)).collect();
        let point = Some(point.clone());
        for bit in bits {
            result = self.add(&result, &result);
            if bit {
                result = self.add(&result, &point);
            }
        }
        result
    }
}
