//! Single coprocessor operations.
//!
//! Every primitive programs the operand registers, starts one function,
//! awaits its completion and interprets the status registers. Offsets are
//! PKA RAM word offsets from [`crate::layout`].

use core::cmp::Ordering;

use crate::{
    curve::Curve,
    ecc::Error,
    layout::{self, MAX_ELEMENT_WORDS, SCRATCHPAD_OFFSET},
    pka::{
        Coprocessor,
        Function,
        PkaFuture,
        Register,
        COMPARE_A_GREATER_THAN_B,
        COMPARE_A_LESS_THAN_B,
        FUNCTION_RUN,
        MSW_ADDRESS_MASK,
        MSW_RESULT_IS_ZERO,
        SHIFT_POINT_AT_INFINITY,
        SHIFT_SUCCESS,
    },
    reg_access::{be_bytes_to_words, words_to_be_bytes},
};

/// The coprocessor, bound to the parameters of the enabled curve.
pub(crate) struct Engine<'a, C> {
    pka: &'a mut C,
    curve: &'static Curve,
}

impl<'a, C: Coprocessor> Engine<'a, C> {
    pub(crate) fn new(pka: &'a mut C, curve: &'static Curve) -> Self {
        Self { pka, curve }
    }

    pub(crate) fn curve(&self) -> &'static Curve {
        self.curve
    }

    /// Element width in words.
    fn words(&self) -> usize {
        self.curve.words
    }

    fn element_bytes(&self) -> usize {
        self.curve.words * 4
    }

    fn write(&mut self, register: Register, value: usize) {
        self.pka.write_register(register, value as u32);
    }

    /// Starts `function` and waits for the coprocessor to finish it.
    async fn run(&mut self, function: Function) {
        trace!("PKA function {:?}", function);
        self.pka
            .write_register(Register::Function, function.bits() | FUNCTION_RUN);
        PkaFuture::new(&*self.pka).await;
    }

    /// Compares two elements.
    pub(crate) async fn compare(&mut self, a: usize, b: usize) -> Ordering {
        self.write(Register::APtr, a);
        self.write(Register::ALength, self.words());
        self.write(Register::BPtr, b);
        self.run(Function::Compare).await;

        match self.pka.read_register(Register::Compare) {
            COMPARE_A_GREATER_THAN_B => Ordering::Greater,
            COMPARE_A_LESS_THAN_B => Ordering::Less,
            _ => Ordering::Equal,
        }
    }

    /// Succeeds if `low < x < high`.
    pub(crate) async fn check_bounds(
        &mut self,
        x: usize,
        low: usize,
        high: usize,
    ) -> Result<(), Error> {
        if self.compare(x, low).await != Ordering::Greater {
            return Err(Error::Failure);
        }
        if self.compare(x, high).await != Ordering::Less {
            return Err(Error::Failure);
        }
        Ok(())
    }

    /// `result = number^-1 mod modulus`
    ///
    /// Fails with [`Error::ResultIsZero`] if `number` has no inverse.
    pub(crate) async fn invert_modulo(
        &mut self,
        number: usize,
        modulus: usize,
        result: usize,
    ) -> Result<(), Error> {
        self.write(Register::APtr, number);
        self.write(Register::ALength, self.words());
        self.write(Register::BPtr, modulus);
        self.write(Register::BLength, self.words());
        self.write(Register::DPtr, SCRATCHPAD_OFFSET);
        self.run(Function::ModInv).await;

        if self.pka.read_register(Register::Msw) & MSW_RESULT_IS_ZERO != 0 {
            return Err(Error::ResultIsZero);
        }

        self.copy(SCRATCHPAD_OFFSET, result, self.words()).await;
        Ok(())
    }

    /// `result = (a + b) mod modulus` or `result = (a * b) mod modulus`,
    /// depending on `function`.
    ///
    /// Fails with [`Error::ResultIsZero`] if the unreduced sum or product is
    /// zero. `result` must have room for [`layout::remainder_space`] words.
    pub(crate) async fn add_or_multiply_modulo(
        &mut self,
        function: Function,
        a: usize,
        b: usize,
        modulus: usize,
        result: usize,
    ) -> Result<(), Error> {
        debug_assert!(matches!(function, Function::Add | Function::Multiply));

        self.write(Register::APtr, a);
        self.write(Register::ALength, self.words());
        self.write(Register::BPtr, b);
        self.write(Register::BLength, self.words());
        self.write(Register::CPtr, SCRATCHPAD_OFFSET);
        self.run(function).await;

        let msw = self.pka.read_register(Register::Msw);
        if msw & MSW_RESULT_IS_ZERO != 0 {
            return Err(Error::ResultIsZero);
        }

        let msw_address = (msw & MSW_ADDRESS_MASK) as usize;
        let length = self
            .words()
            .max((msw_address + 1).saturating_sub(SCRATCHPAD_OFFSET));
        self.write(Register::APtr, SCRATCHPAD_OFFSET);
        self.write(Register::ALength, length);
        self.write(Register::BPtr, modulus);
        self.write(Register::CPtr, result);
        self.run(Function::Modulo).await;
        Ok(())
    }

    /// Field arithmetic where zero is an ordinary value: a zero result is
    /// stored in `result` instead of being reported.
    pub(crate) async fn field_add_or_multiply(
        &mut self,
        function: Function,
        a: usize,
        b: usize,
        result: usize,
    ) {
        if self
            .add_or_multiply_modulo(function, a, b, layout::PRIME_OFFSET, result)
            .await
            .is_err()
        {
            self.copy(layout::NULL_OFFSET, result, self.words()).await;
        }
    }

    /// `result = a - b`, without reduction.
    pub(crate) async fn subtract(&mut self, a: usize, b: usize, result: usize) {
        self.write(Register::APtr, a);
        self.write(Register::ALength, self.words());
        self.write(Register::BPtr, b);
        self.write(Register::BLength, self.words());
        self.write(Register::CPtr, SCRATCHPAD_OFFSET);
        self.run(Function::Subtract).await;

        self.copy(SCRATCHPAD_OFFSET, result, self.words()).await;
    }

    /// `result = a + c` for [`Function::EccAdd`], or `result = a x c` with
    /// the scalar `a` for [`Function::EccMul`], on the enabled curve.
    pub(crate) async fn add_or_multiply_point(
        &mut self,
        function: Function,
        a: usize,
        c: usize,
        result: usize,
    ) -> Result<(), Error> {
        debug_assert!(matches!(function, Function::EccAdd | Function::EccMul));

        self.write(Register::APtr, a);
        self.write(Register::ALength, self.words());
        self.write(Register::BPtr, layout::PAB_OFFSET);
        self.write(Register::BLength, self.words());
        self.write(Register::CPtr, c);
        self.write(Register::DPtr, SCRATCHPAD_OFFSET);
        self.run(function).await;

        match self.pka.read_register(Register::Shift) {
            SHIFT_SUCCESS => {}
            SHIFT_POINT_AT_INFINITY => return Err(Error::PointAtInfinity),
            shift => {
                error!("point operation failed, shift {}", shift);
                return Err(Error::Failure);
            }
        }

        self.copy(SCRATCHPAD_OFFSET, result, layout::point_space(self.words()))
            .await;
        Ok(())
    }

    /// Copies `words` words from `from` to `to`.
    pub(crate) async fn copy(&mut self, from: usize, to: usize, words: usize) {
        self.write(Register::APtr, from);
        self.write(Register::ALength, words);
        self.write(Register::CPtr, to);
        self.run(Function::Copy).await;
    }

    /// Loads a big-endian element.
    pub(crate) fn element_to_ram(&mut self, bytes: &[u8], offset: usize) {
        let mut words = [0u32; MAX_ELEMENT_WORDS];
        let words = &mut words[..self.words()];
        be_bytes_to_words(&bytes[..self.element_bytes()], words);
        self.pka.write_ram(offset, words);
    }

    /// Stores an element as big-endian bytes.
    pub(crate) fn element_from_ram(&self, bytes: &mut [u8], offset: usize) {
        let mut words = [0u32; MAX_ELEMENT_WORDS];
        let words = &mut words[..self.words()];
        self.pka.read_ram(offset, words);
        let len = self.element_bytes();
        words_to_be_bytes(words, &mut bytes[..len]);
    }

    /// Loads a big-endian `x || y` point into the coordinate slots at
    /// `offset`.
    pub(crate) fn point_to_ram(&mut self, bytes: &[u8], offset: usize) {
        let (x, y) = bytes.split_at(self.element_bytes());
        self.element_to_ram(x, offset);
        self.element_to_ram(y, offset + layout::coordinate_space(self.words()));
    }

    /// Stores the point at `offset` as big-endian `x || y`.
    pub(crate) fn point_from_ram(&self, bytes: &mut [u8], offset: usize) {
        let (x, y) = bytes.split_at_mut(self.element_bytes());
        self.element_from_ram(x, offset);
        self.element_from_ram(y, offset + layout::coordinate_space(self.words()));
    }

    /// Reads the least significant word of the element at `offset`.
    pub(crate) fn word_from_ram(&self, offset: usize) -> u32 {
        let mut word = [0u32];
        self.pka.read_ram(offset, &mut word);
        word[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::EllipticCurve, driver::Coroutine, sim::SimulatedPka};

    const A: usize = layout::VARIABLES_OFFSET;
    const B: usize = A + 16;
    const R: usize = B + 16;

    fn engine(pka: &mut SimulatedPka) -> Engine<'_, SimulatedPka> {
        let curve = EllipticCurve::P192.info();
        pka.init();
        crate::ecc::load_curve(pka, curve);
        Engine::new(pka, curve)
    }

    fn run<F: core::future::Future>(future: F) -> F::Output {
        Coroutine::new(core::pin::pin!(future)).run_to_completion()
    }

    fn element(value: u32) -> [u32; 6] {
        [value, 0, 0, 0, 0, 0]
    }

    #[test]
    fn compare_orders_elements() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        engine.pka.write_ram(A, &element(5));
        engine.pka.write_ram(B, &element(7));

        assert_eq!(run(engine.compare(A, B)), Ordering::Less);
        assert_eq!(run(engine.compare(B, A)), Ordering::Greater);
        assert_eq!(run(engine.compare(A, A)), Ordering::Equal);
    }

    #[test]
    fn bounds_are_strict() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        engine.pka.write_ram(A, &element(1));

        assert_eq!(
            run(engine.check_bounds(A, layout::NULL_OFFSET, layout::PRIME_OFFSET)),
            Ok(())
        );
        assert_eq!(
            run(engine.check_bounds(layout::NULL_OFFSET, layout::NULL_OFFSET, layout::PRIME_OFFSET)),
            Err(Error::Failure)
        );
        assert_eq!(
            run(engine.check_bounds(layout::PRIME_OFFSET, layout::NULL_OFFSET, layout::PRIME_OFFSET)),
            Err(Error::Failure)
        );
    }

    #[test]
    fn modular_multiply_reduces() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        // (p - 1)^2 = 1 (mod p)
        let mut p_minus_one = [0u32; 6];
        p_minus_one.copy_from_slice(&EllipticCurve::P192.info().p[..6]);
        p_minus_one[0] -= 1;
        engine.pka.write_ram(A, &p_minus_one);

        assert_eq!(
            run(engine.add_or_multiply_modulo(
                Function::Multiply,
                A,
                A,
                layout::PRIME_OFFSET,
                R
            )),
            Ok(())
        );
        let mut result = [0u32; 6];
        engine.pka.read_ram(R, &mut result);
        assert_eq!(result, element(1));
    }

    #[test]
    fn zero_product_is_reported() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        engine.pka.write_ram(A, &element(9));

        assert_eq!(
            run(engine.add_or_multiply_modulo(
                Function::Multiply,
                A,
                layout::NULL_OFFSET,
                layout::PRIME_OFFSET,
                R
            )),
            Err(Error::ResultIsZero)
        );
    }

    #[test]
    fn field_zero_is_stored() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        engine.pka.write_ram(A, &element(9));
        engine.pka.write_ram(R, &element(0xdead));

        run(engine.field_add_or_multiply(Function::Multiply, A, layout::NULL_OFFSET, R));
        let mut result = [0u32; 6];
        engine.pka.read_ram(R, &mut result);
        assert_eq!(result, element(0));

        run(engine.field_add_or_multiply(Function::Add, A, A, R));
        engine.pka.read_ram(R, &mut result);
        assert_eq!(result, element(18));
    }

    #[test]
    fn inverse_of_zero_is_reported() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);

        assert_eq!(
            run(engine.invert_modulo(layout::NULL_OFFSET, layout::N_OFFSET, R)),
            Err(Error::ResultIsZero)
        );

        engine.pka.write_ram(A, &element(2));
        assert_eq!(run(engine.invert_modulo(A, layout::N_OFFSET, R)), Ok(()));
        assert_eq!(
            run(engine.add_or_multiply_modulo(Function::Multiply, A, R, layout::N_OFFSET, B)),
            Ok(())
        );
        assert_eq!(engine.word_from_ram(B), 1);
    }

    #[test]
    fn subtract_is_not_reduced() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);
        engine.pka.write_ram(A, &element(3));

        run(engine.subtract(layout::PRIME_OFFSET, A, R));
        let mut result = [0u32; 6];
        engine.pka.read_ram(R, &mut result);
        let p = EllipticCurve::P192.info().p;
        assert_eq!(result[0], p[0] - 3);
        assert_eq!(result[1..], p[1..6]);
    }

    #[test]
    fn order_times_generator_is_infinity() {
        let mut pka = SimulatedPka::new();
        let mut engine = engine(&mut pka);

        assert_eq!(
            run(engine.add_or_multiply_point(Function::EccMul, layout::N_OFFSET, layout::G_OFFSET, R)),
            Err(Error::PointAtInfinity)
        );
        assert_eq!(
            run(engine.add_or_multiply_point(Function::EccMul, layout::ONE_OFFSET, layout::G_OFFSET, R)),
            Ok(())
        );

        let mut point = [0u8; 48];
        engine.point_from_ram(&mut point, R);
        let mut generator = [0u8; 48];
        engine.point_from_ram(&mut generator, layout::G_OFFSET);
        assert_eq!(point, generator);
    }
}
