//! Reverse-mode automatic differentiation on a Wengert list
//!
//! Every arithmetic operation on a [`Var`] appends one node to the shared
//! [`Tape`], recording its parents and the local partial derivatives. A
//! backward sweep over the list then accumulates adjoints, yielding the exact
//! gradient of one scalar output with respect to every recorded input in a
//! single pass.
//!
//! `Var` is `Copy` (a tape reference, an index, and a cached value), so
//! expressions read like plain floating-point arithmetic.

use std::cell::RefCell;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// One recorded operation: up to two parents with their local partials.
#[derive(Debug, Clone, Copy)]
struct Node {
    weights: [f64; 2],
    deps: [usize; 2],
}

/// The operation record shared by all [`Var`]s of one computation.
#[derive(Debug, Default)]
pub struct Tape {
    nodes: RefCell<Vec<Node>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Record a new input variable.
    pub fn var(&self, value: f64) -> Var<'_> {
        let index = self.push_leaf();
        Var {
            tape: self,
            index,
            value,
        }
    }

    fn push_leaf(&self) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let index = nodes.len();
        nodes.push(Node {
            weights: [0.0, 0.0],
            deps: [index, index],
        });
        index
    }

    fn push_unary(&self, dep: usize, weight: f64) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let index = nodes.len();
        nodes.push(Node {
            weights: [weight, 0.0],
            deps: [dep, dep],
        });
        index
    }

    fn push_binary(&self, dep0: usize, weight0: f64, dep1: usize, weight1: f64) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let index = nodes.len();
        nodes.push(Node {
            weights: [weight0, weight1],
            deps: [dep0, dep1],
        });
        index
    }

    /// Backward sweep from `output`, seeded with a unit adjoint.
    ///
    /// Nodes recorded after `output` cannot contribute to it and are skipped.
    pub fn gradients(&self, output: Var<'_>) -> Gradients {
        self.sweep(&[output])
    }

    /// One backward sweep seeded with a unit adjoint on every output.
    ///
    /// For outputs living on disconnected subgraphs (batched per-system
    /// energies) the combined adjoints attribute exactly as per-output
    /// sweeps would, at the cost of a single pass.
    pub fn gradients_multi(&self, outputs: &[Var<'_>]) -> Gradients {
        self.sweep(outputs)
    }

    fn sweep(&self, outputs: &[Var<'_>]) -> Gradients {
        let nodes = self.nodes.borrow();
        let mut adjoints = vec![0.0; nodes.len()];
        if outputs.is_empty() {
            return Gradients { adjoints };
        }
        let mut start = 0;
        for output in outputs {
            debug_assert!(std::ptr::eq(output.tape, self));
            adjoints[output.index] += 1.0;
            start = start.max(output.index);
        }
        for i in (0..=start).rev() {
            let adj = adjoints[i];
            if adj == 0.0 {
                continue;
            }
            let node = nodes[i];
            adjoints[node.deps[0]] += node.weights[0] * adj;
            adjoints[node.deps[1]] += node.weights[1] * adj;
        }
        Gradients { adjoints }
    }

    /// Sum a slice of variables into one node. An empty slice sums to a
    /// fresh zero-valued leaf.
    pub fn sum<'t>(&'t self, vars: &[Var<'t>]) -> Var<'t> {
        let mut iter = vars.iter();
        match iter.next() {
            Some(&first) => iter.fold(first, |acc, &v| acc + v),
            None => self.var(0.0),
        }
    }
}

impl Tape {
    /// Whether `output` structurally depends on any of `targets`.
    ///
    /// Distinguishes a gradient that is exactly zero (a stationary point)
    /// from an output that never touched the inputs at all.
    pub(crate) fn depends_on_any(&self, output: usize, targets: &[usize]) -> bool {
        let nodes = self.nodes.borrow();
        let mut reachable = vec![false; output + 1];
        reachable[output] = true;
        for i in (0..=output).rev() {
            if reachable[i] {
                for d in nodes[i].deps {
                    if d < i {
                        reachable[d] = true;
                    }
                }
            }
        }
        targets.iter().any(|&t| t <= output && reachable[t])
    }
}

/// Adjoints from one backward sweep, queried per input variable.
#[derive(Debug, Clone)]
pub struct Gradients {
    adjoints: Vec<f64>,
}

impl Gradients {
    pub fn wrt(&self, var: Var<'_>) -> f64 {
        self.adjoints[var.index]
    }
}

/// A value recorded on a [`Tape`].
#[derive(Debug, Clone, Copy)]
pub struct Var<'t> {
    tape: &'t Tape,
    index: usize,
    value: f64,
}

impl<'t> Var<'t> {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub fn sqrt(self) -> Var<'t> {
        let value = self.value.sqrt();
        let index = self.tape.push_unary(self.index, 0.5 / value);
        Var {
            tape: self.tape,
            index,
            value,
        }
    }

    pub fn powi(self, n: i32) -> Var<'t> {
        let value = self.value.powi(n);
        let weight = f64::from(n) * self.value.powi(n - 1);
        let index = self.tape.push_unary(self.index, weight);
        Var {
            tape: self.tape,
            index,
            value,
        }
    }

    pub fn powf(self, p: f64) -> Var<'t> {
        let value = self.value.powf(p);
        let index = self.tape.push_unary(self.index, p * self.value.powf(p - 1.0));
        Var {
            tape: self.tape,
            index,
            value,
        }
    }

    pub fn exp(self) -> Var<'t> {
        let value = self.value.exp();
        let index = self.tape.push_unary(self.index, value);
        Var {
            tape: self.tape,
            index,
            value,
        }
    }

    pub fn ln(self) -> Var<'t> {
        let value = self.value.ln();
        let index = self.tape.push_unary(self.index, 1.0 / self.value);
        Var {
            tape: self.tape,
            index,
            value,
        }
    }

    pub fn recip(self) -> Var<'t> {
        let value = self.value.recip();
        let index = self
            .tape
            .push_unary(self.index, -1.0 / (self.value * self.value));
        Var {
            tape: self.tape,
            index,
            value,
        }
    }
}

impl<'t> Add for Var<'t> {
    type Output = Var<'t>;

    fn add(self, rhs: Var<'t>) -> Var<'t> {
        debug_assert!(std::ptr::eq(self.tape, rhs.tape));
        let index = self.tape.push_binary(self.index, 1.0, rhs.index, 1.0);
        Var {
            tape: self.tape,
            index,
            value: self.value + rhs.value,
        }
    }
}

impl<'t> Sub for Var<'t> {
    type Output = Var<'t>;

    fn sub(self, rhs: Var<'t>) -> Var<'t> {
        debug_assert!(std::ptr::eq(self.tape, rhs.tape));
        let index = self.tape.push_binary(self.index, 1.0, rhs.index, -1.0);
        Var {
            tape: self.tape,
            index,
            value: self.value - rhs.value,
        }
    }
}

impl<'t> Mul for Var<'t> {
    type Output = Var<'t>;

    fn mul(self, rhs: Var<'t>) -> Var<'t> {
        debug_assert!(std::ptr::eq(self.tape, rhs.tape));
        let index = self
            .tape
            .push_binary(self.index, rhs.value, rhs.index, self.value);
        Var {
            tape: self.tape,
            index,
            value: self.value * rhs.value,
        }
    }
}

impl<'t> Div for Var<'t> {
    type Output = Var<'t>;

    fn div(self, rhs: Var<'t>) -> Var<'t> {
        debug_assert!(std::ptr::eq(self.tape, rhs.tape));
        let index = self.tape.push_binary(
            self.index,
            1.0 / rhs.value,
            rhs.index,
            -self.value / (rhs.value * rhs.value),
        );
        Var {
            tape: self.tape,
            index,
            value: self.value / rhs.value,
        }
    }
}

impl<'t> Neg for Var<'t> {
    type Output = Var<'t>;

    fn neg(self) -> Var<'t> {
        let index = self.tape.push_unary(self.index, -1.0);
        Var {
            tape: self.tape,
            index,
            value: -self.value,
        }
    }
}

impl<'t> Add<f64> for Var<'t> {
    type Output = Var<'t>;

    fn add(self, rhs: f64) -> Var<'t> {
        let index = self.tape.push_unary(self.index, 1.0);
        Var {
            tape: self.tape,
            index,
            value: self.value + rhs,
        }
    }
}

impl<'t> Add<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn add(self, rhs: Var<'t>) -> Var<'t> {
        rhs + self
    }
}

impl<'t> Sub<f64> for Var<'t> {
    type Output = Var<'t>;

    fn sub(self, rhs: f64) -> Var<'t> {
        let index = self.tape.push_unary(self.index, 1.0);
        Var {
            tape: self.tape,
            index,
            value: self.value - rhs,
        }
    }
}

impl<'t> Sub<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn sub(self, rhs: Var<'t>) -> Var<'t> {
        let index = rhs.tape.push_unary(rhs.index, -1.0);
        Var {
            tape: rhs.tape,
            index,
            value: self - rhs.value,
        }
    }
}

impl<'t> Mul<f64> for Var<'t> {
    type Output = Var<'t>;

    fn mul(self, rhs: f64) -> Var<'t> {
        let index = self.tape.push_unary(self.index, rhs);
        Var {
            tape: self.tape,
            index,
            value: self.value * rhs,
        }
    }
}

impl<'t> Mul<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn mul(self, rhs: Var<'t>) -> Var<'t> {
        rhs * self
    }
}

impl<'t> Div<f64> for Var<'t> {
    type Output = Var<'t>;

    fn div(self, rhs: f64) -> Var<'t> {
        let index = self.tape.push_unary(self.index, 1.0 / rhs);
        Var {
            tape: self.tape,
            index,
            value: self.value / rhs,
        }
    }
}

impl<'t> Div<Var<'t>> for f64 {
    type Output = Var<'t>;

    fn div(self, rhs: Var<'t>) -> Var<'t> {
        let index = rhs
            .tape
            .push_unary(rhs.index, -self / (rhs.value * rhs.value));
        Var {
            tape: rhs.tape,
            index,
            value: self / rhs.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_product_rule() {
        let tape = Tape::new();
        let x = tape.var(3.0);
        let y = tape.var(4.0);
        let z = x * y;
        let grads = tape.gradients(z);
        assert_relative_eq!(grads.wrt(x), 4.0);
        assert_relative_eq!(grads.wrt(y), 3.0);
    }

    #[test]
    fn test_chain_rule_through_sqrt() {
        // f = sqrt(x^2 + y^2), df/dx = x / f
        let tape = Tape::new();
        let x = tape.var(3.0);
        let y = tape.var(4.0);
        let r = (x * x + y * y).sqrt();
        assert_relative_eq!(r.value(), 5.0);
        let grads = tape.gradients(r);
        assert_relative_eq!(grads.wrt(x), 0.6);
        assert_relative_eq!(grads.wrt(y), 0.8);
    }

    #[test]
    fn test_fan_out_accumulates() {
        // f = x*x + x, df/dx = 2x + 1
        let tape = Tape::new();
        let x = tape.var(2.5);
        let f = x * x + x;
        let grads = tape.gradients(f);
        assert_relative_eq!(grads.wrt(x), 6.0);
    }

    #[test]
    fn test_division_and_scalars() {
        // f = (2x + 1) / y at x = 3, y = 2: f = 3.5, df/dx = 1, df/dy = -1.75
        let tape = Tape::new();
        let x = tape.var(3.0);
        let y = tape.var(2.0);
        let f = (2.0 * x + 1.0) / y;
        assert_relative_eq!(f.value(), 3.5);
        let grads = tape.gradients(f);
        assert_relative_eq!(grads.wrt(x), 1.0);
        assert_relative_eq!(grads.wrt(y), -1.75);
    }

    #[test]
    fn test_powi_powf_exp_ln() {
        let tape = Tape::new();
        let x = tape.var(2.0);
        let grads = tape.gradients(x.powi(3));
        assert_relative_eq!(grads.wrt(x), 12.0);
        let grads = tape.gradients(x.powf(-6.0));
        assert_relative_eq!(grads.wrt(x), -6.0 * 2.0_f64.powf(-7.0));
        let grads = tape.gradients(x.exp());
        assert_relative_eq!(grads.wrt(x), 2.0_f64.exp());
        let grads = tape.gradients(x.ln());
        assert_relative_eq!(grads.wrt(x), 0.5);
    }

    #[test]
    fn test_unconnected_input_has_zero_gradient() {
        let tape = Tape::new();
        let x = tape.var(1.0);
        let y = tape.var(2.0);
        let f = x * x;
        let grads = tape.gradients(f);
        assert_relative_eq!(grads.wrt(y), 0.0);
    }

    #[test]
    fn test_per_output_unit_seeds_are_independent() {
        // Two outputs on one tape: each sweep sees only its own unit seed.
        let tape = Tape::new();
        let x = tape.var(2.0);
        let y = tape.var(3.0);
        let f = x * x;
        let g = x * y;
        let gf = tape.gradients(f);
        let gg = tape.gradients(g);
        assert_relative_eq!(gf.wrt(x), 4.0);
        assert_relative_eq!(gf.wrt(y), 0.0);
        assert_relative_eq!(gg.wrt(x), 3.0);
        assert_relative_eq!(gg.wrt(y), 2.0);
    }

    #[test]
    fn test_multi_output_sweep_matches_separate_sweeps() {
        // Disconnected outputs: one combined sweep attributes like two
        let tape = Tape::new();
        let x = tape.var(2.0);
        let y = tape.var(3.0);
        let f = x * x;
        let g = y * y * y;
        let combined = tape.gradients_multi(&[f, g]);
        assert_relative_eq!(combined.wrt(x), 4.0);
        assert_relative_eq!(combined.wrt(y), 27.0);
    }

    #[test]
    fn test_sum() {
        let tape = Tape::new();
        let vars: Vec<_> = (1..=4).map(|v| tape.var(v as f64)).collect();
        let total = tape.sum(&vars);
        assert_relative_eq!(total.value(), 10.0);
        let grads = tape.gradients(total);
        for v in &vars {
            assert_relative_eq!(grads.wrt(*v), 1.0);
        }
        assert_relative_eq!(tape.sum(&[]).value(), 0.0);
    }

    #[test]
    fn test_neg() {
        let tape = Tape::new();
        let x = tape.var(5.0);
        let grads = tape.gradients(-x);
        assert_relative_eq!(grads.wrt(x), -1.0);
    }
}
