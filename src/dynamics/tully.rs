//! Fewest-switches surface hopping
//!
//! Nuclei move classically on one adiabatic surface while the electronic
//! amplitudes are propagated with RK4 under the time-dependent Hamiltonian
//! built from the surface energies and the nonadiabatic coupling vectors.
//! After the drift, a stochastic hop between surfaces is attempted and the
//! closing velocity half-kick uses whichever surface is then active; an
//! accepted hop rescales the velocity along the coupling vector so total
//! energy is conserved, and a hop the kinetic energy cannot pay for is
//! frustrated and reverted.
//!
//! Decoherence corrections are not applied; amplitudes evolve coherently
//! between hops.

use log::debug;
use num_complex::Complex64;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::MIN_NORM;
use crate::error::{OxidyneError, Result};

/// Electronic structure of one geometry: per-state energies and forces, and
/// the coupling vectors between states.
///
/// `nacv[i][j]` is the per-atom coupling vector between states i and j;
/// diagonal entries are ignored. Entries may contain NaN where a backend
/// could not produce a coupling; those are treated as zero.
#[derive(Debug, Clone)]
pub struct SurfaceData {
    pub energies: Vec<f64>,
    pub forces: Vec<Vec<[f64; 3]>>,
    pub nacv: Vec<Vec<Vec<[f64; 3]>>>,
}

impl SurfaceData {
    pub fn num_states(&self) -> usize {
        self.energies.len()
    }
}

/// Evaluates the electronic surfaces at a nuclear geometry.
pub trait SurfaceModel {
    fn evaluate(&self, positions: &[[f64; 3]]) -> Result<SurfaceData>;
}

/// One trajectory's nuclear and electronic state.
#[derive(Debug, Clone)]
pub struct TullyState {
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub coeffs: Vec<Complex64>,
    pub surf: usize,
}

impl TullyState {
    /// Start a trajectory on `surf` with unit amplitude there.
    pub fn on_surface(
        positions: Vec<[f64; 3]>,
        velocities: Vec<[f64; 3]>,
        num_states: usize,
        surf: usize,
    ) -> Result<Self> {
        if surf >= num_states {
            return Err(OxidyneError::InvalidParameter(format!(
                "initial surface {surf} out of range for {num_states} states"
            )));
        }
        if positions.len() != velocities.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} positions for {} velocities",
                positions.len(),
                velocities.len()
            )));
        }
        let mut coeffs = vec![Complex64::new(0.0, 0.0); num_states];
        coeffs[surf] = Complex64::new(1.0, 0.0);
        Ok(Self {
            positions,
            velocities,
            coeffs,
            surf,
        })
    }

    /// Total electronic population, conserved under exact propagation.
    pub fn norm_squared(&self) -> f64 {
        self.coeffs.iter().map(|c| c.norm_sqr()).sum()
    }
}

/// Outcome of one hop attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopOutcome {
    NoHop,
    Hopped { from: usize, to: usize },
    Frustrated { from: usize, to: usize },
}

/// Fewest-switches stepper with separate nuclear and electronic timesteps.
#[derive(Debug, Clone, Copy)]
pub struct TullyStepper {
    nuc_dt: f64,
    elec_dt: f64,
    hbar: f64,
}

impl TullyStepper {
    /// # Arguments
    /// * `nuc_dt` - nuclear timestep
    /// * `elec_dt` - electronic substep, at most `nuc_dt`
    /// * `hbar` - reduced Planck constant in the caller's unit system
    pub fn new(nuc_dt: f64, elec_dt: f64, hbar: f64) -> Result<Self> {
        if !(nuc_dt > 0.0) || !(elec_dt > 0.0) || !(hbar > 0.0) {
            return Err(OxidyneError::InvalidParameter(format!(
                "timesteps and hbar must be positive, got nuc_dt={nuc_dt}, elec_dt={elec_dt}, hbar={hbar}"
            )));
        }
        if elec_dt > nuc_dt {
            return Err(OxidyneError::InvalidParameter(format!(
                "electronic substep {elec_dt} exceeds nuclear step {nuc_dt}"
            )));
        }
        Ok(Self {
            nuc_dt,
            elec_dt,
            hbar,
        })
    }

    /// Nonadiabatic coupling terms `T_ij = sum over atoms of v . d_ij`.
    ///
    /// NaN couplings read as zero so a missing backend coupling silently
    /// decouples that pair instead of poisoning the propagation.
    pub fn coupling_matrix(&self, state: &TullyState, surface: &SurfaceData) -> Vec<Vec<f64>> {
        let n = surface.num_states();
        let mut t = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dot = 0.0;
                for (v, d) in state.velocities.iter().zip(&surface.nacv[i][j]) {
                    for axis in 0..3 {
                        let c = d[axis];
                        if c.is_finite() {
                            dot += v[axis] * c;
                        }
                    }
                }
                t[i][j] = dot;
            }
        }
        t
    }

    /// `dc_i/dt = -(i w_i c_i + sum_j T_ij c_j)` with `w_i = E_i / hbar`.
    fn dc_dt(&self, coeffs: &[Complex64], energies: &[f64], t: &[Vec<f64>]) -> Vec<Complex64> {
        let n = coeffs.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let mut d = Complex64::new(0.0, -energies[i] / self.hbar) * coeffs[i];
            for j in 0..n {
                d -= t[i][j] * coeffs[j];
            }
            out.push(d);
        }
        out
    }

    /// One RK4 step of the amplitudes under fixed energies and couplings.
    pub fn rk4_step(
        &self,
        coeffs: &mut [Complex64],
        energies: &[f64],
        t: &[Vec<f64>],
        dt: f64,
    ) {
        let k1 = self.dc_dt(coeffs, energies, t);
        let c2: Vec<_> = coeffs.iter().zip(&k1).map(|(&c, &k)| c + 0.5 * dt * k).collect();
        let k2 = self.dc_dt(&c2, energies, t);
        let c3: Vec<_> = coeffs.iter().zip(&k2).map(|(&c, &k)| c + 0.5 * dt * k).collect();
        let k3 = self.dc_dt(&c3, energies, t);
        let c4: Vec<_> = coeffs.iter().zip(&k3).map(|(&c, &k)| c + dt * k).collect();
        let k4 = self.dc_dt(&c4, energies, t);
        for i in 0..coeffs.len() {
            coeffs[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
    }

    /// Propagate the amplitudes over one nuclear step with RK4 substeps.
    pub fn propagate_electronic(&self, state: &mut TullyState, surface: &SurfaceData) {
        let t = self.coupling_matrix(state, surface);
        let n_sub = (self.nuc_dt / self.elec_dt).round().max(1.0) as usize;
        let dt = self.nuc_dt / n_sub as f64;
        for _ in 0..n_sub {
            self.rk4_step(&mut state.coeffs, &surface.energies, &t, dt);
        }
    }

    /// Fewest-switches probability of leaving the active surface for each
    /// other state. Negative and non-finite values clamp to zero.
    ///
    /// The flux into state j is `b_js = -2 Re(conj(a_js) T_js)`, which for
    /// an antisymmetric coupling matrix equals `2 Re(conj(a_sj) T_sj)`: the
    /// probability is positive exactly while population drains out of the
    /// active surface toward j.
    pub fn hop_probabilities(&self, state: &TullyState, surface: &SurfaceData) -> Vec<f64> {
        let t = self.coupling_matrix(state, surface);
        let s = state.surf;
        let a_ss = state.coeffs[s].norm_sqr();
        let n = surface.num_states();
        let mut probs = vec![0.0; n];
        if a_ss < MIN_NORM {
            return probs;
        }
        for j in 0..n {
            if j == s {
                continue;
            }
            let a_sj = state.coeffs[s].conj() * state.coeffs[j];
            let b = 2.0 * (a_sj.conj() * t[s][j]).re;
            let p = self.nuc_dt * b / a_ss;
            if p.is_finite() && p > 0.0 {
                probs[j] = p.min(1.0);
            }
        }
        probs
    }

    /// Attempt a hop, visiting candidate surfaces in shuffled order with one
    /// uniform draw each.
    pub fn attempt_hop<R: Rng>(
        &self,
        state: &mut TullyState,
        surface: &SurfaceData,
        masses: &[f64],
        rng: &mut R,
    ) -> HopOutcome {
        let probs = self.hop_probabilities(state, surface);
        let s = state.surf;
        let mut candidates: Vec<usize> =
            (0..surface.num_states()).filter(|&j| j != s).collect();
        candidates.shuffle(rng);

        for j in candidates {
            if rng.gen::<f64>() < probs[j] {
                return self.rescale_to_surface(state, surface, masses, j);
            }
        }
        HopOutcome::NoHop
    }

    /// Redirect kinetic energy along the coupling vector to pay for the
    /// electronic energy change of a hop to surface `to`.
    fn rescale_to_surface(
        &self,
        state: &mut TullyState,
        surface: &SurfaceData,
        masses: &[f64],
        to: usize,
    ) -> HopOutcome {
        let from = state.surf;
        let gap = surface.energies[to] - surface.energies[from];

        // Unit coupling direction over all 3N components, NaN read as zero
        let coupling = &surface.nacv[from][to];
        let mut direction: Vec<[f64; 3]> = coupling
            .iter()
            .map(|d| {
                let mut out = [0.0; 3];
                for axis in 0..3 {
                    if d[axis].is_finite() {
                        out[axis] = d[axis];
                    }
                }
                out
            })
            .collect();
        let norm: f64 = direction
            .iter()
            .map(|d| d[0] * d[0] + d[1] * d[1] + d[2] * d[2])
            .sum::<f64>()
            .sqrt();
        if norm < MIN_NORM {
            // No direction to redirect kinetic energy along: the hop cannot
            // be paid for even downhill
            return HopOutcome::Frustrated { from, to };
        }
        for d in &mut direction {
            for axis in 0..3 {
                d[axis] /= norm;
            }
        }

        // Kinetic energy in the component parallel to the coupling direction
        let projection: f64 = state
            .velocities
            .iter()
            .zip(&direction)
            .map(|(v, d)| v[0] * d[0] + v[1] * d[1] + v[2] * d[2])
            .sum();
        let parallel: Vec<[f64; 3]> = direction
            .iter()
            .map(|d| [projection * d[0], projection * d[1], projection * d[2]])
            .collect();
        let ke_par: f64 = masses
            .iter()
            .zip(&parallel)
            .map(|(&m, v)| 0.5 * m * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
            .sum();

        let ke_par_after = ke_par - gap;
        if ke_par_after < 0.0 {
            return HopOutcome::Frustrated { from, to };
        }

        let scale = if ke_par > 0.0 {
            (ke_par_after / ke_par).sqrt()
        } else {
            // No parallel motion and a flat or downhill gap
            1.0
        };
        for (v, p) in state.velocities.iter_mut().zip(&parallel) {
            for axis in 0..3 {
                v[axis] += (scale - 1.0) * p[axis];
            }
        }
        state.surf = to;
        debug!("hop {from} -> {to}, gap {gap:.6}, parallel ke {ke_par:.6}");
        HopOutcome::Hopped { from, to }
    }

    /// First Verlet half step: half kick on the active surface, then drift.
    pub fn verlet_step_1(&self, state: &mut TullyState, surface: &SurfaceData, masses: &[f64]) {
        let forces = &surface.forces[state.surf];
        for a in 0..state.positions.len() {
            for axis in 0..3 {
                state.velocities[a][axis] += 0.5 * self.nuc_dt * forces[a][axis] / masses[a];
                state.positions[a][axis] += self.nuc_dt * state.velocities[a][axis];
            }
        }
    }

    /// Second Verlet half step with forces at the new geometry.
    pub fn verlet_step_2(&self, state: &mut TullyState, surface: &SurfaceData, masses: &[f64]) {
        let forces = &surface.forces[state.surf];
        for a in 0..state.positions.len() {
            for axis in 0..3 {
                state.velocities[a][axis] += 0.5 * self.nuc_dt * forces[a][axis] / masses[a];
            }
        }
    }

    /// One full step: half-kick and drift on the active surface, electronic
    /// propagation at the new geometry, a stochastic hop attempt, then the
    /// second half-kick on whichever surface is active after the attempt.
    pub fn step<M: SurfaceModel, R: Rng>(
        &self,
        state: &mut TullyState,
        model: &M,
        masses: &[f64],
        rng: &mut R,
    ) -> Result<HopOutcome> {
        let before = model.evaluate(&state.positions)?;
        self.check_state(state, &before, masses)?;

        self.verlet_step_1(state, &before, masses);
        let after = model.evaluate(&state.positions)?;
        if after.num_states() != before.num_states() {
            return Err(OxidyneError::InvalidParameter(format!(
                "state count changed from {} to {} within a step",
                before.num_states(),
                after.num_states()
            )));
        }

        self.propagate_electronic(state, &after);
        let outcome = self.attempt_hop(state, &after, masses, rng);
        self.verlet_step_2(state, &after, masses);
        Ok(outcome)
    }

    /// Step a batch of independent trajectories, one outcome per sample.
    pub fn step_batch<M: SurfaceModel, R: Rng>(
        &self,
        states: &mut [TullyState],
        model: &M,
        masses: &[f64],
        rng: &mut R,
    ) -> Result<Vec<HopOutcome>> {
        states
            .iter_mut()
            .map(|state| self.step(state, model, masses, rng))
            .collect()
    }

    fn check_state(
        &self,
        state: &TullyState,
        surface: &SurfaceData,
        masses: &[f64],
    ) -> Result<()> {
        let n_states = surface.num_states();
        if state.coeffs.len() != n_states || state.surf >= n_states {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} amplitudes on surface {} for {n_states} states",
                state.coeffs.len(),
                state.surf
            )));
        }
        if masses.len() != state.positions.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} masses for {} atoms",
                masses.len(),
                state.positions.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_state_surface(gap: f64, coupling: f64) -> SurfaceData {
        let zero = vec![[0.0; 3]];
        let d = vec![[coupling, 0.0, 0.0]];
        let d_neg = vec![[-coupling, 0.0, 0.0]];
        SurfaceData {
            energies: vec![0.0, gap],
            forces: vec![zero.clone(), zero.clone()],
            nacv: vec![vec![zero.clone(), d], vec![d_neg, zero]],
        }
    }

    fn moving_state(speed: f64, surf: usize) -> TullyState {
        TullyState::on_surface(vec![[0.0; 3]], vec![[speed, 0.0, 0.0]], 2, surf).unwrap()
    }

    #[test]
    fn test_electronic_norm_is_conserved() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(0.3, 0.4);
        let mut state = moving_state(1.0, 0);
        for _ in 0..50 {
            stepper.propagate_electronic(&mut state, &surface);
        }
        assert_relative_eq!(state.norm_squared(), 1.0, epsilon = 1e-8);
        // Coupling moved real population to the other state
        assert!(state.coeffs[1].norm_sqr() > 1e-3);
    }

    #[test]
    fn test_no_coupling_means_no_transfer() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(0.3, 0.0);
        let mut state = moving_state(1.0, 0);
        for _ in 0..20 {
            stepper.propagate_electronic(&mut state, &surface);
        }
        assert_relative_eq!(state.coeffs[0].norm_sqr(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(state.coeffs[1].norm_sqr(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nan_coupling_reads_as_zero() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let mut surface = two_state_surface(0.3, 0.4);
        surface.nacv[0][1][0] = [f64::NAN; 3];
        surface.nacv[1][0][0] = [f64::NAN; 3];
        let state = moving_state(1.0, 0);
        let t = stepper.coupling_matrix(&state, &surface);
        assert_eq!(t[0][1], 0.0);
        assert_eq!(t[1][0], 0.0);
    }

    #[test]
    fn test_hop_probability_positive_while_population_drains() {
        // v . d01 > 0 with real positive amplitudes drains surface 0, so
        // the switch probability to surface 1 must be positive; reversing
        // the coupling reverses the flow and suppresses the hop.
        let stepper = TullyStepper::new(0.1, 0.01, 1.0).unwrap();
        let mut state = moving_state(1.0, 0);
        state.coeffs[0] = Complex64::new(0.3_f64.cos(), 0.0);
        state.coeffs[1] = Complex64::new(0.3_f64.sin(), 0.0);

        let surface = two_state_surface(0.0, 3.0);
        let probs = stepper.hop_probabilities(&state, &surface);
        assert!(probs[1] > 0.0);
        let expected = 0.1 * 2.0 * 0.3_f64.cos() * 0.3_f64.sin() * 3.0 / 0.3_f64.cos().powi(2);
        assert_relative_eq!(probs[1], expected, epsilon = 1e-12);

        let reversed = two_state_surface(0.0, -3.0);
        let probs = stepper.hop_probabilities(&state, &reversed);
        assert_eq!(probs[1], 0.0);
    }

    #[test]
    fn test_hop_switches_force_for_second_half_kick() {
        struct SplitForces;
        impl SurfaceModel for SplitForces {
            fn evaluate(&self, positions: &[[f64; 3]]) -> Result<SurfaceData> {
                let n = positions.len();
                let zero = vec![[0.0; 3]; n];
                let pushed = vec![[2.0, 0.0, 0.0]; n];
                let d = vec![[1.0, 0.0, 0.0]; n];
                let d_neg = vec![[-1.0, 0.0, 0.0]; n];
                Ok(SurfaceData {
                    energies: vec![0.0, 0.0],
                    forces: vec![zero.clone(), pushed],
                    nacv: vec![vec![zero.clone(), d], vec![d_neg, zero]],
                })
            }
        }
        // Equal energies and strong coupling: the hop fires with certainty
        // and costs no kinetic energy, so the step's only signature is the
        // second half-kick picking up the new surface's force.
        let stepper = TullyStepper::new(0.5, 0.05, 1.0).unwrap();
        let mut state = moving_state(1.0, 0);
        let amp = std::f64::consts::FRAC_1_SQRT_2;
        state.coeffs[0] = Complex64::new(amp, 0.0);
        state.coeffs[1] = Complex64::new(amp, 0.0);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = stepper
            .step(&mut state, &SplitForces, &[1.0], &mut rng)
            .unwrap();
        assert_eq!(outcome, HopOutcome::Hopped { from: 0, to: 1 });
        assert_relative_eq!(state.velocities[0][0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_coupling_direction_frustrates_even_downhill() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(-0.5, 0.0);
        let mut state = moving_state(1.0, 0);
        let before = state.velocities.clone();
        let outcome = stepper.rescale_to_surface(&mut state, &surface, &[1.0], 1);
        assert_eq!(outcome, HopOutcome::Frustrated { from: 0, to: 1 });
        assert_eq!(state.surf, 0);
        assert_eq!(state.velocities, before);
    }

    #[test]
    fn test_rk4_single_step_preserves_norm() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(0.3, 0.4);
        let state = moving_state(1.0, 0);
        let t = stepper.coupling_matrix(&state, &surface);
        let mut coeffs = state.coeffs.clone();
        stepper.rk4_step(&mut coeffs, &surface.energies, &t, 0.01);
        let norm: f64 = coeffs.iter().map(|c| c.norm_sqr()).sum();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_frustrated_hop_reverts_velocity() {
        // Huge upward gap, tiny kinetic energy: the hop cannot be paid for.
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(100.0, 1.0);
        let mut state = moving_state(0.01, 0);
        state.coeffs[0] = Complex64::new(0.7, 0.0);
        state.coeffs[1] = Complex64::new(0.714, 0.0);
        let before = state.velocities.clone();
        let outcome = stepper.rescale_to_surface(&mut state, &surface, &[1.0], 1);
        assert_eq!(outcome, HopOutcome::Frustrated { from: 0, to: 1 });
        assert_eq!(state.surf, 0);
        assert_eq!(state.velocities, before);
    }

    #[test]
    fn test_accepted_hop_conserves_total_energy() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let gap = 0.2;
        let surface = two_state_surface(gap, 1.0);
        let masses = [1.0];
        let mut state = moving_state(2.0, 0);
        let ke_before = 0.5 * masses[0] * state.velocities[0][0].powi(2);

        let outcome = stepper.rescale_to_surface(&mut state, &surface, &masses, 1);
        assert_eq!(outcome, HopOutcome::Hopped { from: 0, to: 1 });
        assert_eq!(state.surf, 1);
        let ke_after = 0.5 * masses[0] * state.velocities[0][0].powi(2);
        assert_relative_eq!(ke_before, ke_after + gap, epsilon = 1e-12);
    }

    #[test]
    fn test_downhill_hop_speeds_atoms_up() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(0.2, 1.0);
        let mut state = moving_state(2.0, 1);
        let speed_before = state.velocities[0][0];
        let outcome = stepper.rescale_to_surface(&mut state, &surface, &[1.0], 0);
        assert_eq!(outcome, HopOutcome::Hopped { from: 1, to: 0 });
        assert!(state.velocities[0][0] > speed_before);
    }

    #[test]
    fn test_hop_attempts_are_seeded() {
        let stepper = TullyStepper::new(0.5, 0.01, 1.0).unwrap();
        let surface = two_state_surface(0.05, 0.8);
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = moving_state(2.0, 0);
            state.coeffs[0] = Complex64::new(0.6, 0.0);
            state.coeffs[1] = Complex64::new(0.8, 0.0);
            let mut outcomes = Vec::new();
            for _ in 0..20 {
                outcomes.push(stepper.attempt_hop(&mut state, &surface, &[1.0], &mut rng));
            }
            outcomes
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_full_step_on_flat_surfaces() {
        struct Flat;
        impl SurfaceModel for Flat {
            fn evaluate(&self, positions: &[[f64; 3]]) -> Result<SurfaceData> {
                let zero = vec![[0.0; 3]; positions.len()];
                Ok(SurfaceData {
                    energies: vec![0.0, 1.0],
                    forces: vec![zero.clone(), zero.clone()],
                    nacv: vec![vec![zero.clone(), zero.clone()], vec![zero.clone(), zero]],
                })
            }
        }
        let stepper = TullyStepper::new(0.1, 0.01, 1.0).unwrap();
        let mut state = moving_state(1.0, 0);
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = stepper.step(&mut state, &Flat, &[1.0], &mut rng).unwrap();
        assert_eq!(outcome, HopOutcome::NoHop);
        // Force-free motion is a straight drift
        assert_relative_eq!(state.positions[0][0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(state.velocities[0][0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_step_batch_keeps_samples_independent() {
        struct Flat;
        impl SurfaceModel for Flat {
            fn evaluate(&self, positions: &[[f64; 3]]) -> Result<SurfaceData> {
                let zero = vec![[0.0; 3]; positions.len()];
                Ok(SurfaceData {
                    energies: vec![0.0, 1.0],
                    forces: vec![zero.clone(), zero.clone()],
                    nacv: vec![vec![zero.clone(), zero.clone()], vec![zero.clone(), zero]],
                })
            }
        }
        let stepper = TullyStepper::new(0.1, 0.01, 1.0).unwrap();
        let mut states = vec![moving_state(1.0, 0), moving_state(-2.0, 0)];
        let mut rng = StdRng::seed_from_u64(3);
        let outcomes = stepper
            .step_batch(&mut states, &Flat, &[1.0], &mut rng)
            .unwrap();
        assert_eq!(outcomes, vec![HopOutcome::NoHop, HopOutcome::NoHop]);
        assert_relative_eq!(states[0].positions[0][0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(states[1].positions[0][0], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_stepper_parameters() {
        assert!(TullyStepper::new(0.0, 0.01, 1.0).is_err());
        assert!(TullyStepper::new(0.5, 0.0, 1.0).is_err());
        assert!(TullyStepper::new(0.01, 0.5, 1.0).is_err());
        assert!(TullyStepper::new(0.5, 0.01, 0.0).is_err());
    }

    #[test]
    fn test_initial_state_validation() {
        assert!(TullyState::on_surface(vec![[0.0; 3]], vec![[0.0; 3]], 2, 2).is_err());
        assert!(TullyState::on_surface(vec![[0.0; 3]], vec![], 2, 0).is_err());
    }
}
