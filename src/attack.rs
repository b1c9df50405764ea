//! The counterexample-guided key recovery loop.
//!
//! Starting from the doubled circuit of [`dbl`], the loop alternates:
//!
//! - solve the miter to find a distinguishing input, i.e. an input on which
//!   two keys consistent with everything observed so far still disagree
//! - query the [`Oracle`] on that input and append the rewritten template
//!   clauses pinning both copies to the observed response
//!
//! An unsatisfiable miter means every remaining key is equivalent on all
//! inputs; any of them unlocks the circuit.
//!
//! [`dbl`]: crate::dbl
//! [`Oracle`]: crate::sim::Oracle

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use varisat::{ExtendFormula, Lit, Solver};

use crate::ckt::{Circuit, CktError, Result};
use crate::clauselist::ClauseList;
use crate::cnf::{LitMap, build_cnf_mirrored};
use crate::dbl::{DoubledCircuit, DupAllKeys};
use crate::sim::{CktEval, Oracle};

/// Resource limits and verification settings of one attack run.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Counterexample rounds before giving up; `None` runs to convergence.
    pub max_iterations: Option<usize>,
    /// Wall-clock budget; `None` runs to convergence.
    pub time_limit: Option<Duration>,
    /// Random input samples for estimating key coverage; `0` skips sampling
    /// and reports a coverage of 1.0.
    pub verify_samples: usize,
    /// Seed of the sampling generator, for reproducible runs.
    pub seed: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            time_limit: None,
            verify_samples: 1000,
            seed: 1,
        }
    }
}

/// One oracle observation: a primary input vector and the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    pub inputs: Vec<bool>,
    pub outputs: Vec<bool>,
}

/// A recovered key, in declared key-input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub key: Vec<bool>,
    /// Fraction of verification samples on which the key reproduced the
    /// oracle; 1.0 when sampling is disabled.
    pub coverage: f64,
    /// Counterexample rounds it took.
    pub iterations: usize,
    /// Total clauses appended by the template rewriter.
    pub cubes: usize,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Converged(Solution),
    Exhausted { iterations: usize },
}

fn lit_with(l: Lit, v: bool) -> Lit {
    if v { l } else { !l }
}

/// The attack state: the doubled circuit encoded into one incremental
/// solver, the frozen clause template, and the observation log.
pub struct SatAttack<O: Oracle> {
    ckt: Circuit,
    oracle: O,
    dbl: DoubledCircuit,
    solver: Solver<'static>,
    template: ClauseList,
    miter: Lit,
    input_lits: Vec<Lit>,
    key_lits_a: Vec<Lit>,
    key_lits_b: Vec<Lit>,
    output_lits_a: Vec<Lit>,
    output_lits_b: Vec<Lit>,
    /// Template variable index -> is a key variable (either copy).
    key_flags: Vec<bool>,
    vectors: Vec<TestVector>,
    iterations: usize,
    cubes: usize,
    cfg: AttackConfig,
}

impl SatAttack<CktEval> {
    /// Attack `locked` against direct evaluation of an activated circuit.
    /// The two circuits must agree on their primary I/O interface.
    pub fn against_circuit(
        locked: Circuit,
        activated: Circuit,
        cfg: AttackConfig,
    ) -> Result<Self> {
        let oracle = CktEval::new(activated)?;
        locked.compare_io(oracle.ckt())?;
        Self::new(locked, oracle, cfg)
    }
}

impl<O: Oracle> SatAttack<O> {
    pub fn new(ckt: Circuit, oracle: O, cfg: AttackConfig) -> Result<Self> {
        let dbl = DoubledCircuit::build(&ckt, &DupAllKeys)?;
        let mut solver = Solver::new();
        let (lmap, template, miter) = dbl.encode(&mut solver);

        let lits = |ids: &[usize], side: &dyn Fn(usize) -> usize| -> Vec<Lit> {
            ids.iter().map(|&n| lmap[side(n)]).collect()
        };
        let input_lits = lits(&ckt.ckt_inputs, &|n| dbl.node_a(n));
        let key_lits_a = lits(&ckt.key_inputs, &|n| dbl.node_a(n));
        let key_lits_b = lits(&ckt.key_inputs, &|n| dbl.node_b(n));
        let output_lits_a = lits(&ckt.outputs, &|n| dbl.node_a(n));
        let output_lits_b = lits(&ckt.outputs, &|n| dbl.node_b(n));

        let mut key_flags = vec![false; template.num_vars()];
        for l in key_lits_a.iter().chain(&key_lits_b) {
            key_flags[l.var().index()] = true;
        }

        Ok(Self {
            ckt,
            oracle,
            dbl,
            solver,
            template,
            miter,
            input_lits,
            key_lits_a,
            key_lits_b,
            output_lits_a,
            output_lits_b,
            key_flags,
            vectors: Vec::new(),
            iterations: 0,
            cubes: 0,
            cfg,
        })
    }

    pub fn vectors(&self) -> &[TestVector] {
        &self.vectors
    }

    pub fn doubled(&self) -> &DoubledCircuit {
        &self.dbl
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn num_cubes(&self) -> usize {
        self.cubes
    }

    /// Pin key bits known from other analyses before solving. The pattern
    /// has one character per key input: `0`, `1` or `x` (unconstrained).
    pub fn set_known_keys(&mut self, pattern: &str) -> Result<()> {
        if pattern.chars().count() != self.key_lits_a.len() {
            return Err(CktError::KeyFormat(format!(
                "{} characters for {} key inputs",
                pattern.chars().count(),
                self.key_lits_a.len()
            )));
        }
        for (i, ch) in pattern.chars().enumerate() {
            let v = match ch.to_ascii_lowercase() {
                '0' => false,
                '1' => true,
                'x' => continue,
                other => {
                    return Err(CktError::KeyFormat(format!(
                        "unexpected character {other:?}"
                    )));
                }
            };
            self.solver.add_clause(&[lit_with(self.key_lits_a[i], v)]);
            self.solver.add_clause(&[lit_with(self.key_lits_b[i], v)]);
        }
        Ok(())
    }

    /// Run the loop to convergence or until a resource limit trips.
    pub fn solve(&mut self) -> Result<Outcome> {
        let started = Instant::now();

        // Seed with the all-zero and all-one vectors before any solving.
        let width = self.ckt.num_ckt_inputs();
        self.record_input_values(&vec![false; width])?;
        if width > 0 {
            self.record_input_values(&vec![true; width])?;
        }

        loop {
            if let Some(max) = self.cfg.max_iterations {
                if self.iterations >= max {
                    log::info!("giving up after {} iteration(s)", self.iterations);
                    return Ok(Outcome::Exhausted {
                        iterations: self.iterations,
                    });
                }
            }
            if let Some(limit) = self.cfg.time_limit {
                if started.elapsed() >= limit {
                    log::info!("time limit hit after {} iteration(s)", self.iterations);
                    return Ok(Outcome::Exhausted {
                        iterations: self.iterations,
                    });
                }
            }

            self.solver.assume(&[self.miter]);
            if !self.solve_raw()? {
                self.solver.assume(&[]);
                log::info!(
                    "converged after {} iteration(s), {} cube(s)",
                    self.iterations,
                    self.cubes
                );
                return Ok(Outcome::Converged(self.verify()?));
            }

            // Changing assumptions discards the stored model, so it must be
            // read before the reset.
            let model = self.model()?;
            let inputs: Vec<bool> = self
                .input_lits
                .iter()
                .map(|l| model.contains(l))
                .collect();
            self.solver.assume(&[]);
            self.iterations += 1;
            log::debug!("iteration {}: distinguishing input found", self.iterations);
            self.record_input_values(&inputs)?;
        }
    }

    /// Query the oracle on `inputs`, log the vector and append the rewritten
    /// template clauses pinning both copies to the response.
    fn record_input_values(&mut self, inputs: &[bool]) -> Result<()> {
        let outputs = self.oracle.query(inputs);
        if outputs.len() != self.ckt.num_outputs() {
            return Err(CktError::InvalidState(format!(
                "oracle returned {} output(s), expected {}",
                outputs.len(),
                self.ckt.num_outputs()
            )));
        }

        let mut values: Vec<Option<bool>> = vec![None; self.template.num_vars()];
        let assign = |values: &mut Vec<Option<bool>>, l: Lit, v: bool| {
            values[l.var().index()] = Some(v == l.is_positive());
        };
        for (&l, &v) in self.input_lits.iter().zip(inputs) {
            assign(&mut values, l, v);
        }
        // A key input can itself be a declared output. Assigning its variable
        // would satisfy or shorten the very clauses that are supposed to keep
        // it open, so the observed bit is pinned with a unit clause instead.
        for (&l, &v) in self.output_lits_a.iter().zip(&outputs) {
            if self.key_flags[l.var().index()] {
                self.solver.add_clause(&[lit_with(l, v)]);
            } else {
                assign(&mut values, l, v);
            }
        }
        for (&l, &v) in self.output_lits_b.iter().zip(&outputs) {
            if self.key_flags[l.var().index()] {
                self.solver.add_clause(&[lit_with(l, v)]);
            } else {
                assign(&mut values, l, v);
            }
        }

        let appended =
            self.template
                .add_rewritten_clauses(&values, &self.key_flags, &mut self.solver)?;
        self.cubes += appended;
        self.vectors.push(TestVector {
            inputs: inputs.to_vec(),
            outputs,
        });
        Ok(())
    }

    /// Extract a key consistent with every observation and estimate how
    /// often it reproduces the oracle on random inputs.
    fn verify(&mut self) -> Result<Solution> {
        self.solver.assume(&[]);
        if !self.solve_raw()? {
            return Err(CktError::InvalidState(
                "no key satisfies the recorded oracle behavior".to_string(),
            ));
        }
        let model = self.model()?;
        let key: Vec<bool> = self.key_lits_a.iter().map(|l| model.contains(l)).collect();

        let coverage = if self.cfg.verify_samples == 0 {
            1.0
        } else {
            self.estimate_coverage(&key)?
        };
        Ok(Solution {
            key,
            coverage,
            iterations: self.iterations,
            cubes: self.cubes,
        })
    }

    fn estimate_coverage(&mut self, key: &[bool]) -> Result<f64> {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let samples = self.cfg.verify_samples;
        let mut agree = 0usize;
        for _ in 0..samples {
            let inputs: Vec<bool> = (0..self.input_lits.len())
                .map(|_| rng.gen_bool(0.5))
                .collect();
            let expect = self.oracle.query(&inputs);

            let mut assumptions: Vec<Lit> = self
                .input_lits
                .iter()
                .zip(&inputs)
                .map(|(&l, &v)| lit_with(l, v))
                .collect();
            assumptions.extend(
                self.key_lits_a
                    .iter()
                    .zip(key)
                    .map(|(&l, &v)| lit_with(l, v)),
            );
            self.solver.assume(&assumptions);
            if !self.solve_raw()? {
                self.solver.assume(&[]);
                return Err(CktError::InvalidState(
                    "candidate key inconsistent with its own encoding".to_string(),
                ));
            }
            let model = self.model()?;
            let got: Vec<bool> = self
                .output_lits_a
                .iter()
                .map(|l| model.contains(l))
                .collect();
            if got == expect {
                agree += 1;
            }
        }
        self.solver.assume(&[]);
        Ok(agree as f64 / samples as f64)
    }

    /// Exclude a key from the search space, on both copies.
    pub fn block_key(&mut self, key: &[bool]) -> Result<()> {
        if key.len() != self.key_lits_a.len() {
            return Err(CktError::KeyFormat(format!(
                "{} bits for {} key inputs",
                key.len(),
                self.key_lits_a.len()
            )));
        }
        let blocking = |lits: &[Lit]| -> Vec<Lit> {
            lits.iter().zip(key).map(|(&l, &v)| lit_with(l, !v)).collect()
        };
        self.solver.add_clause(&blocking(&self.key_lits_a));
        self.solver.add_clause(&blocking(&self.key_lits_b));
        Ok(())
    }

    /// After convergence and [`block_key`], look for another key consistent
    /// with everything observed. `None` when the key space is exhausted.
    ///
    /// [`block_key`]: SatAttack::block_key
    pub fn next_key(&mut self) -> Result<Option<Solution>> {
        self.solver.assume(&[]);
        if !self.solve_raw()? {
            return Ok(None);
        }
        Ok(Some(self.verify()?))
    }

    /// Determine which key bits are already forced by the observation log
    /// alone, on a fresh single-copy encoding. Returns the forced bits by
    /// key-input position.
    pub fn find_fixed_keys(&mut self) -> Result<BTreeMap<usize, bool>> {
        let mut solver: Solver<'static> = Solver::new();
        let mut template = ClauseList::new();
        let lmap: LitMap = build_cnf_mirrored(&self.ckt, &mut solver, &mut template, |_| true);

        let key_lits: Vec<Lit> = self.ckt.key_inputs.iter().map(|&k| lmap[k]).collect();
        let input_lits: Vec<Lit> = self.ckt.ckt_inputs.iter().map(|&i| lmap[i]).collect();
        let output_lits: Vec<Lit> = self.ckt.outputs.iter().map(|&o| lmap[o]).collect();
        let mut key_flags = vec![false; template.num_vars()];
        for l in &key_lits {
            key_flags[l.var().index()] = true;
        }

        for vector in &self.vectors {
            let mut values: Vec<Option<bool>> = vec![None; template.num_vars()];
            for (&l, &v) in input_lits.iter().zip(&vector.inputs) {
                values[l.var().index()] = Some(v == l.is_positive());
            }
            for (&l, &v) in output_lits.iter().zip(&vector.outputs) {
                if key_flags[l.var().index()] {
                    solver.add_clause(&[lit_with(l, v)]);
                } else {
                    values[l.var().index()] = Some(v == l.is_positive());
                }
            }
            template.add_rewritten_clauses(&values, &key_flags, &mut solver)?;
        }

        if !solver.solve().map_err(solver_err)? {
            return Err(CktError::InvalidState(
                "observation log admits no key".to_string(),
            ));
        }
        let model: HashSet<Lit> = solver
            .model()
            .ok_or_else(|| CktError::InvalidState("solver returned no model".to_string()))?
            .into_iter()
            .collect();

        let mut fixed = BTreeMap::new();
        for (i, &l) in key_lits.iter().enumerate() {
            let v = model.contains(&l);
            solver.assume(&[lit_with(l, !v)]);
            if !solver.solve().map_err(solver_err)? {
                solver.assume(&[]);
                solver.add_clause(&[lit_with(l, v)]);
                fixed.insert(i, v);
            }
        }
        Ok(fixed)
    }

    fn solve_raw(&mut self) -> Result<bool> {
        self.solver.solve().map_err(solver_err)
    }

    fn model(&mut self) -> Result<HashSet<Lit>> {
        Ok(self
            .solver
            .model()
            .ok_or_else(|| CktError::InvalidState("solver returned no model".to_string()))?
            .into_iter()
            .collect())
    }
}

fn solver_err(e: impl std::fmt::Display) -> CktError {
    CktError::Solver(e.to_string())
}
