//! A frozen clause template that can be replayed into a solver.
//!
//! [`ClauseList`] stores clauses outside any solver, in a flat literal pool
//! with per-literal occurrence lists. It implements [`ExtendFormula`], so the
//! CNF builders in [`cnf`] can target it exactly like a live solver. The one
//! operation that matters is [`ClauseList::add_rewritten_clauses`]: project
//! the template through a partial assignment and append the surviving
//! clauses, over fresh variables, to another formula.
//!
//! [`cnf`]: crate::cnf

use std::collections::HashMap;

use varisat::{ExtendFormula, Lit, Var};

use crate::ckt::{CktError, Result};

/// Occurrence-list index of a literal: two slots per variable.
fn code(lit: Lit) -> usize {
    2 * lit.var().index() + usize::from(!lit.is_positive())
}

#[derive(Debug, Clone, Default)]
pub struct ClauseList {
    /// Flat literal pool; clauses are contiguous runs.
    lits: Vec<Lit>,
    /// (start, length) of each clause in `lits`.
    clauses: Vec<(usize, usize)>,
    /// Clause indices containing each literal, indexed by [`code`].
    watches: Vec<Vec<usize>>,
    num_vars: usize,
}

impl ClauseList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// The clauses containing `lit`, in insertion order.
    pub fn clauses_with_lit(&self, lit: Lit) -> impl Iterator<Item = &[Lit]> {
        self.watches
            .get(code(lit))
            .into_iter()
            .flatten()
            .map(move |&c| self.clause(c))
    }

    fn clause(&self, idx: usize) -> &[Lit] {
        let (start, len) = self.clauses[idx];
        &self.lits[start..start + len]
    }

    /// Project the template through `values` and append what survives to
    /// `sink`, returning the number of appended clauses.
    ///
    /// `values` is indexed by template variable. A clause with a satisfied
    /// literal is dropped; falsified literals are removed. In the residual,
    /// variables flagged in `keep` (the key variables) are carried over
    /// verbatim, every other unassigned variable is renamed to a fresh
    /// variable of `sink`, consistently within this call. The projection of
    /// a consistent circuit encoding can never produce an empty clause, so
    /// one reports [`CktError::InvalidState`].
    pub fn add_rewritten_clauses(
        &self,
        values: &[Option<bool>],
        keep: &[bool],
        sink: &mut impl ExtendFormula,
    ) -> Result<usize> {
        if values.len() != self.num_vars || keep.len() != self.num_vars {
            return Err(CktError::InvalidState(format!(
                "assignment over {} vars against a template of {}",
                values.len(),
                self.num_vars
            )));
        }

        let mut rename: HashMap<Var, Var> = HashMap::new();
        let mut residual: Vec<Lit> = Vec::new();
        let mut appended = 0;

        'clauses: for idx in 0..self.clauses.len() {
            residual.clear();
            for &lit in self.clause(idx) {
                match values[lit.var().index()] {
                    Some(v) if v == lit.is_positive() => continue 'clauses,
                    Some(_) => {}
                    None if keep[lit.var().index()] => residual.push(lit),
                    None => {
                        let var = *rename
                            .entry(lit.var())
                            .or_insert_with(|| sink.new_var());
                        residual.push(if lit.is_positive() {
                            Lit::positive(var)
                        } else {
                            Lit::negative(var)
                        });
                    }
                }
            }
            if residual.is_empty() {
                return Err(CktError::InvalidState(
                    "assignment falsifies a template clause".to_string(),
                ));
            }
            sink.add_clause(&residual);
            appended += 1;
        }
        Ok(appended)
    }
}

impl ExtendFormula for ClauseList {
    fn add_clause(&mut self, literals: &[Lit]) {
        let start = self.lits.len();
        let idx = self.clauses.len();
        self.lits.extend_from_slice(literals);
        self.clauses.push((start, literals.len()));
        for &lit in literals {
            debug_assert!(lit.var().index() < self.num_vars);
            self.watches[code(lit)].push(idx);
        }
    }

    fn new_var(&mut self) -> Var {
        let var = Var::from_index(self.num_vars);
        self.num_vars += 1;
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        var
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use varisat::CnfFormula;

    /// xor over (a, b, y) plus a unit on a key var k.
    fn sample() -> (ClauseList, [Lit; 4]) {
        let mut t = ClauseList::new();
        let a = t.new_lit();
        let b = t.new_lit();
        let y = t.new_lit();
        let k = t.new_lit();
        crate::cnf::add_xor(&mut t, a, b, y);
        t.add_clause(&[k, y]);
        (t, [a, b, y, k])
    }

    #[test]
    fn stores_and_indexes_clauses() {
        let (t, [a, _, y, k]) = sample();
        assert_eq!(t.num_vars(), 4);
        assert_eq!(t.num_clauses(), 5);
        assert_eq!(t.clauses_with_lit(a).count(), 2);
        assert_eq!(t.clauses_with_lit(!a).count(), 2);
        assert_eq!(t.clauses_with_lit(k).count(), 1);
        assert_eq!(t.clauses_with_lit(!y).count(), 2);
    }

    #[test]
    fn rewrite_drops_satisfied_and_renames() {
        let (t, [a, b, y, k]) = sample();
        let mut values = vec![None; t.num_vars()];
        // a = true, y = true: every clause containing a or y drops out.
        values[a.var().index()] = Some(true);
        values[y.var().index()] = Some(true);
        let mut keep = vec![false; t.num_vars()];
        keep[k.var().index()] = true;

        let mut sink = CnfFormula::new();
        let n = t.add_rewritten_clauses(&values, &keep, &mut sink).unwrap();
        // y satisfies (a !b y), (!a b y) and (k y); a satisfies (a b !y).
        // Only (!a !b !y) survives, reduced to a unit over a fresh b.
        assert_eq!(n, 1);
        let got: Vec<Vec<Lit>> = sink.iter().map(|c| c.to_vec()).collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].len(), 1);
        assert!(!got[0][0].is_positive());
        assert_ne!(got[0][0].var(), b.var());
    }

    #[test]
    fn rewrite_renames_consistently_within_a_call() {
        let (t, [a, b, y, k]) = sample();
        let mut values = vec![None; t.num_vars()];
        values[a.var().index()] = Some(true);
        let mut keep = vec![false; t.num_vars()];
        keep[k.var().index()] = true;

        let mut sink = CnfFormula::new();
        let n = t.add_rewritten_clauses(&values, &keep, &mut sink).unwrap();
        // a satisfies (a b !y) and (a !b y); the rest survive with b and y
        // renamed: (!b' !y'), (b' y') and (k y').
        assert_eq!(n, 3);
        let got: Vec<Vec<Lit>> = sink.iter().map(|c| c.to_vec()).collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].len(), 2);
        assert_eq!(got[1].len(), 2);
        assert_eq!(got[2].len(), 2);
        // One fresh variable per template variable, shared across clauses.
        assert_eq!(got[0][0], !got[1][0]);
        assert_eq!(got[0][1], !got[1][1]);
        assert_eq!(got[2][1], got[1][1]);
        // The key literal is carried over verbatim.
        assert_eq!(got[2][0], k);
        assert_ne!(got[0][0].var(), b.var());
        assert_ne!(got[0][1].var(), y.var());
    }

    #[test]
    fn rewrite_keeps_key_literals_verbatim() {
        let (t, [a, b, y, k]) = sample();
        let mut values = vec![None; t.num_vars()];
        values[a.var().index()] = Some(true);
        values[b.var().index()] = Some(true);
        values[y.var().index()] = Some(false);
        let mut keep = vec![false; t.num_vars()];
        keep[k.var().index()] = true;

        let mut sink = CnfFormula::new();
        let n = t.add_rewritten_clauses(&values, &keep, &mut sink).unwrap();
        // Only (k y) survives, reduced to the unit (k), untouched.
        assert_eq!(n, 1);
        let got: Vec<Vec<Lit>> = sink.iter().map(|c| c.to_vec()).collect();
        assert_eq!(got, vec![vec![k]]);
    }

    #[test]
    fn rewrite_is_deterministic() {
        let (t, [a, _, y, k]) = sample();
        let mut values = vec![None; t.num_vars()];
        values[a.var().index()] = Some(false);
        values[y.var().index()] = Some(true);
        let mut keep = vec![false; t.num_vars()];
        keep[k.var().index()] = true;

        let mut s1 = CnfFormula::new();
        let mut s2 = CnfFormula::new();
        let n1 = t.add_rewritten_clauses(&values, &keep, &mut s1).unwrap();
        let n2 = t.add_rewritten_clauses(&values, &keep, &mut s2).unwrap();
        assert_eq!(n1, n2);
        let c1: Vec<Vec<Lit>> = s1.iter().map(|c| c.to_vec()).collect();
        let c2: Vec<Vec<Lit>> = s2.iter().map(|c| c.to_vec()).collect();
        assert_eq!(c1, c2);
    }

    #[test]
    fn falsified_clause_is_an_error() {
        let mut t = ClauseList::new();
        let a = t.new_lit();
        let b = t.new_lit();
        t.add_clause(&[a, b]);
        let values = vec![Some(false), Some(false)];
        let keep = vec![false, false];
        let mut sink = CnfFormula::new();
        assert!(matches!(
            t.add_rewritten_clauses(&values, &keep, &mut sink),
            Err(CktError::InvalidState(_))
        ));
    }
}
