//! SAT-based key recovery for logic-locked combinational circuits.
//!
//! A locked netlist carries extra key inputs (any input named
//! `keyinput...`); the right key makes it equivalent to the original
//! design. Given the locked netlist and black-box I/O access to an
//! activated chip, [`SatAttack`] recovers such a key by repeatedly solving
//! a miter of two circuit copies for distinguishing inputs and pinning
//! both copies to the oracle's responses, until no distinguishing input
//! remains.
//!
//! ```
//! use delock::{AttackConfig, Circuit, Outcome, SatAttack};
//!
//! let locked = Circuit::from_bench_str(
//!     "INPUT(a)\nINPUT(b)\nINPUT(keyinput0)\nOUTPUT(y)\n\
//!      g = AND(a, b)\ny = XOR(g, keyinput0)\n",
//! )?;
//! let mut activated = locked.clone();
//! activated.apply_known_keys("0")?;
//!
//! let mut attack = SatAttack::against_circuit(locked, activated, AttackConfig::default())?;
//! match attack.solve()? {
//!     Outcome::Converged(sol) => assert_eq!(sol.key, vec![false]),
//!     Outcome::Exhausted { iterations } => panic!("gave up after {iterations}"),
//! }
//! # Ok::<(), delock::CktError>(())
//! ```

pub mod attack;
pub mod ckt;
pub mod clauselist;
pub mod cnf;
pub mod dbl;
pub mod sim;

// Re-exporting symbols and modules.
pub use attack::{AttackConfig, Outcome, SatAttack, Solution, TestVector};
pub use ckt::{Circuit, CktError, GateFn, Node, NodeId, NodeKind, ParserError, Result, Slice};
pub use clauselist::ClauseList;
pub use dbl::{DoubledCircuit, DupAllKeys, DupPolicy};
pub use sim::{CktEval, Oracle};
