//! SMT-LIB encoding of the memory/pointer model
//!
//! The script is a pure function of the two formulas, the argument model and
//! the relation being checked. Arguments are cells: a pointer cell carries a
//! back-reference, a 32-bit value and a string length; an integer cell a
//! back-reference and a 32-bit value. The back-reference is the address a
//! global argument was loaded from.

use crate::model::{ArgType, ArgumentModel};
use std::fmt;
use std::fmt::Write;

/// Theory declarations and predicate definitions
///
/// Order matters: sorts are declared before the functions that use them.
pub const PREAMBLE: &str = r#"(set-option :print-success false)
(declare-fun mem () (Array (_ BitVec 32) (_ BitVec 32)))
(declare-datatype OptBitVec ((none) (some (value (_ BitVec 32)))))
(declare-datatype PtrCell ((tup (ref (OptBitVec)) (value (_ BitVec 32)) (strlen (_ BitVec 32)))))
(declare-datatype IntCell ((tup (ref (OptBitVec)) (value (_ BitVec 32)))))

; Constraint families
(define-fun valid ((x PtrCell)) (Bool) (distinct (value x)  #x00000000))
(define-fun alias ((x PtrCell) (y PtrCell)) (Bool) (= (value x)  (value y)))
(define-fun deref ((x PtrCell) (y PtrCell)) (Bool) (and ((_ is (some ((_ BitVec 32)) (OptBitVec))) (ref y)) (= (value x)  (value (ref y)))))
(define-fun ptrgt ((x PtrCell) (y PtrCell)) (Bool) (bvugt (value x)  (value y)))
(define-fun ptrlt ((x PtrCell) (y PtrCell)) (Bool) (bvult (value x)  (value y)))
(define-fun strleneq ((x PtrCell) (y (_ BitVec 32))) (Bool) (= (strlen x) y))
(define-fun overlap ((x PtrCell) (y PtrCell)) (Bool)
    (or (and (bvule (value x) (value y))
            (bvugt (bvadd (value x) (bvadd #x00000001 (strlen x))) (value y)))
        (and (bvule (value y) (value x))
            (bvugt (bvadd (value y) (bvadd #x00000001 (strlen y))) (value x)))))

(define-fun eq ((x IntCell) (y (_ BitVec 32))) (Bool) (= (value x) y))
(define-fun eq ((x IntCell) (y IntCell)) (Bool) (= (value x) (value y)))

(define-fun sgt ((x IntCell) (y (_ BitVec 32))) (Bool) (bvsgt (value x) y))
(define-fun ugt ((x IntCell) (y (_ BitVec 32))) (Bool) (bvugt (value x) y))

(define-fun sgt ((x IntCell) (y IntCell)) (Bool) (bvsgt (value x) (value y)))
(define-fun ugt ((x IntCell) (y IntCell)) (Bool) (bvugt (value x) (value y)))

(define-fun slt ((x IntCell) (y (_ BitVec 32))) (Bool) (bvslt (value x) y))
(define-fun ult ((x IntCell) (y (_ BitVec 32))) (Bool) (bvult (value x) y))

(define-fun slt ((x IntCell) (y IntCell)) (Bool) (bvslt (value x) (value y)))
(define-fun ult ((x IntCell) (y IntCell)) (Bool) (bvult (value x) (value y)))

(define-fun smod ((x IntCell) (y (_ BitVec 32)) (z (_ BitVec 32))) (Bool) (= (bvsrem (value x) y) z))
(define-fun umod ((x IntCell) (y (_ BitVec 32)) (z (_ BitVec 32))) (Bool) (= (bvurem (value x) y) z))

; Uninterpreted sum over a memory region
(declare-fun sum
        ((Array (_ BitVec 32) (_ BitVec 32)) (_ BitVec 32) IntCell)
        (_ BitVec 32))

; Stands for constraints the engine could not express
(declare-fun uknconstr () Bool)
"#;

/// Relation between the candidate and the target formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Candidate and target agree on every input
    Equiv,
    /// Every input satisfying the candidate satisfies the target
    Implies,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Equiv => write!(f, "equiv"),
            Relation::Implies => write!(f, "implies"),
        }
    }
}

/// Build the script whose satisfiability refutes `relation`
///
/// A model of the script is an input on which the formulas differ (for
/// `Equiv`) or on which the candidate holds and the target does not (for
/// `Implies`). Unsatisfiable therefore means the relation holds.
pub fn encode(candidate: &str, target: &str, args: &ArgumentModel, relation: Relation) -> String {
    let mut script = String::from(PREAMBLE);
    script.push('\n');

    for arg in args.iter() {
        let v = &arg.name;
        // Writing into a String cannot fail
        let _ = writeln!(script, "\n(declare-fun {} () {})", v, arg.ty.sort());

        if arg.ty == ArgType::Pointer {
            // An invalid pointer has no string behind it
            let _ = writeln!(
                script,
                "(assert (=> (not (valid {v})) (= (strlen {v}) #x00000000)))"
            );
            // [value, value + strlen] does not wrap around the address space
            let _ = writeln!(
                script,
                "(assert (bvult (value {v}) (bvadd #x00000001 (bvadd (value {v}) (strlen {v})))))"
            );
        }

        if arg.scope.is_global() {
            let _ = writeln!(
                script,
                "(assert ((_ is (some ((_ BitVec 32)) (OptBitVec))) (ref {v})))"
            );
            let _ = writeln!(script, "(assert (distinct (value (ref {v})) #x00000000))");
            let _ = writeln!(script, "(assert (= (select mem (value (ref {v}))) (value {v})))");
        } else {
            let _ = writeln!(script, "(assert ((_ is (none () (OptBitVec))) (ref {v})))");
        }
    }

    script.push('\n');

    // Overlapping strings must end at the same address
    for (a, b) in args.pairs() {
        if a.ty.is_pointer() && b.ty.is_pointer() {
            let _ = writeln!(
                script,
                "(assert (=> (overlap {a} {b}) (= (bvadd (value {a}) (strlen {a})) (bvadd (value {b}) (strlen {b})))))",
                a = a.name,
                b = b.name
            );
        }
    }

    let globals: Vec<_> = args.globals().collect();
    for (i, a) in globals.iter().enumerate() {
        for b in &globals[i + 1..] {
            let _ = writeln!(
                script,
                "(assert (distinct (value (ref {})) (value (ref {}))))",
                a.name, b.name
            );
        }
    }

    match relation {
        Relation::Equiv => {
            let _ = writeln!(script, "(assert (distinct {} {}))", candidate, target);
        }
        Relation::Implies => {
            let _ = writeln!(script, "(assert (and {} (not {})))", candidate, target);
        }
    }
    script.push_str("(check-sat)\n(exit)\n");
    script
}
