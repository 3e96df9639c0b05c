//! Translation of concrete atoms into theory expressions
//!
//! The table is keyed by predicate family and, for the sign dependent
//! families, by the signedness of the first operand:
//!
//! | atom              | expression                      |
//! |-------------------|---------------------------------|
//! | `Valid_v0`        | `(valid v0)`                    |
//! | `Overlap_v0_v1`   | `(overlap v0 v1)`               |
//! | `Eq_v0_5`         | `(eq v0 #x00000005)`            |
//! | `GT_v0_0` (INT)   | `(sgt v0 #x00000000)`           |
//! | `LT_v0_v1` (UINT) | `(ult v0 v1)`                   |
//! | `Mod_v0_4_1` (INT)| `(smod v0 #x00000004 #x00000001)` |

use crate::bias::template::Predicate;
use crate::error::BiasError;
use crate::model::{ArgType, ArgumentModel};

/// Render an atom as the expression the encoder's preamble gives meaning to
pub fn to_smtlib(atom: &str, args: &ArgumentModel) -> Result<String, BiasError> {
    let mut elems = atom.split('_');
    let family = elems.next().unwrap_or_default();
    let predicate = family
        .parse::<Predicate>()
        .map_err(|_| BiasError::UnknownPredicate {
            family: family.to_string(),
            template: atom.to_string(),
        })?;
    let operands: Vec<&str> = elems.collect();

    let name = if predicate.is_sign_dependent() {
        let first = operands.first().copied().unwrap_or_default();
        let prefix = match args.get(first).map(|a| a.ty) {
            Some(ArgType::UnsignedInt) => "u",
            Some(ArgType::SignedInt) => "s",
            _ => {
                return Err(BiasError::UnboundOperand {
                    atom: atom.to_string(),
                    name: first.to_string(),
                });
            }
        };
        format!("{}{}", prefix, predicate.smt_name())
    } else {
        predicate.smt_name().to_string()
    };

    let mut expr = format!("({}", name);
    for operand in operands {
        expr.push(' ');
        expr.push_str(&format_operand(operand));
    }
    expr.push(')');
    Ok(expr)
}

/// Numeric operands become 32-bit hexadecimal literals, names pass through
pub fn format_operand(operand: &str) -> String {
    match operand.parse::<i64>() {
        Ok(value) => bv32_literal(value),
        Err(_) => operand.to_string(),
    }
}

/// Two's-complement 32-bit literal, e.g. `-1` becomes `#xffffffff`
pub fn bv32_literal(value: i64) -> String {
    format!("#x{:08x}", value as u32)
}
