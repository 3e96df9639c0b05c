//! Constraint templates and predicate families
//!
//! A template is an underscore separated pattern such as `Alias_X_Y` or
//! `Mod_X_4_0`: a predicate family followed by operands, where single
//! uppercase letters are placeholders for arguments and everything else is
//! kept verbatim.

use crate::error::BiasError;
use std::fmt;
use std::str::FromStr;

/// Predicate families the acquisition engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Valid,
    StrlenEq,
    Eq,
    Gt,
    Lt,
    Mod,
    Alias,
    Deref,
    Overlap,
    PtrGt,
    PtrLt,
}

impl Predicate {
    /// Name of the theory function implementing this family
    ///
    /// Integer comparisons and modulo also get a signedness prefix, see
    /// [`Predicate::is_sign_dependent`].
    pub fn smt_name(&self) -> &'static str {
        match self {
            Predicate::Valid => "valid",
            Predicate::StrlenEq => "strleneq",
            Predicate::Eq => "eq",
            Predicate::Gt => "gt",
            Predicate::Lt => "lt",
            Predicate::Mod => "mod",
            Predicate::Alias => "alias",
            Predicate::Deref => "deref",
            Predicate::Overlap => "overlap",
            Predicate::PtrGt => "ptrgt",
            Predicate::PtrLt => "ptrlt",
        }
    }

    /// Whether the translation depends on the signedness of the first operand
    pub fn is_sign_dependent(&self) -> bool {
        matches!(self, Predicate::Gt | Predicate::Lt | Predicate::Mod)
    }

    /// How a template of this family with `arity` placeholders binds arguments
    pub fn binding(&self, arity: usize) -> Option<Binding> {
        match (self, arity) {
            (Predicate::Valid | Predicate::StrlenEq, 1) => Some(Binding::EachPointer),
            (Predicate::Eq | Predicate::Gt | Predicate::Lt | Predicate::Mod, 1) => {
                Some(Binding::EachInteger)
            }
            (
                Predicate::Alias
                | Predicate::Deref
                | Predicate::Overlap
                | Predicate::PtrGt
                | Predicate::PtrLt,
                2,
            ) => Some(Binding::PointerPairs),
            (Predicate::Eq | Predicate::Gt | Predicate::Lt, 2) => Some(Binding::SameSignPairs),
            _ => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Predicate::Valid => "Valid",
            Predicate::StrlenEq => "StrlenEq",
            Predicate::Eq => "Eq",
            Predicate::Gt => "GT",
            Predicate::Lt => "LT",
            Predicate::Mod => "Mod",
            Predicate::Alias => "Alias",
            Predicate::Deref => "Deref",
            Predicate::Overlap => "Overlap",
            Predicate::PtrGt => "PtrGT",
            Predicate::PtrLt => "PtrLT",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Predicate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(Predicate::Valid),
            "StrlenEq" => Ok(Predicate::StrlenEq),
            "Eq" => Ok(Predicate::Eq),
            "GT" => Ok(Predicate::Gt),
            "LT" => Ok(Predicate::Lt),
            "Mod" => Ok(Predicate::Mod),
            "Alias" => Ok(Predicate::Alias),
            "Deref" => Ok(Predicate::Deref),
            "Overlap" => Ok(Predicate::Overlap),
            "PtrGT" => Ok(Predicate::PtrGt),
            "PtrLT" => Ok(Predicate::PtrLt),
            _ => Err(()),
        }
    }
}

/// Argument binding rule of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// One atom per pointer argument
    EachPointer,
    /// One atom per signed or unsigned argument
    EachInteger,
    /// One atom per unordered pair of pointer arguments
    PointerPairs,
    /// One atom per unordered pair of integers with the same signedness
    SameSignPairs,
}

/// A parsed constraint template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTemplate {
    text: String,
    predicate: Predicate,
    binding: Binding,
    /// Distinct placeholders in order of first appearance
    placeholders: Vec<char>,
}

impl ConstraintTemplate {
    pub fn parse(text: &str) -> Result<Self, BiasError> {
        let text = text.trim();
        let family = text.split('_').next().unwrap_or_default();
        let predicate = family
            .parse::<Predicate>()
            .map_err(|_| BiasError::UnknownPredicate {
                family: family.to_string(),
                template: text.to_string(),
            })?;

        let mut placeholders = Vec::new();
        for c in text.split('_').skip(1).filter_map(placeholder) {
            if !placeholders.contains(&c) {
                placeholders.push(c);
            }
        }

        let binding =
            predicate
                .binding(placeholders.len())
                .ok_or_else(|| BiasError::UnsupportedArity {
                    template: text.to_string(),
                    arity: placeholders.len(),
                })?;

        Ok(Self {
            text: text.to_string(),
            predicate,
            binding,
            placeholders,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn arity(&self) -> usize {
        self.placeholders.len()
    }

    /// Whether the template mentions a numeric constant other than zero
    pub fn has_nonzero_literal(&self) -> bool {
        has_nonzero_literal(&self.text)
    }

    /// Substitute argument names for the placeholders, in order of first appearance
    pub fn bind(&self, names: &[&str]) -> String {
        debug_assert_eq!(names.len(), self.placeholders.len());
        self.text
            .split('_')
            .enumerate()
            .map(|(i, elem)| match placeholder(elem) {
                Some(c) if i > 0 => self
                    .placeholders
                    .iter()
                    .position(|&p| p == c)
                    .and_then(|pos| names.get(pos).copied())
                    .unwrap_or(elem),
                _ => elem,
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for ConstraintTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Whether `text` contains a run of digits with a nonzero value
fn has_nonzero_literal(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .any(|run| run.chars().any(|c| c != '0'))
}

fn placeholder(elem: &str) -> Option<char> {
    let mut chars = elem.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Some(c),
        _ => None,
    }
}
