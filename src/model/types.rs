//! Core types for the typed argument model

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Type of a program argument as seen by the acquisition engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Pointer into memory, modelled as a `PtrCell`
    Pointer,
    /// Two's-complement integer, modelled as an `IntCell`
    SignedInt,
    /// Unsigned integer, modelled as an `IntCell`
    UnsignedInt,
}

impl ArgType {
    pub fn is_pointer(&self) -> bool {
        matches!(self, ArgType::Pointer)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_pointer()
    }

    /// Theory sort of the cell that holds an argument of this type
    pub fn sort(&self) -> &'static str {
        match self {
            ArgType::Pointer => "PtrCell",
            ArgType::SignedInt | ArgType::UnsignedInt => "IntCell",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Pointer => write!(f, "PTR"),
            ArgType::SignedInt => write!(f, "INT"),
            ArgType::UnsignedInt => write!(f, "UINT"),
        }
    }
}

impl FromStr for ArgType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PTR" => Ok(ArgType::Pointer),
            "INT" => Ok(ArgType::SignedInt),
            "UINT" => Ok(ArgType::UnsignedInt),
            other => Err(ConfigError::InvalidValue {
                field: "types",
                value: other.to_string(),
            }),
        }
    }
}

/// Where an argument lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Passed by value, no reference address
    #[default]
    Local,
    /// Read from a global whose address is known
    Global,
}

impl Scope {
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "true" => Ok(Scope::Global),
            "false" => Ok(Scope::Local),
            other => Err(ConfigError::InvalidValue {
                field: "globals",
                value: other.to_string(),
            }),
        }
    }
}

/// A single positional argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedArgument {
    pub name: String,
    pub ty: ArgType,
    pub scope: Scope,
}

impl TypedArgument {
    /// Name of the argument at position `index`
    pub fn positional_name(index: usize) -> String {
        format!("v{}", index)
    }
}

/// Ordered argument list of the function under analysis
///
/// Names are `v0 .. v{n-1}` and therefore unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentModel {
    args: Vec<TypedArgument>,
}

impl ArgumentModel {
    /// Build the model from parallel type and scope lists
    pub fn new(types: &[ArgType], scopes: &[Scope]) -> Result<Self, ConfigError> {
        if types.len() != scopes.len() {
            return Err(ConfigError::LengthMismatch {
                field: "globals",
                expected: types.len(),
                found: scopes.len(),
            });
        }

        Ok(Self::from_pairs(types.iter().copied().zip(scopes.iter().copied())))
    }

    /// All arguments local
    pub fn local(types: &[ArgType]) -> Self {
        Self::from_pairs(types.iter().map(|&ty| (ty, Scope::Local)))
    }

    fn from_pairs(pairs: impl Iterator<Item = (ArgType, Scope)>) -> Self {
        let args = pairs
            .enumerate()
            .map(|(i, (ty, scope))| TypedArgument {
                name: TypedArgument::positional_name(i),
                ty,
                scope,
            })
            .collect();
        Self { args }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedArgument> {
        self.args.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TypedArgument> {
        self.args.iter().find(|arg| arg.name == name)
    }

    pub fn pointers(&self) -> impl Iterator<Item = &TypedArgument> {
        self.args.iter().filter(|arg| arg.ty.is_pointer())
    }

    pub fn globals(&self) -> impl Iterator<Item = &TypedArgument> {
        self.args.iter().filter(|arg| arg.scope.is_global())
    }

    /// Every unordered pair `(a_i, a_j)` with `i < j`
    pub fn pairs(&self) -> impl Iterator<Item = (&TypedArgument, &TypedArgument)> {
        self.args
            .iter()
            .enumerate()
            .flat_map(move |(i, a)| self.args[i + 1..].iter().map(move |b| (a, b)))
    }
}
