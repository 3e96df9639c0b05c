//! Dataset configuration and bias files
//!
//! Both formats are line oriented `key: value` files. Dataset files carry the
//! ground-truth precondition and the argument signature, bias files add the
//! template catalogue under `bias`.

use crate::error::ConfigError;
use crate::model::types::{ArgType, ArgumentModel, Scope};
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed configuration or bias file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// File the configuration was read from
    pub path: PathBuf,
    /// Ground-truth precondition in SMT-LIB syntax (`expr` or `precond`)
    pub precondition: Option<String>,
    /// Binary under analysis, informational only
    pub binary: Option<String>,
    pub nargs: usize,
    /// Typed arguments from `types` and `globals`
    pub arguments: ArgumentModel,
    /// Constraint template catalogue, in file order
    pub bias: Vec<String>,
}

impl Configuration {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse configuration text; `path` is only used for diagnostics
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut precondition = None;
        let mut binary = None;
        let mut nargs = None;
        let mut types = None;
        let mut scopes = None;
        let mut bias = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "expr" | "precond" => precondition = Some(value.to_string()),
                "bin" => binary = Some(value.to_string()),
                "nargs" => {
                    let n = value.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                        field: "nargs",
                        value: value.to_string(),
                    })?;
                    nargs = Some(n);
                }
                "types" => {
                    let parsed = split_list(value)
                        .map(str::parse::<ArgType>)
                        .collect::<Result<Vec<_>, _>>()?;
                    types = Some(parsed);
                }
                "globals" => {
                    let parsed = split_list(value)
                        .map(str::parse::<Scope>)
                        .collect::<Result<Vec<_>, _>>()?;
                    scopes = Some(parsed);
                }
                "bias" => bias = split_list(value).map(str::to_string).collect(),
                // Other keys belong to the engine
                _ => {}
            }
        }

        let nargs = nargs.ok_or_else(|| ConfigError::MissingField {
            field: "nargs",
            path: path.to_path_buf(),
        })?;
        let types = types.unwrap_or_else(|| vec![ArgType::SignedInt; nargs]);
        let scopes = scopes.unwrap_or_else(|| vec![Scope::Local; nargs]);

        if types.len() != nargs {
            return Err(ConfigError::LengthMismatch {
                field: "types",
                expected: nargs,
                found: types.len(),
            });
        }
        let arguments = ArgumentModel::new(&types, &scopes)?;

        Ok(Self {
            path: path.to_path_buf(),
            precondition,
            binary,
            nargs,
            arguments,
            bias,
        })
    }

    /// The ground-truth precondition, which dataset files must provide
    pub fn ground_truth(&self) -> Result<&str, ConfigError> {
        self.precondition
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "expr",
                path: self.path.clone(),
            })
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
