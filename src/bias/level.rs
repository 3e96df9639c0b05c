//! Bias levels: how much of the template catalogue is offered to the engine

use crate::bias::instantiate::instantiate;
use crate::bias::template::ConstraintTemplate;
use crate::bias::translate::to_smtlib;
use crate::error::Error;
use crate::model::Configuration;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Catalogue used in the IJCAI'22 evaluation
pub const IJCAI22_CATALOGUE: [&str; 9] = [
    "Valid_X", "Alias_X_Y", "Deref_X_Y", "Eq_X_0", "LT_X_0", "GT_X_0", "Eq_X_Y", "LT_X_Y",
    "GT_X_Y",
];

/// Filtering strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiasLevel {
    /// Only the concrete atoms that occur in the ground truth
    Min,
    /// Templates having at least one atom that occurs in the ground truth
    Avg,
    /// The whole catalogue
    #[default]
    Max,
}

impl fmt::Display for BiasLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasLevel::Min => write!(f, "min"),
            BiasLevel::Avg => write!(f, "avg"),
            BiasLevel::Max => write!(f, "max"),
        }
    }
}

/// Compute the bias to hand to the engine for a configuration
///
/// Templates with a nonzero numeric literal are dataset-specific tuning and
/// are always retained. At `min`/`avg` an atom is kept when its translated
/// expression occurs verbatim in the ground-truth text; this is a syntactic
/// test, not an entailment check.
pub fn select_bias(
    conf: &Configuration,
    level: BiasLevel,
    ijcai22: bool,
) -> Result<Vec<String>, Error> {
    // Reject unknown families whatever the level
    let catalogue = conf
        .bias
        .iter()
        .map(|text| ConstraintTemplate::parse(text))
        .collect::<Result<Vec<_>, _>>()?;
    for template in &catalogue {
        debug!(%template, predicate = %template.predicate(), arity = template.arity(), "template accepted");
    }

    let additional: BTreeSet<String> = catalogue
        .iter()
        .filter(|t| t.has_nonzero_literal())
        .map(|t| t.text().to_string())
        .collect();

    let base: BTreeSet<String> = if ijcai22 {
        IJCAI22_CATALOGUE.iter().map(|t| t.to_string()).collect()
    } else {
        conf.bias.iter().cloned().collect()
    };

    match level {
        BiasLevel::Max if !ijcai22 => Ok(conf.bias.clone()),
        BiasLevel::Max => Ok(base.union(&additional).cloned().collect()),
        BiasLevel::Min | BiasLevel::Avg => {
            let templates = base
                .union(&additional)
                .map(|t| ConstraintTemplate::parse(t))
                .collect::<Result<Vec<_>, _>>()?;
            let ground_truth = conf.ground_truth()?;

            let mut selected = BTreeSet::new();
            for instance in instantiate(&templates, &conf.arguments) {
                let expr = to_smtlib(&instance.atom, &conf.arguments)?;
                if ground_truth.contains(&expr) {
                    selected.insert(if level == BiasLevel::Avg {
                        instance.template
                    } else {
                        instance.atom
                    });
                }
            }
            Ok(selected.into_iter().collect())
        }
    }
}

/// Render a bias in the tool's output format
pub fn format_bias(bias: &[String]) -> String {
    format!("bias: {}", bias.join(", "))
}
