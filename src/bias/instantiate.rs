//! Instantiation of constraint templates over typed arguments

use crate::bias::template::{Binding, ConstraintTemplate};
use crate::model::ArgumentModel;
use std::collections::BTreeSet;

/// A concrete atom together with the template it came from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instance {
    /// Template text, e.g. `Alias_X_Y`
    pub template: String,
    /// Concrete atom, e.g. `Alias_v0_v2`
    pub atom: String,
}

/// Bind every template to every type-compatible argument or argument pair
///
/// Pairs are unordered and taken in argument order, so `Alias_X_Y` over
/// pointers `v0, v1` yields `Alias_v0_v1` only. Signed and unsigned
/// integers are never paired with each other.
pub fn instantiate(templates: &[ConstraintTemplate], args: &ArgumentModel) -> BTreeSet<Instance> {
    let mut instances = BTreeSet::new();

    for template in templates {
        let atoms: Vec<String> = match template.binding() {
            Binding::EachPointer => args
                .pointers()
                .map(|a| template.bind(&[a.name.as_str()]))
                .collect(),
            Binding::EachInteger => args
                .iter()
                .filter(|a| a.ty.is_integer())
                .map(|a| template.bind(&[a.name.as_str()]))
                .collect(),
            Binding::PointerPairs => args
                .pairs()
                .filter(|(a, b)| a.ty.is_pointer() && b.ty.is_pointer())
                .map(|(a, b)| template.bind(&[a.name.as_str(), b.name.as_str()]))
                .collect(),
            Binding::SameSignPairs => args
                .pairs()
                .filter(|(a, b)| a.ty.is_integer() && a.ty == b.ty)
                .map(|(a, b)| template.bind(&[a.name.as_str(), b.name.as_str()]))
                .collect(),
        };

        instances.extend(atoms.into_iter().map(|atom| Instance {
            template: template.text().to_string(),
            atom,
        }));
    }

    instances
}
