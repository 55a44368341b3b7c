//! Copying one record from the extractor into the loader.

use std::collections::BTreeMap;

use crate::extract::Extract;
use crate::load::Load;

use super::{Constant, Mapping};

/// Fill the loader's in-progress record for the extractor's current record.
///
/// Constants go first and mapped fields second, so a mapped field always wins over a constant
/// with the same destination name.
pub(crate) fn apply<'a>(
    extract: &(dyn Extract + 'a),
    load: &mut (dyn Load + 'a),
    mapping: &BTreeMap<String, Mapping<'a>>,
    constants: &BTreeMap<String, Constant<'a>>,
) {
    for (field, constant) in constants {
        let value = match constant {
            Constant::Value(v) => v.clone(),
            Constant::Compute(f) => f(&*load),
        };
        load.set(field, value);
    }

    for (field, mapped) in mapping {
        let value = match mapped {
            Mapping::Field(id) => extract.get(id).clone(),
            Mapping::Compute(f) => f(extract),
        };
        load.set(field, value);
    }
}
