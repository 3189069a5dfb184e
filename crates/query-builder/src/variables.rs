use graphql_registry::TypeRef;
use indexmap::IndexMap;
use serde_json::Value;

use crate::BuildError;

const VARIABLE_PREFIX: &str = "v";

/// Owns variable numbering for one compilation.
///
/// Every bound argument value becomes `$v{n}` with `n` taken from a single
/// monotonically advancing counter, seeded by the caller so documents built
/// in sequence never reuse a name. The binder records the declaration and
/// the concrete value together, which is what keeps declarations and the
/// variables map in lockstep.
pub(crate) struct VariableBinder {
    counter: usize,
    declarations: Vec<Declaration>,
    values: IndexMap<String, Value>,
}

/// One `$name: type` pair of the operation header.
pub(crate) struct Declaration {
    pub name: String,
    pub ty: String,
}

impl VariableBinder {
    pub fn new(counter: usize) -> Self {
        VariableBinder {
            counter,
            declarations: Vec::new(),
            values: IndexMap::new(),
        }
    }

    /// Allocates the next variable for `value`, declared with the rendered
    /// wire type of `ty`. Returns the variable name without the `$` sigil.
    pub fn bind(&mut self, ty: &TypeRef, value: Value) -> Result<String, BuildError> {
        let rendered = ty.unwrapped()?.to_string();
        let name = format!("{VARIABLE_PREFIX}{}", self.counter);
        self.counter += 1;
        if !self
            .declarations
            .iter()
            .any(|declaration| declaration.name == name)
        {
            self.declarations.push(Declaration {
                name: name.clone(),
                ty: rendered,
            });
        }
        self.values.insert(name.clone(), value);
        Ok(name)
    }

    /// Where numbering ended: the value to thread into the next request.
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn into_values(self) -> IndexMap<String, Value> {
        self.values
    }
}
