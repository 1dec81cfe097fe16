use crate::core::expression::{Expression, ExpressionError, Variables};

/// One combining rule per declared parameter, evaluated against the two
/// particles' values bound as `name1` and `name2`.
pub struct CombiningRules<E> {
    names: Vec<String>,
    suffixed: Vec<[String; 2]>,
    rules: Vec<E>,
}

impl<E: Expression> CombiningRules<E> {
    pub fn new(parameters: impl IntoIterator<Item = (String, E)>) -> Self {
        let (names, rules): (Vec<String>, Vec<E>) = parameters.into_iter().unzip();
        let suffixed = names
            .iter()
            .map(|name| [format!("{name}1"), format!("{name}2")])
            .collect();
        Self {
            names,
            suffixed,
            rules,
        }
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Computes the combined parameters of pair `(i, j)`.
    ///
    /// `scratch` must already hold the global parameters; the suffixed
    /// per-particle values are written over it. Results land in `out` under
    /// the unsuffixed names.
    pub fn combine(
        &self,
        i: usize,
        j: usize,
        particle_parameters: &[Vec<f64>],
        scratch: &mut Variables,
        out: &mut Variables,
    ) -> Result<(), ExpressionError> {
        let (params_i, params_j) = (&particle_parameters[i], &particle_parameters[j]);
        for ((names, &value_i), &value_j) in self.suffixed.iter().zip(params_i).zip(params_j) {
            set_variable(scratch, &names[0], value_i);
            set_variable(scratch, &names[1], value_j);
        }
        for (name, rule) in self.names.iter().zip(&self.rules) {
            let value = rule.evaluate(scratch)?;
            set_variable(out, name, value);
        }
        Ok(())
    }

    /// Binds already-combined values directly, as for an exception override.
    pub fn bind_combined(&self, values: &[f64], out: &mut Variables) {
        for (name, &value) in self.names.iter().zip(values) {
            set_variable(out, name, value);
        }
    }
}

#[inline]
pub(crate) fn set_variable(variables: &mut Variables, name: &str, value: f64) {
    match variables.get_mut(name) {
        Some(slot) => *slot = value,
        None => {
            variables.insert(name.to_string(), value);
        }
    }
}
