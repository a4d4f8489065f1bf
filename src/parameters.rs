//! Named parameter registry shared by projections, orientations, cameras and rigs.
//!
//! Every geometric component stores its raw values in a [`ParameterSet`]: an
//! ordered list of named [`Parameter`]s carrying a value, a default, optional
//! bounds, a kind tag and a fit state. Components that cache derived values
//! (the pixel focal length of a projection, the rotation matrix of an
//! orientation) recompute them inside [`Parametrized::set_parameter`] before
//! returning, so derived state is never observed stale.
//!
//! The fit protocol relies on one ordering rule: the names returned by
//! [`ParameterSet::fit_parameter_names`] are in set order, and
//! [`Parametrized::set_fit_parameters`] writes values in the order of the names
//! it is given.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::CameraError;

/// Whether a parameter describes the camera itself or its pose in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Lens, sensor or image property.
    Intrinsic,
    /// Position or rotation of the camera.
    Extrinsic,
}

/// Where the current value of a parameter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterState {
    /// Never set; the value equals the default.
    Default,
    /// Set explicitly by the user or loaded from a file.
    UserDefined,
    /// Selected for fitting; the fit may overwrite the value.
    Fit,
}

/// A named scalar with its default, bounds, kind and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Current value.
    pub value: f64,
    /// Value used when none was supplied.
    pub default: f64,
    /// Optional lower and upper bound used when fitting.
    pub range: (Option<f64>, Option<f64>),
    /// Intrinsic or extrinsic.
    pub kind: ParameterKind,
    /// Origin of the current value.
    pub state: ParameterState,
}

impl Parameter {
    /// Creates a parameter from an optional user value and a default.
    ///
    /// The state is [`ParameterState::UserDefined`] when `value` is given and
    /// [`ParameterState::Default`] otherwise.
    pub fn new(value: Option<f64>, default: f64, kind: ParameterKind) -> Self {
        let (value, state) = match value {
            Some(v) => (v, ParameterState::UserDefined),
            None => (default, ParameterState::Default),
        };
        Parameter {
            value,
            default,
            range: (None, None),
            kind,
            state,
        }
    }

    /// Attaches fit bounds. `None` leaves the side unbounded.
    pub fn with_range(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.range = (lower, upper);
        self
    }

    /// Bounds with missing sides replaced by infinities.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.range.0.unwrap_or(f64::NEG_INFINITY),
            self.range.1.unwrap_or(f64::INFINITY),
        )
    }
}

/// Ordered collection of uniquely named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, Parameter)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter. Fails if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, parameter: Parameter) -> Result<(), CameraError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(CameraError::InvalidParams(format!(
                "duplicate parameter name '{name}'"
            )));
        }
        self.entries.push((name, parameter));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Parameter names in set order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Parameter, CameraError> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
            .ok_or_else(|| CameraError::UnknownParameter(name.to_string()))
    }

    /// Current value of `name`.
    pub fn value(&self, name: &str) -> Result<f64, CameraError> {
        self.get(name)
            .map(|p| p.value)
            .ok_or_else(|| CameraError::UnknownParameter(name.to_string()))
    }

    /// Writes a value. A parameter still in its default state becomes user defined.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), CameraError> {
        let parameter = self.get_mut(name)?;
        parameter.value = value;
        if parameter.state == ParameterState::Default {
            parameter.state = ParameterState::UserDefined;
        }
        Ok(())
    }

    pub fn set_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError> {
        self.get_mut(name)?.state = state;
        Ok(())
    }

    /// Names of the parameters selected for fitting, in set order.
    pub fn fit_parameter_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, p)| p.state == ParameterState::Fit)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Names of all parameters of the given kind, in set order.
    pub fn names_of_kind(&self, kind: ParameterKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, p)| p.kind == kind)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Bounds of the named parameters, in the order of `names`.
    pub fn parameter_ranges(&self, names: &[String]) -> Result<Vec<(f64, f64)>, CameraError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .map(Parameter::bounds)
                    .ok_or_else(|| CameraError::UnknownParameter(name.clone()))
            })
            .collect()
    }

    /// Current values of the named parameters, used as initial fit estimates.
    pub fn parameter_defaults(&self, names: &[String]) -> Result<Vec<f64>, CameraError> {
        names.iter().map(|name| self.value(name)).collect()
    }

    /// Copy of the set with every name prefixed by `prefix`.
    pub fn prefixed(&self, prefix: &str) -> ParameterSet {
        ParameterSet {
            entries: self
                .entries
                .iter()
                .map(|(n, p)| (format!("{prefix}{n}"), p.clone()))
                .collect(),
        }
    }

    /// Flat name to value mapping, the persisted shape.
    pub fn to_values(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|(n, p)| (n.clone(), p.value))
            .collect()
    }
}

/// Collects `(name, parameter)` pairs; a repeated name replaces the earlier entry.
impl FromIterator<(String, Parameter)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Parameter)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (name, parameter) in iter {
            match set.entries.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = parameter,
                None => set.entries.push((name, parameter)),
            }
        }
        set
    }
}

fn check_fit_lengths(names: &[String], values: &[f64]) -> Result<(), CameraError> {
    if names.len() != values.len() {
        return Err(CameraError::InvalidParams(format!(
            "got {} values for {} parameters",
            values.len(),
            names.len()
        )));
    }
    Ok(())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Common interface of everything that owns named parameters.
///
/// Implementors recompute their derived state inside `set_parameter`. The
/// provided methods build the fit protocol and flat-file persistence on top
/// of the three required ones.
pub trait Parametrized {
    /// Snapshot of all parameters, in a stable order.
    fn parameter_set(&self) -> ParameterSet;

    /// Writes one parameter and refreshes any derived state.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), CameraError>;

    /// Changes the state of one parameter, e.g. to select it for fitting.
    fn set_parameter_state(&mut self, name: &str, state: ParameterState) -> Result<(), CameraError>;

    fn get_parameter(&self, name: &str) -> Result<f64, CameraError> {
        self.parameter_set().value(name)
    }

    /// Writes `values[i]` into `names[i]` through [`Parametrized::set_parameter`].
    fn set_fit_parameters(&mut self, names: &[String], values: &[f64]) -> Result<(), CameraError> {
        check_fit_lengths(names, values)?;
        for (name, &value) in names.iter().zip(values) {
            self.set_parameter(name, value)?;
        }
        Ok(())
    }

    /// Selects the named parameters for the next fit.
    fn mark_for_fit(&mut self, names: &[&str]) -> Result<(), CameraError> {
        for name in names {
            self.set_parameter_state(name, ParameterState::Fit)?;
        }
        Ok(())
    }

    /// Selects every parameter of `kind` for the next fit.
    fn mark_kind_for_fit(&mut self, kind: ParameterKind) -> Result<(), CameraError> {
        for name in self.parameter_set().names_of_kind(kind) {
            self.set_parameter_state(&name, ParameterState::Fit)?;
        }
        Ok(())
    }

    /// Writes all parameter values as a flat mapping.
    ///
    /// The file is YAML when the extension is `yaml` or `yml`, JSON otherwise.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let values = self.parameter_set().to_values();
        let contents = if is_yaml(path) {
            serde_yaml::to_string(&values)?
        } else {
            serde_json::to_string_pretty(&values)?
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        debug!("saved {} parameters to {}", values.len(), path.display());
        Ok(())
    }

    /// Reads a flat mapping written by [`Parametrized::save`] and applies every entry.
    ///
    /// Nothing is written unless every key names a known parameter.
    fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CameraError>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let values: BTreeMap<String, f64> = if is_yaml(path) {
            serde_yaml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        let known = self.parameter_set();
        if let Some(unknown) = values.keys().find(|name| !known.contains(name.as_str())) {
            return Err(CameraError::UnknownParameter(unknown.clone()));
        }
        for (name, value) in &values {
            self.set_parameter(name, *value)?;
        }
        debug!("loaded {} parameters from {}", values.len(), path.display());
        Ok(())
    }
}
