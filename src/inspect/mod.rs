//! Heuristics over a loaded [`Model`]: which inputs carry data, which constants look like input normalization, and how
//! wide the produced embedding probably is.

use std::collections::HashSet;

use crate::{
	model::{Model, TypeInfo, ValueInfo},
	tensor::{Dimension, ElementType, TensorData, TensorSpec, data_type},
	trace
};


/// The normalization constants of the common `(pixel - 127.5) / 128.0` preprocessing.
pub const DEFAULT_TARGETS: [f64; 2] = [127.5, 128.0];
/// Default absolute tolerance when comparing a constant to a target.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Describes a declared tensor. Never fails: unknown element types are labelled `unk(<code>)`, and dimensions that
/// carry neither a value nor a symbol become `?`.
///
/// Declarations that are not tensors (sequences, maps) or carry no type are described with element type code `0` and
/// an empty shape.
pub fn describe_tensor(decl: &ValueInfo) -> TensorSpec {
	let (elem_type, shape) = match &decl.ty {
		Some(TypeInfo::Tensor { elem_type, shape }) => (*elem_type, shape.as_deref().unwrap_or_default()),
		_ => (data_type::UNDEFINED, &[][..])
	};
	TensorSpec {
		name: decl.name.clone(),
		dtype: ElementType::from_code(elem_type),
		shape: shape.iter().map(Dimension::label).collect()
	}
}

/// Returns the model's data inputs, in declaration order.
///
/// Inputs that share their name with an initializer are bound weights rather than runtime inputs, and are left out.
pub fn classify_inputs(model: &Model) -> Vec<TensorSpec> {
	let initializers: HashSet<&str> = model.graph.initializers.iter().map(|i| i.name.as_str()).collect();
	model
		.graph
		.inputs
		.iter()
		.filter(|input| !initializers.contains(input.name.as_str()))
		.map(describe_tensor)
		.collect()
}

/// Configuration for [`find_preprocessing_hints`].
#[derive(Debug, Clone, PartialEq)]
pub struct HintOptions {
	targets: Vec<f64>,
	epsilon: f64
}

impl Default for HintOptions {
	fn default() -> Self {
		Self {
			targets: DEFAULT_TARGETS.to_vec(),
			epsilon: DEFAULT_EPSILON
		}
	}
}

impl HintOptions {
	/// Sets the constant values to look for. Defaults to [`DEFAULT_TARGETS`].
	#[must_use]
	pub fn with_targets(mut self, targets: impl IntoIterator<Item = f64>) -> Self {
		self.targets = targets.into_iter().collect();
		self
	}

	/// Sets the absolute tolerance. A negative epsilon matches nothing.
	#[must_use]
	pub fn with_epsilon(mut self, epsilon: f64) -> Self {
		self.epsilon = epsilon;
		self
	}

	pub fn targets(&self) -> &[f64] {
		&self.targets
	}

	pub fn epsilon(&self) -> f64 {
		self.epsilon
	}
}

/// A single-element initializer whose value is close to a normalization target.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingHint {
	pub name: String,
	pub value: f64
}

/// Scans single-element initializers for values within `epsilon` of one of the configured targets.
///
/// Hits follow initializer order, then target order. An initializer close to several targets is reported once per
/// target. Non-finite values are never reported. This is informational only: a model may hold such constants for
/// unrelated reasons.
pub fn find_preprocessing_hints(model: &Model, options: &HintOptions) -> Vec<PreprocessingHint> {
	let mut hits = Vec::new();
	for init in &model.graph.initializers {
		let Some(value) = init.scalar() else {
			if matches!(init.data, TensorData::External(_)) {
				trace!(name = %init.name, "skipping initializer whose payload was not read from external data");
			}
			continue;
		};
		if !value.is_finite() {
			trace!(name = %init.name, "skipping non-finite scalar initializer");
			continue;
		}
		for target in options.targets() {
			if (value - target).abs() <= options.epsilon() {
				hits.push(PreprocessingHint { name: init.name.clone(), value });
			}
		}
	}
	hits
}

/// Guesses the embedding width from the first declared output: the last dimension, scanning from the end, that is a
/// plain non-negative integer.
///
/// Typical embedding outputs are `[N, D]` or `[D]`, so `['?', '512']` gives `Some(512)`. Returns `None` if the model
/// has no outputs or no dimension qualifies.
pub fn guess_embedding_dimension(model: &Model) -> Option<u64> {
	let output = model.graph.outputs.first()?;
	describe_tensor(output).shape.iter().rev().find_map(|label| parse_dimension(label))
}

fn parse_dimension(label: &str) -> Option<u64> {
	if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	label.parse().ok()
}
