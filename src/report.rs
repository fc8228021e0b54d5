use std::fmt;

use crate::{
	inspect::{self, HintOptions, PreprocessingHint},
	model::Model,
	tensor::TensorSpec
};

/// Everything printed about a model, gathered in one pass.
///
/// The [`Display`](fmt::Display) implementation renders the sections in a fixed order: model info, data inputs,
/// outputs, graph summary, preprocessing hints, and (only when a guess exists) the embedding dimension.
#[derive(Debug)]
pub struct Report<'m> {
	model: &'m Model,
	inputs: Vec<TensorSpec>,
	outputs: Vec<TensorSpec>,
	hints: Vec<PreprocessingHint>,
	embedding_dimension: Option<u64>
}

impl<'m> Report<'m> {
	pub fn new(model: &'m Model, options: &HintOptions) -> Self {
		Self {
			model,
			inputs: inspect::classify_inputs(model),
			outputs: model.graph.outputs.iter().map(inspect::describe_tensor).collect(),
			hints: inspect::find_preprocessing_hints(model, options),
			embedding_dimension: inspect::guess_embedding_dimension(model)
		}
	}

	/// Data inputs, with initializer-bound weights removed.
	pub fn inputs(&self) -> &[TensorSpec] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[TensorSpec] {
		&self.outputs
	}

	pub fn hints(&self) -> &[PreprocessingHint] {
		&self.hints
	}

	pub fn embedding_dimension(&self) -> Option<u64> {
		self.embedding_dimension
	}

	fn fmt_info(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let model = self.model;
		writeln!(f, "=== ONNX MODEL INFO ===")?;
		if let Some(source) = &model.source {
			writeln!(f, "file        : {}", source.path.display())?;
			writeln!(f, "size        : {} bytes", source.size)?;
			writeln!(f, "sha256      : {}", source.sha256)?;
		}
		writeln!(f, "ir_version  : {}", model.ir_version)?;
		let opsets: Vec<String> = model.opset_versions().iter().map(|(domain, version)| format!("{domain}={version}")).collect();
		writeln!(f, "opsets      : {}", opsets.join(", "))?;

		if !model.producer_name.is_empty() {
			if model.producer_version.is_empty() {
				writeln!(f, "producer    : {}", model.producer_name)?;
			} else {
				writeln!(f, "producer    : {} {}", model.producer_name, model.producer_version)?;
			}
		}
		if !model.graph.name.is_empty() {
			writeln!(f, "graph       : {}", model.graph.name)?;
		}
		if model.model_version != 0 {
			writeln!(f, "model_version: {}", model.model_version)?;
		}
		if !model.domain.is_empty() {
			writeln!(f, "domain      : {}", model.domain)?;
		}
		for (key, value) in &model.metadata {
			writeln!(f, "meta        : {key}={value}")?;
		}
		Ok(())
	}
}

impl fmt::Display for Report<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.fmt_info(f)?;

		writeln!(f, "\n--- INPUTS (data tensors) ---")?;
		if self.inputs.is_empty() {
			writeln!(f, "(no data inputs found; model may use dynamic IO or all inputs folded)")?;
		}
		for (i, spec) in self.inputs.iter().enumerate() {
			writeln!(f, "[{i}] {spec}")?;
		}

		writeln!(f, "\n--- OUTPUTS ---")?;
		for (i, spec) in self.outputs.iter().enumerate() {
			writeln!(f, "[{i}] {spec}")?;
		}

		let graph = &self.model.graph;
		writeln!(f, "\n--- GRAPH SUMMARY ---")?;
		writeln!(
			f,
			"nodes: {}  initializers: {}  parameters: {}",
			graph.nodes.len(),
			graph.initializers.len(),
			self.model.parameter_count()
		)?;

		writeln!(f, "\n--- PREPROCESS HINTS ---")?;
		if self.hints.is_empty() {
			writeln!(f, "no typical 127.5/128 constants found; preprocessing is probably done outside the model")?;
		} else {
			for hint in &self.hints {
				writeln!(f, "const initializer near preprocessing: {} ≈ {:?}", hint.name, hint.value)?;
			}
			writeln!(f, "note: the model may already apply (img - 127.5) / 128 internally")?;
		}

		if let Some(dim) = self.embedding_dimension {
			writeln!(f, "\n--- EMBEDDING GUESS ---")?;
			writeln!(f, "embedding dimension (guess) : {dim}")?;
		}
		Ok(())
	}
}
