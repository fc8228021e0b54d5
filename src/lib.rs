#![warn(clippy::unwrap_used)]

//! `onnx_inspect` reads an ONNX model file and summarizes what an integrator needs to know before wiring it up: the
//! data inputs it expects (with bound weights filtered out), its outputs, opset versions, graph size, whether
//! input-normalization constants such as `127.5`/`128.0` are baked into the graph, and a guess at the embedding width.
//!
//! ```no_run
//! use onnx_inspect::{HintOptions, Model, Report};
//!
//! # fn main() -> onnx_inspect::Result<()> {
//! let model = Model::load("arcface.onnx")?;
//! print!("{}", Report::new(&model, &HintOptions::default()));
//! # Ok(())
//! # }
//! ```
//!
//! Parsing is delegated to the protobuf types of [`tract_onnx`]; after parsing, the graph is checked for dangling
//! references, cyclic node dependencies and missing opset imports, then handed to `tract` to build its inference
//! graph. Any of these failing is reported as an [`Error`] of kind [`ErrorKind::Validation`].

pub mod error;
pub mod inspect;
pub mod logging;
pub mod model;
pub mod report;
pub mod tensor;

pub(crate) use self::logging::{debug, info, trace, warning as warn};
pub use self::{
	error::{Error, ErrorCode, ErrorKind, Result},
	inspect::{HintOptions, PreprocessingHint, classify_inputs, describe_tensor, find_preprocessing_hints, guess_embedding_dimension},
	model::Model,
	report::Report,
	tensor::{Dimension, ElementType, ExternalData, TensorSpec}
};

/// Loads the model at `path` and builds its report with the default hint options.
///
/// This is what the `inspect` binary prints.
pub fn inspect_file(path: impl AsRef<std::path::Path>) -> Result<String> {
	let model = Model::load(path)?;
	if model.graph.outputs.is_empty() {
		warn!("model declares no outputs");
	}
	Ok(Report::new(&model, &HintOptions::default()).to_string())
}
