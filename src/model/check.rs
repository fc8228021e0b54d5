use std::{
	collections::{HashMap, HashSet},
	path::Path
};

use tract_onnx::{Onnx, pb};

use super::{Model, normalize_domain};
use crate::{Error, ErrorCode, Result, debug, trace};

/// Structural checks on a converted model: format version, opset coverage, typed IO, and name resolution.
///
/// ONNX requires nodes to be listed in topological order, so every node input must be produced by a graph input, an
/// initializer, or an earlier node. A reference to a later node's output therefore means the node dependencies are
/// cyclic (or at least unsorted).
pub(super) fn check_model(model: &Model) -> Result<()> {
	if model.ir_version <= 0 {
		return Err(Error::new(ErrorCode::InvalidGraph, "model does not have an ir_version set"));
	}

	if model.opsets.is_empty() {
		return Err(Error::new(ErrorCode::InvalidOpset, "model does not declare any opset imports"));
	}
	let domains: HashSet<&str> = model.opsets.iter().map(|o| o.domain_name()).collect();
	for (i, node) in model.graph.nodes.iter().enumerate() {
		let domain = normalize_domain(&node.domain);
		if !domains.contains(domain) {
			return Err(Error::new(
				ErrorCode::InvalidOpset,
				format!("node {} uses domain `{domain}`, which has no opset import", node.display_name(i))
			));
		}
	}

	let graph = &model.graph;
	for (kind, decls) in [("input", &graph.inputs), ("output", &graph.outputs)] {
		if let Some(decl) = decls.iter().find(|d| d.ty.is_none()) {
			return Err(Error::new(ErrorCode::InvalidGraph, format!("graph {kind} `{}` has no type", decl.name)));
		}
	}

	let mut defined: HashSet<&str> = HashSet::new();
	for input in &graph.inputs {
		if !defined.insert(&input.name) {
			return Err(duplicate(&input.name));
		}
	}
	let mut initializers: HashSet<&str> = HashSet::new();
	for init in &graph.initializers {
		if !initializers.insert(&init.name) {
			return Err(duplicate(&init.name));
		}
		// an initializer may share its name with a graph input; that input is then a bound weight
		defined.insert(&init.name);
	}

	let mut producers: HashMap<&str, usize> = HashMap::new();
	for (i, node) in graph.nodes.iter().enumerate() {
		for output in node.outputs.iter().filter(|o| !o.is_empty()) {
			if defined.contains(output.as_str()) || producers.insert(output, i).is_some() {
				return Err(duplicate(output));
			}
		}
	}

	for (i, node) in graph.nodes.iter().enumerate() {
		for input in node.inputs.iter().filter(|o| !o.is_empty()) {
			if defined.contains(input.as_str()) {
				continue;
			}
			let message = match producers.get(input.as_str()) {
				Some(&producer) => format!(
					"node {} consumes `{input}` before node {} produces it (cyclic or unsorted node dependencies)",
					node.display_name(i),
					graph.nodes[producer].display_name(producer)
				),
				None => format!("node {} references undefined value `{input}`", node.display_name(i))
			};
			return Err(Error::new(ErrorCode::InvalidGraph, message));
		}
		defined.extend(node.outputs.iter().filter(|o| !o.is_empty()).map(String::as_str));
		trace!(node = i, op_type = %node.op_type, "node inputs resolved");
	}

	if let Some(output) = graph.outputs.iter().find(|o| !defined.contains(o.name.as_str())) {
		return Err(Error::new(ErrorCode::InvalidGraph, format!("graph output `{}` is never produced", output.name)));
	}

	debug!(nodes = graph.nodes.len(), initializers = graph.initializers.len(), "structural checks passed");
	Ok(())
}

fn duplicate(name: &str) -> Error {
	Error::new(ErrorCode::InvalidGraph, format!("value `{name}` is defined more than once"))
}

/// Has `tract` build its inference graph from the protobuf, surfacing anything it cannot resolve.
///
/// External tensor data is resolved against `model_dir`; without one, a model that uses external data is rejected.
pub(super) fn check_with_framework(onnx: &Onnx, proto: &pb::ModelProto, model_dir: Option<&Path>) -> Result<()> {
	let model_dir = model_dir.map(|dir| dir.to_string_lossy());
	let parsed = onnx
		.parse(proto, model_dir.as_deref())
		.map_err(|e| Error::new(ErrorCode::InvalidGraph, format!("graph could not be built: {e:#}")))?;
	if !parsed.unresolved_inputs.is_empty() {
		return Err(Error::new(
			ErrorCode::InvalidGraph,
			format!("graph could not be built: could not resolve inputs {}", parsed.unresolved_inputs.join(", "))
		));
	}
	debug!("graph built by tract");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::check_model;
	use crate::{
		ErrorCode,
		model::{Graph, Initializer, Model, Node, Opset, ValueInfo},
		tensor::{Dimension, TensorData, data_type}
	};

	fn model(graph: Graph) -> Model {
		Model {
			ir_version: 7,
			opsets: vec![Opset::new("", 13)],
			graph,
			..Model::default()
		}
	}

	fn float(name: &str) -> ValueInfo {
		ValueInfo::tensor(name, data_type::FLOAT, [Dimension::Value(1)])
	}

	fn scalar(name: &str) -> Initializer {
		Initializer {
			name: name.to_string(),
			data_type: data_type::FLOAT,
			dims: vec![],
			data: TensorData::Float(vec![1.0])
		}
	}

	fn chain() -> Graph {
		Graph {
			inputs: vec![float("x"), float("w")],
			outputs: vec![float("y")],
			nodes: vec![Node::new("Sub", ["x", "mean"], ["centered"]), Node::new("Mul", ["centered", "w"], ["y"])],
			initializers: vec![scalar("w"), scalar("mean")],
			..Graph::default()
		}
	}

	#[test]
	fn test_valid_graph() {
		assert!(check_model(&model(chain())).is_ok());
	}

	#[test]
	fn test_missing_ir_version() {
		let m = Model { ir_version: 0, ..model(chain()) };
		assert_eq!(check_model(&m).unwrap_err().code(), ErrorCode::InvalidGraph);
	}

	#[test]
	fn test_opset_coverage() {
		let m = Model { opsets: vec![], ..model(chain()) };
		assert_eq!(check_model(&m).unwrap_err().code(), ErrorCode::InvalidOpset);

		let mut graph = chain();
		graph.nodes[1].domain = "com.microsoft".to_string();
		let err = check_model(&model(graph)).unwrap_err();
		assert_eq!(err.code(), ErrorCode::InvalidOpset);
		assert!(err.message().contains("com.microsoft"));

		let mut graph = chain();
		graph.nodes[0].domain = "ai.onnx".to_string();
		assert!(check_model(&model(graph)).is_ok());
	}

	#[test]
	fn test_dangling_reference() {
		let mut graph = chain();
		graph.nodes[0].inputs[1] = "ghost".to_string();
		let err = check_model(&model(graph)).unwrap_err();
		assert_eq!(err.code(), ErrorCode::InvalidGraph);
		assert!(err.message().contains("undefined value `ghost`"));
	}

	#[test]
	fn test_cyclic_dependency() {
		let graph = Graph {
			inputs: vec![float("x")],
			outputs: vec![float("b")],
			nodes: vec![Node::new("Add", ["x", "b"], ["a"]), Node::new("Relu", ["a"], ["b"])],
			..Graph::default()
		};
		let err = check_model(&model(graph)).unwrap_err();
		assert_eq!(err.code(), ErrorCode::InvalidGraph);
		assert!(err.message().contains("cyclic"));
	}

	#[test]
	fn test_duplicate_definitions() {
		let mut graph = chain();
		graph.nodes[1].outputs = vec!["centered".to_string()];
		assert_eq!(check_model(&model(graph)).unwrap_err().code(), ErrorCode::InvalidGraph);

		let mut graph = chain();
		graph.initializers.push(scalar("mean"));
		assert!(check_model(&model(graph)).unwrap_err().message().contains("more than once"));
	}

	#[test]
	fn test_untyped_and_unproduced_outputs() {
		let mut graph = chain();
		graph.outputs[0].ty = None;
		assert!(check_model(&model(graph)).unwrap_err().message().contains("has no type"));

		let mut graph = chain();
		graph.outputs.push(float("z"));
		assert!(check_model(&model(graph)).unwrap_err().message().contains("never produced"));
	}

	#[test]
	fn test_optional_inputs_are_skipped() {
		let mut graph = chain();
		graph.nodes[1].inputs.push(String::new());
		assert!(check_model(&model(graph)).is_ok());
	}
}
