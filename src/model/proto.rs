use tract_onnx::{
	Onnx,
	pb::{self, tensor_shape_proto::dimension, type_proto},
	prelude::Framework
};

use super::{Graph, Initializer, Model, Node, Opset, TypeInfo, ValueInfo};
use crate::{
	Error, ErrorCode, Result,
	tensor::{Dimension, ExternalData, TensorData}
};

/// Decodes a serialized `ModelProto`.
pub(super) fn decode(onnx: &Onnx, mut bytes: &[u8]) -> Result<pb::ModelProto> {
	onnx.proto_model_for_read(&mut bytes)
		.map_err(|e| Error::new(ErrorCode::InvalidProtobuf, format!("not a valid ONNX model: {e:#}")))
}

impl TryFrom<&pb::ModelProto> for Model {
	type Error = Error;

	fn try_from(proto: &pb::ModelProto) -> Result<Self> {
		let graph = proto
			.graph
			.as_ref()
			.ok_or_else(|| Error::new(ErrorCode::InvalidGraph, "model does not contain a graph"))?;
		Ok(Model {
			ir_version: proto.ir_version,
			opsets: proto.opset_import.iter().map(|op| Opset::new(op.domain.clone(), op.version)).collect(),
			producer_name: proto.producer_name.clone(),
			producer_version: proto.producer_version.clone(),
			domain: proto.domain.clone(),
			model_version: proto.model_version,
			metadata: proto.metadata_props.iter().map(|p| (p.key.clone(), p.value.clone())).collect(),
			graph: Graph::from(graph),
			source: None
		})
	}
}

impl From<&pb::GraphProto> for Graph {
	fn from(graph: &pb::GraphProto) -> Self {
		Graph {
			name: graph.name.clone(),
			inputs: graph.input.iter().map(ValueInfo::from).collect(),
			outputs: graph.output.iter().map(ValueInfo::from).collect(),
			nodes: graph.node.iter().map(Node::from).collect(),
			initializers: graph.initializer.iter().map(Initializer::from).collect()
		}
	}
}

impl From<&pb::ValueInfoProto> for ValueInfo {
	fn from(vi: &pb::ValueInfoProto) -> Self {
		let ty = vi.r#type.as_ref().and_then(|t| t.value.as_ref()).map(|value| match value {
			type_proto::Value::TensorType(tensor) => TypeInfo::Tensor {
				elem_type: tensor.elem_type,
				shape: tensor.shape.as_ref().map(|s| s.dim.iter().map(Dimension::from).collect())
			},
			#[allow(unreachable_patterns)]
			_ => TypeInfo::Other
		});
		ValueInfo { name: vi.name.clone(), ty }
	}
}

impl From<&pb::tensor_shape_proto::Dimension> for Dimension {
	fn from(dim: &pb::tensor_shape_proto::Dimension) -> Self {
		match &dim.value {
			Some(dimension::Value::DimValue(v)) => Dimension::Value(*v),
			Some(dimension::Value::DimParam(p)) if !p.is_empty() => Dimension::Param(p.clone()),
			_ => Dimension::Unknown
		}
	}
}

impl From<&pb::NodeProto> for Node {
	fn from(node: &pb::NodeProto) -> Self {
		Node {
			name: node.name.clone(),
			op_type: node.op_type.clone(),
			domain: node.domain.clone(),
			inputs: node.input.clone(),
			outputs: node.output.clone()
		}
	}
}

impl From<&pb::TensorProto> for Initializer {
	fn from(t: &pb::TensorProto) -> Self {
		let data = if t.data_location == Some(pb::tensor_proto::DataLocation::External as i32) {
			TensorData::External(external_data(t))
		} else if !t.raw_data.is_empty() {
			TensorData::Raw(t.raw_data.to_vec())
		} else if !t.float_data.is_empty() {
			TensorData::Float(t.float_data.clone())
		} else if !t.int32_data.is_empty() {
			TensorData::Int32(t.int32_data.clone())
		} else if !t.int64_data.is_empty() {
			TensorData::Int64(t.int64_data.clone())
		} else if !t.double_data.is_empty() {
			TensorData::Double(t.double_data.clone())
		} else if !t.uint64_data.is_empty() {
			TensorData::Uint64(t.uint64_data.clone())
		} else if !t.string_data.is_empty() {
			TensorData::Strings(t.string_data.len())
		} else {
			TensorData::Empty
		};
		Initializer {
			name: t.name.clone(),
			data_type: t.data_type,
			dims: t.dims.clone(),
			data
		}
	}
}

/// Reads the `location`/`offset`/`length` entries of an externally stored tensor. Unparseable numbers are ignored.
fn external_data(t: &pb::TensorProto) -> ExternalData {
	let mut external = ExternalData::default();
	for entry in &t.external_data {
		match entry.key.as_str() {
			"location" => external.location = entry.value.clone(),
			"offset" => external.offset = entry.value.parse().unwrap_or_default(),
			"length" => external.length = entry.value.parse().ok(),
			_ => {}
		}
	}
	external
}
