//! Builds ONNX models for tests from the prost-generated `onnx.proto` types that `tract-onnx` exposes.

#![allow(dead_code)]

use std::path::PathBuf;

use prost::Message;
use tract_onnx::pb::{
	self,
	tensor_shape_proto::{Dimension, dimension},
	type_proto
};

pub const FLOAT: i32 = pb::tensor_proto::DataType::Float as i32;
pub const INT64: i32 = pb::tensor_proto::DataType::Int64 as i32;

#[derive(Clone, Copy)]
pub enum Dim<'s> {
	Value(i64),
	Param(&'s str),
	Unknown
}

/// `ValueInfoProto` for a tensor.
pub fn tensor_info(name: &str, elem_type: i32, dims: &[Dim<'_>]) -> pb::ValueInfoProto {
	let dim = dims
		.iter()
		.map(|dim| Dimension {
			value: match dim {
				Dim::Value(v) => Some(dimension::Value::DimValue(*v)),
				Dim::Param(p) => Some(dimension::Value::DimParam(p.to_string())),
				Dim::Unknown => None
			},
			..Default::default()
		})
		.collect();
	pb::ValueInfoProto {
		name: name.to_string(),
		r#type: Some(pb::TypeProto {
			value: Some(type_proto::Value::TensorType(type_proto::Tensor {
				elem_type,
				shape: Some(pb::TensorShapeProto { dim })
			})),
			..Default::default()
		}),
		..Default::default()
	}
}

/// `NodeProto` in the default domain.
pub fn node(op_type: &str, inputs: &[&str], outputs: &[&str]) -> pb::NodeProto {
	pb::NodeProto {
		op_type: op_type.to_string(),
		input: inputs.iter().map(|s| s.to_string()).collect(),
		output: outputs.iter().map(|s| s.to_string()).collect(),
		..Default::default()
	}
}

/// Little-endian bytes of `values`, as ONNX stores them in `raw_data` and in external data files.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
	values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// `TensorProto` holding `f32` values in `raw_data`.
pub fn f32_initializer(name: &str, dims: &[i64], values: &[f32]) -> pb::TensorProto {
	pb::TensorProto {
		name: name.to_string(),
		dims: dims.to_vec(),
		data_type: FLOAT,
		raw_data: f32_bytes(values).into(),
		..Default::default()
	}
}

/// `f32` `TensorProto` whose contents live in `location`, relative to the model file.
pub fn external_f32_initializer(name: &str, dims: &[i64], location: &str) -> pb::TensorProto {
	pb::TensorProto {
		name: name.to_string(),
		dims: dims.to_vec(),
		data_type: FLOAT,
		data_location: Some(pb::tensor_proto::DataLocation::External as i32),
		external_data: vec![pb::StringStringEntryProto {
			key: "location".to_string(),
			value: location.to_string()
		}],
		..Default::default()
	}
}

/// Serialized `ModelProto` with the given opset imports (`(domain, version)`) wrapping `graph`.
pub fn model(ir_version: i64, opsets: &[(&str, i64)], graph: pb::GraphProto) -> Vec<u8> {
	pb::ModelProto {
		ir_version,
		producer_name: "onnx-inspect-tests".to_string(),
		producer_version: "0.1".to_string(),
		opset_import: opsets
			.iter()
			.map(|(domain, version)| pb::OperatorSetIdProto {
				domain: domain.to_string(),
				version: *version
			})
			.collect(),
		graph: Some(graph),
		..Default::default()
	}
	.encode_to_vec()
}

/// The face-embedding network used across tests:
/// `embedding = Flatten(GlobalAveragePool(x - mean)) @ w`, with `w` also declared as a graph input. `batch` is the
/// leading dimension of both `x` and `embedding`.
pub fn face_embedding_graph(batch: Dim<'_>) -> pb::GraphProto {
	pb::GraphProto {
		name: "face_embedding".to_string(),
		node: vec![
			node("Sub", &["x", "mean"], &["centered"]),
			node("GlobalAveragePool", &["centered"], &["pooled"]),
			node("Flatten", &["pooled"], &["flat"]),
			node("MatMul", &["flat", "w"], &["embedding"]),
		],
		initializer: vec![f32_initializer("w", &[3, 512], &[0.01; 3 * 512]), f32_initializer("mean", &[], &[127.5])],
		input: vec![
			tensor_info("x", FLOAT, &[batch, Dim::Value(3), Dim::Value(112), Dim::Value(112)]),
			tensor_info("w", FLOAT, &[Dim::Value(3), Dim::Value(512)]),
		],
		output: vec![tensor_info("embedding", FLOAT, &[batch, Dim::Value(512)])],
		..Default::default()
	}
}

pub fn face_embedding_model() -> Vec<u8> {
	model(7, &[("", 13)], face_embedding_graph(Dim::Value(1)))
}

/// Writes `bytes` to a fresh file under the test target directory and returns its path.
pub fn write_model(name: &str, bytes: &[u8]) -> PathBuf {
	let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(format!("{name}.onnx"));
	std::fs::write(&path, bytes).expect("could not write test model");
	path
}

/// Like [`write_model`], but in a directory of its own next to the given external data files.
pub fn write_model_with_data(name: &str, bytes: &[u8], data: &[(&str, &[u8])]) -> PathBuf {
	let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
	std::fs::create_dir_all(&dir).expect("could not create test model directory");
	for (location, contents) in data {
		std::fs::write(dir.join(location), contents).expect("could not write external data");
	}
	let path = dir.join("model.onnx");
	std::fs::write(&path, bytes).expect("could not write test model");
	path
}
