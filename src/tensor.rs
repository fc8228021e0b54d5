use std::fmt;

use half::{bf16, f16};

/// Raw `TensorProto.DataType` codes, as they appear in the ONNX protobuf.
pub mod data_type {
	pub const UNDEFINED: i32 = 0;
	pub const FLOAT: i32 = 1;
	pub const UINT8: i32 = 2;
	pub const INT8: i32 = 3;
	pub const UINT16: i32 = 4;
	pub const INT16: i32 = 5;
	pub const INT32: i32 = 6;
	pub const INT64: i32 = 7;
	pub const STRING: i32 = 8;
	pub const BOOL: i32 = 9;
	pub const FLOAT16: i32 = 10;
	pub const DOUBLE: i32 = 11;
	pub const UINT32: i32 = 12;
	pub const UINT64: i32 = 13;
	pub const COMPLEX64: i32 = 14;
	pub const COMPLEX128: i32 = 15;
	pub const BFLOAT16: i32 = 16;
}

/// Element type of a declared tensor, as labelled in the report.
///
/// Only the common numeric types get a name; every other code is kept as [`ElementType::Unknown`] and rendered as
/// `unk(<code>)`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ElementType {
	Float32,
	Uint8,
	Int8,
	Uint16,
	Int16,
	Int32,
	Int64,
	Bool,
	Float16,
	Float64,
	Unknown(i32)
}

const ELEMENT_TYPES: [(i32, ElementType, &str); 10] = [
	(data_type::FLOAT, ElementType::Float32, "float32"),
	(data_type::UINT8, ElementType::Uint8, "uint8"),
	(data_type::INT8, ElementType::Int8, "int8"),
	(data_type::UINT16, ElementType::Uint16, "uint16"),
	(data_type::INT16, ElementType::Int16, "int16"),
	(data_type::INT32, ElementType::Int32, "int32"),
	(data_type::INT64, ElementType::Int64, "int64"),
	(data_type::BOOL, ElementType::Bool, "bool"),
	(data_type::FLOAT16, ElementType::Float16, "float16"),
	(data_type::DOUBLE, ElementType::Float64, "float64")
];

impl ElementType {
	/// Looks up the element type for a raw `TensorProto.DataType` code.
	pub fn from_code(code: i32) -> Self {
		ELEMENT_TYPES
			.iter()
			.find(|(c, ..)| *c == code)
			.map_or(ElementType::Unknown(code), |(_, ty, _)| *ty)
	}

	/// Returns the raw `TensorProto.DataType` code of this element type.
	pub fn code(&self) -> i32 {
		match self {
			ElementType::Unknown(code) => *code,
			known => ELEMENT_TYPES.iter().find(|(_, ty, _)| ty == known).map_or(data_type::UNDEFINED, |(c, ..)| *c)
		}
	}
}

impl fmt::Display for ElementType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ElementType::Unknown(code) => write!(f, "unk({code})"),
			known => match ELEMENT_TYPES.iter().find(|(_, ty, _)| ty == known) {
				Some((.., label)) => f.write_str(label),
				None => write!(f, "unk({})", self.code())
			}
		}
	}
}

/// A single dimension of a declared tensor shape.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Dimension {
	/// A static dimension.
	Value(i64),
	/// A symbolic dimension, sized at run time (e.g. `batch`).
	Param(String),
	/// Neither a value nor a symbol was recorded.
	Unknown
}

impl Dimension {
	/// Renders the dimension as it appears in a shape: its decimal value, its symbol, or `?`.
	pub fn label(&self) -> String {
		match self {
			Dimension::Value(v) => v.to_string(),
			Dimension::Param(p) if !p.is_empty() => p.clone(),
			_ => String::from("?")
		}
	}
}

/// A declared tensor described for display: name, element type and dimension labels.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TensorSpec {
	pub name: String,
	pub dtype: ElementType,
	pub shape: Vec<String>
}

impl TensorSpec {
	/// Renders the shape as a bracketed list of quoted labels, e.g. `['N', '3', '112', '112']`.
	pub fn shape_string(&self) -> String {
		let dims: Vec<String> = self.shape.iter().map(|d| format!("'{d}'")).collect();
		format!("[{}]", dims.join(", "))
	}
}

impl fmt::Display for TensorSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "name={}  dtype={}  shape={}", self.name, self.dtype, self.shape_string())
	}
}

/// Payload of an initializer tensor, as stored in the protobuf.
///
/// ONNX stores tensor contents either as little-endian bytes in `raw_data` or in one of several typed repeated fields;
/// which field is used depends on the exporter.
#[derive(Debug, PartialEq, Clone, Default)]
pub enum TensorData {
	Raw(Vec<u8>),
	Float(Vec<f32>),
	Int32(Vec<i32>),
	Int64(Vec<i64>),
	Double(Vec<f64>),
	Uint64(Vec<u64>),
	/// String tensors are never numeric; only the element count is kept.
	Strings(usize),
	/// Contents stored in a file beside the model and not read (yet).
	External(ExternalData),
	#[default]
	Empty
}

/// Where an externally stored tensor lives, relative to the model's directory.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ExternalData {
	pub location: String,
	pub offset: u64,
	/// Byte length; `None` means "to the end of the file".
	pub length: Option<u64>
}

/// Extracts the first element of a tensor payload as an `f64`.
///
/// Returns `None` for string and complex tensors, empty payloads, and payloads too short for the declared type.
pub fn first_scalar(ty: i32, data: &TensorData) -> Option<f64> {
	match data {
		TensorData::Raw(bytes) => first_raw_scalar(ty, bytes),
		TensorData::Float(v) if ty == data_type::FLOAT => v.first().map(|&x| f64::from(x)),
		TensorData::Int32(v) => {
			let x = *v.first()?;
			match ty {
				data_type::INT32 | data_type::INT16 | data_type::INT8 | data_type::UINT16 | data_type::UINT8 => Some(f64::from(x)),
				data_type::BOOL => Some(if x != 0 { 1.0 } else { 0.0 }),
				// half-precision values are stored as their bit patterns
				data_type::FLOAT16 => Some(f16::from_bits(x as u16).to_f64()),
				data_type::BFLOAT16 => Some(bf16::from_bits(x as u16).to_f64()),
				_ => None
			}
		}
		TensorData::Int64(v) if ty == data_type::INT64 => v.first().map(|&x| x as f64),
		TensorData::Double(v) if ty == data_type::DOUBLE => v.first().copied(),
		TensorData::Uint64(v) if ty == data_type::UINT32 || ty == data_type::UINT64 => v.first().map(|&x| x as f64),
		_ => None
	}
}

fn first_raw_scalar(ty: i32, bytes: &[u8]) -> Option<f64> {
	fn take<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
		bytes.get(..N)?.try_into().ok()
	}

	let value = match ty {
		data_type::FLOAT => f64::from(f32::from_le_bytes(take(bytes)?)),
		data_type::UINT8 => f64::from(*bytes.first()?),
		data_type::INT8 => f64::from(i8::from_le_bytes(take(bytes)?)),
		data_type::UINT16 => f64::from(u16::from_le_bytes(take(bytes)?)),
		data_type::INT16 => f64::from(i16::from_le_bytes(take(bytes)?)),
		data_type::INT32 => f64::from(i32::from_le_bytes(take(bytes)?)),
		data_type::INT64 => i64::from_le_bytes(take(bytes)?) as f64,
		data_type::BOOL => {
			if *bytes.first()? != 0 {
				1.0
			} else {
				0.0
			}
		}
		data_type::FLOAT16 => f16::from_le_bytes(take(bytes)?).to_f64(),
		data_type::DOUBLE => f64::from_le_bytes(take(bytes)?),
		data_type::UINT32 => f64::from(u32::from_le_bytes(take(bytes)?)),
		data_type::UINT64 => u64::from_le_bytes(take(bytes)?) as f64,
		data_type::BFLOAT16 => bf16::from_le_bytes(take(bytes)?).to_f64(),
		_ => return None
	};
	Some(value)
}
