//! A read-only view of a loaded ONNX model.

use std::{
	fs::{self, File},
	io::{self, Read, Seek, SeekFrom},
	path::{Path, PathBuf}
};

use sha2::{Digest, Sha256};

use crate::{
	Result, debug, info, trace,
	tensor::{Dimension, ExternalData, TensorData, first_scalar}
};

mod check;
mod proto;

/// The default operator set domain. An empty domain string means the same thing.
pub const ONNX_DOMAIN: &str = "ai.onnx";

/// A model loaded from a serialized ONNX protobuf and checked for structural consistency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
	/// ONNX IR (format) version.
	pub ir_version: i64,
	pub opsets: Vec<Opset>,
	pub producer_name: String,
	pub producer_version: String,
	pub domain: String,
	pub model_version: i64,
	/// Custom `metadata_props`, in declaration order.
	pub metadata: Vec<(String, String)>,
	pub graph: Graph,
	/// The file this model was loaded from, if any.
	pub source: Option<SourceFile>
}

/// Identity of the file a [`Model`] was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
	pub path: PathBuf,
	pub size: u64,
	/// Lowercase hex SHA-256 digest of the file contents.
	pub sha256: String
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opset {
	pub domain: String,
	pub version: i64
}

impl Opset {
	pub fn new(domain: impl Into<String>, version: i64) -> Self {
		Self { domain: domain.into(), version }
	}

	/// The domain with the empty string normalized to [`ONNX_DOMAIN`].
	pub fn domain_name(&self) -> &str {
		normalize_domain(&self.domain)
	}
}

pub(crate) fn normalize_domain(domain: &str) -> &str {
	if domain.is_empty() { ONNX_DOMAIN } else { domain }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
	pub name: String,
	pub inputs: Vec<ValueInfo>,
	pub outputs: Vec<ValueInfo>,
	pub nodes: Vec<Node>,
	pub initializers: Vec<Initializer>
}

/// A declared graph input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
	pub name: String,
	/// `None` when the declaration carries no type at all.
	pub ty: Option<TypeInfo>
}

impl ValueInfo {
	/// Shorthand for a tensor declaration.
	pub fn tensor(name: impl Into<String>, elem_type: i32, shape: impl IntoIterator<Item = Dimension>) -> Self {
		Self {
			name: name.into(),
			ty: Some(TypeInfo::Tensor {
				elem_type,
				shape: Some(shape.into_iter().collect())
			})
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
	Tensor {
		elem_type: i32,
		/// `None` if the declaration has no shape (rank unknown).
		shape: Option<Vec<Dimension>>
	},
	/// Sequence, map, optional and sparse types; only tensors are described.
	Other
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
	pub name: String,
	pub op_type: String,
	pub domain: String,
	pub inputs: Vec<String>,
	pub outputs: Vec<String>
}

impl Node {
	pub fn new<I, O>(op_type: impl Into<String>, inputs: I, outputs: O) -> Self
	where
		I: IntoIterator,
		I::Item: Into<String>,
		O: IntoIterator,
		O::Item: Into<String>
	{
		Self {
			name: String::new(),
			op_type: op_type.into(),
			domain: String::new(),
			inputs: inputs.into_iter().map(Into::into).collect(),
			outputs: outputs.into_iter().map(Into::into).collect()
		}
	}

	/// A name for error messages: the node name, or its operator type when unnamed.
	pub(crate) fn display_name(&self, index: usize) -> String {
		if self.name.is_empty() {
			format!("#{index} ({})", self.op_type)
		} else {
			format!("`{}` ({})", self.name, self.op_type)
		}
	}
}

/// A named constant tensor bundled with the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Initializer {
	pub name: String,
	/// Raw `TensorProto.DataType` code; see [`crate::tensor::data_type`].
	pub data_type: i32,
	pub dims: Vec<i64>,
	pub data: TensorData
}

impl Initializer {
	/// Number of elements declared by `dims`. A tensor with no dims is a scalar with one element.
	///
	/// Returns `None` if a dimension is negative or the product overflows.
	pub fn element_count(&self) -> Option<u64> {
		self.dims.iter().try_fold(1u64, |acc, &d| u64::try_from(d).ok().and_then(|d| acc.checked_mul(d)))
	}

	/// The value of a single-element initializer, or `None` if it is not a numeric scalar.
	pub fn scalar(&self) -> Option<f64> {
		if self.element_count() != Some(1) {
			return None;
		}
		first_scalar(self.data_type, &self.data)
	}
}

impl Model {
	/// Reads, parses, and validates the ONNX model at `path`.
	///
	/// Tensors stored as external data are looked up relative to the model's directory. Single-element external
	/// tensors are read so that they can show up as preprocessing hints; larger ones are left unread.
	///
	/// Fails with a [`Load`](crate::ErrorKind::Load) error if the file is missing, unreadable, or not an ONNX protobuf,
	/// and with a [`Validation`](crate::ErrorKind::Validation) error if the graph is inconsistent.
	pub fn load(path: impl AsRef<Path>) -> Result<Model> {
		let path = path.as_ref();
		let bytes = fs::read(path).map_err(|e| crate::Error::from(e).context(path.display()))?;
		debug!(path = %path.display(), size = bytes.len(), "read model file");

		let model_dir = match path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir,
			_ => Path::new(".")
		};
		let mut model = Model::parse(&bytes, Some(model_dir)).map_err(|e| e.context(path.display()))?;
		model.read_external_scalars(model_dir);
		model.source = Some(SourceFile {
			path: path.to_path_buf(),
			size: bytes.len() as u64,
			sha256: hex_digest(&bytes)
		});
		info!(path = %path.display(), nodes = model.graph.nodes.len(), "loaded model");
		Ok(model)
	}

	/// Parses and validates an ONNX model held in memory.
	///
	/// With no directory to resolve them against, models that store tensors as external data fail validation; use
	/// [`Model::load`] for those.
	pub fn from_bytes(bytes: &[u8]) -> Result<Model> {
		Model::parse(bytes, None)
	}

	fn parse(bytes: &[u8], model_dir: Option<&Path>) -> Result<Model> {
		let onnx = tract_onnx::onnx();
		let proto = proto::decode(&onnx, bytes)?;
		let model = Model::try_from(&proto)?;
		check::check_model(&model)?;
		check::check_with_framework(&onnx, &proto, model_dir)?;
		Ok(model)
	}

	/// Replaces the payload of each single-element external initializer with the bytes read from its file.
	fn read_external_scalars(&mut self, model_dir: &Path) {
		for init in &mut self.graph.initializers {
			let TensorData::External(external) = &init.data else {
				continue;
			};
			if init.element_count() != Some(1) {
				continue;
			}
			match read_external(model_dir, external) {
				Ok(bytes) => init.data = TensorData::Raw(bytes),
				Err(e) => trace!(name = %init.name, location = %external.location, "could not read external data: {e}")
			}
		}
	}

	/// Opset imports keyed by normalized domain, in first-seen order. A domain imported twice keeps the later version.
	pub fn opset_versions(&self) -> Vec<(&str, i64)> {
		let mut versions: Vec<(&str, i64)> = Vec::with_capacity(self.opsets.len());
		for opset in &self.opsets {
			match versions.iter_mut().find(|(domain, _)| *domain == opset.domain_name()) {
				Some(entry) => entry.1 = opset.version,
				None => versions.push((opset.domain_name(), opset.version))
			}
		}
		versions
	}

	/// Total number of elements across all initializers.
	pub fn parameter_count(&self) -> u64 {
		self.graph.initializers.iter().filter_map(Initializer::element_count).sum()
	}
}

/// Reads at most [`MAX_SCALAR_BYTES`] of an external tensor; enough for any numeric scalar.
fn read_external(model_dir: &Path, external: &ExternalData) -> io::Result<Vec<u8>> {
	let mut file = File::open(model_dir.join(&external.location))?;
	file.seek(SeekFrom::Start(external.offset))?;
	let limit = external.length.map_or(MAX_SCALAR_BYTES, |len| len.min(MAX_SCALAR_BYTES));
	let mut bytes = Vec::new();
	file.take(limit).read_to_end(&mut bytes)?;
	Ok(bytes)
}

const MAX_SCALAR_BYTES: u64 = 16;

fn hex_digest(bytes: &[u8]) -> String {
	Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
	use super::{Initializer, Model, Opset, hex_digest, read_external};
	use crate::tensor::{ExternalData, TensorData, data_type};

	#[test]
	fn test_element_count() {
		let mut init = Initializer {
			name: "w".to_string(),
			data_type: data_type::FLOAT,
			dims: vec![],
			data: TensorData::Empty
		};
		assert_eq!(init.element_count(), Some(1));
		init.dims = vec![3, 512];
		assert_eq!(init.element_count(), Some(1536));
		init.dims = vec![3, 0];
		assert_eq!(init.element_count(), Some(0));
		init.dims = vec![-1, 4];
		assert_eq!(init.element_count(), None);
		init.dims = vec![i64::MAX, i64::MAX];
		assert_eq!(init.element_count(), None);
	}

	#[test]
	fn test_scalar_requires_single_element() {
		let init = Initializer {
			name: "pair".to_string(),
			data_type: data_type::FLOAT,
			dims: vec![2],
			data: TensorData::Float(vec![127.5, 128.0])
		};
		assert_eq!(init.scalar(), None);

		let init = Initializer { dims: vec![1, 1], ..init };
		assert_eq!(init.scalar(), Some(127.5));
	}

	#[test]
	fn test_opset_versions() {
		let model = Model {
			opsets: vec![Opset::new("", 11), Opset::new("com.microsoft", 1), Opset::new("ai.onnx", 13)],
			..Model::default()
		};
		assert_eq!(model.opset_versions(), vec![("ai.onnx", 13), ("com.microsoft", 1)]);
	}

	#[test]
	fn test_read_external_honors_offset_and_length() {
		let dir = std::env::temp_dir().join(format!("onnx-inspect-external-{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		let mut contents = vec![0xaa; 4];
		contents.extend_from_slice(&127.5f32.to_le_bytes());
		contents.extend_from_slice(&[0xbb; 32]);
		std::fs::write(dir.join("weights.bin"), &contents).unwrap();

		let external = ExternalData { location: "weights.bin".to_string(), offset: 4, length: Some(4) };
		assert_eq!(read_external(&dir, &external).unwrap(), 127.5f32.to_le_bytes());

		// without a length, reading stops well before the end of a large file
		let external = ExternalData { length: None, ..external };
		assert_eq!(read_external(&dir, &external).unwrap().len(), 16);

		let external = ExternalData { location: "missing.bin".to_string(), ..external };
		assert!(read_external(&dir, &external).is_err());

		std::fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn test_hex_digest() {
		assert_eq!(hex_digest(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
	}
}
