use std::{env, process::ExitCode};

use onnx_inspect::ErrorKind;

fn main() -> ExitCode {
	onnx_inspect::logging::init();

	let Some(path) = env::args_os().nth(1) else {
		println!("Usage: inspect <model.onnx>");
		return ExitCode::from(1);
	};

	match onnx_inspect::inspect_file(&path) {
		Ok(report) => {
			print!("{report}");
			ExitCode::SUCCESS
		}
		Err(e) => {
			eprintln!("{}: {e}", e.kind());
			ExitCode::from(match e.kind() {
				ErrorKind::Load => 2,
				ErrorKind::Validation => 3
			})
		}
	}
}
