use aksl::CompileError;
use std::path::PathBuf;
use thiserror::Error;

/// Why the driver stopped.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read '{}'", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to write '{}'", path.display())]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to write to the standard output")]
	Stdout(#[source] std::io::Error),
	#[error("invalid options file '{}'", path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("could not serialize the output")]
	Json(#[from] serde_json::Error),
	/// The diagnostics have already been reported by the time this is returned.
	#[error("could not compile '{}' due to {count} previous error{}", path.display(), if *count == 1 { "" } else { "s" })]
	Failed { path: PathBuf, count: usize },
	#[error(transparent)]
	Compile(#[from] CompileError),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failure_messages() {
		let one = CliError::Failed {
			path: "a.aksl".into(),
			count: 1,
		};
		assert_eq!(one.to_string(), "could not compile 'a.aksl' due to 1 previous error");
		let many = CliError::Failed {
			path: "a.aksl".into(),
			count: 3,
		};
		assert_eq!(many.to_string(), "could not compile 'a.aksl' due to 3 previous errors");
	}
}
