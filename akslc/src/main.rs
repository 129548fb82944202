mod error;
mod file;
mod logger;
mod report;

use crate::{
	error::CliError,
	file::SourceFile,
	report::{report, MessageFormat},
};
use aksl::{
	compiler::Compiler, layout::MemoryLayout, CompileError, CompileOptions, GlslVersion, ShaderKind,
	SpirvVersion, TargetApi,
};
use clap::{Parser, ValueEnum};
use std::{
	error::Error,
	io::Write,
	path::{Path, PathBuf},
	process::ExitCode,
};

/// Compiles AkSL shaders to GLSL or SPIR-V.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Input AkSL file
	input: PathBuf,

	/// Output path (default: stdout)
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Output language
	#[arg(short, long, value_enum, default_value_t = Target::Glsl)]
	target: Target,

	/// Kind of program
	#[arg(short, long, value_enum, default_value_t = Kind::Fragment)]
	kind: Kind,

	/// API the generated GLSL is written for
	#[arg(long, value_enum, default_value_t = Api::Opengl)]
	api: Api,

	/// GLSL version, e.g. `450` or `300es` (default: 300es for OpenGL ES, otherwise 450)
	#[arg(long, value_parser = parse_glsl_version)]
	glsl_version: Option<GlslVersion>,

	/// SPIR-V version, e.g. `1.3`
	#[arg(long, default_value = "1.0", value_parser = parse_spirv_version)]
	spirv_version: SpirvVersion,

	/// Omit optional whitespace from generated GLSL
	#[arg(long)]
	minify: bool,

	/// Emit precision qualifiers in generated GLSL
	#[arg(long)]
	precision: bool,

	/// Use `highp` wherever a precision qualifier is emitted
	#[arg(long)]
	force_high_precision: bool,

	/// Whether to emit debug names in generated SPIR-V
	#[arg(long)]
	emit_names: Option<bool>,

	/// JSON file with compile options; command-line flags take precedence
	#[arg(long)]
	config: Option<PathBuf>,

	/// Print the default uniform block layout as JSON instead of compiling
	#[arg(long, value_enum)]
	reflect: Option<Layout>,

	/// Format of reported diagnostics
	#[arg(long, value_enum, default_value_t = MessageFormat::Human)]
	message_format: MessageFormat,

	/// Increase logging verbosity; may be repeated
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
	Glsl,
	Spirv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
	Vertex,
	Fragment,
	Compute,
	Library,
}

impl From<Kind> for ShaderKind {
	fn from(kind: Kind) -> Self {
		match kind {
			Kind::Vertex => ShaderKind::Vertex,
			Kind::Fragment => ShaderKind::Fragment,
			Kind::Compute => ShaderKind::Compute,
			Kind::Library => ShaderKind::Base,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Api {
	Opengl,
	OpenglEs,
	Vulkan,
}

impl From<Api> for TargetApi {
	fn from(api: Api) -> Self {
		match api {
			Api::Opengl => TargetApi::OpenGl,
			Api::OpenglEs => TargetApi::OpenGlEs,
			Api::Vulkan => TargetApi::Vulkan,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Layout {
	Std140,
	Std430,
}

impl From<Layout> for MemoryLayout {
	fn from(layout: Layout) -> Self {
		match layout {
			Layout::Std140 => MemoryLayout::Std140,
			Layout::Std430 => MemoryLayout::Std430,
		}
	}
}

fn parse_glsl_version(s: &str) -> Result<GlslVersion, String> {
	GlslVersion::from_str_opt(s).ok_or_else(|| format!("unknown GLSL version '{s}'"))
}

fn parse_spirv_version(s: &str) -> Result<SpirvVersion, String> {
	SpirvVersion::from_str_opt(s).ok_or_else(|| format!("unknown SPIR-V version '{s}', expected 1.0 to 1.6"))
}

impl Cli {
	/// Reads the options file, if any, and applies the command-line overrides on top.
	fn options(&self) -> Result<CompileOptions, CliError> {
		let mut options = match &self.config {
			Some(path) => {
				let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
					path: path.clone(),
					source,
				})?;
				serde_json::from_str(&text).map_err(|source| CliError::Config {
					path: path.clone(),
					source,
				})?
			}
			None => CompileOptions::default(),
		};
		self.apply_overrides(&mut options);
		Ok(options)
	}

	fn apply_overrides(&self, options: &mut CompileOptions) {
		if self.minify {
			options.minify_code = true;
		}
		if self.precision {
			options.use_precision_qualifiers = true;
		}
		if self.force_high_precision {
			options.force_high_precision = true;
		}
		if let Some(emit_names) = self.emit_names {
			options.emit_names = emit_names;
		}
	}

	fn glsl_version(&self) -> GlslVersion {
		self.glsl_version.unwrap_or(match self.api {
			Api::OpenglEs => GlslVersion::V300Es,
			Api::Opengl | Api::Vulkan => GlslVersion::V450,
		})
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	if let Err(e) = logger::init(cli.verbose) {
		eprintln!("warning: {e}");
	}

	match run(&cli) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {err}");
			let mut source = err.source();
			while let Some(cause) = source {
				eprintln!("  caused by: {cause}");
				source = cause.source();
			}
			ExitCode::FAILURE
		}
	}
}

fn run(cli: &Cli) -> Result<(), CliError> {
	let contents = std::fs::read_to_string(&cli.input).map_err(|source| CliError::Read {
		path: cli.input.clone(),
		source,
	})?;
	let file = SourceFile::new(&cli.input, contents);
	let options = cli.options()?;
	let kind = ShaderKind::from(cli.kind);
	log::info!("Compiling '{}' as a {kind:?} program", file.name());

	let result = if let Some(layout) = cli.reflect {
		Compiler::parse(&file.contents, kind, options)
			.map_err(CliError::from)
			.and_then(|program| {
				let uniforms = program.uniforms(layout.into());
				log::debug!("Reflected {} uniforms", uniforms.len());
				Ok(Output::Text(serde_json::to_string_pretty(&uniforms)?))
			})
	} else {
		match cli.target {
			Target::Glsl => Compiler::compile_to_glsl(
				&file.contents,
				kind,
				options,
				cli.api.into(),
				cli.glsl_version(),
			)
			.map(Output::Text),
			Target::Spirv => Compiler::compile_to_spirv(&file.contents, kind, options, cli.spirv_version)
				.map(|module| Output::Binary(module.to_bytes())),
		}
		.map_err(CliError::from)
	};

	let output = match result {
		Ok(output) => output,
		Err(CliError::Compile(CompileError::Failed(diagnostics))) => {
			report(&diagnostics, &file, cli.message_format)?;
			return Err(CliError::Failed {
				path: cli.input.clone(),
				count: diagnostics.error_count(),
			});
		}
		Err(e) => return Err(e),
	};

	write_output(cli.output.as_deref(), &output)
}

/// A compiled artifact.
enum Output {
	Text(String),
	Binary(Vec<u8>),
}

impl Output {
	fn bytes(&self) -> &[u8] {
		match self {
			Output::Text(text) => text.as_bytes(),
			Output::Binary(bytes) => bytes,
		}
	}
}

fn write_output(path: Option<&Path>, output: &Output) -> Result<(), CliError> {
	match path {
		Some(path) => {
			std::fs::write(path, output.bytes()).map_err(|source| CliError::Write {
				path: path.to_owned(),
				source,
			})?;
			log::info!("Wrote {} bytes to '{}'", output.bytes().len(), path.display());
		}
		None => {
			let mut stdout = std::io::stdout().lock();
			stdout
				.write_all(output.bytes())
				.and_then(|()| stdout.flush())
				.map_err(CliError::Stdout)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn arguments_are_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn defaults() {
		let cli = Cli::try_parse_from(["akslc", "shader.aksl"]).unwrap();
		assert_eq!(cli.target, Target::Glsl);
		assert_eq!(cli.kind, Kind::Fragment);
		assert_eq!(cli.glsl_version(), GlslVersion::V450);
		assert_eq!(cli.spirv_version, SpirvVersion::V1_0);
		assert_eq!(cli.message_format, MessageFormat::Human);
		assert_eq!(cli.verbose, 0);
	}

	#[test]
	fn value_names() {
		let cli = Cli::try_parse_from([
			"akslc",
			"shader.aksl",
			"--target",
			"spirv",
			"--kind",
			"library",
			"--api",
			"opengl-es",
			"--spirv-version",
			"1.3",
			"--message-format",
			"json",
			"-vv",
		])
		.unwrap();
		assert_eq!(cli.target, Target::Spirv);
		assert_eq!(ShaderKind::from(cli.kind), ShaderKind::Base);
		assert_eq!(TargetApi::from(cli.api), TargetApi::OpenGlEs);
		assert_eq!(cli.glsl_version(), GlslVersion::V300Es);
		assert_eq!(cli.spirv_version, SpirvVersion::V1_3);
		assert_eq!(cli.message_format, MessageFormat::Json);
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn unknown_versions_are_rejected() {
		assert!(Cli::try_parse_from(["akslc", "a.aksl", "--glsl-version", "451"]).is_err());
		assert!(Cli::try_parse_from(["akslc", "a.aksl", "--spirv-version", "2.0"]).is_err());
	}

	#[test]
	fn flags_override_the_options_file() {
		let mut options: CompileOptions =
			serde_json::from_str(r#"{ "minify_code": false, "emit_names": true }"#).unwrap();
		let cli = Cli::try_parse_from([
			"akslc",
			"a.aksl",
			"--minify",
			"--emit-names",
			"false",
		])
		.unwrap();
		cli.apply_overrides(&mut options);
		assert!(options.minify_code);
		assert!(!options.emit_names);
		assert!(!options.use_precision_qualifiers);
	}

	#[test]
	fn partial_options_files_use_defaults() {
		let options: CompileOptions = serde_json::from_str(r#"{ "use_precision_qualifiers": true }"#).unwrap();
		assert!(options.use_precision_qualifiers);
		assert_eq!(options.emit_names, CompileOptions::default().emit_names);
	}
}
