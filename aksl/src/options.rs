//! Compilation options and target descriptions.
//!
//! Everything in here is plain data. With the `serde` feature enabled, all types can be (de)serialized, which is
//! how the command-line driver reads option files.

/// Options which affect the produced artifact but not the accepted language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileOptions {
	/// Omit all optional whitespace from generated GLSL.
	pub minify_code: bool,
	/// Emit `highp`/`mediump` qualifiers in generated GLSL.
	pub use_precision_qualifiers: bool,
	/// Emit `highp` where `mediump` would otherwise be used.
	pub force_high_precision: bool,
	/// Emit `OpName`/`OpMemberName` debug instructions in generated SPIR-V.
	pub emit_names: bool,
}

impl Default for CompileOptions {
	fn default() -> Self {
		Self {
			minify_code: false,
			use_precision_qualifiers: false,
			force_high_precision: false,
			emit_names: true,
		}
	}
}

/// The kind of program being compiled. Decides the SPIR-V execution model and which constructs are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShaderKind {
	/// A library of functions and declarations with no entry point.
	Base,
	Vertex,
	Fragment,
	Compute,
}

impl ShaderKind {
	/// Returns whether unsized arrays may be declared in this kind of program.
	pub fn allows_unsized_arrays(self) -> bool {
		matches!(
			self,
			ShaderKind::Vertex | ShaderKind::Fragment | ShaderKind::Compute
		)
	}

	/// Returns whether this kind of program must define `void main()`.
	pub fn requires_entry_point(self) -> bool {
		self != ShaderKind::Base
	}
}

/// The graphics API the generated code will be consumed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TargetApi {
	OpenGl,
	OpenGlEs,
	Vulkan,
}

/// A GLSL language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlslVersion {
	V300Es,
	V310Es,
	V320Es,
	V330,
	V400,
	V410,
	V420,
	V430,
	V440,
	V450,
	V460,
}

impl GlslVersion {
	/// Returns the number used in the `#version` directive.
	pub fn number(self) -> u16 {
		match self {
			GlslVersion::V300Es => 300,
			GlslVersion::V310Es => 310,
			GlslVersion::V320Es => 320,
			GlslVersion::V330 => 330,
			GlslVersion::V400 => 400,
			GlslVersion::V410 => 410,
			GlslVersion::V420 => 420,
			GlslVersion::V430 => 430,
			GlslVersion::V440 => 440,
			GlslVersion::V450 => 450,
			GlslVersion::V460 => 460,
		}
	}

	pub fn is_es_profile(self) -> bool {
		matches!(
			self,
			GlslVersion::V300Es | GlslVersion::V310Es | GlslVersion::V320Es
		)
	}

	pub fn is_core_profile(self) -> bool {
		!self.is_es_profile()
	}

	/// Returns the `#version` directive for this version, without a line ending.
	pub fn directive(self) -> String {
		if self.is_es_profile() {
			format!("#version {} es", self.number())
		} else {
			format!("#version {}", self.number())
		}
	}

	/// Parses a version number such as `450` or `300es`/`300 es`.
	pub fn from_str_opt(s: &str) -> Option<Self> {
		let s = s.trim();
		let (number, es) = match s.strip_suffix("es") {
			Some(n) => (n.trim(), true),
			None => (s, false),
		};
		let version = match (number, es) {
			("300", true) => GlslVersion::V300Es,
			("310", true) => GlslVersion::V310Es,
			("320", true) => GlslVersion::V320Es,
			("330", false) => GlslVersion::V330,
			("400", false) => GlslVersion::V400,
			("410", false) => GlslVersion::V410,
			("420", false) => GlslVersion::V420,
			("430", false) => GlslVersion::V430,
			("440", false) => GlslVersion::V440,
			("450", false) => GlslVersion::V450,
			("460", false) => GlslVersion::V460,
			_ => return None,
		};
		Some(version)
	}
}

/// A SPIR-V version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpirvVersion {
	V1_0,
	V1_1,
	V1_2,
	V1_3,
	V1_4,
	V1_5,
	V1_6,
}

impl SpirvVersion {
	/// Returns the `(major, minor)` pair.
	pub fn major_minor(self) -> (u8, u8) {
		match self {
			SpirvVersion::V1_0 => (1, 0),
			SpirvVersion::V1_1 => (1, 1),
			SpirvVersion::V1_2 => (1, 2),
			SpirvVersion::V1_3 => (1, 3),
			SpirvVersion::V1_4 => (1, 4),
			SpirvVersion::V1_5 => (1, 5),
			SpirvVersion::V1_6 => (1, 6),
		}
	}

	/// Returns the version word of the module header: `0 | major | minor | 0`.
	pub fn word(self) -> u32 {
		let (major, minor) = self.major_minor();
		(u32::from(major) << 16) | (u32::from(minor) << 8)
	}

	/// Parses a version such as `1.3`.
	pub fn from_str_opt(s: &str) -> Option<Self> {
		let version = match s.trim() {
			"1.0" => SpirvVersion::V1_0,
			"1.1" => SpirvVersion::V1_1,
			"1.2" => SpirvVersion::V1_2,
			"1.3" => SpirvVersion::V1_3,
			"1.4" => SpirvVersion::V1_4,
			"1.5" => SpirvVersion::V1_5,
			"1.6" => SpirvVersion::V1_6,
			_ => return None,
		};
		Some(version)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn glsl_versions() {
		assert_eq!(GlslVersion::V450.directive(), "#version 450");
		assert_eq!(GlslVersion::V300Es.directive(), "#version 300 es");
		assert_eq!(GlslVersion::from_str_opt("310 es"), Some(GlslVersion::V310Es));
		assert_eq!(GlslVersion::from_str_opt("310"), None);
		assert!(GlslVersion::V320Es.is_es_profile());
		assert!(GlslVersion::V330.is_core_profile());
	}

	#[test]
	fn spirv_version_word() {
		assert_eq!(SpirvVersion::V1_0.word(), 0x0001_0000);
		assert_eq!(SpirvVersion::V1_3.word(), 0x0001_0300);
		assert_eq!(SpirvVersion::from_str_opt("1.6"), Some(SpirvVersion::V1_6));
	}
}
