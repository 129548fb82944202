use aksl::{
	compiler::Compiler, layout::MemoryLayout, CompileError, CompileOptions, GlslVersion, ShaderKind,
	SpirvVersion, TargetApi,
};

const FRAGMENT: &str = r#"
layout(location = 0) in float3 normal;
layout(location = 0) out float4 color;

void main() {
	float3 n = normalize(normal);
	float light = max(dot(n, float3(0.0, 0.0, 1.0)), 0.0);
	int steps = 0;
	for (int i = 0; i < 4; i++) {
		if (light > 0.25 * float(i)) steps += 1;
	}
	color = float4(n * light, 1.0) * (1.0 - float(steps) / 4.0);
}
"#;

fn glsl(source: &str) -> String {
	Compiler::compile_to_glsl(
		source,
		ShaderKind::Fragment,
		CompileOptions::default(),
		TargetApi::OpenGl,
		GlslVersion::V450,
	)
	.unwrap()
}

/// Drops the `#version` directive so that the output can be fed back in.
fn body(glsl: &str) -> &str {
	glsl.split_once('\n').map_or("", |(_, rest)| rest)
}

#[test]
fn generated_glsl_is_a_fixed_point() {
	let first = glsl(FRAGMENT);
	assert!(first.starts_with("#version 450\n"));
	let second = glsl(body(&first));
	assert_eq!(first, second);
	let third = glsl(body(&second));
	assert_eq!(second, third);
}

#[test]
fn minified_glsl_reparses() {
	let options = CompileOptions {
		minify_code: true,
		..CompileOptions::default()
	};
	let minified = Compiler::compile_to_glsl(
		FRAGMENT,
		ShaderKind::Fragment,
		options,
		TargetApi::OpenGl,
		GlslVersion::V450,
	)
	.unwrap();
	assert!(minified.len() < glsl(FRAGMENT).len());
	assert!(Compiler::parse(body(&minified), ShaderKind::Fragment, CompileOptions::default()).is_ok());
}

#[test]
fn library_modules_load() {
	let module = Compiler::compile_to_spirv(
		"float twice(float x) { return x * 2.0; }",
		ShaderKind::Base,
		CompileOptions::default(),
		SpirvVersion::V1_0,
	)
	.unwrap();
	let words = module.words();
	assert_eq!(words[0], 0x0723_0203);
	assert_eq!(words[1], 0x0001_0000);
	assert_eq!(words[2], 0);
	assert!(words[3] > 1);
	assert_eq!(words[4], 0);
	assert_eq!(module.to_bytes().len(), words.len() * 4);

	let loaded = rspirv::dr::load_words(words).unwrap();
	assert_eq!(loaded.functions.len(), 1);
	assert!(loaded.entry_points.is_empty());
}

#[test]
fn fragment_modules_load() {
	let module =
		Compiler::compile_to_spirv(FRAGMENT, ShaderKind::Fragment, CompileOptions::default(), SpirvVersion::V1_5)
			.unwrap();
	let loaded = rspirv::dr::load_words(module.words()).unwrap();
	assert_eq!(loaded.entry_points.len(), 1);
	assert_eq!(loaded.functions.len(), 1);
}

#[test]
fn compilations_are_independent() {
	let handles: Vec<_> = (0..4)
		.map(|_| std::thread::spawn(|| glsl(FRAGMENT)))
		.collect();
	let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
	assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn errors_are_reported_in_source_order() {
	let source = "void main() {\n\tint a = true;\n\tfloat b = undefined;\n}\n";
	let Err(CompileError::Failed(diagnostics)) =
		Compiler::parse(source, ShaderKind::Fragment, CompileOptions::default())
	else {
		panic!("expected the compilation to fail");
	};
	assert_eq!(diagnostics.error_count(), 2);
	let starts: Vec<_> = diagnostics.iter().map(|d| d.span.start).collect();
	assert!(starts[0] < starts[1]);
	assert!(diagnostics.emit_to_string(source, "shader.aksl").contains("shader.aksl"));
}

#[test]
fn uniforms_are_packed_by_alignment() {
	let program = Compiler::parse(
		"uniform float a;\nuniform float4 b;\nuniform float2 c;\nvoid main() {}\n",
		ShaderKind::Fragment,
		CompileOptions::default(),
	)
	.unwrap();
	let uniforms = program.uniforms(MemoryLayout::Std140);
	let placed: Vec<_> = uniforms
		.iter()
		.map(|u| (u.name.as_str(), u.offset, u.size))
		.collect();
	assert_eq!(placed, [("b", 0, 16), ("c", 16, 8), ("a", 24, 4)]);
}

#[test]
fn uniforms_past_four_gigabytes_are_left_out() {
	let program = Compiler::parse(
		"uniform float a;\nuniform float4 huge[300000000];\nuniform float b;\nvoid main() {}\n",
		ShaderKind::Fragment,
		CompileOptions::default(),
	)
	.unwrap();
	let names: Vec<_> = program
		.uniforms(MemoryLayout::Std140)
		.into_iter()
		.map(|u| (u.name, u.offset))
		.collect();
	assert_eq!(names, [("a".to_owned(), 0), ("b".to_owned(), 4)]);
}
