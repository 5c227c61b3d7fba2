use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use shaderc::{Compiler, ShaderKind};

const SHADERS: &[(&str, ShaderKind)] = &[
    ("sprite_default.vert", ShaderKind::Vertex),
    ("sprite_default.frag", ShaderKind::Fragment),
    ("sprite_picking.vert", ShaderKind::Vertex),
    ("sprite_picking.frag", ShaderKind::Fragment),
];

fn main() -> Result<()> {
    let out_dir = env::var("OUT_DIR").context("OUT_DIR not set")?;
    let shader_dir = Path::new("shaders");

    let compiler = Compiler::new().context("shaderc failed to initialize a compiler instance")?;

    for (name, kind) in SHADERS {
        let source_path = shader_dir.join(name);
        let source = fs::read_to_string(&source_path)
            .with_context(|| format!("reading shader source {}", source_path.display()))?;

        let mut options = shaderc::CompileOptions::new()
            .context("shaderc failed to initialize compile options")?;
        options.set_optimization_level(shaderc::OptimizationLevel::Performance);

        let artifact = compiler
            .compile_into_spirv(&source, *kind, name, "main", Some(&options))
            .with_context(|| format!("compiling {}", name))?;

        let out_path = Path::new(&out_dir).join(format!("{name}.spv"));
        fs::write(&out_path, artifact.as_binary_u8())
            .with_context(|| format!("writing {}", out_path.display()))?;

        println!("cargo:rerun-if-changed={}", source_path.display());
    }

    Ok(())
}
