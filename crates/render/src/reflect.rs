//! WGSL stage reflection: entry points, active uniforms and vertex inputs.
//!
//! Uniforms are standalone `var<uniform>` declarations in bind group 0, one
//! binding per uniform:
//!
//! ```wgsl
//! @group(0) @binding(0) var<uniform> model: mat4x4<f32>;
//! ```

use crate::context::UniformType;
use crate::error::{RenderError, ShaderStage};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, Scalar, TypeInner, VectorSize};
use std::collections::BTreeMap;

/// One active uniform of a stage or program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub binding: u32,
    pub ty: UniformType,
}

/// What one compiled stage exposes.
#[derive(Debug, Clone)]
pub struct StageReflection {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub uniforms: Vec<UniformInfo>,
    /// `@location` inputs of a vertex entry point, ascending.
    pub vertex_inputs: Vec<u32>,
}

/// Interface of a linked program.
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub uniforms: BTreeMap<String, UniformInfo>,
    pub vertex_inputs: Vec<u32>,
}

impl ProgramLayout {
    /// Compile both stages and merge their interfaces.
    pub fn link(vertex: &str, fragment: &str) -> Result<Self, RenderError> {
        let vs = reflect_stage(ShaderStage::Vertex, vertex)?;
        let fs = reflect_stage(ShaderStage::Fragment, fragment)?;

        let mut uniforms: BTreeMap<String, UniformInfo> = BTreeMap::new();
        let mut by_binding: BTreeMap<u32, String> = BTreeMap::new();
        for info in vs.uniforms.into_iter().chain(fs.uniforms) {
            if let Some(existing) = uniforms.get(&info.name) {
                if existing != &info {
                    return Err(RenderError::Link {
                        log: format!(
                            "uniform `{}` is declared differently in the two stages \
                             (binding {} as {:?} vs binding {} as {:?})",
                            info.name, existing.binding, existing.ty, info.binding, info.ty
                        ),
                    });
                }
                continue;
            }
            if let Some(other) = by_binding.get(&info.binding) {
                return Err(RenderError::Link {
                    log: format!(
                        "uniforms `{other}` and `{}` share binding {}",
                        info.name, info.binding
                    ),
                });
            }
            by_binding.insert(info.binding, info.name.clone());
            uniforms.insert(info.name.clone(), info);
        }

        Ok(Self {
            vertex_entry: vs.entry_point,
            fragment_entry: fs.entry_point,
            uniforms,
            vertex_inputs: vs.vertex_inputs,
        })
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(name)
    }

    pub fn uniform_at(&self, binding: u32) -> Option<&UniformInfo> {
        self.uniforms.values().find(|u| u.binding == binding)
    }
}

/// Parse, validate and reflect one WGSL stage.
pub fn reflect_stage(stage: ShaderStage, source: &str) -> Result<StageReflection, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| RenderError::Compile {
            stage,
            log: e.to_string(),
        })?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .ok_or_else(|| RenderError::Compile {
            stage,
            log: format!("no @{stage} entry point"),
        })?;

    let uniforms = collect_uniforms(stage, &module)?;

    let mut vertex_inputs = Vec::new();
    if stage == ShaderStage::Vertex {
        for arg in &entry.function.arguments {
            match &arg.binding {
                Some(Binding::Location { location, .. }) => vertex_inputs.push(*location),
                Some(Binding::BuiltIn(_)) => {}
                None => {
                    if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                        for member in members {
                            if let Some(Binding::Location { location, .. }) = &member.binding {
                                vertex_inputs.push(*location);
                            }
                        }
                    }
                }
            }
        }
        vertex_inputs.sort_unstable();
    }

    Ok(StageReflection {
        stage,
        entry_point: entry.name.clone(),
        uniforms,
        vertex_inputs,
    })
}

fn collect_uniforms(stage: ShaderStage, module: &Module) -> Result<Vec<UniformInfo>, RenderError> {
    let mut uniforms = Vec::new();
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        let Some(binding) = &var.binding else {
            continue;
        };
        if binding.group != 0 {
            return Err(RenderError::Compile {
                stage,
                log: format!(
                    "uniform `{name}` is in bind group {}; only group 0 is supported",
                    binding.group
                ),
            });
        }
        let ty = uniform_type(&module.types[var.ty].inner).ok_or_else(|| RenderError::Compile {
            stage,
            log: format!("uniform `{name}` has an unsupported type"),
        })?;
        uniforms.push(UniformInfo {
            name,
            binding: binding.binding,
            ty,
        });
    }
    uniforms.sort_by_key(|u| u.binding);
    Ok(uniforms)
}

fn uniform_type(inner: &TypeInner) -> Option<UniformType> {
    match *inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar == Scalar::F32 => Some(UniformType::Mat4),
        TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => Some(match size {
            VectorSize::Bi => UniformType::Vec2,
            VectorSize::Tri => UniformType::Vec3,
            VectorSize::Quad => UniformType::Vec4,
        }),
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(UniformType::Float),
        TypeInner::Scalar(scalar) if scalar == Scalar::I32 => Some(UniformType::Int),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> projection: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = projection * view * model * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

    pub(crate) const FRAGMENT: &str = r#"
@group(0) @binding(3) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0) * tint;
}
"#;

    #[test]
    fn reflects_vertex_stage() {
        let vs = reflect_stage(ShaderStage::Vertex, VERTEX).unwrap();
        assert_eq!(vs.entry_point, "vs_main");
        assert_eq!(vs.vertex_inputs, vec![0, 1]);
        let names: Vec<_> = vs.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["model", "view", "projection"]);
        assert!(vs.uniforms.iter().all(|u| u.ty == UniformType::Mat4));
    }

    #[test]
    fn links_uniforms_of_both_stages() {
        let layout = ProgramLayout::link(VERTEX, FRAGMENT).unwrap();
        assert_eq!(layout.uniforms.len(), 4);
        assert_eq!(layout.uniform("tint").unwrap().ty, UniformType::Vec4);
        assert_eq!(layout.uniform_at(2).unwrap().name, "projection");
        assert_eq!(layout.fragment_entry, "fs_main");
    }

    #[test]
    fn compile_error_carries_diagnostics() {
        let err = reflect_stage(ShaderStage::Vertex, "fn broken( {").unwrap_err();
        match err {
            RenderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let err = reflect_stage(ShaderStage::Vertex, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn conflicting_bindings_fail_to_link() {
        let fragment = r#"
@group(0) @binding(0) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0) * tint;
}
"#;
        let err = ProgramLayout::link(VERTEX, fragment).unwrap_err();
        assert!(matches!(err, RenderError::Link { .. }));
    }
}
