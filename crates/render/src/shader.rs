use crate::context::{Context, ProgramId, UniformLocation, UniformValue};
use crate::error::{RenderError, ShaderStage};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

/// A compiled and linked shader program.
///
/// Uniform locations are looked up once per name and cached for the lifetime
/// of the program. Setting a uniform the program does not declare logs a
/// warning the first time and is otherwise a no-op.
pub struct Shader {
    context: Context,
    id: ProgramId,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl Shader {
    /// Read both stage files and build a program from them.
    pub fn create(
        context: &Context,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, RenderError> {
        let vertex = read_stage(ShaderStage::Vertex, vertex_path.as_ref())?;
        let fragment = read_stage(ShaderStage::Fragment, fragment_path.as_ref())?;
        Self::from_sources(context, &vertex, &fragment)
    }

    /// Compile and link a program from in-memory sources.
    pub fn from_sources(
        context: &Context,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, RenderError> {
        let id = context.create_program(vertex, fragment)?;
        tracing::debug!(program = id.0, "shader program linked");
        Ok(Self {
            context: context.clone(),
            id,
            locations: RefCell::new(HashMap::new()),
        })
    }

    /// Make this the context's current program.
    pub fn bind(&self) {
        self.context.use_program(Some(self.id));
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }

    pub fn set_vec2(&self, name: &str, value: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(value));
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    pub fn set_vec4(&self, name: &str, value: Vec4) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    /// Upload `value` to the uniform called `name`, if the program has one.
    pub fn set_uniform(&self, name: &str, value: UniformValue) {
        if let Some(location) = self.location(name) {
            self.context.set_uniform(self.id, location, value);
        }
    }

    /// Whether `name` is an active uniform of this program.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.location(name).is_some()
    }

    fn location(&self, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return *cached;
        }
        let location = self.context.uniform_location(self.id, name);
        if location.is_none() {
            tracing::warn!(program = self.id.0, "uniform `{name}` not found in shader program");
        }
        self.locations.borrow_mut().insert(name.to_owned(), location);
        location
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.context.delete_program(self.id);
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path).map_err(|source| RenderError::ShaderIo {
        stage,
        path: path.to_path_buf(),
        source,
    })
}
