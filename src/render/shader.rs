use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

pub const SHADER_DEFAULT: &str = "default";
pub const SHADER_SIMPLE: &str = "simple";
pub const SHADER_TEXT: &str = "text";

pub const UNIFORM_PROJECTION: &str = "uProjection";
pub const UNIFORM_COLOR: &str = "uColor";
pub const UNIFORM_TEXTURE: &str = "uTexture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Named program source: one source text per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    name: String,
    stages: IndexMap<ShaderStage, String>,
}

impl ShaderSource {
    /// Vertex + fragment pair. Both sources must be non-empty.
    pub fn new(
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> ChartResult<Self> {
        let name = name.into();
        let vertex = vertex.into();
        let fragment = fragment.into();
        if name.is_empty() {
            return Err(ChartError::InvalidData(
                "shader name must not be empty".to_owned(),
            ));
        }
        if vertex.trim().is_empty() || fragment.trim().is_empty() {
            return Err(ChartError::InvalidData(format!(
                "shader `{name}` needs both vertex and fragment sources"
            )));
        }

        let mut stages = IndexMap::with_capacity(2);
        stages.insert(ShaderStage::Vertex, vertex);
        stages.insert(ShaderStage::Fragment, fragment);
        Ok(Self { name, stages })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> Option<&str> {
        self.stages.get(&stage).map(String::as_str)
    }

    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        self.stages.iter().map(|(stage, src)| (*stage, src.as_str()))
    }

    /// Per-vertex color program: `aPosition`, `aColor`, `uProjection`.
    #[must_use]
    pub fn builtin_default() -> Self {
        builtin(SHADER_DEFAULT, DEFAULT_VERTEX, DEFAULT_FRAGMENT)
    }

    /// Uniform color program: `aPosition`, `uProjection`, `uColor`.
    #[must_use]
    pub fn builtin_simple() -> Self {
        builtin(SHADER_SIMPLE, SIMPLE_VERTEX, SIMPLE_FRAGMENT)
    }

    /// Glyph-atlas program: `aPosition`, `aTexCoord`, `aColor`, `uTexture`.
    #[must_use]
    pub fn builtin_text() -> Self {
        builtin(SHADER_TEXT, TEXT_VERTEX, TEXT_FRAGMENT)
    }

    #[must_use]
    pub fn builtins() -> [Self; 3] {
        [
            Self::builtin_default(),
            Self::builtin_simple(),
            Self::builtin_text(),
        ]
    }
}

fn builtin(name: &str, vertex: &str, fragment: &str) -> ShaderSource {
    let mut stages = IndexMap::with_capacity(2);
    stages.insert(ShaderStage::Vertex, vertex.to_owned());
    stages.insert(ShaderStage::Fragment, fragment.to_owned());
    ShaderSource {
        name: name.to_owned(),
        stages,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
}

/// Compiled program. An invalid shader (failed compile or link) accepts
/// every call as a no-op; renderers check [`Shader::is_valid`] and skip.
pub trait Shader {
    fn name(&self) -> &str;

    fn is_valid(&self) -> bool;

    fn bind(&mut self);

    fn unbind(&mut self);

    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn dispose(&mut self);

    fn set_matrix4(&mut self, name: &str, matrix: &glam::Mat4) {
        self.set_uniform(name, UniformValue::Mat4(matrix.to_cols_array()));
    }

    fn set_color(&mut self, name: &str, rgba: [f32; 4]) {
        self.set_uniform(name, UniformValue::Vec4(rgba));
    }
}

const DEFAULT_VERTEX: &str = "#version 150
in vec2 aPosition;
in vec4 aColor;

uniform mat4 uProjection;

out vec4 vColor;

void main() {
    gl_Position = uProjection * vec4(aPosition, 0.0, 1.0);
    vColor = aColor;
}
";

const DEFAULT_FRAGMENT: &str = "#version 150
in vec4 vColor;

out vec4 fragColor;

void main() {
    fragColor = vColor;
}
";

const SIMPLE_VERTEX: &str = "#version 150
in vec2 aPosition;

uniform mat4 uProjection;

void main() {
    gl_Position = uProjection * vec4(aPosition, 0.0, 1.0);
}
";

const SIMPLE_FRAGMENT: &str = "#version 150
uniform vec4 uColor;

out vec4 fragColor;

void main() {
    fragColor = uColor;
}
";

const TEXT_VERTEX: &str = "#version 150
in vec2 aPosition;
in vec2 aTexCoord;
in vec4 aColor;

uniform mat4 uProjection;

out vec2 vTexCoord;
out vec4 vColor;

void main() {
    gl_Position = uProjection * vec4(aPosition, 0.0, 1.0);
    vTexCoord = aTexCoord;
    vColor = aColor;
}
";

const TEXT_FRAGMENT: &str = "#version 150
in vec2 vTexCoord;
in vec4 vColor;

uniform sampler2D uTexture;

out vec4 fragColor;

void main() {
    float alpha = texture(uTexture, vTexCoord).r;
    if (alpha < 0.01) discard;
    fragColor = vec4(vColor.rgb, vColor.a * alpha);
}
";
