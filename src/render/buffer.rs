use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{ChartError, ChartResult};
use crate::render::device::DrawMode;

/// Scalar type of a vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Float,
    Int,
    UnsignedByte,
}

impl AttributeType {
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::UnsignedByte => 1,
        }
    }
}

/// One named attribute inside an interleaved vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: String,
    pub components: u8,
    pub kind: AttributeType,
    pub normalized: bool,
    pub offset_bytes: usize,
}

impl VertexAttribute {
    #[must_use]
    pub fn float(name: impl Into<String>, components: u8, offset_bytes: usize) -> Self {
        Self {
            name: name.into(),
            components,
            kind: AttributeType::Float,
            normalized: false,
            offset_bytes,
        }
    }

    /// Offset of the attribute in floats, for float-only layouts.
    #[must_use]
    pub fn offset_floats(&self) -> usize {
        self.offset_bytes / 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    Static,
    #[default]
    Dynamic,
    Stream,
}

pub const POSITION_ATTRIBUTE: &str = "aPosition";
pub const COLOR_ATTRIBUTE: &str = "aColor";

/// Immutable interleaved vertex layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDescriptor {
    floats_per_vertex: usize,
    initial_capacity: usize,
    usage: BufferUsage,
    attributes: SmallVec<[VertexAttribute; 2]>,
    label: Option<String>,
}

impl BufferDescriptor {
    #[must_use]
    pub fn builder() -> BufferDescriptorBuilder {
        BufferDescriptorBuilder::default()
    }

    /// `x, y, r, g, b, a` per vertex.
    #[must_use]
    pub fn position_color_2d(initial_capacity: usize) -> Self {
        Self {
            floats_per_vertex: 6,
            initial_capacity,
            usage: BufferUsage::Dynamic,
            attributes: SmallVec::from_iter([
                VertexAttribute::float(POSITION_ATTRIBUTE, 2, 0),
                VertexAttribute::float(COLOR_ATTRIBUTE, 4, 8),
            ]),
            label: None,
        }
    }

    /// `x, y` per vertex; color comes from a uniform.
    #[must_use]
    pub fn position_only_2d(initial_capacity: usize) -> Self {
        Self {
            floats_per_vertex: 2,
            initial_capacity,
            usage: BufferUsage::Dynamic,
            attributes: SmallVec::from_iter([VertexAttribute::float(POSITION_ATTRIBUTE, 2, 0)]),
            label: None,
        }
    }

    /// Copy of this layout tagged with a debug label.
    #[must_use]
    pub fn labeled(&self, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn floats_per_vertex(&self) -> usize {
        self.floats_per_vertex
    }

    #[must_use]
    pub fn stride_bytes(&self) -> usize {
        self.floats_per_vertex * 4
    }

    #[must_use]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.usage != BufferUsage::Static
    }

    #[must_use]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BufferDescriptorBuilder {
    floats_per_vertex: usize,
    initial_capacity: usize,
    usage: BufferUsage,
    attributes: SmallVec<[VertexAttribute; 2]>,
    label: Option<String>,
}

impl BufferDescriptorBuilder {
    #[must_use]
    pub fn floats_per_vertex(mut self, floats: usize) -> Self {
        self.floats_per_vertex = floats;
        self
    }

    #[must_use]
    pub fn initial_capacity(mut self, floats: usize) -> Self {
        self.initial_capacity = floats;
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validates that every attribute fits inside one vertex.
    pub fn build(self) -> ChartResult<BufferDescriptor> {
        if self.floats_per_vertex == 0 {
            return Err(ChartError::InvalidData(
                "buffer layout needs at least one float per vertex".to_owned(),
            ));
        }
        let stride = self.floats_per_vertex * 4;
        for attr in &self.attributes {
            let end = attr.offset_bytes + usize::from(attr.components) * attr.kind.size_bytes();
            if attr.components == 0 || attr.components > 4 || end > stride {
                return Err(ChartError::InvalidData(format!(
                    "attribute `{}` does not fit a {stride}-byte vertex",
                    attr.name
                )));
            }
        }

        Ok(BufferDescriptor {
            floats_per_vertex: self.floats_per_vertex,
            initial_capacity: self.initial_capacity,
            usage: self.usage,
            attributes: self.attributes,
            label: self.label,
        })
    }
}

/// Capacity (in floats) a buffer grows to when `required` no longer fits:
/// at least `required` and at least 1.5x the current capacity.
#[must_use]
pub fn grown_capacity(current: usize, required: usize) -> usize {
    required.max(current.saturating_add(current.div_ceil(2)))
}

/// GPU vertex storage owned by the resource manager.
///
/// Implementations keep whatever handle they need to reach their backend,
/// so uploads and draws only borrow the buffer itself.
pub trait Buffer {
    fn descriptor(&self) -> &BufferDescriptor;

    /// Uploads `data` as the buffer's full contents.
    ///
    /// Reallocates to [`grown_capacity`] when `data` exceeds the current
    /// capacity; otherwise only the first `data.len()` floats are rewritten.
    /// Afterwards `vertex_count() == data.len() / floats_per_vertex`.
    fn upload(&mut self, data: &[f32]) -> ChartResult<()>;

    /// Binds, enables attributes, draws the held vertices, then disables the
    /// attributes so later draws start from a clean state.
    fn draw(&mut self, mode: DrawMode) -> ChartResult<()> {
        let count = self.vertex_count();
        self.draw_range(mode, 0, count)
    }

    fn draw_range(&mut self, mode: DrawMode, first: usize, count: usize) -> ChartResult<()>;

    fn vertex_count(&self) -> usize;

    fn set_vertex_count(&mut self, count: usize);

    /// Allocated size in floats.
    fn capacity(&self) -> usize;

    fn dispose(&mut self);

    fn is_initialized(&self) -> bool;

    /// Uploads `length` floats of `data` starting at `offset`.
    fn upload_range(&mut self, data: &[f32], offset: usize, length: usize) -> ChartResult<()> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= data.len())
            .ok_or(ChartError::IndexOutOfBounds {
                index: offset.saturating_add(length),
                len: data.len(),
            })?;
        self.upload(&data[offset..end])
    }
}
