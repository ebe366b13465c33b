use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    #[default]
    Rgba8,
    R16F,
    Rgba16F,
    Rgba32F,
}

impl TextureFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8 => 1,
            Self::Rg8 | Self::R16F => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
            Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    #[default]
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: TextureFormat,
    #[serde(default)]
    pub min_filter: TextureFilter,
    #[serde(default)]
    pub mag_filter: TextureFilter,
    #[serde(default)]
    pub wrap: TextureWrap,
    #[serde(default)]
    pub generate_mipmaps: bool,
}

impl TextureDescriptor {
    #[must_use]
    pub fn rgba(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
            generate_mipmaps: false,
        }
    }

    /// Single-channel 8-bit texture, e.g. a glyph coverage atlas.
    #[must_use]
    pub fn alpha_mask(width: u32, height: u32) -> Self {
        Self {
            format: TextureFormat::R8,
            ..Self::rgba(width, height)
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.min_filter = filter;
        self.mag_filter = filter;
        self
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    pub fn validate(&self, max_texture_size: u32) -> ChartResult<()> {
        if self.width == 0
            || self.height == 0
            || self.width > max_texture_size
            || self.height > max_texture_size
        {
            return Err(ChartError::InvalidData(format!(
                "texture size {}x{} must be within 1..={max_texture_size}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

pub trait Texture {
    fn descriptor(&self) -> &TextureDescriptor;

    /// Replaces the full texel contents; `data.len()` must equal
    /// [`TextureDescriptor::byte_len`].
    fn upload(&mut self, data: &[u8]) -> ChartResult<()>;

    fn bind(&mut self, unit: u32);

    fn unbind(&mut self);

    fn dispose(&mut self);

    fn is_initialized(&self) -> bool;
}

/// Shared length check for texture uploads.
pub(crate) fn check_texture_upload(descriptor: &TextureDescriptor, data: &[u8]) -> ChartResult<()> {
    let expected = descriptor.byte_len();
    if data.len() != expected {
        return Err(ChartError::InvalidData(format!(
            "texture upload has {} bytes, expected {expected}",
            data.len()
        )));
    }
    Ok(())
}
