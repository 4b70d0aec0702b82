use crate::error::RenderError;

/// Byte alignment required of attribute offsets and strides.
pub const VERTEX_ALIGNMENT: u32 = 4;

/// Component layout of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeBaseType {
    Float1,
    Float2,
    Float3,
    Float4,
    Int1,
    Int2,
    Int3,
    Int4,
}

impl VertexAttributeBaseType {
    /// Number of scalar components.
    pub fn component_count(self) -> u32 {
        match self {
            Self::Float1 | Self::Int1 => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 => 4,
        }
    }

    /// Size of one scalar component in bytes. All base types are 32-bit.
    pub fn component_size(self) -> u32 {
        4
    }

    /// Size of the whole attribute in bytes.
    pub fn size(self) -> u32 {
        self.component_count() * self.component_size()
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int1 | Self::Int2 | Self::Int3 | Self::Int4)
    }
}

/// Describes how a slice of interleaved vertex bytes feeds one shader input.
///
/// `stride` and `offset` are both in bytes. A stride of 0 means the attribute
/// is tightly packed, i.e. the stride equals the attribute size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub slot: u32,
    pub base_type: VertexAttributeBaseType,
    /// Integer data is normalized to [0, 1] / [-1, 1]. Ignored for floats.
    pub normalized: bool,
    /// Distance in bytes between consecutive vertex records.
    pub stride: u32,
    /// Byte offset of this attribute within a vertex record.
    pub offset: u32,
}

impl VertexAttribute {
    pub fn new(
        slot: u32,
        base_type: VertexAttributeBaseType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) -> Self {
        Self {
            slot,
            base_type,
            normalized,
            stride,
            offset,
        }
    }

    /// Stride with the tightly-packed shorthand resolved.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.base_type.size()
        } else {
            self.stride
        }
    }

    /// Check that the attribute fits inside one vertex record and that its
    /// offset and stride are 4-byte aligned.
    pub fn validate(&self) -> Result<(), RenderError> {
        let invalid = |reason: String| RenderError::InvalidAttribute {
            slot: self.slot,
            reason,
        };
        if self.offset % VERTEX_ALIGNMENT != 0 || self.stride % VERTEX_ALIGNMENT != 0 {
            return Err(invalid(format!(
                "offset {} and stride {} must be multiples of {VERTEX_ALIGNMENT}",
                self.offset, self.stride
            )));
        }
        if self.stride == 0 {
            if self.offset != 0 {
                return Err(invalid(format!(
                    "tightly packed attribute must start at offset 0, got {}",
                    self.offset
                )));
            }
            return Ok(());
        }
        let size = self.base_type.size();
        if self
            .offset
            .checked_add(size)
            .is_none_or(|end| end > self.stride)
        {
            return Err(invalid(format!(
                "{size} bytes at offset {} do not fit in a {}-byte stride",
                self.offset, self.stride
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_sizes() {
        assert_eq!(VertexAttributeBaseType::Float3.size(), 12);
        assert_eq!(VertexAttributeBaseType::Int4.component_count(), 4);
        assert!(VertexAttributeBaseType::Int2.is_integer());
        assert!(!VertexAttributeBaseType::Float1.is_integer());
    }

    #[test]
    fn interleaved_attributes_fit() {
        let position = VertexAttribute::new(0, VertexAttributeBaseType::Float3, false, 24, 0);
        let color = VertexAttribute::new(1, VertexAttributeBaseType::Float3, false, 24, 12);
        assert!(position.validate().is_ok());
        assert!(color.validate().is_ok());
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let attr = VertexAttribute::new(2, VertexAttributeBaseType::Float3, false, 24, 16);
        assert!(matches!(
            attr.validate(),
            Err(RenderError::InvalidAttribute { slot: 2, .. })
        ));
    }

    #[test]
    fn huge_offset_is_rejected_without_overflow() {
        let attr = VertexAttribute::new(0, VertexAttributeBaseType::Float4, false, 24, u32::MAX - 3);
        assert!(matches!(
            attr.validate(),
            Err(RenderError::InvalidAttribute { slot: 0, .. })
        ));
    }

    #[test]
    fn misaligned_offset_or_stride_is_rejected() {
        let offset = VertexAttribute::new(1, VertexAttributeBaseType::Float1, false, 16, 2);
        assert!(matches!(
            offset.validate(),
            Err(RenderError::InvalidAttribute { slot: 1, .. })
        ));

        let stride = VertexAttribute::new(1, VertexAttributeBaseType::Float1, false, 18, 0);
        assert!(matches!(
            stride.validate(),
            Err(RenderError::InvalidAttribute { slot: 1, .. })
        ));
    }

    #[test]
    fn tightly_packed_stride() {
        let attr = VertexAttribute::new(0, VertexAttributeBaseType::Float2, false, 0, 0);
        assert_eq!(attr.effective_stride(), 8);
        assert!(attr.validate().is_ok());

        let shifted = VertexAttribute { offset: 4, ..attr };
        assert!(shifted.validate().is_err());
    }
}
