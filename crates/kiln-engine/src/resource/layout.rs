use core::ops::RangeInclusive;

/// Numeric type of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    /// Four normalized unsigned bytes.
    Color,
    Double1,
    Double2,
    Double3,
    Double4,
    Float1,
    Float2,
    Float3,
    Float4,
    Int1,
    Int2,
    Int3,
    Int4,
    Quaternion,
}

impl ComponentType {
    /// Number of scalar elements.
    pub const fn element_count(self) -> u32 {
        match self {
            Self::Double1 | Self::Float1 | Self::Int1 => 1,
            Self::Double2 | Self::Float2 | Self::Int2 => 2,
            Self::Double3 | Self::Float3 | Self::Int3 => 3,
            Self::Color | Self::Double4 | Self::Float4 | Self::Int4 | Self::Quaternion => 4,
        }
    }

    /// Size in bytes of one attribute of this type.
    pub const fn byte_size(self) -> u32 {
        match self {
            Self::Color => 4,
            Self::Double1 | Self::Double2 | Self::Double3 | Self::Double4 => {
                self.element_count() * 8
            }
            _ => self.element_count() * 4,
        }
    }

    #[inline]
    pub const fn is_double(self) -> bool {
        matches!(self, Self::Double1 | Self::Double2 | Self::Double3 | Self::Double4)
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int1 | Self::Int2 | Self::Int3 | Self::Int4)
    }
}

/// Semantic slot of a vertex attribute.
///
/// The discriminant is the backend attribute index. Slots up to `Userdata3`
/// come from the vertex buffer; `InstanceData*` slots come from the instance
/// buffer and advance once per instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum VertexComponent {
    Position = 0,
    Color,
    Normal,
    Tangent,
    TexCoord,
    Userdata0,
    Userdata1,
    Userdata2,
    Userdata3,
    InstanceData0,
    InstanceData1,
    InstanceData2,
    InstanceData3,
    InstanceData4,
    InstanceData5,
}

impl VertexComponent {
    pub const COUNT: usize = 15;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Position,
        Self::Color,
        Self::Normal,
        Self::Tangent,
        Self::TexCoord,
        Self::Userdata0,
        Self::Userdata1,
        Self::Userdata2,
        Self::Userdata3,
        Self::InstanceData0,
        Self::InstanceData1,
        Self::InstanceData2,
        Self::InstanceData3,
        Self::InstanceData4,
        Self::InstanceData5,
    ];

    /// Indices of the per-vertex attribute range.
    pub const VERTEX_RANGE: RangeInclusive<usize> = 0..=8;

    /// Indices of the per-instance attribute range.
    pub const INSTANCE_RANGE: RangeInclusive<usize> = 9..=14;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Backend attribute location.
    #[inline]
    pub const fn attribute_index(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn is_instance_data(self) -> bool {
        self.index() >= *Self::INSTANCE_RANGE.start()
    }
}

/// Placement of one enabled component inside a vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LayoutComponent {
    pub ty: ComponentType,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

/// Vertex declaration: which components are enabled and where they live.
///
/// A layout is shared by every buffer using it, so it is tracked as its own
/// resource; the same type serves as the instancing layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    components: [Option<LayoutComponent>; VertexComponent::COUNT],
    stride: u32,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two floats of position, used by the fullscreen quad.
    pub fn xy() -> Self {
        Self::new().with(VertexComponent::Position, ComponentType::Float2)
    }

    /// Appends `component` right after the current end of the vertex.
    pub fn with(self, component: VertexComponent, ty: ComponentType) -> Self {
        let offset = self.stride;
        self.with_offset(component, ty, offset)
    }

    /// Places `component` at an explicit byte offset. The stride grows to cover it.
    pub fn with_offset(mut self, component: VertexComponent, ty: ComponentType, offset: u32) -> Self {
        self.components[component.index()] = Some(LayoutComponent { ty, offset });
        self.stride = self.stride.max(offset + ty.byte_size());
        self
    }

    /// Overrides the stride (for interleaved buffers with padding).
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    #[inline]
    pub fn component(&self, component: VertexComponent) -> Option<LayoutComponent> {
        self.components[component.index()]
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Iterates enabled components in attribute order.
    pub fn enabled(&self) -> impl Iterator<Item = (VertexComponent, LayoutComponent)> + '_ {
        VertexComponent::ALL
            .iter()
            .filter_map(|&c| self.component(c).map(|lc| (c, lc)))
    }
}
