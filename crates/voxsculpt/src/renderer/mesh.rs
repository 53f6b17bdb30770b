use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
            shader_location: 0,
            offset: 0,
            format: wgpu::VertexFormat::Float32x3,
        }];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [-1.0, -1.0, 0.0] },
    Vertex { position: [1.0, -1.0, 0.0] },
    Vertex { position: [1.0, 1.0, 0.0] },
    Vertex { position: [-1.0, 1.0, 0.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Unit cube centred on the origin. Corner `i` sits at
/// `(i & 1, i >> 1 & 1, i >> 2 & 1) - 0.5`.
const CUBE_VERTICES: [Vertex; 8] = [
    Vertex { position: [-0.5, -0.5, -0.5] },
    Vertex { position: [0.5, -0.5, -0.5] },
    Vertex { position: [-0.5, 0.5, -0.5] },
    Vertex { position: [0.5, 0.5, -0.5] },
    Vertex { position: [-0.5, -0.5, 0.5] },
    Vertex { position: [0.5, -0.5, 0.5] },
    Vertex { position: [-0.5, 0.5, 0.5] },
    Vertex { position: [0.5, 0.5, 0.5] },
];

/// Counter-clockwise seen from outside.
#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    4, 5, 7,  4, 7, 6, // +z
    0, 2, 3,  0, 3, 1, // -z
    1, 3, 7,  1, 7, 5, // +x
    0, 4, 6,  0, 6, 2, // -x
    2, 6, 7,  2, 7, 3, // +y
    0, 1, 5,  0, 5, 4, // -y
];

/// Static indexed geometry drawn `instance_count` times per draw call.
pub struct Mesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
    pub instance_count: u32,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u16],
        instance_count: u32,
    ) -> Self {
        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} VBO")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} IBO")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vbo,
            ibo,
            index_count: indices.len() as u32,
            instance_count,
        }
    }

    /// Two triangles covering clip space.
    pub fn screen_quad(device: &wgpu::Device) -> Self {
        Self::new(device, "Screen Quad", &QUAD_VERTICES, &QUAD_INDICES, 1)
    }

    /// One unit cube per voxel; the vertex shader places instance `i` from
    /// the Position texel it maps to.
    pub fn cube_batch(device: &wgpu::Device, instances: u32) -> Self {
        Self::new(device, "Cube Batch", &CUBE_VERTICES, &CUBE_INDICES, instances)
    }

    pub fn draw<'p>(&'p self, pass: &mut wgpu::RenderPass<'p>) {
        pass.set_vertex_buffer(0, self.vbo.slice(..));
        pass.set_index_buffer(self.ibo.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
    }
}
