/// 基本几何体生成
///
/// 生成三角形、正方形、立方体和球体。所有三角形在左手坐标系下
/// 以顺时针顺序作为正面，与管线的背面剔除设置一致。

use super::{Geometry, Vertex};
use crate::math::{constants::PI, Color};

/// 球体的纬线（堆叠）数量
pub const SPHERE_STACKS: u32 = 16;
/// 球体的经线（切片）数量
pub const SPHERE_SLICES: u32 = 24;

/// 基本几何体类型
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveGeometryType {
    /// 单个三角形（XY 平面，面向 -Z）
    Triangle,
    /// 单位正方形（XY 平面，面向 -Z）
    Square,
    /// 边长为 1 的立方体
    Cube,
    /// 半径为 0.5 的 UV 球体
    Sphere,
}

/// 生成基本几何体，所有顶点使用同一颜色
pub fn create_primitive_geometry(kind: PrimitiveGeometryType, color: Color) -> Geometry {
    match kind {
        PrimitiveGeometryType::Triangle => triangle(color),
        PrimitiveGeometryType::Square => square(color),
        PrimitiveGeometryType::Cube => cube(color),
        PrimitiveGeometryType::Sphere => sphere(color, 0.5, SPHERE_SLICES, SPHERE_STACKS),
    }
}

fn triangle(color: Color) -> Geometry {
    Geometry::new(
        vec![
            Vertex::new([-0.5, -0.5, 0.0], color, [0.0, 1.0]),
            Vertex::new([0.0, 0.5, 0.0], color, [0.5, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], color, [1.0, 1.0]),
        ],
        vec![0, 1, 2],
    )
}

fn square(color: Color) -> Geometry {
    Geometry::new(
        vec![
            Vertex::new([-0.5, -0.5, 0.0], color, [0.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], color, [0.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], color, [1.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], color, [1.0, 1.0]),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

fn cube(color: Color) -> Geometry {
    const H: f32 = 0.5;
    // 每个面 4 个顶点，保证每个面拥有独立的 UV
    let faces: [[([f32; 3], [f32; 2]); 4]; 6] = [
        // 前 (-Z)
        [([-H, -H, -H], [0.0, 1.0]), ([-H, H, -H], [0.0, 0.0]), ([H, H, -H], [1.0, 0.0]), ([H, -H, -H], [1.0, 1.0])],
        // 后 (+Z)
        [([-H, -H, H], [1.0, 1.0]), ([H, -H, H], [0.0, 1.0]), ([H, H, H], [0.0, 0.0]), ([-H, H, H], [1.0, 0.0])],
        // 上 (+Y)
        [([-H, H, -H], [0.0, 1.0]), ([-H, H, H], [0.0, 0.0]), ([H, H, H], [1.0, 0.0]), ([H, H, -H], [1.0, 1.0])],
        // 下 (-Y)
        [([-H, -H, -H], [1.0, 1.0]), ([H, -H, -H], [0.0, 1.0]), ([H, -H, H], [0.0, 0.0]), ([-H, -H, H], [1.0, 0.0])],
        // 左 (-X)
        [([-H, -H, H], [0.0, 1.0]), ([-H, H, H], [0.0, 0.0]), ([-H, H, -H], [1.0, 0.0]), ([-H, -H, -H], [1.0, 1.0])],
        // 右 (+X)
        [([H, -H, -H], [0.0, 1.0]), ([H, H, -H], [0.0, 0.0]), ([H, H, H], [1.0, 0.0]), ([H, -H, H], [1.0, 1.0])],
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for face in faces.iter() {
        let base = vertices.len() as u32;
        vertices.extend(face.iter().map(|(p, uv)| Vertex::new(*p, color, *uv)));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Geometry::new(vertices, indices)
}

fn sphere(color: Color, radius: f32, slices: u32, stacks: u32) -> Geometry {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    vertices.push(Vertex::new([0.0, radius, 0.0], color, [0.0, 0.0]));

    let phi_step = PI / stacks as f32;
    let theta_step = 2.0 * PI / slices as f32;

    // 两极之间的纬线环；每环首尾顶点重合以便 UV 连续
    for i in 1..stacks {
        let phi = i as f32 * phi_step;
        for j in 0..=slices {
            let theta = j as f32 * theta_step;
            let position = [
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            ];
            vertices.push(Vertex::new(position, color, [theta / (2.0 * PI), phi / PI]));
        }
    }

    vertices.push(Vertex::new([0.0, -radius, 0.0], color, [0.0, 1.0]));

    // 北极扇形
    for i in 1..=slices {
        indices.extend_from_slice(&[0, i + 1, i]);
    }

    // 中间的四边形带
    let base = 1;
    let ring = slices + 1;
    for i in 0..stacks - 2 {
        for j in 0..slices {
            indices.extend_from_slice(&[
                base + i * ring + j,
                base + i * ring + j + 1,
                base + (i + 1) * ring + j,
                base + (i + 1) * ring + j,
                base + i * ring + j + 1,
                base + (i + 1) * ring + j + 1,
            ]);
        }
    }

    // 南极扇形
    let south = vertices.len() as u32 - 1;
    let last_ring = south - ring;
    for i in 0..slices {
        indices.extend_from_slice(&[south, last_ring + i, last_ring + i + 1]);
    }

    Geometry::new(vertices, indices)
}
