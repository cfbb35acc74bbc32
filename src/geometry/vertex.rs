/// 顶点定义模块
///
/// 定义渲染管线输入装配阶段使用的顶点结构，
/// 与管线状态对象中的输入布局一一对应。

use bytemuck::{Pod, Zeroable};

use crate::math::Color;

/// 渲染顶点
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)，偏移 0，语义 `POSITION`
/// - color: 16 bytes (4 * f32)，偏移 12，语义 `COLOR`
/// - texcoord: 8 bytes (2 * f32)，偏移 28，语义 `TEXCOORD`
/// - **总计**: 36 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 顶点颜色 (r, g, b, a)
    pub color: [f32; 4],

    /// 纹理坐标 (u, v)
    pub texcoord: [f32; 2],
}

impl Vertex {
    /// 顶点跨度（字节）
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// 各属性在顶点中的字节偏移
    pub const POSITION_OFFSET: u32 = 0;
    pub const COLOR_OFFSET: u32 = 12;
    pub const TEXCOORD_OFFSET: u32 = 28;

    /// 创建一个新的顶点
    #[inline]
    pub fn new(position: [f32; 3], color: Color, texcoord: [f32; 2]) -> Self {
        Self {
            position,
            color: color.to_array(),
            texcoord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(Vertex::STRIDE, 36);
        assert_eq!(std::mem::offset_of!(Vertex, color) as u32, Vertex::COLOR_OFFSET);
        assert_eq!(std::mem::offset_of!(Vertex, texcoord) as u32, Vertex::TEXCOORD_OFFSET);
    }

    #[test]
    fn test_vertex_bytes() {
        let v = Vertex::new([1.0, 2.0, 3.0], Color::RED, [0.5, 0.25]);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
    }
}
