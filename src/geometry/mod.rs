/// 几何体模块
///
/// CPU 侧的几何数据：顶点结构、几何体容器以及基本几何体生成。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构定义
/// - `primitive`: 三角形 / 正方形 / 立方体 / 球体生成
///
/// # 架构设计
///
/// ```text
/// create_primitive_geometry / 用户数据
///     ↓
/// Geometry (CPU侧数据)
///     ↓
/// Mesh (上传到GPU)
/// ```

pub mod vertex;
pub mod primitive;

pub use vertex::Vertex;
pub use primitive::{create_primitive_geometry, PrimitiveGeometryType};

/// CPU 侧几何数据
///
/// 简单的数据持有者，不包含 GPU 资源。索引为 32 位，每 3 个索引组成一个三角形。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// 顶点数组
    pub vertices: Vec<Vertex>,
    /// 三角形索引
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// 顶点缓冲区大小（字节）
    pub fn vertex_buffer_size(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()) as u64
    }

    /// 索引缓冲区大小（字节）
    pub fn index_buffer_size(&self) -> u64 {
        (self.indices.len() * std::mem::size_of::<u32>()) as u64
    }

    /// 校验索引是否全部落在顶点范围内且构成完整三角形
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!("index count {} is not a multiple of 3", self.indices.len()));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(format!(
                "index {} out of range for {} vertices",
                bad,
                self.vertices.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Color;

    #[test]
    fn test_geometry_sizes() {
        let geometry = create_primitive_geometry(PrimitiveGeometryType::Square, Color::WHITE);
        assert_eq!(geometry.vertex_buffer_size(), 4 * 36);
        assert_eq!(geometry.index_buffer_size(), 6 * 4);
        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut geometry = create_primitive_geometry(PrimitiveGeometryType::Triangle, Color::WHITE);
        geometry.indices.push(0);
        assert!(geometry.validate().is_err());

        geometry.indices = vec![0, 1, 7];
        assert!(geometry.validate().unwrap_err().contains("out of range"));
        assert!(Geometry::default().is_empty());
    }
}
