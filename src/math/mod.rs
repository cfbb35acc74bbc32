//! 统一的数学库模块
//!
//! 基于 `nalgebra` 提供渲染器需要的数学类型和函数。
//!
//! # 约定
//!
//! - 矩阵使用列向量约定（`M * v`），与 nalgebra 一致
//! - 投影和视图矩阵为左手坐标系，深度范围 [0, 1]（Direct3D 约定）
//! - 上传到 GPU 时使用 [`matrix::to_gpu_layout`]，即转置后按行写入，
//!   对应 HLSL 默认的 column_major 打包方式

pub use nalgebra::{
    Matrix4 as Mat4, Point3,
    Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 从整数值创建颜色（0-255）
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// 转换为数组
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    // 预定义颜色
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::constants;

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 创建缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 创建绕 Y 轴旋转的矩阵
    pub fn rotation_y(angle: f32) -> Matrix4 {
        Matrix4::from_axis_angle(&Vector3::y_axis(), angle)
    }

    /// 左手坐标系 Look-At 视图矩阵
    pub fn look_at_lh(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_lh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    /// 左手坐标系 Look-To 视图矩阵（给定观察方向而不是目标点）
    pub fn look_to_lh(eye: &Vector3, direction: &Vector3, up: &Vector3) -> Matrix4 {
        look_at_lh(eye, &(eye + direction), up)
    }

    /// 左手坐标系透视投影，深度映射到 [0, 1]
    ///
    /// `fov_y` 为垂直视场角（弧度），`aspect` 为宽 / 高。
    pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let h = 1.0 / (fov_y * 0.5).tan();
        let w = h / aspect;
        let range = far / (far - near);

        Matrix4::new(
            w, 0.0, 0.0, 0.0,
            0.0, h, 0.0, 0.0,
            0.0, 0.0, range, -range * near,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// 转换为常量缓冲区布局：转置后按行存储
    pub fn to_gpu_layout(m: &Matrix4) -> [[f32; 4]; 4] {
        let t = m.transpose();
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = t[(r, c)];
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_creation() {
        let color = Color::rgb(1.0, 0.5, 0.0);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.a, 1.0);
        assert_eq!(Color::from_rgba_u8(255, 0, 0, 255), Color::RED);
        assert_eq!(Color::from([0.0, 0.0, 1.0, 1.0]), Color::BLUE);
    }

    #[test]
    fn test_gpu_layout_is_transposed() {
        let mat = matrix::translation(1.0, 2.0, 3.0);
        let gpu = matrix::to_gpu_layout(&mat);

        // 平移分量位于第 4 列，转置后成为第 4 行
        assert_eq!(gpu[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(gpu[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = matrix::perspective_fov_lh(constants::PI / 2.0, 1.0, 1.0, 100.0);

        let near = proj * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, 100.0, 1.0);

        assert!(utils::approx_eq(near.z / near.w, 0.0, 1e-5));
        assert!(utils::approx_eq(far.z / far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_look_to_matches_look_at() {
        let eye = Vector3::new(0.0, 2.0, -5.0);
        let target = Vector3::new(0.0, 0.0, 0.0);
        let up = Vector3::new(0.0, 1.0, 0.0);

        let at = matrix::look_at_lh(&eye, &target, &up);
        let to = matrix::look_to_lh(&eye, &(target - eye), &up);
        assert!((at - to).abs().max() < 1e-5);

        // 左手坐标系：目标点位于观察空间 +Z
        let view_target = at * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(view_target.z > 0.0);
    }
}
