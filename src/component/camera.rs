//! Camera 组件
//!
//! 管理相机的视图矩阵与投影矩阵。相机既可以注视一个目标点
//! （[`Camera::update_at`]），也可以沿一个方向观察（[`Camera::update_to`]）。

use crate::math::{matrix, Matrix4, Vector3};

/// 一次相机更新的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// 投影矩阵
    pub projection: Matrix4,
    /// 视图矩阵
    pub view: Matrix4,
}

impl CameraMatrices {
    /// 视图投影矩阵（先视图，后投影）
    pub fn view_projection(&self) -> Matrix4 {
        self.projection * self.view
    }
}

/// 透视镜头参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    /// 视口宽度
    pub view_width: f32,
    /// 视口高度
    pub view_height: f32,
    /// 垂直视场角（弧度）
    pub fov_y: f32,
    /// 近裁剪面距离
    pub near: f32,
    /// 远裁剪面距离
    pub far: f32,
}

impl Lens {
    /// 宽高比；高度为 0 时退化为 1
    pub fn aspect(&self) -> f32 {
        if self.view_height > 0.0 {
            self.view_width / self.view_height
        } else {
            1.0
        }
    }

    fn projection(&self) -> Matrix4 {
        matrix::perspective_fov_lh(self.fov_y, self.aspect(), self.near, self.far)
    }
}

/// Camera 组件
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3,
    look: Vector3,
    up: Vector3,
    lens: Lens,
    matrices: CameraMatrices,
}

impl Camera {
    /// 创建新的 Camera：位于原点，朝向 +Z，FOV 45 度
    pub fn new(view_width: f32, view_height: f32) -> Self {
        let mut camera = Self {
            position: Vector3::zeros(),
            look: Vector3::new(0.0, 0.0, 1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            lens: Lens {
                view_width,
                view_height,
                fov_y: std::f32::consts::FRAC_PI_4,
                near: 0.1,
                far: 1000.0,
            },
            matrices: CameraMatrices {
                projection: Matrix4::identity(),
                view: Matrix4::identity(),
            },
        };
        camera.update_to(camera.position, camera.look, camera.up, camera.lens);
        camera
    }

    /// 注视目标点
    pub fn update_at(&mut self, position: Vector3, target: Vector3, up: Vector3, lens: Lens) -> CameraMatrices {
        self.position = position;
        self.look = (target - position).normalize();
        self.up = up;
        self.lens = lens;
        self.matrices = CameraMatrices {
            projection: lens.projection(),
            view: matrix::look_at_lh(&position, &target, &up),
        };
        self.matrices
    }

    /// 沿给定方向观察
    pub fn update_to(&mut self, position: Vector3, direction: Vector3, up: Vector3, lens: Lens) -> CameraMatrices {
        self.position = position;
        self.look = direction.normalize();
        self.up = up;
        self.lens = lens;
        self.matrices = CameraMatrices {
            projection: lens.projection(),
            view: matrix::look_to_lh(&position, &direction, &up),
        };
        self.matrices
    }

    /// 视口尺寸变化时只重建投影矩阵
    pub fn set_viewport(&mut self, view_width: f32, view_height: f32) -> CameraMatrices {
        self.lens.view_width = view_width;
        self.lens.view_height = view_height;
        self.matrices.projection = self.lens.projection();
        self.matrices
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn look(&self) -> Vector3 {
        self.look
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn matrices(&self) -> CameraMatrices {
        self.matrices
    }
}
