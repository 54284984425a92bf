//! 渲染栈
//!
//! 渲染栈是“无值”栈：每个启用的渲染模块从只读的粒子视图生成一段网格，
//! 按栈顺序拼接成一个网格，索引按已有顶点数偏移。

use super::pool::SlotIndex;
use crate::math::HostTransform;
use glam::Vec4;

/// 粒子顶点（对应着色器输入布局）
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
    /// 欧拉角（度）
    pub rotation: [f32; 3],
    pub _padding: f32,
}

/// CPU 端网格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<ParticleVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// 追加另一段网格，索引按当前顶点数偏移
    pub fn append(&mut self, other: Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices
            .extend(other.indices.into_iter().map(|i| i + offset));
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// 顶点数据的字节视图，可直接上传到顶点缓冲
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// 积分完成后的只读通道快照
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    pub active: &'a [SlotIndex],
    pub position: &'a [Vec4],
    pub rotation: &'a [Vec4],
    pub scale: &'a [Vec4],
    pub color: &'a [Vec4],
    pub pivot_offset: &'a [Vec4],
    pub custom_vector: &'a [Vec4],
    pub emitter: &'a HostTransform,
}

/// 渲染模块
pub trait RenderModule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// 为视图中的活跃粒子生成网格片段
    fn build(&self, view: &ParticleView<'_>) -> Mesh;
}

/// 每个粒子一个点精灵顶点
#[derive(Debug, Clone)]
pub struct PointSpriteModule {
    pub name: String,
    pub enabled: bool,
    /// 顶点大小 = scale.x * size_multiplier
    pub size_multiplier: f32,
}

impl PointSpriteModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            size_multiplier: 1.0,
        }
    }
}

impl RenderModule for PointSpriteModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn build(&self, view: &ParticleView<'_>) -> Mesh {
        let mut mesh = Mesh::default();
        for &i in view.active {
            let (Some(position), Some(pivot)) = (view.position.get(i), view.pivot_offset.get(i))
            else {
                continue;
            };
            let scale = view.scale.get(i).copied().unwrap_or(Vec4::ONE);
            let color = view.color.get(i).copied().unwrap_or(Vec4::ONE);
            let rotation = view.rotation.get(i).copied().unwrap_or(Vec4::ZERO);
            mesh.indices.push(mesh.vertices.len() as u32);
            mesh.vertices.push(ParticleVertex {
                position: (*position + *pivot).truncate().to_array(),
                size: scale.x * self.size_multiplier,
                color: color.to_array(),
                rotation: rotation.truncate().to_array(),
                _padding: 0.0,
            });
        }
        mesh
    }
}

/// 渲染模块栈
#[derive(Debug, Default)]
pub struct RenderStack {
    modules: Vec<Box<dyn RenderModule>>,
}

impl RenderStack {
    pub fn push(&mut self, module: Box<dyn RenderModule>) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<Box<dyn RenderModule>> {
        (index < self.modules.len()).then(|| self.modules.remove(index))
    }

    pub fn modules(&self) -> &[Box<dyn RenderModule>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 按栈顺序拼接所有启用模块的网格
    pub fn composite(&self, view: &ParticleView<'_>) -> Mesh {
        self.modules
            .iter()
            .filter(|m| m.is_enabled())
            .fold(Mesh::default(), |mut mesh, module| {
                mesh.append(module.build(view));
                mesh
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_fixture<'a>(
        active: &'a [SlotIndex],
        values: &'a [Vec4],
        emitter: &'a HostTransform,
    ) -> ParticleView<'a> {
        ParticleView {
            active,
            position: values,
            rotation: values,
            scale: values,
            color: values,
            pivot_offset: values,
            custom_vector: values,
            emitter,
        }
    }

    #[test]
    fn test_point_sprite_one_vertex_per_particle() {
        let values = [Vec4::ONE, Vec4::splat(2.0), Vec4::splat(3.0)];
        let emitter = HostTransform::default();
        let view = view_fixture(&[0, 2], &values, &emitter);
        let mesh = PointSpriteModule::new("points").build(&view);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1]);
        // 位置 + 枢轴偏移
        assert_eq!(mesh.vertices[1].position, [6.0, 6.0, 6.0]);
        assert_eq!(mesh.vertices[1].size, 3.0);
    }

    #[test]
    fn test_composite_offsets_indices() {
        let values = [Vec4::ONE, Vec4::ONE];
        let emitter = HostTransform::default();
        let view = view_fixture(&[0, 1], &values, &emitter);

        let mut disabled = PointSpriteModule::new("off");
        disabled.enabled = false;
        let mut stack = RenderStack::default();
        stack
            .push(Box::new(PointSpriteModule::new("a")))
            .push(Box::new(disabled))
            .push(Box::new(PointSpriteModule::new("b")));

        let mesh = stack.composite(&view);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3]);
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<ParticleVertex>());
    }
}
