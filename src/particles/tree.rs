//! 发射器层级
//!
//! 效果由若干发射器组成的树表示。每帧按广度优先顺序推进所有发射器，
//! 某个发射器发出的事件在它的帧完成后，从它所在的根开始广度优先
//! 分发给同一棵树里的其他发射器（兄弟、祖先和子孙）。
//! 推进某个发射器时它会被暂时取出，其余发射器通过 [`EmitterLookup`]
//! 供跨发射器采样读取。

use super::context::{EmitterLookup, HostInputs};
use super::emitter::Emitter;
use super::events::EventData;
use crate::core::error::TreeError;
use std::collections::VecDeque;

/// 发射器在层级中的标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(pub usize);

#[derive(Debug)]
struct EmitterNode {
    /// 推进期间为 `None`
    emitter: Option<Emitter>,
    parent: Option<EmitterId>,
    children: Vec<EmitterId>,
}

/// 发射器树
#[derive(Debug, Default)]
pub struct EffectTree {
    nodes: Vec<EmitterNode>,
    roots: Vec<EmitterId>,
}

impl EffectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, emitter: Emitter) -> EmitterId {
        let id = self.insert(emitter, None);
        self.roots.push(id);
        id
    }

    pub fn add_child(
        &mut self,
        parent: EmitterId,
        emitter: Emitter,
    ) -> Result<EmitterId, TreeError> {
        if parent.0 >= self.nodes.len() {
            return Err(TreeError::UnknownEmitter(parent));
        }
        let id = self.insert(emitter, Some(parent));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn insert(&mut self, mut emitter: Emitter, parent: Option<EmitterId>) -> EmitterId {
        let id = EmitterId(self.nodes.len());
        emitter.attach(id, parent);
        self.nodes.push(EmitterNode {
            emitter: Some(emitter),
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: EmitterId) -> Option<&Emitter> {
        self.nodes.get(id.0).and_then(|n| n.emitter.as_ref())
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.nodes.get_mut(id.0).and_then(|n| n.emitter.as_mut())
    }

    pub fn parent(&self, id: EmitterId) -> Option<EmitterId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: EmitterId) -> &[EmitterId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }

    pub fn find(&self, name: &str) -> Option<EmitterId> {
        (0..self.nodes.len())
            .map(EmitterId)
            .find(|&id| self.get(id).is_some_and(|e| e.name == name))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.emitter.as_ref().map(|e| (EmitterId(i), e)))
    }

    /// 所有发射器的活跃粒子总数
    pub fn active_particles(&self) -> usize {
        self.iter().map(|(_, e)| e.pool().active_count()).sum()
    }

    /// 广度优先顺序（根在前）
    pub fn breadth_first(&self) -> Vec<EmitterId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<EmitterId> = self.roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        order
    }

    /// 重置所有发射器，种子按层级顺序依次递增
    pub fn reset(&mut self, seed: i32) {
        for (offset, id) in self.breadth_first().into_iter().enumerate() {
            if let Some(emitter) = self.get_mut(id) {
                emitter.reset(seed.wrapping_add(offset as i32));
            }
        }
    }

    /// 推进一帧
    pub fn tick(&mut self, dt: f32, host: &HostInputs) {
        for id in self.breadth_first() {
            let Some(mut emitter) = self.nodes[id.0].emitter.take() else {
                continue;
            };
            let events = emitter.tick(dt, host, &*self);
            self.nodes[id.0].emitter = Some(emitter);
            if !events.is_empty() {
                self.deliver(id, &events);
            }
        }
    }

    /// `id` 所在树的根
    pub fn root_of(&self, id: EmitterId) -> EmitterId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// 把事件广度优先分发给与 `origin` 同根的其他发射器；返回接受的监听者总数
    ///
    /// `origin` 自身的监听者已在它的帧内收到事件，这里跳过。
    pub fn deliver(&mut self, origin: EmitterId, events: &[EventData]) -> usize {
        let mut accepted = 0;
        let mut queue = VecDeque::from([self.root_of(origin)]);
        while let Some(id) = queue.pop_front() {
            if id != origin {
                if let Some(emitter) = self.get_mut(id) {
                    accepted += events.iter().map(|e| emitter.handle_event(e)).sum::<usize>();
                }
            }
            queue.extend(self.children(id).iter().copied());
        }
        tracing::trace!(
            target: "particles.events",
            "Delivered {} event(s) from {:?}, {} listener(s) accepted",
            events.len(),
            origin,
            accepted
        );
        accepted
    }
}

impl EmitterLookup for EffectTree {
    fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.get(id)
    }
}
