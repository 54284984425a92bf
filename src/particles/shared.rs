//! 共享栈
//!
//! 共享栈保存可被其他模块引用的属性。引用使用带代数的句柄，
//! 删除条目后旧句柄失效，不会指向后来复用同一槽位的属性。

use super::property::{DataMode, Property};
use crate::core::error::SharedError;

/// 共享属性句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct SharedSlot {
    generation: u32,
    entry: Option<(String, Property)>,
}

/// 共享属性栈
#[derive(Debug, Clone, Default)]
pub struct SharedStack {
    slots: Vec<SharedSlot>,
}

impl SharedStack {
    /// 添加共享属性
    ///
    /// 共享属性不能是引用模式，这样引用链最多一层，不会成环。
    pub fn add(
        &mut self,
        name: impl Into<String>,
        property: Property,
    ) -> Result<SharedHandle, SharedError> {
        let name = name.into();
        if matches!(property.mode, DataMode::Reference(_)) {
            return Err(SharedError::ReferenceNotAllowed(name));
        }

        if let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.entry.is_none())
        {
            slot.entry = Some((name, property));
            return Ok(SharedHandle {
                index: index as u32,
                generation: slot.generation,
            });
        }

        self.slots.push(SharedSlot {
            generation: 0,
            entry: Some((name, property)),
        });
        Ok(SharedHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        })
    }

    fn slot(&self, handle: SharedHandle) -> Option<&SharedSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
    }

    pub fn get(&self, handle: SharedHandle) -> Option<&Property> {
        self.slot(handle)
            .and_then(|s| s.entry.as_ref())
            .map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, handle: SharedHandle) -> Option<&mut Property> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.entry.as_mut())
            .map(|(_, p)| p)
    }

    /// 移除共享属性，使所有指向它的句柄失效
    pub fn remove(&mut self, handle: SharedHandle) -> Option<Property> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?;
        let (_, property) = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(property)
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<SharedHandle> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .filter(|(n, _)| n == name)
                .map(|_| SharedHandle {
                    index: index as u32,
                    generation: slot.generation,
                })
        })
    }

    pub fn contains(&self, handle: SharedHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::property::ValueKind;

    #[test]
    fn test_add_find_remove() {
        let mut shared = SharedStack::default();
        let h = shared.add("gravity", Property::scalar(-9.8)).unwrap();
        assert_eq!(shared.find("gravity"), Some(h));
        assert_eq!(shared.len(), 1);

        assert!(shared.remove(h).is_some());
        assert!(!shared.contains(h));
        assert!(shared.remove(h).is_none());
        assert!(shared.is_empty());
    }

    #[test]
    fn test_stale_handle_does_not_see_reused_slot() {
        let mut shared = SharedStack::default();
        let old = shared.add("a", Property::scalar(1.0)).unwrap();
        shared.remove(old);
        let new = shared.add("b", Property::scalar(2.0)).unwrap();
        assert_ne!(old, new);
        assert!(shared.get(old).is_none());
        assert!(shared.get(new).is_some());
    }

    #[test]
    fn test_reference_mode_rejected() {
        let mut shared = SharedStack::default();
        let h = shared.add("a", Property::scalar(1.0)).unwrap();
        let err = shared
            .add("b", Property::reference(ValueKind::Scalar, h))
            .unwrap_err();
        assert_eq!(err, SharedError::ReferenceNotAllowed("b".to_string()));
    }
}
