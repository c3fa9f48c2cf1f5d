//! Instance tree
//!
//! An [`Instance`] is a shared handle to a mutable node. The tree owns its
//! children top-down; the parent link is a `Weak` reference used only for
//! traversal, so dropping the last handle to a root frees the whole subtree.
//!
//! Invariants:
//! - the tree is acyclic; [`Instance::set_parent`] rejects self and descendants
//! - a DataModel never acquires a parent
//! - child order is insertion order, except after the `_fast` removals

use crate::{Error, Result, RootDesc, Value};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

const NAME: &str = "Name";

#[derive(Default)]
struct InstanceData {
    class_name: String,
    reference: String,
    is_service: bool,
    is_data_model: bool,
    parent_locked: bool,
    properties: HashMap<String, Value>,
    children: Vec<Instance>,
    parent: Weak<RefCell<InstanceData>>,
    desc: Option<Arc<RootDesc>>,
}

/// A shared handle to a node in the instance tree
///
/// Equality is identity: two handles are equal when they refer to the same
/// node.
#[derive(Clone)]
pub struct Instance(Rc<RefCell<InstanceData>>);

impl Instance {
    /// Create an instance whose `Name` is its class name
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let mut properties = HashMap::new();
        properties.insert(NAME.to_string(), Value::String(class_name.clone()));
        Self(Rc::new(RefCell::new(InstanceData {
            class_name,
            properties,
            ..Default::default()
        })))
    }

    /// Create a root DataModel, which can never be parented
    pub fn new_data_model() -> Self {
        let inst = Self::new("DataModel");
        inst.0.borrow_mut().is_data_model = true;
        inst
    }

    fn data(&self) -> Ref<'_, InstanceData> {
        self.0.borrow()
    }

    pub fn class_name(&self) -> String {
        self.data().class_name.clone()
    }

    pub fn set_class_name(&self, class_name: impl Into<String>) {
        self.0.borrow_mut().class_name = class_name.into();
    }

    /// The `Name` property, or an empty string when it is not stringlike
    pub fn name(&self) -> String {
        self.data()
            .properties
            .get(NAME)
            .and_then(|v| v.as_stringlike().map(|b| String::from_utf8_lossy(b).into_owned()))
            .unwrap_or_default()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.set(NAME, Value::String(name.into()));
    }

    /// Opaque reference id used by model formats
    pub fn reference(&self) -> String {
        self.data().reference.clone()
    }

    pub fn set_reference(&self, reference: impl Into<String>) {
        self.0.borrow_mut().reference = reference.into();
    }

    pub fn is_service(&self) -> bool {
        self.data().is_service
    }

    pub fn set_service(&self, is_service: bool) {
        self.0.borrow_mut().is_service = is_service;
    }

    pub fn is_data_model(&self) -> bool {
        self.data().is_data_model
    }

    /// Get a property value
    pub fn get(&self, name: &str) -> Option<Value> {
        self.data().properties.get(name).cloned()
    }

    /// Set a property value, returning the previous one
    pub fn set(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        debug_assert!(value.is_prop_value(), "tuples cannot be stored as properties");
        self.0.borrow_mut().properties.insert(name.into(), value)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().properties.remove(name)
    }

    /// All properties, sorted by name
    pub fn properties(&self) -> BTreeMap<String, Value> {
        self.data()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The descriptor attached directly to this instance
    pub fn desc(&self) -> Option<Arc<RootDesc>> {
        self.data().desc.clone()
    }

    pub fn set_desc(&self, desc: Option<Arc<RootDesc>>) {
        self.0.borrow_mut().desc = desc;
    }

    /// The descriptor of this instance or of its nearest ancestor that has one
    pub fn nearest_desc(&self) -> Option<Arc<RootDesc>> {
        let mut current = Some(self.clone());
        while let Some(inst) = current {
            if let Some(desc) = inst.desc() {
                return Some(desc);
            }
            current = inst.parent();
        }
        None
    }

    pub fn parent(&self) -> Option<Instance> {
        self.data().parent.upgrade().map(Instance)
    }

    /// Children in order
    pub fn children(&self) -> Vec<Instance> {
        self.data().children.clone()
    }

    /// Move this instance under `parent`, or detach it with `None`
    pub fn set_parent(&self, parent: Option<&Instance>) -> Result<()> {
        {
            let data = self.data();
            if data.is_data_model && parent.is_some() {
                return Err(Error::DataModelParent);
            }
            if data.parent_locked {
                return Err(Error::ParentLocked(self.name()));
            }
        }
        if let Some(parent) = parent {
            if parent == self || self.is_ancestor_of(parent) {
                return Err(Error::CyclicParent {
                    child: self.name(),
                    parent: parent.name(),
                });
            }
            if self.parent().as_ref() == Some(parent) {
                return Ok(());
            }
        }

        self.detach();
        if let Some(parent) = parent {
            parent.0.borrow_mut().children.push(self.clone());
            self.0.borrow_mut().parent = Rc::downgrade(&parent.0);
        }
        Ok(())
    }

    /// Remove from the current parent, keeping sibling order
    fn detach(&self) {
        if let Some(old) = self.parent() {
            let mut old = old.0.borrow_mut();
            if let Some(index) = old.children.iter().position(|c| c == self) {
                old.children.remove(index);
            }
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Remove the child at `index`, keeping sibling order
    pub fn remove_child_at(&self, index: usize) -> Option<Instance> {
        let child = {
            let mut data = self.0.borrow_mut();
            if index >= data.children.len() {
                return None;
            }
            data.children.remove(index)
        };
        child.0.borrow_mut().parent = Weak::new();
        Some(child)
    }

    /// Remove the child at `index` in O(1); the last child takes its place
    pub fn remove_child_at_fast(&self, index: usize) -> Option<Instance> {
        let child = {
            let mut data = self.0.borrow_mut();
            if index >= data.children.len() {
                return None;
            }
            data.children.swap_remove(index)
        };
        child.0.borrow_mut().parent = Weak::new();
        Some(child)
    }

    /// Detach every child
    pub fn clear_all_children(&self) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in children {
            child.0.borrow_mut().parent = Weak::new();
        }
    }

    /// Detach from the parent and lock the parent so it cannot change again
    pub fn destroy(&self) {
        self.detach();
        self.0.borrow_mut().parent_locked = true;
        for child in self.children() {
            child.destroy();
        }
    }

    /// Copy this instance and its descendants
    ///
    /// The copy has no parent and no reference id. Instance-valued
    /// properties that point inside the copied subtree are redirected to the
    /// corresponding copies.
    pub fn clone_deep(&self) -> Instance {
        let mut copies: HashMap<*const RefCell<InstanceData>, Instance> = HashMap::new();
        let root = self.copy_subtree(&mut copies);
        for copy in copies.values() {
            let mut data = copy.0.borrow_mut();
            for value in data.properties.values_mut() {
                if let Value::Instance(target) = value {
                    if let Some(mapped) = copies.get(&Rc::as_ptr(&target.0)) {
                        *value = Value::Instance(mapped.clone());
                    }
                }
            }
        }
        root
    }

    fn copy_subtree(&self, copies: &mut HashMap<*const RefCell<InstanceData>, Instance>) -> Instance {
        let copy = {
            let data = self.data();
            Instance(Rc::new(RefCell::new(InstanceData {
                class_name: data.class_name.clone(),
                is_service: data.is_service,
                is_data_model: data.is_data_model,
                properties: data
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.copy()))
                    .collect(),
                desc: data.desc.clone(),
                ..Default::default()
            })))
        };
        copies.insert(Rc::as_ptr(&self.0), copy.clone());
        for child in self.children() {
            let child_copy = child.copy_subtree(copies);
            child_copy.0.borrow_mut().parent = Rc::downgrade(&copy.0);
            copy.0.borrow_mut().children.push(child_copy);
        }
        copy
    }

    /// Every descendant in depth-first pre-order
    pub fn descendants(&self) -> Vec<Instance> {
        let mut out = Vec::new();
        let mut stack: Vec<Instance> = self.children().into_iter().rev().collect();
        while let Some(inst) = stack.pop() {
            stack.extend(inst.children().into_iter().rev());
            out.push(inst);
        }
        out
    }

    /// Whether this instance is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &Instance) -> bool {
        let mut current = other.parent();
        while let Some(inst) = current {
            if &inst == self {
                return true;
            }
            current = inst.parent();
        }
        false
    }

    /// Whether this instance is a strict descendant of `other`
    pub fn is_descendant_of(&self, other: &Instance) -> bool {
        other.is_ancestor_of(self)
    }

    /// Dot-separated names from the top of the tree, excluding a DataModel root
    pub fn full_name(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(inst) = current {
            if inst.is_data_model() {
                break;
            }
            names.push(inst.name());
            current = inst.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// First child with the given name; searches all descendants when `recursive`
    pub fn find_first_child(&self, name: &str, recursive: bool) -> Option<Instance> {
        let candidates = if recursive {
            self.descendants()
        } else {
            self.children()
        };
        candidates.into_iter().find(|c| c.name() == name)
    }

    /// First child with exactly the given class name
    pub fn find_first_child_of_class(&self, class_name: &str) -> Option<Instance> {
        self.children()
            .into_iter()
            .find(|c| c.class_name() == class_name)
    }

    /// Nearest ancestor with the given name
    pub fn find_first_ancestor(&self, name: &str) -> Option<Instance> {
        self.find_ancestor(|inst| inst.name() == name)
    }

    /// Nearest ancestor with exactly the given class name
    pub fn find_first_ancestor_of_class(&self, class_name: &str) -> Option<Instance> {
        self.find_ancestor(|inst| inst.class_name() == class_name)
    }

    fn find_ancestor(&self, pred: impl Fn(&Instance) -> bool) -> Option<Instance> {
        let mut current = self.parent();
        while let Some(inst) = current {
            if pred(&inst) {
                return Some(inst);
            }
            current = inst.parent();
        }
        None
    }

    /// Whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Instance")
            .field("class_name", &data.class_name)
            .field("children", &data.children.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(class: &str, name: &str) -> Instance {
        let inst = Instance::new(class);
        inst.set_name(name);
        inst
    }

    #[test]
    fn test_parenting_preserves_order() {
        let model = Instance::new("Model");
        let a = named("Part", "A");
        let b = named("Part", "B");
        let c = named("Part", "C");
        for child in [&a, &b, &c] {
            child.set_parent(Some(&model)).unwrap();
        }

        b.set_parent(None).unwrap();
        let names: Vec<String> = model.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(b.parent().is_none());
        assert_eq!(a.parent(), Some(model.clone()));
    }

    #[test]
    fn test_fast_removal_trades_order() {
        let model = Instance::new("Model");
        for name in ["A", "B", "C"] {
            named("Part", name).set_parent(Some(&model)).unwrap();
        }

        let removed = model.remove_child_at_fast(0).unwrap();
        assert_eq!(removed.name(), "A");
        assert!(removed.parent().is_none());
        let names: Vec<String> = model.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["C", "B"]);
        assert!(model.remove_child_at_fast(5).is_none());
    }

    #[test]
    fn test_cycle_rejected() {
        let a = Instance::new("Folder");
        let b = Instance::new("Folder");
        b.set_parent(Some(&a)).unwrap();

        assert!(matches!(a.set_parent(Some(&b)), Err(Error::CyclicParent { .. })));
        assert!(matches!(a.set_parent(Some(&a)), Err(Error::CyclicParent { .. })));
        assert!(a.parent().is_none());
    }

    #[test]
    fn test_data_model_cannot_be_parented() {
        let game = Instance::new_data_model();
        let folder = Instance::new("Folder");
        assert_eq!(game.set_parent(Some(&folder)), Err(Error::DataModelParent));
        assert!(game.set_parent(None).is_ok());
    }

    #[test]
    fn test_weak_parent_does_not_keep_alive() {
        let child = Instance::new("Part");
        {
            let model = Instance::new("Model");
            child.set_parent(Some(&model)).unwrap();
            assert!(child.parent().is_some());
        }
        assert!(child.parent().is_none());
    }

    #[test]
    fn test_clone_deep_remaps_internal_references() {
        let model = named("Model", "M");
        let part = named("Part", "P");
        part.set_parent(Some(&model)).unwrap();
        let outside = Instance::new("Part");
        model.set("PrimaryPart", Value::Instance(part.clone()));
        model.set("Other", Value::Instance(outside.clone()));
        model.set_reference("RBX1");

        let copy = model.clone_deep();
        let copied_part = copy.children()[0].clone();
        assert_ne!(copied_part, part);
        assert_eq!(copy.get("PrimaryPart"), Some(Value::Instance(copied_part)));
        assert_eq!(copy.get("Other"), Some(Value::Instance(outside)));
        assert_eq!(copy.reference(), "");
        assert!(copy.parent().is_none());
    }

    #[test]
    fn test_destroy_locks_parent() {
        let model = Instance::new("Model");
        let part = Instance::new("Part");
        part.set_parent(Some(&model)).unwrap();
        part.destroy();

        assert!(model.children().is_empty());
        assert!(matches!(part.set_parent(Some(&model)), Err(Error::ParentLocked(_))));
    }

    #[test]
    fn test_queries() {
        let game = Instance::new_data_model();
        let workspace = named("Workspace", "Workspace");
        let model = named("Model", "House");
        let door = named("Part", "Door");
        workspace.set_parent(Some(&game)).unwrap();
        model.set_parent(Some(&workspace)).unwrap();
        door.set_parent(Some(&model)).unwrap();

        assert_eq!(door.full_name(), "Workspace.House.Door");
        assert_eq!(game.descendants().len(), 3);
        assert!(game.is_ancestor_of(&door));
        assert!(door.is_descendant_of(&workspace));
        assert!(workspace.find_first_child("Door", false).is_none());
        assert_eq!(workspace.find_first_child("Door", true), Some(door.clone()));
        assert_eq!(door.find_first_ancestor_of_class("Workspace"), Some(workspace.clone()));
        assert_eq!(door.find_first_ancestor("House"), Some(model));
    }

    #[test]
    fn test_nearest_desc() {
        let desc = Arc::new(RootDesc::new());
        let model = Instance::new("Model");
        let part = Instance::new("Part");
        part.set_parent(Some(&model)).unwrap();

        assert!(part.nearest_desc().is_none());
        model.set_desc(Some(desc.clone()));
        assert!(Arc::ptr_eq(&part.nearest_desc().unwrap(), &desc));
        assert!(part.desc().is_none());
    }
}
