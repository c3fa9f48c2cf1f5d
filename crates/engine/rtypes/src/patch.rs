//! Descriptor patches
//!
//! A patch is an ordered list of [`DescAction`]s. Each action adds, removes or
//! changes one element of a [`RootDesc`]. Fields are carried as JSON values
//! in the API dump shape, so an action can describe any member kind without a
//! dedicated struct per element.

use crate::desc::{ClassDesc, EnumDesc, EnumItemDesc, MemberDesc, RootDesc};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

pub type Fields = BTreeMap<String, Json>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Add,
    Remove,
    Change,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Add => "add",
            ActionKind::Remove => "remove",
            ActionKind::Change => "change",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    Class,
    Property,
    Function,
    Event,
    Callback,
    Enum,
    EnumItem,
}

impl Element {
    /// The `MemberType` tag for member elements
    fn member_type(self) -> Option<&'static str> {
        match self {
            Element::Property => Some("Property"),
            Element::Function => Some("Function"),
            Element::Event => Some("Event"),
            Element::Callback => Some("Callback"),
            _ => None,
        }
    }

    fn of_member(member: &MemberDesc) -> Element {
        match member {
            MemberDesc::Property(_) => Element::Property,
            MemberDesc::Function(_) => Element::Function,
            MemberDesc::Event(_) => Element::Event,
            MemberDesc::Callback(_) => Element::Callback,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One step of a descriptor patch
///
/// `primary` names the class or enum. `secondary` names the member or enum
/// item, and is empty for class and enum actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescAction {
    #[serde(rename = "Type")]
    pub kind: ActionKind,
    pub element: Element,
    pub primary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secondary: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: Fields,
}

impl DescAction {
    pub fn new(kind: ActionKind, element: Element, primary: impl Into<String>) -> Self {
        Self {
            kind,
            element,
            primary: primary.into(),
            secondary: String::new(),
            fields: Fields::new(),
        }
    }

    /// Set the member or item name; builder style
    pub fn secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = secondary.into();
        self
    }

    /// Set one field; builder style
    pub fn field(mut self, name: impl Into<String>, value: Json) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    fn target(&self) -> String {
        if self.secondary.is_empty() {
            self.primary.clone()
        } else {
            format!("{}.{}", self.primary, self.secondary)
        }
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::Patch {
            action: self.kind.to_string(),
            element: self.element.to_string(),
            name: self.target(),
            reason: reason.into(),
        }
    }
}

impl RootDesc {
    /// Apply the actions in order, producing a new schema
    pub fn patch(&self, actions: &[DescAction]) -> Result<RootDesc> {
        let mut desc = self.clone();
        for action in actions {
            desc.apply(action)?;
        }
        Ok(desc)
    }

    fn apply(&mut self, action: &DescAction) -> Result<()> {
        match action.element {
            Element::Class => self.apply_class(action),
            Element::Enum => self.apply_enum(action),
            Element::EnumItem => self.apply_enum_item(action),
            _ => self.apply_member(action),
        }
    }

    fn apply_class(&mut self, action: &DescAction) -> Result<()> {
        let name = &action.primary;
        match action.kind {
            ActionKind::Add => {
                if self.classes.contains_key(name) {
                    return Err(action.fail("class already exists"));
                }
                let class = overlay(&ClassDesc::new(name.as_str(), ""), &action.fields, &["Name", "Members"])
                    .map_err(|e| action.fail(e))?;
                self.classes.insert(name.clone(), class);
            }
            ActionKind::Remove => {
                self.classes
                    .remove(name)
                    .ok_or_else(|| action.fail("class does not exist"))?;
            }
            ActionKind::Change => {
                let class = self
                    .classes
                    .get_mut(name)
                    .ok_or_else(|| action.fail("class does not exist"))?;
                let mut changed: ClassDesc =
                    overlay(class, &action.fields, &["Name", "Members"]).map_err(|e| action.fail(e))?;
                changed.members = std::mem::take(&mut class.members);
                *class = changed;
            }
        }
        Ok(())
    }

    fn apply_member(&mut self, action: &DescAction) -> Result<()> {
        let member_type = action
            .element
            .member_type()
            .ok_or_else(|| action.fail("not a member element"))?;
        let class = self
            .classes
            .get_mut(&action.primary)
            .ok_or_else(|| action.fail("class does not exist"))?;
        let index = class
            .members
            .iter()
            .position(|m| m.name() == action.secondary);

        match action.kind {
            ActionKind::Add => {
                if index.is_some() {
                    return Err(action.fail("member already exists"));
                }
                let mut base = Fields::new();
                base.insert("MemberType".into(), Json::from(member_type));
                base.insert("Name".into(), Json::from(action.secondary.as_str()));
                let member = from_fields(base, &action.fields, &["MemberType", "Name"])
                    .map_err(|e| action.fail(e))?;
                class.members.push(member);
            }
            ActionKind::Remove => {
                let index = index.ok_or_else(|| action.fail("member does not exist"))?;
                if class.members[index].member_type() != member_type {
                    return Err(action.fail(format!("member is a {}", class.members[index].member_type())));
                }
                class.members.remove(index);
            }
            ActionKind::Change => {
                let index = index.ok_or_else(|| action.fail("member does not exist"))?;
                let current = &class.members[index];
                if current.member_type() != member_type {
                    return Err(action.fail(format!("member is a {}", current.member_type())));
                }
                let changed = overlay(current, &action.fields, &["MemberType", "Name"])
                    .map_err(|e| action.fail(e))?;
                class.members[index] = changed;
            }
        }
        Ok(())
    }

    fn apply_enum(&mut self, action: &DescAction) -> Result<()> {
        let name = &action.primary;
        match action.kind {
            ActionKind::Add => {
                if self.enums.contains_key(name) {
                    return Err(action.fail("enum already exists"));
                }
                let desc = overlay(&EnumDesc::new(name.as_str()), &action.fields, &["Name", "Items"])
                    .map_err(|e| action.fail(e))?;
                self.enums.insert(name.clone(), desc);
            }
            ActionKind::Remove => {
                self.enums
                    .remove(name)
                    .ok_or_else(|| action.fail("enum does not exist"))?;
            }
            ActionKind::Change => {
                let desc = self
                    .enums
                    .get_mut(name)
                    .ok_or_else(|| action.fail("enum does not exist"))?;
                let mut changed: EnumDesc =
                    overlay(desc, &action.fields, &["Name", "Items"]).map_err(|e| action.fail(e))?;
                changed.items = std::mem::take(&mut desc.items);
                *desc = changed;
            }
        }
        Ok(())
    }

    fn apply_enum_item(&mut self, action: &DescAction) -> Result<()> {
        let desc = self
            .enums
            .get_mut(&action.primary)
            .ok_or_else(|| action.fail("enum does not exist"))?;
        let index = desc.items.iter().position(|i| i.name == action.secondary);

        match action.kind {
            ActionKind::Add => {
                if index.is_some() {
                    return Err(action.fail("item already exists"));
                }
                let item = EnumItemDesc {
                    name: action.secondary.clone(),
                    ..Default::default()
                };
                let item = overlay(&item, &action.fields, &["Name"]).map_err(|e| action.fail(e))?;
                desc.items.push(item);
            }
            ActionKind::Remove => {
                let index = index.ok_or_else(|| action.fail("item does not exist"))?;
                desc.items.remove(index);
            }
            ActionKind::Change => {
                let index = index.ok_or_else(|| action.fail("item does not exist"))?;
                let item = overlay(&desc.items[index], &action.fields, &["Name"])
                    .map_err(|e| action.fail(e))?;
                desc.items[index] = item;
            }
        }
        Ok(())
    }

    /// The actions that turn `prev` into `next`
    ///
    /// Classes come first, then enums, each in name order. Within a class,
    /// members that keep their relative order are changed in place and the
    /// rest are re-added at the end, so that `prev.patch(&diff)` equals
    /// `next` exactly.
    pub fn diff(prev: &RootDesc, next: &RootDesc) -> Vec<DescAction> {
        let mut actions = Vec::new();

        for name in prev.classes.keys() {
            if !next.classes.contains_key(name) {
                actions.push(DescAction::new(ActionKind::Remove, Element::Class, name.as_str()));
            }
        }
        for (name, class) in &next.classes {
            match prev.classes.get(name) {
                None => {
                    let mut add = DescAction::new(ActionKind::Add, Element::Class, name.as_str());
                    add.fields = fields_of(class, &["Name", "Members"]);
                    actions.push(add);
                    for member in &class.members {
                        actions.push(add_member(name, member));
                    }
                }
                Some(old) => diff_class(old, class, &mut actions),
            }
        }

        for name in prev.enums.keys() {
            if !next.enums.contains_key(name) {
                actions.push(DescAction::new(ActionKind::Remove, Element::Enum, name.as_str()));
            }
        }
        for (name, desc) in &next.enums {
            match prev.enums.get(name) {
                None => {
                    let mut add = DescAction::new(ActionKind::Add, Element::Enum, name.as_str());
                    add.fields = fields_of(desc, &["Name", "Items"]);
                    actions.push(add);
                    for item in &desc.items {
                        actions.push(add_item(name, item));
                    }
                }
                Some(old) => diff_enum(old, desc, &mut actions),
            }
        }

        actions
    }
}

fn add_member(class: &str, member: &MemberDesc) -> DescAction {
    let mut add = DescAction::new(ActionKind::Add, Element::of_member(member), class).secondary(member.name());
    add.fields = fields_of(member, &["MemberType", "Name"]);
    add
}

fn add_item(enum_name: &str, item: &EnumItemDesc) -> DescAction {
    let mut add = DescAction::new(ActionKind::Add, Element::EnumItem, enum_name).secondary(item.name.as_str());
    add.fields = fields_of(item, &["Name"]);
    add
}

fn diff_class(old: &ClassDesc, new: &ClassDesc, actions: &mut Vec<DescAction>) {
    let changed = changed_fields(old, new, &["Name", "Members"]);
    if !changed.is_empty() {
        let mut change = DescAction::new(ActionKind::Change, Element::Class, new.name.as_str());
        change.fields = changed;
        actions.push(change);
    }

    let old_names: Vec<&str> = old.members.iter().map(|m| m.name()).collect();
    let new_names: Vec<&str> = new.members.iter().map(|m| m.name()).collect();
    let kept = stable_prefix(&old_names, &new_names);

    for member in &old.members {
        let stays = new.members[..kept].iter().any(|m| m.name() == member.name());
        let same_kind = new
            .member(member.name())
            .is_some_and(|m| m.member_type() == member.member_type());
        if !stays || !same_kind {
            actions.push(
                DescAction::new(ActionKind::Remove, Element::of_member(member), new.name.as_str())
                    .secondary(member.name()),
            );
        }
    }
    for (index, member) in new.members.iter().enumerate() {
        let previous = old.member(member.name());
        match previous {
            Some(prev) if index < kept && prev.member_type() == member.member_type() => {
                let changed = changed_fields(prev, member, &["MemberType", "Name"]);
                if !changed.is_empty() {
                    let mut change =
                        DescAction::new(ActionKind::Change, Element::of_member(member), new.name.as_str())
                            .secondary(member.name());
                    change.fields = changed;
                    actions.push(change);
                }
            }
            _ => actions.push(add_member(&new.name, member)),
        }
    }
}

fn diff_enum(old: &EnumDesc, new: &EnumDesc, actions: &mut Vec<DescAction>) {
    let changed = changed_fields(old, new, &["Name", "Items"]);
    if !changed.is_empty() {
        let mut change = DescAction::new(ActionKind::Change, Element::Enum, new.name.as_str());
        change.fields = changed;
        actions.push(change);
    }

    let old_names: Vec<&str> = old.items.iter().map(|i| i.name.as_str()).collect();
    let new_names: Vec<&str> = new.items.iter().map(|i| i.name.as_str()).collect();
    let kept = stable_prefix(&old_names, &new_names);

    for item in &old.items {
        if !new.items[..kept].iter().any(|i| i.name == item.name) {
            actions.push(
                DescAction::new(ActionKind::Remove, Element::EnumItem, new.name.as_str())
                    .secondary(item.name.as_str()),
            );
        }
    }
    for (index, item) in new.items.iter().enumerate() {
        let previous = old.items.iter().find(|i| i.name == item.name);
        match previous {
            Some(prev) if index < kept => {
                let changed = changed_fields(prev, item, &["Name"]);
                if !changed.is_empty() {
                    let mut change = DescAction::new(ActionKind::Change, Element::EnumItem, new.name.as_str())
                        .secondary(item.name.as_str());
                    change.fields = changed;
                    actions.push(change);
                }
            }
            _ => actions.push(add_item(&new.name, item)),
        }
    }
}

/// Length of the leading run of `next` that already exists in `prev` in the
/// same relative order
fn stable_prefix(prev: &[&str], next: &[&str]) -> usize {
    let surviving: Vec<&str> = prev.iter().copied().filter(|n| next.contains(n)).collect();
    next.iter()
        .zip(surviving.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

fn fields_of<T: Serialize>(value: &T, skip: &[&str]) -> Fields {
    match serde_json::to_value(value) {
        Ok(Json::Object(map)) => map
            .into_iter()
            .filter(|(k, _)| !skip.contains(&k.as_str()))
            .collect(),
        _ => Fields::new(),
    }
}

fn changed_fields<T: Serialize>(old: &T, new: &T, skip: &[&str]) -> Fields {
    let old = fields_of(old, skip);
    fields_of(new, skip)
        .into_iter()
        .filter(|(k, v)| old.get(k) != Some(v))
        .collect()
}

/// Serialize `base`, overwrite it with `fields` and read it back
fn overlay<T: Serialize + DeserializeOwned>(base: &T, fields: &Fields, locked: &[&str]) -> std::result::Result<T, String> {
    let base = fields_of(base, &[]);
    from_fields(base, fields, locked)
}

fn from_fields<T: DeserializeOwned>(mut base: Fields, fields: &Fields, locked: &[&str]) -> std::result::Result<T, String> {
    for (key, value) in fields {
        if !locked.contains(&key.as_str()) {
            base.insert(key.clone(), value.clone());
        }
    }
    let object: serde_json::Map<String, Json> = base.into_iter().collect();
    serde_json::from_value(Json::Object(object)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{PropertyDesc, TypeDesc};
    use serde_json::json;

    fn base() -> RootDesc {
        let mut part = ClassDesc::new("Part", "Instance");
        part.members.push(MemberDesc::Property(PropertyDesc {
            name: "Size".into(),
            value_type: TypeDesc::new("DataType", "Vector3"),
            ..Default::default()
        }));
        RootDesc::new()
            .with_class(ClassDesc::new("Instance", "<<<ROOT>>>"))
            .with_class(part)
            .with_enum(EnumDesc::new("Material").with_item("Plastic", 256))
    }

    #[test]
    fn test_add_property() {
        let actions = vec![DescAction::new(ActionKind::Add, Element::Property, "Part")
            .secondary("Anchored")
            .field("ValueType", json!({"Category": "Primitive", "Name": "bool"}))];
        let desc = base().patch(&actions).unwrap();
        let prop = desc.property("Part", "Anchored").unwrap();
        assert_eq!(prop.value_type.name, "bool");
        // The original is untouched
        assert!(base().property("Part", "Anchored").is_none());
    }

    #[test]
    fn test_patch_errors_name_the_element() {
        let add_existing = DescAction::new(ActionKind::Add, Element::Class, "Part");
        let err = base().patch(&[add_existing]).unwrap_err();
        assert_eq!(err.to_string(), "cannot add Class Part: class already exists");

        let remove_missing =
            DescAction::new(ActionKind::Remove, Element::EnumItem, "Material").secondary("Wood");
        let err = base().patch(&[remove_missing]).unwrap_err();
        assert_eq!(err.to_string(), "cannot remove EnumItem Material.Wood: item does not exist");

        let wrong_kind = DescAction::new(ActionKind::Change, Element::Function, "Part").secondary("Size");
        assert!(base().patch(&[wrong_kind]).is_err());
    }

    #[test]
    fn test_actions_apply_in_order() {
        let actions = vec![
            DescAction::new(ActionKind::Add, Element::Enum, "Shape"),
            DescAction::new(ActionKind::Add, Element::EnumItem, "Shape")
                .secondary("Ball")
                .field("Value", json!(0)),
            DescAction::new(ActionKind::Change, Element::EnumItem, "Shape")
                .secondary("Ball")
                .field("Value", json!(3)),
        ];
        let desc = base().patch(&actions).unwrap();
        assert_eq!(desc.enum_("Shape").unwrap().item_by_name("Ball").unwrap().value, 3);

        let reversed: Vec<DescAction> = actions.into_iter().rev().collect();
        assert!(base().patch(&reversed).is_err());
    }

    #[test]
    fn test_change_class_keeps_members() {
        let change = DescAction::new(ActionKind::Change, Element::Class, "Part")
            .field("Superclass", json!("BasePart"))
            .field("Members", json!([]));
        let desc = base().patch(&[change]).unwrap();
        let part = desc.class("Part").unwrap();
        assert_eq!(part.superclass, "BasePart");
        assert_eq!(part.members.len(), 1);
    }

    #[test]
    fn test_diff_then_patch_reproduces_next() {
        let prev = base();
        let mut part = prev.class("Part").unwrap().clone();
        part.members.insert(
            0,
            MemberDesc::Property(PropertyDesc {
                name: "Anchored".into(),
                value_type: TypeDesc::new("Primitive", "bool"),
                ..Default::default()
            }),
        );
        part.tags.push(json!("NotCreatable"));
        let next = prev
            .clone()
            .with_class(part)
            .with_class(ClassDesc::new("Model", "Instance"))
            .with_enum(EnumDesc::new("Material").with_item("Plastic", 256).with_item("Wood", 512));
        let mut next = next;
        next.classes.remove("Instance");

        let actions = RootDesc::diff(&prev, &next);
        assert_eq!(prev.patch(&actions).unwrap(), next);
        assert!(RootDesc::diff(&next, &next).is_empty());
    }

    #[test]
    fn test_action_json_shape() {
        let action = DescAction::new(ActionKind::Remove, Element::Class, "Part");
        let encoded = serde_json::to_value(&action).unwrap();
        assert_eq!(encoded, json!({"Type": "Remove", "Element": "Class", "Primary": "Part"}));
        let decoded: DescAction = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, action);
    }
}
