//! API descriptors: the optional schema of classes, members and enums
//!
//! A [`RootDesc`] is an immutable snapshot once built. It is shared behind an
//! `Arc` by every instance and script that uses it; deriving a new schema
//! (see [`RootDesc::patch`]) always produces a new value.
//!
//! The serde representation matches the JSON API dump shape:
//!
//! ```json
//! {
//!   "Version": 1,
//!   "Classes": [{ "Name": "Part", "Superclass": "BasePart", "Members": [
//!     { "MemberType": "Property", "Name": "BrickColor",
//!       "ValueType": { "Category": "Enum", "Name": "BrickColor" } }
//!   ] }],
//!   "Enums": [{ "Name": "BrickColor", "Items": [{ "Name": "Red", "Value": 21 }] }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag values are usually plain strings, but newer dumps also carry objects
pub type Tag = serde_json::Value;

fn has_tag(tags: &[Tag], name: &str) -> bool {
    tags.iter().any(|t| t.as_str() == Some(name))
}

/// The type of a property, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TypeDesc {
    /// `Primitive`, `DataType`, `Class`, `Enum` or `Group`
    pub category: String,
    pub name: String,
}

impl TypeDesc {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PropertySecurity {
    pub read: String,
    pub write: String,
}

impl Default for PropertySecurity {
    fn default() -> Self {
        Self {
            read: "None".into(),
            write: "None".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Serialization {
    pub can_load: bool,
    pub can_save: bool,
}

impl Default for Serialization {
    fn default() -> Self {
        Self {
            can_load: true,
            can_save: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PropertyDesc {
    pub name: String,
    pub value_type: TypeDesc,
    pub category: String,
    pub security: PropertySecurity,
    pub serialization: Serialization,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterDesc {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: TypeDesc,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FunctionDesc {
    pub name: String,
    pub parameters: Vec<ParameterDesc>,
    pub return_type: TypeDesc,
    pub security: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventDesc {
    pub name: String,
    pub parameters: Vec<ParameterDesc>,
    pub security: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CallbackDesc {
    pub name: String,
    pub parameters: Vec<ParameterDesc>,
    pub return_type: TypeDesc,
    pub security: String,
    pub tags: Vec<Tag>,
}

/// A member of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "MemberType")]
pub enum MemberDesc {
    Property(PropertyDesc),
    Function(FunctionDesc),
    Event(EventDesc),
    Callback(CallbackDesc),
}

impl MemberDesc {
    pub fn name(&self) -> &str {
        match self {
            MemberDesc::Property(p) => &p.name,
            MemberDesc::Function(f) => &f.name,
            MemberDesc::Event(e) => &e.name,
            MemberDesc::Callback(c) => &c.name,
        }
    }

    /// `Property`, `Function`, `Event` or `Callback`
    pub fn member_type(&self) -> &'static str {
        match self {
            MemberDesc::Property(_) => "Property",
            MemberDesc::Function(_) => "Function",
            MemberDesc::Event(_) => "Event",
            MemberDesc::Callback(_) => "Callback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClassDesc {
    pub name: String,
    /// Empty or `<<<ROOT>>>` for the root of the hierarchy
    pub superclass: String,
    pub memory_category: String,
    pub members: Vec<MemberDesc>,
    pub tags: Vec<Tag>,
}

impl ClassDesc {
    /// A class with no members
    pub fn new(name: impl Into<String>, superclass: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.into(),
            ..Default::default()
        }
    }

    /// A member declared directly on this class
    pub fn member(&self, name: &str) -> Option<&MemberDesc> {
        self.members.iter().find(|m| m.name() == name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        has_tag(&self.tags, tag)
    }

    fn parent_name(&self) -> Option<&str> {
        match self.superclass.as_str() {
            "" | "<<<ROOT>>>" => None,
            name => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnumItemDesc {
    pub name: String,
    pub value: u32,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnumDesc {
    pub name: String,
    /// Items in declaration order
    pub items: Vec<EnumItemDesc>,
    pub tags: Vec<Tag>,
}

impl EnumDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an item; builder style
    pub fn with_item(mut self, name: impl Into<String>, value: u32) -> Self {
        self.items.push(EnumItemDesc {
            name: name.into(),
            value,
            tags: Vec::new(),
        });
        self
    }

    pub fn item_by_name(&self, name: &str) -> Option<EnumItem> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .map(|i| self.to_item(i))
    }

    pub fn item_by_value(&self, value: u32) -> Option<EnumItem> {
        self.items
            .iter()
            .find(|i| i.value == value)
            .map(|i| self.to_item(i))
    }

    /// All items as runtime values, in declaration order
    pub fn enum_items(&self) -> Vec<EnumItem> {
        self.items.iter().map(|i| self.to_item(i)).collect()
    }

    fn to_item(&self, item: &EnumItemDesc) -> EnumItem {
        EnumItem {
            enum_name: self.name.clone(),
            name: item.name.clone(),
            value: item.value,
        }
    }
}

/// A resolved enum item, as seen by scripts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumItem {
    pub enum_name: String,
    pub name: String,
    pub value: u32,
}

impl fmt::Display for EnumItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enum.{}.{}", self.enum_name, self.name)
    }
}

/// A complete API schema
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RootDump", into = "RootDump")]
pub struct RootDesc {
    pub classes: BTreeMap<String, ClassDesc>,
    pub enums: BTreeMap<String, EnumDesc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RootDump {
    #[serde(default = "dump_version")]
    version: u32,
    #[serde(default)]
    classes: Vec<ClassDesc>,
    #[serde(default)]
    enums: Vec<EnumDesc>,
}

fn dump_version() -> u32 {
    1
}

impl From<RootDump> for RootDesc {
    fn from(dump: RootDump) -> Self {
        Self {
            classes: dump
                .classes
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            enums: dump.enums.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }
}

impl From<RootDesc> for RootDump {
    fn from(desc: RootDesc) -> Self {
        Self {
            version: dump_version(),
            classes: desc.classes.into_values().collect(),
            enums: desc.enums.into_values().collect(),
        }
    }
}

impl RootDesc {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class; builder style
    pub fn with_class(mut self, class: ClassDesc) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Add or replace an enum; builder style
    pub fn with_enum(mut self, desc: EnumDesc) -> Self {
        self.enums.insert(desc.name.clone(), desc);
        self
    }

    pub fn class(&self, name: &str) -> Option<&ClassDesc> {
        self.classes.get(name)
    }

    pub fn enum_(&self, name: &str) -> Option<&EnumDesc> {
        self.enums.get(name)
    }

    /// The class followed by each of its superclasses
    ///
    /// Stops at the first superclass missing from the schema. A malformed
    /// schema with a superclass loop yields each class once.
    pub fn ancestry(&self, name: &str) -> Vec<&ClassDesc> {
        let mut chain: Vec<&ClassDesc> = Vec::new();
        let mut next = self.class(name);
        while let Some(class) = next {
            if chain.iter().any(|c| c.name == class.name) {
                break;
            }
            chain.push(class);
            next = class.parent_name().and_then(|p| self.class(p));
        }
        chain
    }

    /// A member of the class or of any superclass
    pub fn member(&self, class: &str, member: &str) -> Option<&MemberDesc> {
        self.ancestry(class)
            .into_iter()
            .find_map(|c| c.member(member))
    }

    /// A property of the class or of any superclass
    pub fn property(&self, class: &str, property: &str) -> Option<&PropertyDesc> {
        match self.member(class, property) {
            Some(MemberDesc::Property(p)) => Some(p),
            _ => None,
        }
    }

    /// Whether `class` is `target` or inherits from it
    pub fn is_a(&self, class: &str, target: &str) -> bool {
        self.ancestry(class).iter().any(|c| c.name == target)
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    pub fn enum_names(&self) -> Vec<String> {
        self.enums.keys().cloned().collect()
    }
}
