//! A serializable description of everything a world exposes to scripts

use crate::World;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Root {
    pub types: Vec<TypeDump>,
    pub formats: Vec<FormatDump>,
    pub libraries: Vec<LibraryDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeDump {
    pub name: String,
    /// Lua values the type occupies; negative for the rest of the frame
    pub count: i32,
    pub members: Vec<MemberDump>,
    pub constructors: Vec<String>,
    pub operators: Vec<String>,
    /// Whether other types convert into this one on pull
    pub convertible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDump {
    pub name: String,
    pub kind: MemberKind,
    pub value_type: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Property,
    Method,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormatDump {
    pub name: String,
    pub media_types: Vec<String>,
    pub options: Vec<OptionDump>,
    pub can_encode: bool,
    pub encode_types: Vec<String>,
    /// Registered types the format can decode into
    pub decode_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionDump {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryDump {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_as: Option<String>,
    pub globals: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Describe the types, formats and opened libraries of a world
pub fn dump(world: &World) -> Root {
    let reflectors = world.host().reflectors();

    let types = reflectors
        .iter()
        .map(|r| TypeDump {
            name: r.name.to_string(),
            count: r.count,
            members: r
                .members
                .iter()
                .map(|(name, m)| MemberDump {
                    name: name.to_string(),
                    kind: if m.method {
                        MemberKind::Method
                    } else {
                        MemberKind::Property
                    },
                    value_type: m.value_type.to_string(),
                    read_only: !m.method && m.set.is_none(),
                })
                .collect(),
            constructors: r.constructors.keys().map(|k| k.to_string()).collect(),
            operators: strings(&r.operators.names()),
            convertible: r.convert_from.is_some(),
        })
        .collect();

    let formats = world
        .host()
        .formats()
        .into_iter()
        .map(|f| FormatDump {
            name: f.name.to_string(),
            media_types: strings(f.media_types),
            options: f
                .options
                .iter()
                .map(|o| OptionDump {
                    name: o.name.to_string(),
                    types: strings(o.types),
                })
                .collect(),
            can_encode: f.can_encode(),
            encode_types: strings(f.encode_types),
            decode_types: reflectors
                .iter()
                .filter(|r| f.can_decode(r.name))
                .map(|r| r.name.to_string())
                .collect(),
        })
        .collect();

    let libraries = world
        .opened_libraries()
        .into_iter()
        .map(|lib| LibraryDump {
            name: lib.name.to_string(),
            import_as: lib.import_as.map(str::to_string),
            globals: lib.globals,
        })
        .collect();

    Root {
        types,
        formats,
        libraries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_describes_world() {
        let world = World::new();
        world.open("sym").unwrap();
        let root = dump(&world);

        let vector3 = root.types.iter().find(|t| t.name == "Vector3").unwrap();
        assert_eq!(vector3.constructors, vec!["new".to_string()]);
        assert!(vector3.operators.contains(&"__add".to_string()));
        let magnitude = vector3.members.iter().find(|m| m.name == "Magnitude").unwrap();
        assert_eq!(magnitude.kind, MemberKind::Property);
        assert!(magnitude.read_only);

        let txt = root.formats.iter().find(|f| f.name == "txt").unwrap();
        assert_eq!(txt.decode_types, vec!["string".to_string()]);
        assert!(txt.can_encode);

        assert_eq!(root.libraries.len(), 1);
        assert_eq!(root.libraries[0].globals, vec!["sym".to_string()]);
    }

    #[test]
    fn test_dump_serializes() {
        let world = World::new();
        world.open_all().unwrap();
        let json = serde_json::to_value(dump(&world)).unwrap();
        assert!(json["types"].as_array().unwrap().len() > 20);
        assert_eq!(json["libraries"][0]["name"], "base");
        assert!(json["libraries"][0].get("import_as").is_none());
    }
}
