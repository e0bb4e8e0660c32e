//! STEP model backend
//!
//! Opens IFC files written in the ISO 10303-21 clear-text encoding and
//! exposes their structural elements and property sets.
//!
//! Property groups are resolved through two relationships:
//! - `IFCRELDEFINESBYTYPE`: property sets on the element's type object
//! - `IFCRELDEFINESBYPROPERTIES`: property sets and element quantities on
//!   the occurrence itself

pub mod reader;

use super::{EntityId, ModelElement, ModelFile, ModelParser, PropertyGroup, PropertyValue};
use crate::types::StructuralType;
use anyhow::{anyhow, bail, Context, Result};
use reader::{parse_physical_file, StepEntity, StepValue};
use std::collections::HashMap;
use std::path::Path;

/// Entity names per queried type, subtypes included, with their schema spelling
fn entity_names(element_type: StructuralType) -> &'static [(&'static str, &'static str)] {
    match element_type {
        StructuralType::Wall => &[
            ("IFCWALL", "IfcWall"),
            ("IFCWALLSTANDARDCASE", "IfcWallStandardCase"),
            ("IFCWALLELEMENTEDCASE", "IfcWallElementedCase"),
        ],
        StructuralType::Slab => &[
            ("IFCSLAB", "IfcSlab"),
            ("IFCSLABSTANDARDCASE", "IfcSlabStandardCase"),
            ("IFCSLABELEMENTEDCASE", "IfcSlabElementedCase"),
        ],
        StructuralType::Beam => &[
            ("IFCBEAM", "IfcBeam"),
            ("IFCBEAMSTANDARDCASE", "IfcBeamStandardCase"),
        ],
        StructuralType::Column => &[
            ("IFCCOLUMN", "IfcColumn"),
            ("IFCCOLUMNSTANDARDCASE", "IfcColumnStandardCase"),
        ],
        StructuralType::Window => &[
            ("IFCWINDOW", "IfcWindow"),
            ("IFCWINDOWSTANDARDCASE", "IfcWindowStandardCase"),
        ],
        StructuralType::Door => &[
            ("IFCDOOR", "IfcDoor"),
            ("IFCDOORSTANDARDCASE", "IfcDoorStandardCase"),
        ],
    }
}

/// Property-set definitions attached to one element
#[derive(Debug, Default, Clone)]
struct Definitions {
    from_type: Vec<EntityId>,
    from_occurrence: Vec<EntityId>,
}

/// Reader for `.ifc` files in STEP physical format
#[derive(Debug, Clone, Copy, Default)]
pub struct StepModelParser;

impl StepModelParser {
    pub fn new() -> Self {
        Self
    }
}

impl ModelParser for StepModelParser {
    fn name(&self) -> &str {
        "step"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ModelFile>> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        let model = StepModel::parse(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Box::new(model))
    }
}

/// Parsed model with its property-definition index
pub struct StepModel {
    entities: HashMap<EntityId, StepEntity>,
    definitions: HashMap<EntityId, Definitions>,
}

impl StepModel {
    pub fn parse(text: &str) -> Result<Self> {
        let entities = parse_physical_file(text)?;
        let definitions = index_definitions(&entities);
        tracing::debug!(
            "parsed {} entities, {} elements with property definitions",
            entities.len(),
            definitions.len()
        );
        Ok(Self {
            entities,
            definitions,
        })
    }

    fn entity(&self, id: EntityId) -> Result<&StepEntity> {
        self.entities
            .get(&id)
            .ok_or_else(|| anyhow!("dangling reference #{id}"))
    }

    fn read_group(&self, id: EntityId) -> Result<Option<PropertyGroup>> {
        let entity = self.entity(id)?;
        let name = entity.text_arg(2).unwrap_or_default();

        // (member list argument, member value argument) per definition kind
        let (list_index, value_index) = match entity.type_name.as_str() {
            "IFCPROPERTYSET" => (4, 2),
            "IFCELEMENTQUANTITY" => (5, 3),
            _ => return Ok(None),
        };

        let members = entity
            .arg(list_index)
            .ok_or_else(|| anyhow!("#{id}={} has no member list", entity.type_name))?
            .refs();

        let mut properties = Vec::new();
        for member_id in members {
            let member = self.entity(member_id)?;
            let supported = match list_index {
                4 => member.type_name == "IFCPROPERTYSINGLEVALUE",
                _ => member.type_name.starts_with("IFCQUANTITY"),
            };
            if !supported {
                continue;
            }
            let Some(key) = member.text_arg(0) else {
                bail!("#{member_id}={} has no name", member.type_name);
            };
            let value = member
                .arg(value_index)
                .map(property_value)
                .unwrap_or(PropertyValue::Null);
            properties.push((key, value));
        }

        Ok(Some(PropertyGroup { name, properties }))
    }
}

impl ModelFile for StepModel {
    fn elements_of_type(&self, element_type: StructuralType) -> Vec<ModelElement> {
        let names = entity_names(element_type);
        let mut elements: Vec<ModelElement> = self
            .entities
            .iter()
            .filter_map(|(id, entity)| {
                let (_, schema_name) = names
                    .iter()
                    .find(|(upper, _)| *upper == entity.type_name)?;
                Some(ModelElement {
                    id: *id,
                    type_name: schema_name.to_string(),
                    global_id: entity.text_arg(0),
                    name: entity.text_arg(2),
                })
            })
            .collect();
        elements.sort_by_key(|e| e.id);
        elements
    }

    fn property_groups(&self, element: &ModelElement) -> Result<Vec<PropertyGroup>> {
        let Some(defs) = self.definitions.get(&element.id) else {
            return Ok(Vec::new());
        };

        let mut groups = Vec::new();
        for id in defs.from_type.iter().chain(&defs.from_occurrence) {
            if let Some(group) = self.read_group(*id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }
}

/// Map every related object to the property definitions that reach it
fn index_definitions(entities: &HashMap<EntityId, StepEntity>) -> HashMap<EntityId, Definitions> {
    let mut relations: Vec<(&EntityId, &StepEntity)> = entities
        .iter()
        .filter(|(_, e)| {
            e.type_name == "IFCRELDEFINESBYPROPERTIES" || e.type_name == "IFCRELDEFINESBYTYPE"
        })
        .collect();
    relations.sort_by_key(|(id, _)| **id);

    let mut index: HashMap<EntityId, Definitions> = HashMap::new();
    for (_, relation) in relations {
        let related = relation.arg(4).map(StepValue::refs).unwrap_or_default();
        let relating = relation.arg(5).map(StepValue::refs).unwrap_or_default();

        if relation.type_name == "IFCRELDEFINESBYTYPE" {
            // IfcTypeObject.HasPropertySets; a dangling type is reported on read
            let type_sets: Vec<EntityId> = match relating.first() {
                Some(type_id) => match entities.get(type_id) {
                    Some(type_object) => {
                        type_object.arg(5).map(StepValue::refs).unwrap_or_default()
                    }
                    None => vec![*type_id],
                },
                None => Vec::new(),
            };
            for object in &related {
                index
                    .entry(*object)
                    .or_default()
                    .from_type
                    .extend(&type_sets);
            }
        } else {
            for object in &related {
                index
                    .entry(*object)
                    .or_default()
                    .from_occurrence
                    .extend(&relating);
            }
        }
    }
    index
}

fn property_value(value: &StepValue) -> PropertyValue {
    match value {
        StepValue::Typed(_, inner) => property_value(inner),
        StepValue::Integer(i) => PropertyValue::Number(*i as f64),
        StepValue::Real(r) => PropertyValue::Number(*r),
        StepValue::Text(s) => PropertyValue::Text(s.clone()),
        StepValue::Enum(e) => match e.as_str() {
            "T" => PropertyValue::Bool(true),
            "F" => PropertyValue::Bool(false),
            "U" => PropertyValue::Null,
            other => PropertyValue::Text(other.to_string()),
        },
        StepValue::Null | StepValue::Derived => PropertyValue::Null,
        StepValue::Binary(b) => PropertyValue::Text(b.clone()),
        StepValue::Ref(id) => PropertyValue::Text(format!("#{id}")),
        StepValue::List(_) => PropertyValue::Text(format!("{value:?}")),
    }
}
