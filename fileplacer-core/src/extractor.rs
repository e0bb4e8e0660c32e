use crate::models::{ModelElement, ModelFile, ModelParser, PropertyGroup, PropertyValue};
use crate::types::*;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Flattens structural elements of a model file into `ElementRecord`s
pub struct MetadataExtractor {
    parser: Box<dyn ModelParser>,
}

impl MetadataExtractor {
    pub fn new(parser: Box<dyn ModelParser>) -> Self {
        Self { parser }
    }

    pub fn is_available(&self) -> bool {
        self.parser.is_available()
    }

    pub fn parser_name(&self) -> &str {
        self.parser.name()
    }

    /// Records for every structural element in the file.
    ///
    /// `Ok(None)` when no parser is available or the file holds no structural
    /// elements; errors only for files that cannot be opened at all.
    pub fn extract(&self, path: &Path) -> Result<Option<Vec<ElementRecord>>> {
        if !self.is_available() {
            return Ok(None);
        }

        let model = self.parser.open(path)?;
        let records = Self::extract_from(model.as_ref());
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records))
        }
    }

    /// Walk the six structural types in order; one record per element
    pub fn extract_from(model: &dyn ModelFile) -> Vec<ElementRecord> {
        let mut records = Vec::new();
        for element_type in StructuralType::ALL {
            for element in model.elements_of_type(element_type) {
                let properties = read_properties(model, &element);
                if let ElementProperties::Unreadable(reason) = &properties {
                    tracing::warn!(
                        "{} #{}: properties unreadable ({}), keeping element without dimensions",
                        element.type_name,
                        element.id,
                        reason
                    );
                }
                records.push(build_record(element, properties));
            }
        }
        records
    }
}

fn build_record(element: ModelElement, properties: ElementProperties) -> ElementRecord {
    ElementRecord {
        type_name: element.type_name,
        global_id: element
            .global_id
            .unwrap_or_else(|| MISSING_GLOBAL_ID.to_string()),
        name: element
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNNAMED_ELEMENT.to_string()),
        properties: properties.into_map(),
    }
}

/// Never fails: any problem becomes `Unreadable`
fn read_properties(model: &dyn ModelFile, element: &ModelElement) -> ElementProperties {
    match model
        .property_groups(element)
        .and_then(|groups| whitelisted_dimensions(&groups))
    {
        Ok(map) => ElementProperties::Read(map),
        Err(e) => ElementProperties::Unreadable(e.to_string()),
    }
}

/// Copy Width/Height/Length out of every group; later groups win
fn whitelisted_dimensions(groups: &[PropertyGroup]) -> Result<BTreeMap<Dimension, f64>> {
    let mut dimensions = BTreeMap::new();
    for group in groups {
        for dimension in Dimension::ALL {
            if let Some(value) = group.get(dimension.key()) {
                let number = coerce(value).map_err(|e| {
                    anyhow!("{}.{}: {}", group.name, dimension.key(), e)
                })?;
                dimensions.insert(dimension, round3(number));
            }
        }
    }
    Ok(dimensions)
}

fn coerce(value: &PropertyValue) -> Result<f64> {
    match value {
        PropertyValue::Number(n) => Ok(*n),
        PropertyValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        PropertyValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("'{text}' is not a number")),
        PropertyValue::Null => Err(anyhow!("value is empty")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, UnavailableParser};
    use std::collections::HashMap;

    /// In-memory model with scripted property reads
    #[derive(Default)]
    struct FakeModel {
        elements: Vec<(StructuralType, ModelElement)>,
        groups: HashMap<EntityId, std::result::Result<Vec<PropertyGroup>, String>>,
    }

    impl FakeModel {
        fn element(
            mut self,
            element_type: StructuralType,
            id: EntityId,
            global_id: Option<&str>,
            name: Option<&str>,
        ) -> Self {
            self.elements.push((
                element_type,
                ModelElement {
                    id,
                    type_name: element_type.entity_name().to_string(),
                    global_id: global_id.map(str::to_string),
                    name: name.map(str::to_string),
                },
            ));
            self
        }

        fn groups(mut self, id: EntityId, groups: Vec<PropertyGroup>) -> Self {
            self.groups.insert(id, Ok(groups));
            self
        }

        fn failing(mut self, id: EntityId) -> Self {
            self.groups.insert(id, Err("corrupt property set".to_string()));
            self
        }
    }

    impl ModelFile for FakeModel {
        fn elements_of_type(&self, element_type: StructuralType) -> Vec<ModelElement> {
            self.elements
                .iter()
                .filter(|(t, _)| *t == element_type)
                .map(|(_, e)| e.clone())
                .collect()
        }

        fn property_groups(&self, element: &ModelElement) -> Result<Vec<PropertyGroup>> {
            match self.groups.get(&element.id) {
                Some(Ok(groups)) => Ok(groups.clone()),
                Some(Err(reason)) => Err(anyhow!(reason.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn group(name: &str, props: &[(&str, PropertyValue)]) -> PropertyGroup {
        PropertyGroup {
            name: name.to_string(),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_failed_property_read_keeps_element() {
        let model = FakeModel::default()
            .element(StructuralType::Wall, 1, Some("w1"), Some("Wall 1"))
            .element(StructuralType::Wall, 2, Some("w2"), Some("Wall 2"))
            .failing(1)
            .groups(
                2,
                vec![group("Pset", &[("Width", PropertyValue::Number(0.2))])],
            );

        let records = MetadataExtractor::extract_from(&model);
        assert_eq!(records.len(), 2);
        assert!(records[0].properties.is_empty());
        assert_eq!(records[1].dimension(Dimension::Width), Some(0.2));
    }

    #[test]
    fn test_non_numeric_whitelisted_value_empties_properties() {
        let model = FakeModel::default()
            .element(StructuralType::Slab, 1, Some("s1"), Some("Slab"))
            .groups(
                1,
                vec![group(
                    "Pset",
                    &[
                        ("Width", PropertyValue::Number(3.0)),
                        ("Height", PropertyValue::Text("tall".to_string())),
                    ],
                )],
            );
        let records = MetadataExtractor::extract_from(&model);
        assert_eq!(records.len(), 1);
        assert!(records[0].properties.is_empty());
    }

    #[test]
    fn test_fallback_identity_fields() {
        let model = FakeModel::default()
            .element(StructuralType::Door, 1, None, None)
            .element(StructuralType::Door, 2, Some("d2"), Some(""));
        let records = MetadataExtractor::extract_from(&model);
        assert_eq!(records[0].global_id, MISSING_GLOBAL_ID);
        assert_eq!(records[0].name, UNNAMED_ELEMENT);
        assert_eq!(records[1].global_id, "d2");
        assert_eq!(records[1].name, UNNAMED_ELEMENT);
    }

    #[test]
    fn test_whitelist_rounding_and_override() {
        let model = FakeModel::default()
            .element(StructuralType::Beam, 1, Some("b1"), Some("Beam"))
            .groups(
                1,
                vec![
                    group(
                        "Pset_Type",
                        &[
                            ("Length", PropertyValue::Number(1.0)),
                            ("Material", PropertyValue::Text("Steel".to_string())),
                        ],
                    ),
                    group(
                        "Qto",
                        &[
                            ("Length", PropertyValue::Number(4.123456)),
                            ("Height", PropertyValue::Text(" 0.3 ".to_string())),
                            ("Weight", PropertyValue::Number(120.0)),
                        ],
                    ),
                ],
            );

        let records = MetadataExtractor::extract_from(&model);
        let beam = &records[0];
        assert_eq!(beam.properties.len(), 2);
        assert_eq!(beam.dimension(Dimension::Length), Some(4.123));
        assert_eq!(beam.dimension(Dimension::Height), Some(0.3));
        assert_eq!(beam.dimension(Dimension::Width), None);
    }

    #[test]
    fn test_records_follow_type_order() {
        let model = FakeModel::default()
            .element(StructuralType::Door, 1, Some("d"), Some("Door"))
            .element(StructuralType::Wall, 2, Some("w"), Some("Wall"))
            .element(StructuralType::Column, 3, Some("c"), Some("Column"));
        let types: Vec<String> = MetadataExtractor::extract_from(&model)
            .into_iter()
            .map(|r| r.type_name)
            .collect();
        assert_eq!(types, ["IfcWall", "IfcColumn", "IfcDoor"]);
    }

    #[test]
    fn test_unavailable_parser_is_silent() {
        let extractor = MetadataExtractor::new(Box::new(UnavailableParser));
        assert!(!extractor.is_available());
        let result = extractor.extract(Path::new("/nowhere/model.ifc")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(2.0004), 2.0);
        assert_eq!(round3(0.12351), 0.124);
        assert_eq!(round3(-1.2344), -1.234);
    }
}
