// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema table: declared attribute names and kinds per entity type.
//!
//! The table is the read-only lookup the store consults for indexed attribute
//! access and for `is_a` supertype checks. A built-in IFC4 subset covers the
//! entity types the round-trip core touches; larger tables can be loaded from
//! JSON once per process.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Declared attribute kind, as reported by `attribute_kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum AttributeKind {
    #[serde(rename = "STRING")]
    Text,
    #[serde(rename = "DOUBLE")]
    Double,
    #[serde(rename = "INT")]
    Integer,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "ENUM")]
    Enum,
    #[serde(rename = "ENTITY")]
    Ref,
    #[serde(rename = "LIST")]
    List,
}

impl AttributeKind {
    /// The tag string used by the schema file format
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Text => "STRING",
            AttributeKind::Double => "DOUBLE",
            AttributeKind::Integer => "INT",
            AttributeKind::Boolean => "BOOLEAN",
            AttributeKind::Enum => "ENUM",
            AttributeKind::Ref => "ENTITY",
            AttributeKind::List => "LIST",
        }
    }
}

/// One declared attribute slot
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeDef {
    fn new(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawTypeDef {
    #[serde(default)]
    supertype: Option<String>,
    /// Attributes declared by this type itself (supertype attributes prepend)
    #[serde(default)]
    attributes: Vec<AttributeDef>,
}

#[derive(Debug, Clone)]
struct TypeDef {
    supertype: Option<String>,
    /// Flattened attribute list, root supertype first
    attributes: Vec<AttributeDef>,
}

/// Entity type table: supertype chains plus flattened attribute layouts
#[derive(Debug, Clone)]
pub struct SchemaTable {
    types: FxHashMap<String, TypeDef>,
}

impl SchemaTable {
    fn from_raw(raw: FxHashMap<String, RawTypeDef>) -> Result<Self> {
        let mut types = FxHashMap::default();
        for name in raw.keys() {
            let mut chain = Vec::new();
            let mut cursor = Some(name.as_str());
            while let Some(ty) = cursor {
                if chain.iter().any(|c| *c == ty) {
                    return Err(Error::Schema(format!("supertype cycle at {ty}")));
                }
                chain.push(ty);
                cursor = raw
                    .get(ty)
                    .ok_or_else(|| Error::Schema(format!("unknown supertype {ty}")))?
                    .supertype
                    .as_deref();
            }
            let mut attributes = Vec::new();
            for ty in chain.iter().rev() {
                attributes.extend_from_slice(&raw[*ty].attributes);
            }
            types.insert(
                name.clone(),
                TypeDef {
                    supertype: raw[name].supertype.clone(),
                    attributes,
                },
            );
        }
        Ok(Self { types })
    }

    /// Load a schema table from its JSON serialization
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: FxHashMap<String, RawTypeDef> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Check whether a type is declared
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Flattened attribute layout for a type (supertype attributes first)
    pub fn attributes(&self, type_name: &str) -> Option<&[AttributeDef]> {
        self.types.get(type_name).map(|t| t.attributes.as_slice())
    }

    /// Walk the supertype chain: is `type_name` the same as or derived from `ancestor`?
    pub fn is_subtype_of(&self, type_name: &str, ancestor: &str) -> bool {
        let mut cursor = Some(type_name);
        while let Some(ty) = cursor {
            if ty == ancestor {
                return true;
            }
            cursor = self.types.get(ty).and_then(|t| t.supertype.as_deref());
        }
        false
    }

    /// Built-in IFC4 subset: the types touched by import, styling, spatial
    /// structure and tessellated write-back.
    pub fn ifc4_subset() -> Self {
        use AttributeKind::{Boolean, Double, Enum, Integer, List, Ref, Text};

        let mut raw: FxHashMap<String, RawTypeDef> = FxHashMap::default();
        let mut def = |name: &str, supertype: Option<&str>, attrs: &[(&str, AttributeKind)]| {
            raw.insert(
                name.to_string(),
                RawTypeDef {
                    supertype: supertype.map(str::to_string),
                    attributes: attrs
                        .iter()
                        .map(|(n, k)| AttributeDef::new(n, *k))
                        .collect(),
                },
            );
        };

        // Rooted object tree
        def(
            "IfcRoot",
            None,
            &[
                ("GlobalId", Text),
                ("OwnerHistory", Ref),
                ("Name", Text),
                ("Description", Text),
            ],
        );
        def("IfcObjectDefinition", Some("IfcRoot"), &[]);
        def(
            "IfcObject",
            Some("IfcObjectDefinition"),
            &[("ObjectType", Text)],
        );
        def(
            "IfcContext",
            Some("IfcObjectDefinition"),
            &[
                ("ObjectType", Text),
                ("LongName", Text),
                ("Phase", Text),
                ("RepresentationContexts", List),
                ("UnitsInContext", Ref),
            ],
        );
        def("IfcProject", Some("IfcContext"), &[]);
        def(
            "IfcProduct",
            Some("IfcObject"),
            &[("ObjectPlacement", Ref), ("Representation", Ref)],
        );
        def(
            "IfcSpatialStructureElement",
            Some("IfcProduct"),
            &[("LongName", Text), ("CompositionType", Enum)],
        );
        def(
            "IfcSite",
            Some("IfcSpatialStructureElement"),
            &[
                ("RefLatitude", List),
                ("RefLongitude", List),
                ("RefElevation", Double),
                ("LandTitleNumber", Text),
                ("SiteAddress", Ref),
            ],
        );
        def(
            "IfcBuilding",
            Some("IfcSpatialStructureElement"),
            &[
                ("ElevationOfRefHeight", Double),
                ("ElevationOfTerrain", Double),
                ("BuildingAddress", Ref),
            ],
        );
        def(
            "IfcBuildingStorey",
            Some("IfcSpatialStructureElement"),
            &[("Elevation", Double)],
        );
        def(
            "IfcSpace",
            Some("IfcSpatialStructureElement"),
            &[("PredefinedType", Enum), ("ElevationWithFlooring", Double)],
        );
        def("IfcElement", Some("IfcProduct"), &[("Tag", Text)]);
        def("IfcBuildingElement", Some("IfcElement"), &[]);
        def(
            "IfcWall",
            Some("IfcBuildingElement"),
            &[("PredefinedType", Enum)],
        );
        def(
            "IfcSlab",
            Some("IfcBuildingElement"),
            &[("PredefinedType", Enum)],
        );
        def(
            "IfcBeam",
            Some("IfcBuildingElement"),
            &[("PredefinedType", Enum)],
        );
        def(
            "IfcBuildingElementProxy",
            Some("IfcBuildingElement"),
            &[("PredefinedType", Enum)],
        );
        def("IfcFeatureElement", Some("IfcElement"), &[]);
        def(
            "IfcOpeningElement",
            Some("IfcFeatureElement"),
            &[("PredefinedType", Enum)],
        );

        // Relationships
        def("IfcRelationship", Some("IfcRoot"), &[]);
        def(
            "IfcRelAggregates",
            Some("IfcRelationship"),
            &[("RelatingObject", Ref), ("RelatedObjects", List)],
        );
        def(
            "IfcRelContainedInSpatialStructure",
            Some("IfcRelationship"),
            &[("RelatedElements", List), ("RelatingStructure", Ref)],
        );
        def(
            "IfcRelAssociatesMaterial",
            Some("IfcRelationship"),
            &[("RelatedObjects", List), ("RelatingMaterial", Ref)],
        );
        def(
            "IfcRelVoidsElement",
            Some("IfcRelationship"),
            &[
                ("RelatingBuildingElement", Ref),
                ("RelatedOpeningElement", Ref),
            ],
        );

        // Units
        def("IfcUnitAssignment", None, &[("Units", List)]);
        def(
            "IfcSIUnit",
            None,
            &[
                ("Dimensions", Ref),
                ("UnitType", Enum),
                ("Prefix", Enum),
                ("Name", Enum),
            ],
        );

        // Representation plumbing
        def(
            "IfcGeometricRepresentationContext",
            None,
            &[
                ("ContextIdentifier", Text),
                ("ContextType", Text),
                ("CoordinateSpaceDimension", Integer),
                ("Precision", Double),
                ("WorldCoordinateSystem", Ref),
                ("TrueNorth", Ref),
            ],
        );
        def(
            "IfcProductRepresentation",
            None,
            &[
                ("Name", Text),
                ("Description", Text),
                ("Representations", List),
            ],
        );
        def(
            "IfcProductDefinitionShape",
            Some("IfcProductRepresentation"),
            &[],
        );
        def(
            "IfcMaterialDefinitionRepresentation",
            Some("IfcProductRepresentation"),
            &[("RepresentedMaterial", Ref)],
        );
        def(
            "IfcRepresentation",
            None,
            &[
                ("ContextOfItems", Ref),
                ("RepresentationIdentifier", Text),
                ("RepresentationType", Text),
                ("Items", List),
            ],
        );
        def("IfcShapeRepresentation", Some("IfcRepresentation"), &[]);
        def("IfcStyledRepresentation", Some("IfcRepresentation"), &[]);
        def(
            "IfcRepresentationMap",
            None,
            &[("MappingOrigin", Ref), ("MappedRepresentation", Ref)],
        );

        // Representation items and geometry
        def("IfcRepresentationItem", None, &[]);
        def(
            "IfcGeometricRepresentationItem",
            Some("IfcRepresentationItem"),
            &[],
        );
        def(
            "IfcMappedItem",
            Some("IfcRepresentationItem"),
            &[("MappingSource", Ref), ("MappingTarget", Ref)],
        );
        def(
            "IfcStyledItem",
            Some("IfcRepresentationItem"),
            &[("Item", Ref), ("Styles", List), ("Name", Text)],
        );
        def(
            "IfcTessellatedFaceSet",
            Some("IfcGeometricRepresentationItem"),
            &[("Coordinates", Ref)],
        );
        def(
            "IfcTriangulatedFaceSet",
            Some("IfcTessellatedFaceSet"),
            &[
                ("Normals", List),
                ("Closed", Boolean),
                ("CoordIndex", List),
                ("PnIndex", List),
            ],
        );
        def(
            "IfcCartesianPointList",
            Some("IfcGeometricRepresentationItem"),
            &[],
        );
        def(
            "IfcCartesianPointList3D",
            Some("IfcCartesianPointList"),
            &[("CoordList", List)],
        );
        def(
            "IfcSweptAreaSolid",
            Some("IfcGeometricRepresentationItem"),
            &[("SweptArea", Ref), ("Position", Ref)],
        );
        def(
            "IfcExtrudedAreaSolid",
            Some("IfcSweptAreaSolid"),
            &[("ExtrudedDirection", Ref), ("Depth", Double)],
        );
        def(
            "IfcCartesianPoint",
            Some("IfcGeometricRepresentationItem"),
            &[("Coordinates", List)],
        );
        def(
            "IfcDirection",
            Some("IfcGeometricRepresentationItem"),
            &[("DirectionRatios", List)],
        );
        def("IfcObjectPlacement", None, &[]);
        def(
            "IfcLocalPlacement",
            Some("IfcObjectPlacement"),
            &[("PlacementRelTo", Ref), ("RelativePlacement", Ref)],
        );
        def(
            "IfcPlacement",
            Some("IfcGeometricRepresentationItem"),
            &[("Location", Ref)],
        );
        def(
            "IfcAxis2Placement3D",
            Some("IfcPlacement"),
            &[("Axis", Ref), ("RefDirection", Ref)],
        );

        // Styles and materials
        def("IfcPresentationStyle", None, &[("Name", Text)]);
        def(
            "IfcSurfaceStyle",
            Some("IfcPresentationStyle"),
            &[("Side", Enum), ("Styles", List)],
        );
        def(
            "IfcSurfaceStyleShading",
            None,
            &[("SurfaceColour", Ref), ("Transparency", Double)],
        );
        def(
            "IfcColourRgb",
            None,
            &[
                ("Name", Text),
                ("Red", Double),
                ("Green", Double),
                ("Blue", Double),
            ],
        );
        def("IfcPresentationStyleAssignment", None, &[("Styles", List)]);
        def("IfcMaterialDefinition", None, &[]);
        def(
            "IfcMaterial",
            Some("IfcMaterialDefinition"),
            &[("Name", Text), ("Description", Text), ("Category", Text)],
        );
        def(
            "IfcMaterialLayerSet",
            Some("IfcMaterialDefinition"),
            &[
                ("MaterialLayers", List),
                ("LayerSetName", Text),
                ("Description", Text),
            ],
        );

        Self::from_raw(raw).expect("built-in schema is well-formed")
    }
}
