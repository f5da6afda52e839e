// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end round trip: parse-model fixture in, scene out, edits back in.

use approx::assert_relative_eq;
use ifc_bridge_geometry::tessellate::body_representation;
use ifc_bridge_geometry::{FacetTessellator, Point3};
use ifc_bridge_model::{AttributeValue, ModelStore, SchemaTable};
use ifc_bridge_sync::{mesh_key_name, IfcImporter, ObjectKey, Scene, WriteBack};

fn real_list(values: &[f64]) -> AttributeValue {
    AttributeValue::List(values.iter().map(|v| AttributeValue::Real(*v)).collect())
}

fn int_list(values: &[i64]) -> AttributeValue {
    AttributeValue::List(values.iter().map(|v| AttributeValue::Integer(*v)).collect())
}

fn refs(ids: &[u32]) -> AttributeValue {
    AttributeValue::List(ids.iter().map(|id| AttributeValue::EntityRef(*id)).collect())
}

struct Fixture {
    store: ModelStore,
    context: u32,
    storey: u32,
    wall: u32,
    representation: u32,
}

/// Millimeter model with a site/building/storey chain, one red wall with a
/// placement chain, and a triangulated body representation.
fn millimeter_model() -> Fixture {
    let mut store = ModelStore::new(SchemaTable::ifc4_subset());

    let si_unit = store
        .create(
            "IfcSIUnit",
            vec![
                AttributeValue::Null,
                AttributeValue::Enum("LENGTHUNIT".into()),
                AttributeValue::Enum("MILLI".into()),
                AttributeValue::Enum("METRE".into()),
            ],
        )
        .unwrap();
    store
        .create("IfcUnitAssignment", vec![refs(&[si_unit])])
        .unwrap();

    let project = named(&mut store, "IfcProject", "Tower");
    let context = store
        .create(
            "IfcGeometricRepresentationContext",
            vec![
                AttributeValue::Null,
                AttributeValue::Text("Model".into()),
                AttributeValue::Integer(3),
            ],
        )
        .unwrap();
    let site = named(&mut store, "IfcSite", "Site");
    let building = named(&mut store, "IfcBuilding", "B1");
    let storey = named(&mut store, "IfcBuildingStorey", "L3");
    aggregate(&mut store, project, site);
    aggregate(&mut store, site, building);
    aggregate(&mut store, building, storey);

    // Storey sits 3000mm up; the wall is 1000mm along X from the storey
    let storey_placement = local_placement(&mut store, None, [0.0, 0.0, 3000.0]);
    let wall_placement = local_placement(&mut store, Some(storey_placement), [1000.0, 0.0, 0.0]);

    let points = store
        .create(
            "IfcCartesianPointList3D",
            vec![AttributeValue::List(vec![
                real_list(&[0.0, 0.0, 0.0]),
                real_list(&[2000.0, 0.0, 0.0]),
                real_list(&[0.0, 2000.0, 0.0]),
            ])],
        )
        .unwrap();
    let face_set = store
        .create(
            "IfcTriangulatedFaceSet",
            vec![
                AttributeValue::EntityRef(points),
                AttributeValue::Null,
                AttributeValue::Boolean(true),
                AttributeValue::List(vec![int_list(&[1, 2, 3])]),
            ],
        )
        .unwrap();
    let representation = store
        .create(
            "IfcShapeRepresentation",
            vec![
                AttributeValue::EntityRef(context),
                AttributeValue::Text("Body".into()),
                AttributeValue::Text("Tessellation".into()),
                refs(&[face_set]),
            ],
        )
        .unwrap();
    let shape_def = store
        .create(
            "IfcProductDefinitionShape",
            vec![AttributeValue::Null, AttributeValue::Null, refs(&[representation])],
        )
        .unwrap();
    let wall = store
        .create(
            "IfcWall",
            vec![
                AttributeValue::Text("guid-wall".into()),
                AttributeValue::Null,
                AttributeValue::Text("W1".into()),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::EntityRef(wall_placement),
                AttributeValue::EntityRef(shape_def),
            ],
        )
        .unwrap();
    store
        .create(
            "IfcRelContainedInSpatialStructure",
            vec![
                AttributeValue::Text("guid-contain".into()),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
                refs(&[wall]),
                AttributeValue::EntityRef(storey),
            ],
        )
        .unwrap();

    attach_red_material(&mut store, context, wall);

    Fixture {
        store,
        context,
        storey,
        wall,
        representation,
    }
}

fn named(store: &mut ModelStore, type_name: &str, name: &str) -> u32 {
    store
        .create(
            type_name,
            vec![
                AttributeValue::Text(format!("guid-{name}")),
                AttributeValue::Null,
                AttributeValue::Text(name.into()),
            ],
        )
        .unwrap()
}

fn aggregate(store: &mut ModelStore, parent: u32, child: u32) {
    store
        .create(
            "IfcRelAggregates",
            vec![
                AttributeValue::Text(format!("guid-agg-{parent}-{child}")),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::EntityRef(parent),
                refs(&[child]),
            ],
        )
        .unwrap();
}

fn local_placement(store: &mut ModelStore, parent: Option<u32>, origin: [f64; 3]) -> u32 {
    let location = store
        .create("IfcCartesianPoint", vec![real_list(&origin)])
        .unwrap();
    let axis2 = store
        .create(
            "IfcAxis2Placement3D",
            vec![
                AttributeValue::EntityRef(location),
                AttributeValue::Null,
                AttributeValue::Null,
            ],
        )
        .unwrap();
    let parent_attr = match parent {
        Some(id) => AttributeValue::EntityRef(id),
        None => AttributeValue::Null,
    };
    store
        .create(
            "IfcLocalPlacement",
            vec![parent_attr, AttributeValue::EntityRef(axis2)],
        )
        .unwrap()
}

/// Concrete material with a red, quarter-transparent surface style
fn attach_red_material(store: &mut ModelStore, context: u32, wall: u32) {
    let material = store
        .create(
            "IfcMaterial",
            vec![AttributeValue::Text("Concrete".into())],
        )
        .unwrap();
    let colour = store
        .create(
            "IfcColourRgb",
            vec![
                AttributeValue::Null,
                AttributeValue::Real(0.8),
                AttributeValue::Real(0.1),
                AttributeValue::Real(0.1),
            ],
        )
        .unwrap();
    let shading = store
        .create(
            "IfcSurfaceStyleShading",
            vec![AttributeValue::EntityRef(colour), AttributeValue::Real(0.25)],
        )
        .unwrap();
    let surface_style = store
        .create(
            "IfcSurfaceStyle",
            vec![
                AttributeValue::Text("Red".into()),
                AttributeValue::Enum("BOTH".into()),
                refs(&[shading]),
            ],
        )
        .unwrap();
    let styled_item = store
        .create(
            "IfcStyledItem",
            vec![
                AttributeValue::Null,
                refs(&[surface_style]),
                AttributeValue::Null,
            ],
        )
        .unwrap();
    let styled_rep = store
        .create(
            "IfcStyledRepresentation",
            vec![
                AttributeValue::EntityRef(context),
                AttributeValue::Null,
                AttributeValue::Null,
                refs(&[styled_item]),
            ],
        )
        .unwrap();
    store
        .create(
            "IfcMaterialDefinitionRepresentation",
            vec![
                AttributeValue::Null,
                AttributeValue::Null,
                refs(&[styled_rep]),
                AttributeValue::EntityRef(material),
            ],
        )
        .unwrap();
    store
        .create(
            "IfcRelAssociatesMaterial",
            vec![
                AttributeValue::Text("guid-mat".into()),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
                refs(&[wall]),
                AttributeValue::EntityRef(material),
            ],
        )
        .unwrap();
}

fn wall_object(scene: &Scene, importer: &IfcImporter<'_, FacetTessellator>, storey: u32) -> ObjectKey {
    let collection = importer.hierarchy().collection(storey).unwrap();
    scene.collection(collection).unwrap().objects[0]
}

#[test]
fn import_scales_placements_and_vertices_to_meters() {
    let fixture = millimeter_model();
    let tessellator = FacetTessellator::new();
    let mut importer = IfcImporter::new(&fixture.store, &tessellator);
    let mut scene = Scene::new();
    let summary = importer.execute(&mut scene).unwrap();

    assert_eq!(summary.objects_created, 1);
    assert_eq!(summary.orphans, 0);
    assert_relative_eq!(importer.unit_scale(), 0.001);

    let object = wall_object(&scene, &importer, fixture.storey);
    let data = scene.object(object).unwrap();
    assert_eq!(data.name, "IfcWall/W1");
    assert_eq!(data.ifc_definition_id, fixture.wall);

    // 1000mm along X under a storey 3000mm up, in meters
    let translation = data.matrix_world.column(3);
    assert_relative_eq!(translation[0], 1.0, epsilon = 1e-9);
    assert_relative_eq!(translation[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(translation[2], 3.0, epsilon = 1e-9);

    let mesh = scene.mesh(data.mesh.unwrap()).unwrap();
    assert_eq!(mesh.mesh.vertex_count(), 3);
    assert_relative_eq!(mesh.mesh.vertices[1].x, 2.0, epsilon = 1e-9);
}

#[test]
fn import_builds_the_full_containment_chain() {
    let fixture = millimeter_model();
    let tessellator = FacetTessellator::new();
    let mut importer = IfcImporter::new(&fixture.store, &tessellator);
    let mut scene = Scene::new();
    importer.execute(&mut scene).unwrap();

    let hierarchy = importer.hierarchy();
    assert!(hierarchy.unplaced.is_empty());
    let storey_collection = hierarchy.collection(fixture.storey).unwrap();
    assert_eq!(scene.collection(storey_collection).unwrap().name, "IfcBuildingStorey/L3");
}

#[test]
fn material_color_and_transparency_survive_import() {
    let fixture = millimeter_model();
    let tessellator = FacetTessellator::new();
    let mut importer = IfcImporter::new(&fixture.store, &tessellator);
    let mut scene = Scene::new();
    importer.execute(&mut scene).unwrap();

    let object = wall_object(&scene, &importer, fixture.storey);
    let mesh = scene
        .mesh(scene.object(object).unwrap().mesh.unwrap())
        .unwrap();
    let material_key = mesh.slots[0].unwrap();
    let material = scene.material(material_key).unwrap();
    assert_eq!(material.name, "Concrete");
    assert_relative_eq!(material.diffuse_color[0], 0.8);
    assert_relative_eq!(material.diffuse_color[3], 0.75); // 1 - transparency
    assert!(material.ifc_style_id.is_some());
}

#[test]
fn edited_mesh_written_back_becomes_the_wall_body() {
    let mut fixture = millimeter_model();
    let tessellator = FacetTessellator::new();
    let mut scene = Scene::new();
    let object = {
        let mut importer = IfcImporter::new(&fixture.store, &tessellator);
        importer.execute(&mut scene).unwrap();
        wall_object(&scene, &importer, fixture.storey)
    };

    // Edit: push one vertex out half a meter
    let mesh_key = scene.object(object).unwrap().mesh.unwrap();
    scene.mesh_mut(mesh_key).unwrap().mesh.vertices[2] = Point3::new(0.0, 2.5, 0.0);

    let old_rep = fixture.representation;
    let mut writer = WriteBack::new(&mut fixture.store, &tessellator, 0.001);
    let new_rep = writer
        .add_representation(&mut scene, object, fixture.context)
        .unwrap();
    assert_ne!(new_rep, old_rep);

    // The selection rule now resolves the wall to the written body
    assert_eq!(body_representation(&fixture.store, fixture.wall), Some(new_rep));

    // Coordinates went back to millimeters
    let item = fixture.store.attribute(new_rep, 3).unwrap().as_list().unwrap()[0]
        .as_entity_ref()
        .unwrap();
    let points = fixture
        .store
        .attribute(item, 0)
        .unwrap()
        .as_entity_ref()
        .unwrap();
    let coords = fixture.store.attribute(points, 0).unwrap().as_list().unwrap();
    let edited = coords[2].as_list().unwrap();
    assert_relative_eq!(edited[1].as_float().unwrap(), 2500.0, epsilon = 1e-6);

    // The written body carries the wall's surface style
    let style_refs: Vec<u32> = fixture
        .store
        .by_type("IfcStyledItem")
        .into_iter()
        .filter(|item_id| {
            fixture
                .store
                .attribute(*item_id, 0)
                .ok()
                .and_then(|v| v.as_entity_ref())
                == Some(item)
        })
        .collect();
    assert_eq!(style_refs.len(), 1);

    // Importing the written model again reproduces the edited geometry
    let mut importer = IfcImporter::new(&fixture.store, &tessellator);
    let mut reimported = Scene::new();
    importer.execute(&mut reimported).unwrap();
    let object = wall_object(&reimported, &importer, fixture.storey);
    let mesh = reimported
        .mesh(reimported.object(object).unwrap().mesh.unwrap())
        .unwrap();
    assert_relative_eq!(mesh.mesh.vertices[2].y, 2.5, epsilon = 1e-9);
}

#[test]
fn switch_representation_repoints_the_object_mesh() {
    let mut fixture = millimeter_model();
    let tessellator = FacetTessellator::new();
    let mut scene = Scene::new();
    let object = {
        let mut importer = IfcImporter::new(&fixture.store, &tessellator);
        importer.execute(&mut scene).unwrap();
        wall_object(&scene, &importer, fixture.storey)
    };

    // A second body living in the same context
    let points = fixture
        .store
        .create(
            "IfcCartesianPointList3D",
            vec![AttributeValue::List(vec![
                real_list(&[0.0, 0.0, 0.0]),
                real_list(&[500.0, 0.0, 0.0]),
                real_list(&[0.0, 500.0, 0.0]),
                real_list(&[0.0, 0.0, 500.0]),
            ])],
        )
        .unwrap();
    let face_set = fixture
        .store
        .create(
            "IfcTriangulatedFaceSet",
            vec![
                AttributeValue::EntityRef(points),
                AttributeValue::Null,
                AttributeValue::Boolean(true),
                AttributeValue::List(vec![int_list(&[1, 2, 3]), int_list(&[1, 2, 4])]),
            ],
        )
        .unwrap();
    let other_rep = fixture
        .store
        .create(
            "IfcShapeRepresentation",
            vec![
                AttributeValue::EntityRef(fixture.context),
                AttributeValue::Text("Body".into()),
                AttributeValue::Text("Tessellation".into()),
                refs(&[face_set]),
            ],
        )
        .unwrap();

    let mut writer = WriteBack::new(&mut fixture.store, &tessellator, 0.001);
    writer
        .switch_representation(&mut scene, object, other_rep)
        .unwrap();

    let data = scene.object(object).unwrap();
    let mesh_key = data.mesh.unwrap();
    assert_eq!(
        scene.mesh_by_name(&mesh_key_name(&fixture.store, other_rep)),
        Some(mesh_key)
    );
    let mesh = scene.mesh(mesh_key).unwrap();
    assert_eq!(mesh.ifc_definition_id, Some(other_rep));
    assert_eq!(mesh.mesh.triangle_count(), 2);
    assert_relative_eq!(mesh.mesh.vertices[3].z, 0.5, epsilon = 1e-9);
    // Materials re-derived from the wall's association
    assert_eq!(mesh.slots.len(), 1);
}
