//! Import/export round trips over the public API, plus disk-backed file
//! lists.

use meshport::export::{export, ExportSettings, ExportedFile, FileVariant};
use meshport::import::{import, FormatToken, ImportSettings, UpVector};
use meshport::io::{File, FileList};
use meshport::model::generator::{generate_cuboid, generate_cylinder, GeneratorParams};
use meshport::model::{finalize_model, Color, FinalizeParams, Model};

fn finalized(mut model: Model) -> Model {
    finalize_model(&mut model, &FinalizeParams::default());
    model
}

fn reimport(files: Vec<ExportedFile>) -> Model {
    let mut list = FileList::new();
    for file in files {
        list.add(File::from_memory(file.name, file.content));
    }
    let result = import(&list, None, &ImportSettings::default());
    for issue in &result.issues {
        eprintln!("{:?}", issue);
    }
    result.model.expect("reimport")
}

fn assert_bounds_match(a: &Model, b: &Model, eps: f64) {
    let ba = a.bounding_box().expect("bounds a");
    let bb = b.bounding_box().expect("bounds b");
    assert!((ba.min - bb.min).length() < eps, "{:?} vs {:?}", ba.min, bb.min);
    assert!((ba.max - bb.max).length() < eps, "{:?} vs {:?}", ba.max, bb.max);
}

fn triangle_count(model: &Model) -> usize {
    model.meshes().iter().map(|m| m.triangle_count()).sum()
}

#[test]
fn test_obj_roundtrip_with_materials() {
    let params = GeneratorParams::named("box").with_color(Color::rgb(10, 200, 30));
    let model = finalized(generate_cuboid(&params, 1.0, 2.0, 3.0));

    let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
    let files = export(&model, FormatToken::Obj, &settings).unwrap();
    assert_eq!(files.len(), 2);

    let back = reimport(files);
    assert_eq!(triangle_count(&back), 12);
    assert_eq!(back.materials().len(), 1);
    assert_eq!(back.materials()[0].color(), Color::rgb(10, 200, 30));
    assert_bounds_match(&model, &back, 1.0e-6);
}

#[test]
fn test_stl_roundtrip_both_variants() {
    for variant in [FileVariant::Binary, FileVariant::Text] {
        let model = finalized(generate_cylinder(&GeneratorParams::named("cyl"), 1.0, 2.0, 24));
        let expected = triangle_count(&model);

        let settings = ExportSettings { variant, ..Default::default() };
        let back = reimport(export(&model, FormatToken::Stl, &settings).unwrap());
        assert_eq!(triangle_count(&back), expected);
        assert_bounds_match(&model, &back, 1.0e-4);
    }
}

#[test]
fn test_ply_roundtrip_both_variants() {
    for variant in [FileVariant::Binary, FileVariant::Text] {
        let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0));

        let settings = ExportSettings { variant, ..Default::default() };
        let back = reimport(export(&model, FormatToken::Ply, &settings).unwrap());
        assert_eq!(triangle_count(&back), 12);
        assert_eq!(back.meshes()[0].vertex_count(), 8);
        // Exported normals survive the trip
        assert_eq!(back.meshes()[0].normals.len(), 8);
        assert_bounds_match(&model, &back, 1.0e-4);
    }
}

#[test]
fn test_gltf_roundtrip_both_variants() {
    for variant in [FileVariant::Binary, FileVariant::Text] {
        let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 2.0, 3.0));
        let settings = ExportSettings { variant, ..Default::default() };
        let back = reimport(export(&model, FormatToken::Gltf, &settings).unwrap());
        assert_eq!(triangle_count(&back), 12);
        assert_bounds_match(&model, &back, 1.0e-4);
    }
}

#[test]
fn test_off_roundtrip() {
    let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 2.0, 2.0, 2.0));
    let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
    let back = reimport(export(&model, FormatToken::Off, &settings).unwrap());
    assert_eq!(triangle_count(&back), 12);
    assert_bounds_match(&model, &back, 1.0e-9);
}

#[test]
fn test_unit_scale_out_and_back() {
    let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0));

    // Export in millimeters, import declaring the data as millimeters
    let out = ExportSettings {
        unit_scale: 1000.0,
        variant: FileVariant::Text,
        ..Default::default()
    };
    let files = export(&model, FormatToken::Obj, &out).unwrap();

    let mut list = FileList::new();
    for file in files {
        list.add(File::from_memory(file.name, file.content));
    }
    let back_settings = ImportSettings { unit_scale: 0.001, ..Default::default() };
    let back = import(&list, None, &back_settings).model.expect("model");
    assert_bounds_match(&model, &back, 1.0e-6);
}

#[test]
fn test_y_up_export_consumed_by_y_up_import() {
    let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 2.0, 3.0));
    let settings = ExportSettings {
        up_vector: UpVector::Y,
        variant: FileVariant::Text,
        ..Default::default()
    };
    let files = export(&model, FormatToken::Obj, &settings).unwrap();

    let mut list = FileList::new();
    for file in files {
        list.add(File::from_memory(file.name, file.content));
    }
    let back = import(&list, None, &ImportSettings { up_vector: UpVector::Y, ..Default::default() })
        .model
        .expect("model");
    assert_bounds_match(&model, &back, 1.0e-6);
}

#[test]
fn test_disk_backed_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0));

    let settings = ExportSettings {
        base_name: "disk".to_string(),
        variant: FileVariant::Text,
        ..Default::default()
    };
    let files = export(&model, FormatToken::Ply, &settings).unwrap();
    let mut paths = Vec::new();
    for file in &files {
        let path = dir.path().join(&file.name);
        std::fs::write(&path, &file.content).unwrap();
        paths.push(path);
    }

    let list = FileList::from_disk(&paths).unwrap();
    let back = import(&list, None, &ImportSettings::default()).model.expect("model");
    assert_eq!(triangle_count(&back), 12);
}

#[test]
fn test_detection_survives_misleading_extension() {
    let model = finalized(generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0));
    let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
    let files = export(&model, FormatToken::Ply, &settings).unwrap();

    let mut list = FileList::new();
    for file in files {
        // Rename to a wrong extension; the sniffer should still win
        list.add(File::from_memory("mystery.dat", file.content));
    }
    let back = import(&list, None, &ImportSettings::default()).model.expect("model");
    assert_eq!(triangle_count(&back), 12);
}
