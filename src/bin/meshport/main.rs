//! meshport CLI - inspect and convert 3D model files.

use std::env;
use std::fs;
use std::path::Path;

use meshport::export::{export, ExportSettings, FileVariant};
use meshport::import::{import, FormatToken, ImportResult, ImportSettings, Severity};
use meshport::io::FileList;
use meshport::model::{calculate_surface_area, calculate_volume, is_solid, Model, NodeId};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Global flags select the tracing filter
    let mut filter = "warn";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => filter = "debug",
            "-q" | "--quiet" => filter = "error",
            _ => filtered_args.push(arg),
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: meshport info <file> [siblings..]");
                std::process::exit(1);
            }
            cmd_info(&filtered_args[1..]);
        }
        "tree" | "t" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: meshport tree <file> [siblings..]");
                std::process::exit(1);
            }
            cmd_tree(&filtered_args[1..]);
        }
        "convert" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: meshport convert <input..> <output> [--ascii]");
                std::process::exit(1);
            }
            let ascii = filtered_args.iter().any(|&s| s == "--ascii" || s == "-a");
            let paths: Vec<&str> = filtered_args[1..]
                .iter()
                .filter(|&&s| s != "--ascii" && s != "-a")
                .copied()
                .collect();
            let (output, inputs) = paths.split_last().unwrap();
            cmd_convert(inputs, output, ascii);
        }
        "help" | "h" | "-h" | "--help" => print_help(),
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(&filtered_args);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn load(paths: &[&str]) -> ImportResult {
    let files = match FileList::from_disk(paths) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    import(&files, None, &ImportSettings::default())
}

fn report_issues(result: &ImportResult) {
    for issue in &result.issues {
        let tag = match issue.severity {
            Severity::Fatal => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{tag}: {}", issue.message);
    }
}

fn require_model(result: ImportResult) -> Model {
    report_issues(&result);
    match result.model {
        Some(model) => model,
        None => {
            eprintln!("Import failed");
            std::process::exit(1);
        }
    }
}

fn cmd_info(paths: &[&str]) {
    let model = require_model(load(paths));

    println!("Nodes:     {}", model.node_count());
    println!("Meshes:    {}", model.meshes().len());
    println!("Instances: {}", model.instances().len());
    println!("Materials: {}", model.materials().len());

    let vertices: usize = model.meshes().iter().map(|m| m.vertex_count()).sum();
    let triangles: usize = model.meshes().iter().map(|m| m.triangle_count()).sum();
    println!("Vertices:  {vertices}");
    println!("Triangles: {triangles}");

    if let Some(bounds) = model.bounding_box() {
        let size = bounds.size();
        println!(
            "Bounds:    [{:.4} {:.4} {:.4}] .. [{:.4} {:.4} {:.4}] (size {:.4} x {:.4} x {:.4})",
            bounds.min.x, bounds.min.y, bounds.min.z,
            bounds.max.x, bounds.max.y, bounds.max.z,
            size.x, size.y, size.z,
        );
    }

    for mesh in model.meshes() {
        let area = calculate_surface_area(mesh);
        print!("  {} ({} tris, area {:.4}", mesh.name, mesh.triangle_count(), area);
        if is_solid(mesh) {
            print!(", volume {:.4}", calculate_volume(mesh));
        }
        println!(")");
    }
}

fn cmd_tree(paths: &[&str]) {
    let model = require_model(load(paths));
    print_node(&model, model.root_id(), 0);
}

fn print_node(model: &Model, id: NodeId, depth: usize) {
    let node = model.node(id);
    let indent = "  ".repeat(depth);
    let name = if node.name.is_empty() { "<root>" } else { &node.name };
    let meshes = node
        .mesh_instances()
        .iter()
        .map(|&inst| model.mesh(model.instance(inst).mesh).name.clone())
        .collect::<Vec<_>>();
    if meshes.is_empty() {
        println!("{indent}{name}");
    } else {
        println!("{indent}{name} [{}]", meshes.join(", "));
    }
    for &child in node.children() {
        print_node(model, child, depth + 1);
    }
}

fn cmd_convert(inputs: &[&str], output: &str, ascii: bool) {
    let model = require_model(load(inputs));

    let output_path = Path::new(output);
    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let Some(token) = FormatToken::from_name(extension) else {
        eprintln!("Error: unsupported output extension {extension:?}");
        std::process::exit(1);
    };

    let base_name = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();
    // A .gltf output means the JSON plus external buffer pair; .glb is
    // the binary container
    let text = ascii || extension.eq_ignore_ascii_case("gltf");
    let settings = ExportSettings {
        variant: if text { FileVariant::Text } else { FileVariant::Binary },
        base_name,
        ..Default::default()
    };

    let files = match export(&model, token, &settings) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let directory = output_path.parent().unwrap_or_else(|| Path::new("."));
    for file in &files {
        let path = directory.join(&file.name);
        if let Err(e) = fs::write(&path, &file.content) {
            eprintln!("Error writing {}: {e}", path.display());
            std::process::exit(1);
        }
        println!("Wrote {} ({} bytes)", path.display(), file.content.len());
    }
}

fn print_help() {
    println!("meshport - 3D model import/export toolkit");
    println!();
    println!("USAGE:");
    println!("    meshport [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file> [siblings..]        Import and show model statistics");
    println!("    t, tree    <file> [siblings..]        Show the node hierarchy");
    println!("    c, convert <input..> <output>         Convert to the output extension");
    println!("    h, help                               Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Enable debug logging");
    println!("    -q, --quiet      Errors only");
    println!("    -a, --ascii      convert: write the text variant");
    println!();
    println!("FORMATS: obj, stl, ply, off, gltf/glb (import); obj, stl, ply, off (export)");
}
