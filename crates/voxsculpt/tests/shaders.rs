use std::fs;
use std::path::Path;

#[test]
fn validate_all_shaders() {
    let shader_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
    let mut errors = Vec::new();
    let mut count = 0;

    for entry in fs::read_dir(&shader_dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().map_or(false, |ext| ext == "wgsl") {
            validate_shader(&path, &mut errors);
            count += 1;
        }
    }

    assert_eq!(count, 6, "expected six shaders in {:?}", shader_dir);
    if !errors.is_empty() {
        panic!("Shader validation failed:\n{}", errors.join("\n"));
    }
}

fn validate_shader(path: &Path, errors: &mut Vec<String>) {
    let source = fs::read_to_string(path).unwrap();
    let module = match naga::front::wgsl::parse_str(&source) {
        Ok(module) => module,
        Err(e) => {
            errors.push(format!(
                "Failed to parse {:?}:\n{}",
                path.file_name().unwrap(),
                e.emit_to_string(&source)
            ));
            return;
        }
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );

    if let Err(e) = validator.validate(&module) {
        errors.push(format!(
            "Failed to validate {:?}:\n{:?}",
            path.file_name().unwrap(),
            e
        ));
    }
}

#[test]
fn data_shaders_expose_quad_entry_points() {
    let shader_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
    for name in ["copy.wgsl", "init_lattice.wgsl", "velocity.wgsl", "position.wgsl"] {
        let source = fs::read_to_string(shader_dir.join(name)).unwrap();
        let module = naga::front::wgsl::parse_str(&source).unwrap();
        let entries: Vec<&str> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(entries.contains(&"vs_quad"), "{} lacks vs_quad: {:?}", name, entries);
        assert!(entries.contains(&"fs_main"), "{} lacks fs_main: {:?}", name, entries);
    }
}
