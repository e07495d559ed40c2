use std::path::Path;

fn main() {
    let demo_path = Path::new("data/demo_event.json");
    validate_snapshot_file(demo_path);
    set_build_dependencies();
}

fn validate_snapshot_file(snapshot_path: &Path) {
    // Ensure the embedded demo exists at build time
    assert!(
        snapshot_path.exists(),
        "\n\nDEMO DATA BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the demo snapshot before building.\n",
        snapshot_path.display()
    );

    let contents = std::fs::read_to_string(snapshot_path).unwrap_or_else(|e| {
        panic!(
            "\n\nDEMO DATA BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            snapshot_path.display()
        );
    });

    let snapshot: serde_json::Value = serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\nDEMO DATA BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            snapshot_path.display()
        );
    });

    validate_snapshot_structure(&snapshot);
}

fn validate_snapshot_structure(snapshot: &serde_json::Value) {
    assert!(
        snapshot.is_object(),
        "\n\nDEMO DATA BUILD ERROR: Root must be a JSON object\n\
         Got: {snapshot}\n"
    );

    assert!(
        snapshot.get("version").and_then(|v| v.as_str()).is_some(),
        "\n\nDEMO DATA BUILD ERROR: Missing string 'version' field\n"
    );

    let postulations = snapshot
        .get("postulations")
        .and_then(|p| p.as_array())
        .unwrap_or_else(|| {
            panic!(
                "\n\nDEMO DATA BUILD ERROR: Missing 'postulations' array\n\
                 The snapshot must have a top-level 'postulations' array.\n"
            );
        });

    let hosts = validate_postulations(postulations);

    if let Some(matches) = snapshot.get("matches") {
        assert!(
            matches.is_array(),
            "\n\nDEMO DATA BUILD ERROR: 'matches' must be an array\n\
             Got: {matches}\n"
        );
    }

    println!(
        "cargo:warning=Validated demo data: {} postulations, {hosts} hosts",
        postulations.len()
    );
}

fn validate_postulations(postulations: &[serde_json::Value]) -> usize {
    let mut hosts = 0;

    for (i, postulation) in postulations.iter().enumerate() {
        let id = postulation
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");

        for field in ["id", "event_id", "requester_id", "status", "role"] {
            assert!(
                postulation.get(field).is_some(),
                "\n\nDEMO DATA BUILD ERROR: Postulation '{id}' (index {i}) missing '{field}' field\n"
            );
        }

        let role = &postulation["role"];
        match role.get("type").and_then(|t| t.as_str()) {
            Some("host") => {
                validate_host(role, id);
                hosts += 1;
            }
            Some("visitor") => validate_visitor(role, id),
            other => panic!(
                "\n\nDEMO DATA BUILD ERROR: Postulation '{id}' has unknown role type {other:?}\n"
            ),
        }
    }

    hosts
}

fn validate_host(role: &serde_json::Value, id: &str) {
    let total = role
        .get("total_capacity")
        .and_then(serde_json::Value::as_u64);
    let remaining = role
        .get("remaining_capacity")
        .and_then(serde_json::Value::as_u64);

    match (total, remaining) {
        (Some(total), Some(remaining)) => assert!(
            remaining <= total,
            "\n\nDEMO DATA BUILD ERROR: Host '{id}' has remaining capacity {remaining} above total {total}\n"
        ),
        _ => panic!(
            "\n\nDEMO DATA BUILD ERROR: Host '{id}' needs numeric 'total_capacity' and 'remaining_capacity'\n"
        ),
    }
}

fn validate_visitor(role: &serde_json::Value, id: &str) {
    let people = role.get("people_count").and_then(serde_json::Value::as_u64);
    assert!(
        people.is_some_and(|n| n > 0),
        "\n\nDEMO DATA BUILD ERROR: Visitor '{id}' needs a positive 'people_count'\n"
    );
}

fn set_build_dependencies() {
    // Tell cargo to rerun if the demo data changes
    println!("cargo:rerun-if-changed=data/demo_event.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
