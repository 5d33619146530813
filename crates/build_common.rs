// Build script helpers shared by the couchlink crates.
// Pulled into each build.rs with include!("../build_common.rs"); the
// including file imports std::env, std::fs and std::path::Path.

/// Writes the crate README, adjusted for rustdoc, to
/// `$OUT_DIR/README_GENERATED.md`.
///
/// Relative links are rewritten line by line. `src/<module>.rs` targets
/// become intra-doc module paths, and links that climb out of the crate
/// resolve against the workspace repository URL. A missing README yields
/// an empty page.
fn render_readme_for_rustdoc(crate_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let readme = crate_dir.join("README.md");
    println!("cargo:rerun-if-changed={}", readme.display());

    let workspace_manifest = find_workspace_manifest(crate_dir);
    if let Some(manifest) = &workspace_manifest {
        println!("cargo:rerun-if-changed={}", manifest.display());
    }
    let repository = workspace_manifest
        .as_deref()
        .and_then(|manifest| fs::read_to_string(manifest).ok())
        .and_then(|manifest| workspace_repository(&manifest));

    let source = fs::read_to_string(&readme).unwrap_or_default();
    let rendered: Vec<String> = source
        .lines()
        .map(|line| rewrite_links(line, repository.as_deref()))
        .collect();

    let out_dir = env::var("OUT_DIR")?;
    fs::write(
        Path::new(&out_dir).join("README_GENERATED.md"),
        rendered.join("\n"),
    )?;
    Ok(())
}

/// Rewrite the target of every `[text](target)` link on one line.
fn rewrite_links(line: &str, repository: Option<&str>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find("](") {
        let (head, tail) = rest.split_at(open + 2);
        out.push_str(head);
        let Some(close) = tail.find(')') else {
            rest = tail;
            break;
        };
        out.push_str(&link_target(&tail[..close], repository));
        rest = &tail[close..];
    }
    out.push_str(rest);
    out
}

fn link_target(target: &str, repository: Option<&str>) -> String {
    if let Some(module) = target.strip_prefix("src/") {
        let module = module.strip_suffix(".rs").unwrap_or(module);
        let module = module.strip_suffix("/mod").unwrap_or(module);
        return module.replace('/', "::");
    }
    match (target.strip_prefix("../../"), repository) {
        (Some(path), Some(url)) if path == "README.md" => url.to_string(),
        (Some(path), Some(url)) => format!("{}/blob/main/{path}", url.trim_end_matches('/')),
        _ => target.to_string(),
    }
}

/// Nearest ancestor manifest declaring a `[workspace]` table.
fn find_workspace_manifest(crate_dir: &Path) -> Option<std::path::PathBuf> {
    crate_dir.ancestors().skip(1).find_map(|dir| {
        let manifest = dir.join("Cargo.toml");
        let text = fs::read_to_string(&manifest).ok()?;
        text.lines()
            .any(|line| line.trim() == "[workspace]")
            .then_some(manifest)
    })
}

/// `repository` key of the `[workspace.package]` table.
fn workspace_repository(manifest: &str) -> Option<String> {
    let mut in_package = false;
    for line in manifest.lines().map(str::trim) {
        if line.starts_with('[') {
            in_package = line == "[workspace.package]";
            continue;
        }
        if !in_package {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "repository" {
            let value = value.trim().trim_matches('"');
            return (!value.is_empty()).then(|| value.to_string());
        }
    }
    None
}
