use std::env;
use std::path::{Path, PathBuf};
use tether_constraints::ConstraintKind;
use tether_project::{ProjectConfig, create_new_project, load_project_toml};
use tether_scene::{LoadReport, Scene};

const DEFAULT_PROJECT_NAME: &str = "Tether Project";

fn main() {
    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "new" => new_command(&args, &cwd),
        "run" => run_command(&args, &cwd),
        "inspect" => inspect_command(&args, &cwd),
        "add" => add_command(&args, &cwd),
        "remove" => remove_command(&args, &cwd),
        "kinds" => kinds_command(),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Err(format!("unknown command `{command}`"))
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tether_cli new [--path <parent_dir>] [--name <project_name>]");
    eprintln!("  tether_cli run [--path <project_dir>] [--scene <file>] [--frames <n>] [--save]");
    eprintln!("  tether_cli inspect [--path <project_dir>] [--scene <file>]");
    eprintln!(
        "  tether_cli add --node <node> --kind <kind> [--target <node>] [--fac <0..1>] [--inactive]"
    );
    eprintln!("                 [--path <project_dir>] [--scene <file>]");
    eprintln!("  tether_cli remove --node <node> [--path <project_dir>] [--scene <file>]");
    eprintln!("  tether_cli kinds");
    eprintln!();
    eprintln!("  <node> is a node name or handle (`2:0` or hex).");
}

fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn require_flag(args: &[String], flag: &str) -> Result<String, String> {
    parse_flag_value(args, flag).ok_or_else(|| format!("missing required `{flag} <value>`"))
}

fn resolve_cli_path(input: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(input);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

fn sanitize_project_dir_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "tether_project".to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        let invalid = matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*');
        if invalid {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let collapsed = out.trim_matches('.');
    if collapsed.is_empty() {
        "tether_project".to_string()
    } else {
        collapsed.to_string()
    }
}

/// Project config plus the scene file the command works on.
struct Workspace {
    config: ProjectConfig,
    scene_path: PathBuf,
}

fn open_workspace(args: &[String], cwd: &Path) -> Result<Workspace, String> {
    let project_dir = parse_flag_value(args, "--path")
        .map(|p| resolve_cli_path(&p, cwd))
        .unwrap_or_else(|| cwd.to_path_buf());
    let config = load_project_toml(&project_dir).map_err(|err| {
        format!(
            "failed to read project.toml in {}: {err}",
            project_dir.display()
        )
    })?;
    init_logging(&config.log_level);

    let scene_path = parse_flag_value(args, "--scene")
        .map(|p| resolve_cli_path(&p, cwd))
        .unwrap_or_else(|| config.main_scene_path(&project_dir));
    Ok(Workspace { config, scene_path })
}

fn load_scene(ws: &Workspace) -> Result<Scene, String> {
    let (scene, report) = Scene::load(&ws.scene_path, ws.config.recapture)
        .map_err(|err| format!("failed to load scene: {err}"))?;
    print_report(&report);
    Ok(scene)
}

fn save_scene(ws: &Workspace, scene: &Scene) -> Result<(), String> {
    scene
        .save(&ws.scene_path)
        .map_err(|err| format!("failed to save scene: {err}"))
}

fn print_report(report: &LoadReport) {
    for (node, entry) in &report.skipped {
        eprintln!(
            "skipped constraint #{} on node {node} ({}): {}",
            entry.index,
            entry.tag.as_deref().unwrap_or("untagged"),
            entry.reason
        );
    }
}

fn parse_frames(raw: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|_| format!("invalid `--frames` value `{raw}`: expected a non-negative integer"))
}

fn parse_fac(raw: &str) -> Result<f32, String> {
    match raw.parse::<f32>() {
        Ok(fac) if (0.0..=1.0).contains(&fac) => Ok(fac),
        _ => Err(format!("invalid `--fac` value `{raw}`: expected a number in [0, 1]")),
    }
}

fn new_command(args: &[String], cwd: &Path) -> Result<(), String> {
    init_logging(tether_project::DEFAULT_LOG_LEVEL);
    let base_dir = parse_flag_value(args, "--path")
        .map(|p| resolve_cli_path(&p, cwd))
        .unwrap_or_else(|| cwd.to_path_buf());
    let project_name =
        parse_flag_value(args, "--name").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
    let project_dir = base_dir.join(sanitize_project_dir_name(&project_name));

    create_new_project(&project_dir, &project_name)
        .map_err(|err| format!("failed to create project at {}: {err}", project_dir.display()))?;

    println!(
        "created project `{}` at {}",
        project_name,
        project_dir.display()
    );
    Ok(())
}

fn run_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let ws = open_workspace(args, cwd)?;
    let frames = match parse_flag_value(args, "--frames") {
        Some(raw) => parse_frames(&raw)?,
        None => ws.config.frames,
    };
    let mut scene = load_scene(&ws)?;

    log::info!(
        "running `{}` for {frames} frames ({} nodes)",
        ws.config.name,
        scene.nodes().len()
    );
    for _ in 0..frames {
        scene.update();
    }

    println!("after {frames} frames:");
    print!("{}", scene.describe());

    if has_flag(args, "--save") {
        save_scene(&ws, &scene)?;
        println!("saved {}", ws.scene_path.display());
    }
    Ok(())
}

fn inspect_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let ws = open_workspace(args, cwd)?;
    let scene = load_scene(&ws)?;
    println!(
        "{} (recapture: {})",
        ws.scene_path.display(),
        ws.config.recapture
    );
    print!("{}", scene.describe());
    Ok(())
}

fn add_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let node_ref = require_flag(args, "--node")?;
    let kind = require_flag(args, "--kind")?.parse::<ConstraintKind>()?;
    let fac = parse_flag_value(args, "--fac")
        .map(|raw| parse_fac(&raw))
        .transpose()?;

    let ws = open_workspace(args, cwd)?;
    let mut scene = load_scene(&ws)?;

    let node = scene.resolve(&node_ref).map_err(|err| err.to_string())?;
    let target = parse_flag_value(args, "--target")
        .map(|raw| scene.resolve(&raw))
        .transpose()
        .map_err(|err| err.to_string())?;

    let index = scene
        .append_constraint(node, kind, target)
        .map_err(|err| err.to_string())?;
    if let Some(fac) = fac {
        scene
            .set_constraint_fac(node, index, fac)
            .map_err(|err| err.to_string())?;
    }
    if has_flag(args, "--inactive") {
        scene
            .set_constraint_active(node, index, false)
            .map_err(|err| err.to_string())?;
    }

    save_scene(&ws, &scene)?;
    println!("added {kind} to `{node_ref}` at index {index}");
    Ok(())
}

fn remove_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let node_ref = require_flag(args, "--node")?;
    let ws = open_workspace(args, cwd)?;
    let mut scene = load_scene(&ws)?;

    let node = scene.resolve(&node_ref).map_err(|err| err.to_string())?;
    let removed = scene
        .remove_last_constraint(node)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("`{node_ref}` has no constraints"))?;

    save_scene(&ws, &scene)?;
    println!("removed {} from `{node_ref}`", removed.kind());
    Ok(())
}

fn kinds_command() -> Result<(), String> {
    for kind in ConstraintKind::ALL {
        println!("{:<14} {}", kind.tag(), kind.menu_path());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_values() {
        let a = args(&["tether_cli", "add", "--node", "Watcher", "--inactive"]);
        assert_eq!(parse_flag_value(&a, "--node").as_deref(), Some("Watcher"));
        assert_eq!(parse_flag_value(&a, "--inactive"), None);
        assert!(has_flag(&a, "--inactive"));
        assert!(require_flag(&a, "--kind").is_err());
    }

    #[test]
    fn numeric_flags_are_validated() {
        assert_eq!(parse_frames("60").unwrap(), 60);
        assert!(parse_frames("-1").is_err());
        assert_eq!(parse_fac("0.25").unwrap(), 0.25);
        assert!(parse_fac("1.5").is_err());
        assert!(parse_fac("half").is_err());
    }

    #[test]
    fn project_dir_names_are_sanitized() {
        assert_eq!(sanitize_project_dir_name("My: Rig?"), "My_ Rig_");
        assert_eq!(sanitize_project_dir_name("   "), "tether_project");
        assert_eq!(sanitize_project_dir_name(".."), "tether_project");
    }

    #[test]
    fn cli_paths_resolve_against_cwd() {
        let cwd = PathBuf::from("/work");
        assert_eq!(resolve_cli_path("demo", &cwd), PathBuf::from("/work/demo"));
        assert_eq!(resolve_cli_path("/abs/demo", &cwd), PathBuf::from("/abs/demo"));
    }
}
