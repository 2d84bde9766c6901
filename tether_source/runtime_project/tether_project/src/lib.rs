use std::{
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
};
use tether_constraints::RecapturePolicy;
use toml::Value;

pub const DEFAULT_MAIN_SCENE: &str = "res://main.scene.json";
pub const DEFAULT_FRAMES: u32 = 120;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub main_scene: String,
    /// Frames ticked by `tether_cli run` when `--frames` is not given.
    pub frames: u32,
    /// Default `env_logger` filter; `RUST_LOG` still wins.
    pub log_level: String,
    pub recapture: RecapturePolicy,
}

impl ProjectConfig {
    pub fn default_for_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_scene: DEFAULT_MAIN_SCENE.to_string(),
            frames: DEFAULT_FRAMES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            recapture: RecapturePolicy::Manual,
        }
    }

    /// Absolute path of the main scene for a project rooted at `root`.
    pub fn main_scene_path(&self, root: &Path) -> PathBuf {
        resolve_res_path(&self.main_scene, root)
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    MissingField(&'static str),
    InvalidField(&'static str, String),
    AlreadyExists(PathBuf),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
            Self::AlreadyExists(path) => {
                write!(f, "project directory already exists: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

pub fn create_new_project(project_root: &Path, project_name: &str) -> Result<(), ProjectError> {
    if project_root.exists() {
        return Err(ProjectError::AlreadyExists(project_root.to_path_buf()));
    }
    fs::create_dir_all(project_root.join("res"))?;
    ensure_project_toml(project_root, project_name)?;
    write_if_missing(project_root.join("res").join("main.scene.json"), DEMO_SCENE)?;
    log::debug!("scaffolded project `{project_name}` at {}", project_root.display());
    Ok(())
}

/// Map a `res://` path onto `<root>/res`. Anything else is taken as a plain
/// path, relative ones against `root`.
pub fn resolve_res_path(input: &str, root: &Path) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("res://") {
        let rel = stripped.trim_start_matches('/');
        let res = root.join("res");
        if rel.is_empty() {
            return res;
        }
        return res.join(rel);
    }

    let path = PathBuf::from(input);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

pub fn ensure_project_toml(root: &Path, default_name: &str) -> std::io::Result<()> {
    let project_toml = root.join("project.toml");
    if project_toml.exists() {
        return Ok(());
    }
    fs::write(project_toml, default_project_toml(default_name))
}

pub fn default_project_toml(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
main_scene = "{DEFAULT_MAIN_SCENE}"

[runtime]
frames = {DEFAULT_FRAMES}
log_level = "{DEFAULT_LOG_LEVEL}"
recapture = "manual"
"#
    )
}

pub fn load_project_toml(root: &Path) -> Result<ProjectConfig, ProjectError> {
    let project_toml = fs::read_to_string(root.join("project.toml"))?;
    parse_project_toml(&project_toml)
}

pub fn parse_project_toml(contents: &str) -> Result<ProjectConfig, ProjectError> {
    let value: Value = contents.parse::<Value>()?;
    let project_table = value
        .get("project")
        .and_then(Value::as_table)
        .ok_or(ProjectError::MissingField("project"))?;

    let name = project_table
        .get("name")
        .and_then(Value::as_str)
        .ok_or(ProjectError::MissingField("project.name"))?
        .to_string();

    let main_scene = project_table
        .get("main_scene")
        .and_then(Value::as_str)
        .ok_or(ProjectError::MissingField("project.main_scene"))?
        .to_string();
    validate_res_path("project.main_scene", &main_scene)?;

    let mut config = ProjectConfig {
        main_scene,
        ..ProjectConfig::default_for_name(name)
    };

    // [runtime] is optional, and so is every key in it.
    let Some(runtime) = value.get("runtime") else {
        return Ok(config);
    };
    let runtime = runtime.as_table().ok_or(ProjectError::InvalidField(
        "runtime",
        "must be a table".to_string(),
    ))?;

    if let Some(frames) = runtime.get("frames") {
        let frames = frames.as_integer().ok_or(ProjectError::InvalidField(
            "runtime.frames",
            "must be an integer".to_string(),
        ))?;
        config.frames = u32::try_from(frames).map_err(|_| {
            ProjectError::InvalidField(
                "runtime.frames",
                "must be a non-negative integer".to_string(),
            )
        })?;
    }

    if let Some(level) = runtime.get("log_level") {
        let level = level.as_str().ok_or(ProjectError::InvalidField(
            "runtime.log_level",
            "must be a string".to_string(),
        ))?;
        config.log_level = level.to_string();
    }

    if let Some(policy) = runtime.get("recapture") {
        let policy = policy.as_str().ok_or(ProjectError::InvalidField(
            "runtime.recapture",
            "must be a string".to_string(),
        ))?;
        config.recapture = policy
            .parse::<RecapturePolicy>()
            .map_err(|reason| ProjectError::InvalidField("runtime.recapture", reason))?;
    }

    Ok(config)
}

fn validate_res_path(field: &'static str, path: &str) -> Result<(), ProjectError> {
    if path.starts_with("res://") {
        return Ok(());
    }
    Err(ProjectError::InvalidField(
        field,
        "must start with `res://`".to_string(),
    ))
}

fn write_if_missing(path: PathBuf, contents: &str) -> std::io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents)
}

/// Starter scene: a watcher looking at a target and a follower halfway to it.
const DEMO_SCENE: &str = r#"{
  "nodes": [
    {
      "id": "0000000000000001",
      "name": "Target",
      "transform": { "position": [0.0, 1.0, 5.0] }
    },
    {
      "id": "0000000000000002",
      "name": "Watcher",
      "transform": { "position": [3.0, 1.0, 0.0] },
      "constraints": [
        {
          "type": "look_at",
          "target": "0000000000000001",
          "baseline": { "position": [3.0, 1.0, 0.0] }
        }
      ]
    },
    {
      "id": "0000000000000003",
      "name": "Follower",
      "constraints": [
        { "type": "copy_position", "target": "0000000000000001", "fac": 0.5 }
      ]
    }
  ]
}
"#;
