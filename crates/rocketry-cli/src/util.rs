use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context as _;
use serde::{Serialize, de::DeserializeOwned};

use crate::model::policy_model::PolicyModel;

/// Human-readable name of an output destination.
#[must_use]
pub fn display_target(path: Option<&Path>) -> String {
    path.map_or_else(|| "stdout".to_owned(), |p| p.display().to_string())
}

/// Writes `value` as pretty JSON followed by a newline, to `path` or stdout.
pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: Serialize,
{
    let target = display_target(path);
    let mut writer: Box<dyn Write> = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {target}"))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {target}"))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to finish writing {target}"))
}

pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read a trained policy model, rejecting weight arrays that do not form a
/// valid network.
pub fn read_policy_model_file(path: &Path) -> anyhow::Result<PolicyModel> {
    read_json_file("policy model", path)
}

#[cfg(test)]
mod tests {
    use std::{fs, process};

    use rocketry_engine::SimulationConfig;

    use super::*;

    #[test]
    fn test_save_then_read() {
        let path = std::env::temp_dir().join(format!("rocketry-util-{}.json", process::id()));
        let config = SimulationConfig {
            speed: 7,
            ..SimulationConfig::default()
        };
        save_json(&config, Some(&path)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let restored: SimulationConfig = read_json_file("simulation config", &path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_read_errors_name_the_file_kind() {
        let err = read_policy_model_file(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(err.to_string().contains("policy model"));
    }

    #[test]
    fn test_display_target() {
        assert_eq!(display_target(None), "stdout");
        assert_eq!(display_target(Some(Path::new("best.json"))), "best.json");
    }
}
