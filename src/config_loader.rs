// Configuration file loader
//
// An optional flat TOML file (`audiolens.conf` in the working directory)
// can pre-seed environment variables before AppConfig reads them.
// Precedence is env var > config file > application default, so a value
// already present in the environment is never overwritten.

use std::env;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use toml::Value;

const CONFIG_FILE_PATH: &str = "audiolens.conf";

/// Merge the default config file into the environment, if it exists
pub fn load_config() {
    merge_config_file(Path::new(CONFIG_FILE_PATH));
}

/// Merge one flat TOML file into the environment
///
/// Returns the number of variables actually set. A missing file is normal
/// and merges nothing; an unreadable or unparseable file logs a warning
/// and merges nothing. Keys whose env var is already set are skipped.
pub fn merge_config_file(path: &Path) -> usize {
    if !path.exists() {
        debug!("No config file at {}", path.display());
        return 0;
    }

    let table = match fs::read_to_string(path) {
        Ok(content) => match content.parse::<Value>() {
            Ok(Value::Table(table)) => table,
            Ok(_) => {
                warn!("Config file {} is not a TOML table", path.display());
                return 0;
            }
            Err(e) => {
                warn!("Failed to parse config file {}: {}", path.display(), e);
                return 0;
            }
        },
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return 0;
        }
    };

    let mut applied = 0;
    for (key, value) in table {
        // Only scalar values map onto environment variables
        let Some(value) = scalar_to_string(&value) else {
            warn!("Skipping non-scalar config key: {}", key);
            continue;
        };
        if env::var(&key).is_ok() {
            debug!("Env var {} already set, keeping it", key);
            continue;
        }
        debug!("Setting {} from config file", key);
        env::set_var(key, value);
        applied += 1;
    }

    info!(
        "Loaded {} setting(s) from config file {}",
        applied,
        path.display()
    );
    applied
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn merges_scalars_and_respects_existing_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audiolens.conf");
        fs::write(
            &path,
            "AUDIOLENS_TEST_LOADER_A = \"from-file\"\n\
             AUDIOLENS_TEST_LOADER_B = 42\n\
             AUDIOLENS_TEST_LOADER_C = [1, 2]\n",
        )
        .unwrap();

        env::set_var("AUDIOLENS_TEST_LOADER_A", "from-env");
        let applied = merge_config_file(&path);

        // A was already set, B merged, C skipped as non-scalar
        assert_eq!(applied, 1);
        assert_eq!(env::var("AUDIOLENS_TEST_LOADER_A").unwrap(), "from-env");
        assert_eq!(env::var("AUDIOLENS_TEST_LOADER_B").unwrap(), "42");
        assert!(env::var("AUDIOLENS_TEST_LOADER_C").is_err());

        env::remove_var("AUDIOLENS_TEST_LOADER_A");
        env::remove_var("AUDIOLENS_TEST_LOADER_B");
    }

    #[test]
    fn missing_and_broken_files_merge_nothing() {
        let dir = tempdir().unwrap();
        assert_eq!(merge_config_file(&dir.path().join("absent.conf")), 0);

        let path = dir.path().join("broken.conf");
        fs::write(&path, "not = [valid").unwrap();
        assert_eq!(merge_config_file(&path), 0);
    }
}
