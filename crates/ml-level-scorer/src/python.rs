use crate::error::{ScorerError, ScorerResult};
use crate::features::LevelFeatures;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::path::{Path, PathBuf};

/// In-process wrapper around a trained Python level-scoring model, loaded via
/// PyO3. Only compiled in with the `ml` feature.
pub struct EmbeddedScorerModel {
    model: Py<PyAny>,
}

unsafe impl Send for EmbeddedScorerModel {}
unsafe impl Sync for EmbeddedScorerModel {}

impl EmbeddedScorerModel {
    pub fn load(model_dir: &str) -> ScorerResult<Self> {
        Python::attach(|py| {
            add_to_sys_path(py, model_dir)
                .map_err(|e: PyErr| ScorerError::Model(format!("failed to configure sys.path: {e}")))?;

            let module = py
                .import("level_scorer.model")
                .map_err(|e: PyErr| ScorerError::Unavailable(format!("level_scorer.model not importable: {e}")))?;

            let model = module
                .getattr("LevelScorer")
                .map_err(|e: PyErr| ScorerError::Unavailable(format!("LevelScorer class not found: {e}")))?
                .call1((model_dir,))
                .map_err(|e: PyErr| ScorerError::Model(format!("LevelScorer init failed: {e}")))?;
            model
                .call_method0("load")
                .map_err(|e: PyErr| ScorerError::Model(format!("LevelScorer.load() failed: {e}")))?;

            Ok(Self { model: model.unbind() })
        })
    }

    pub fn predict(&self, features: &LevelFeatures) -> ScorerResult<f64> {
        Python::attach(|py| {
            let values = features.to_vec();
            let result = self
                .model
                .call_method1(py, "predict", (values,))
                .map_err(|e: PyErr| ScorerError::Model(format!("LevelScorer.predict() failed: {e}")))?;
            result
                .extract::<f64>(py)
                .map_err(|e: PyErr| ScorerError::Model(format!("failed to extract prediction: {e}")))
        })
    }
}

fn add_to_sys_path(py: Python<'_>, model_dir: &str) -> PyResult<()> {
    let sys = py.import("sys")?;
    let path: Bound<'_, PyList> = sys.getattr("path")?.cast_into()?;

    let abs_path = std::fs::canonicalize(model_dir).unwrap_or_else(|_| PathBuf::from(model_dir));
    let path_str = abs_path.to_string_lossy().to_string();

    let already_present = path.iter().any(|item| item.extract::<String>().map(|p| p == path_str).unwrap_or(false));
    if !already_present {
        path.insert(0, &path_str)?;
    }
    Ok(())
}

/// A model is considered trained and ready if its directory has at least one
/// serialized weights file.
pub fn has_model_files(dir: &str) -> bool {
    let path = Path::new(dir);
    if !path.is_dir() {
        return false;
    }
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().ends_with(".json") || e.file_name().to_string_lossy().ends_with(".pkl"))
        })
        .unwrap_or(false)
}
