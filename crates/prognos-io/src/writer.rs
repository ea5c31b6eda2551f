//! JSON result writer and artifact paths for one experiment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes an experiment's outputs under one directory.
///
/// Creates the output directory on construction if it does not exist.
/// JSON outputs are named `{experiment}_{suffix}.json` and model binaries
/// `{experiment}_chain.bin` / `{experiment}_cost.bin`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write `value` as pretty JSON to `{experiment}_{suffix}.json` and
    /// return the path written.
    ///
    /// # Errors
    ///
    /// | Variant                  | When                          |
    /// |--------------------------|-------------------------------|
    /// | [`IoError::Serialize`]   | `value` cannot be rendered    |
    /// | [`IoError::WriteFile`]   | the file cannot be written    |
    #[instrument(skip(self, value))]
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        suffix: &str,
        value: &T,
    ) -> Result<PathBuf, IoError> {
        let path = self.json_path(suffix);
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "result written");
        Ok(path)
    }

    /// Return `{output_dir}/{experiment}_{suffix}.json` without writing.
    #[must_use]
    pub fn json_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()))
    }

    /// Return the path where the classifier chain should be saved.
    #[must_use]
    pub fn chain_model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_chain.bin", self.experiment.as_str()))
    }

    /// Return the path where the cost model should be saved.
    #[must_use]
    pub fn cost_model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_cost.bin", self.experiment.as_str()))
    }

    /// Return the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &ExperimentName {
        &self.experiment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Summary<'a> {
        experiment: &'a str,
        n_patients: usize,
    }

    #[test]
    fn write_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("run1").unwrap()).unwrap();
        let path = writer
            .write_json("summary", &Summary { experiment: "run1", n_patients: 3 })
            .unwrap();
        assert_eq!(path, dir.path().join("run1_summary.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["experiment"], "run1");
        assert_eq!(content["n_patients"], 3);
    }

    #[test]
    fn write_json_accepts_slices() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("arr").unwrap()).unwrap();
        let rows: Vec<u32> = vec![1, 2, 3];
        let path = writer.write_json("rows", rows.as_slice()).unwrap();
        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content.as_array().unwrap().len(), 3);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = ResultWriter::new(&nested, ExperimentName::new("deep").unwrap()).unwrap();
        writer.write_json("x", &1).unwrap();
        assert!(nested.join("deep_x.json").exists());
    }

    #[test]
    fn model_paths() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("cohort").unwrap()).unwrap();
        assert_eq!(writer.chain_model_path(), dir.path().join("cohort_chain.bin"));
        assert_eq!(writer.cost_model_path(), dir.path().join("cohort_cost.bin"));
        assert_eq!(writer.experiment().as_str(), "cohort");
    }

    #[test]
    fn unwritable_target_reported() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("clash").unwrap()).unwrap();
        fs::create_dir(writer.json_path("out")).unwrap();
        let result = writer.write_json("out", &1);
        assert!(matches!(result, Err(IoError::WriteFile { .. })));
    }
}
