//! Model persistence boundary.
//!
//! A [`ModelStore`] is an opaque key-value store of [`ModelSnapshot`]s keyed by model type.
//! Two stores ship with the crate: an in-process [`MemoryModelStore`] and a directory-backed
//! [`FileModelStore`] writing one bincode file per key.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpartaError};

/// Flattened parameters of a two-layer Q-network.
///
/// Matrices are stored neuron-major: the outer sequence is the neuron, the inner one its
/// input weights. There is no schema version; compatibility follows from the shapes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelSnapshot {
    pub input_size: usize,
    pub hidden_weights: Vec<Vec<f64>>,
    pub hidden_biases: Vec<f64>,
    pub output_weights: Vec<Vec<f64>>,
    pub output_biases: Vec<f64>,
    pub performance: f64,
}

impl ModelSnapshot {
    pub fn hidden_size(&self) -> usize {
        self.hidden_biases.len()
    }

    pub fn output_size(&self) -> usize {
        self.output_biases.len()
    }

    /// Check that the nested sequences describe `input -> hidden -> output` consistently.
    pub fn validate(&self) -> Result<()> {
        check_matrix("hidden", &self.hidden_weights, self.hidden_size(), self.input_size)?;
        check_matrix("output", &self.output_weights, self.output_size(), self.hidden_size())
    }

    pub(crate) fn matrix_to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
        matrix.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    pub(crate) fn rows_to_matrix(rows: &[Vec<f64>], cols: usize) -> Result<Array2<f64>> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), cols), flat)
            .map_err(|e| SpartaError::InvalidSnapshot(e.to_string()))
    }

    pub(crate) fn to_vector(values: &[f64]) -> Array1<f64> {
        Array1::from_vec(values.to_vec())
    }
}

fn check_matrix(layer: &str, rows: &[Vec<f64>], neurons: usize, inputs: usize) -> Result<()> {
    if rows.len() != neurons {
        return Err(SpartaError::InvalidSnapshot(format!(
            "{} layer has {} weight rows but {} biases",
            layer,
            rows.len(),
            neurons
        )));
    }
    if let Some(row) = rows.iter().find(|row| row.len() != inputs) {
        return Err(SpartaError::InvalidSnapshot(format!(
            "{} layer row has {} weights, expected {}",
            layer,
            row.len(),
            inputs
        )));
    }
    Ok(())
}

/// Save/load interface the networks persist through.
pub trait ModelStore: Send + Sync {
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<ModelSnapshot>>;
}

/// In-process store, mostly useful for tests and short-lived hosts.
#[derive(Default)]
pub struct MemoryModelStore {
    snapshots: Mutex<HashMap<String, ModelSnapshot>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Inserts and lookups never leave the map half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ModelSnapshot>> {
        self.snapshots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()> {
        self.lock().insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<ModelSnapshot>> {
        Ok(self.lock().get(key).cloned())
    }
}

/// Stores each snapshot as `<dir>/<key>.bin` in bincode.
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(FileModelStore {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.bin", name))
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("bin.tmp");
        let serialized = bincode::serialize(snapshot)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        // Rename so a crash mid-write never clobbers the last good snapshot.
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<ModelSnapshot>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let snapshot: ModelSnapshot = bincode::deserialize(&data)?;
        Ok(Some(snapshot))
    }
}
