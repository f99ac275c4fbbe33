use anyhow::{Result, anyhow};
use ndarray::{Array, ArrayViewD};
use ort::{
    session::{
        Session,
        builder::{GraphOptimizationLevel, SessionBuilder},
    },
    value::Value,
};
use std::{collections::HashMap, path::Path};

use crate::vocab::UNK_ID;

/// Forward pass of a tashkeel model: one output-vocabulary id per input position.
///
/// Implementations may keep internal state but must give the same answer for the
/// same input. They are not required to be callable from several threads at once.
pub trait InferenceBackend: Send {
    fn predict(&mut self, input_ids: &[i64]) -> Result<Vec<i64>>;
}

/// ONNX Runtime session wrapper (internal)
pub struct OrtBackend {
    session: Session,
    input_name: String,
}

impl OrtBackend {
    pub fn new(model_path: &Path) -> Result<Self> {
        if !model_path.is_file() {
            return Err(anyhow!("model file not found"));
        }

        let session = SessionBuilder::new()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("model declares no inputs"))?;

        Ok(Self { session, input_name })
    }
}

impl InferenceBackend for OrtBackend {
    fn predict(&mut self, input_ids: &[i64]) -> Result<Vec<i64>> {
        let input = Value::from_array(Array::from_shape_vec(
            (1, input_ids.len()),
            input_ids.to_vec(),
        )?)?;

        let mut inputs = HashMap::new();
        inputs.insert(self.input_name.clone(), input);

        let outputs = self.session.run(inputs)?;

        // Exported models either emit ids directly ([1, N], i64) or per-class
        // scores ([1, N, V], f32).
        if let Ok(ids) = outputs[0].try_extract_array::<i64>() {
            return Ok(flatten_ids(ids));
        }
        argmax_ids(outputs[0].try_extract_array::<f32>()?)
    }
}

fn flatten_ids(ids: ArrayViewD<'_, i64>) -> Vec<i64> {
    ids.iter().copied().collect()
}

/// Highest-scoring class per position of a `[1, N, V]` score tensor.
fn argmax_ids(logits: ArrayViewD<'_, f32>) -> Result<Vec<i64>> {
    if logits.ndim() != 3 {
        return Err(anyhow!("unexpected output shape {:?}", logits.shape()));
    }

    Ok(logits
        .slice(ndarray::s![0, .., ..])
        .outer_iter()
        .map(|position| {
            position
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map_or(UNK_ID, |(class, _)| class as i64)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_id_output() {
        let ids = Array2::from_shape_vec((1, 4), vec![2, 3, 0, 0]).unwrap();
        assert_eq!(flatten_ids(ids.view().into_dyn()), vec![2, 3, 0, 0]);
    }

    #[test]
    fn test_argmax_over_classes() {
        let logits = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                0.1, 0.2, 0.9, 0.0, //
                -1.0, -2.0, -0.5, 3.5, //
                0.0, 5.0, 5.0, 1.0,
            ],
        )
        .unwrap();
        // ties go to the last maximum
        assert_eq!(argmax_ids(logits.view().into_dyn()).unwrap(), vec![2, 3, 2]);
    }

    #[test]
    fn test_argmax_rejects_two_dimensional_scores() {
        let logits = Array2::<f32>::zeros((1, 3));
        assert!(argmax_ids(logits.view().into_dyn()).is_err());
    }

    #[test]
    fn test_missing_model_file() {
        let err = OrtBackend::new(Path::new("/does/not/exist.onnx")).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
