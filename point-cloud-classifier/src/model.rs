//! Train-once / predict-many wrapper around the forest.
use crate::forest::{FeatureRow, ForestParams, RandomForest};
use crate::source::PointTable;
use constants::class::{ClassLabel, UnknownClassId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("feature rows ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },
    #[error("label at row {row} is outside the closed class set: {source}")]
    UnknownLabel {
        row: usize,
        #[source]
        source: UnknownClassId,
    },
}

/// Fits the classifier from a feature table and matching labels.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    params: ForestParams,
}

impl ModelTrainer {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn fit(
        &self,
        features: &PointTable,
        labels: &[ClassLabel],
    ) -> Result<TrainedModel, TrainingError> {
        if features.len() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let rows = feature_rows(features);
        let ids: Vec<u8> = labels.iter().map(|l| l.id()).collect();

        log::info!(
            "Training forest: {} trees, max depth {}, {} rows",
            self.params.n_trees,
            self.params.max_depth,
            rows.len()
        );
        let forest = RandomForest::fit(&rows, &ids, &self.params);
        log::info!(
            "Forest trained ({} nodes across {} trees)",
            forest.total_nodes(),
            forest.n_trees()
        );

        Ok(TrainedModel {
            forest,
            training_rows: rows.len(),
        })
    }

    /// Fit from raw class ids, rejecting any id outside the closed set.
    pub fn fit_class_ids(
        &self,
        features: &PointTable,
        class_ids: &[u8],
    ) -> Result<TrainedModel, TrainingError> {
        let labels = class_ids
            .iter()
            .enumerate()
            .map(|(row, &id)| {
                ClassLabel::try_from(id).map_err(|source| TrainingError::UnknownLabel { row, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.fit(features, &labels)
    }
}

/// Immutable fitted model shared by every prediction of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    forest: RandomForest,
    training_rows: usize,
}

impl TrainedModel {
    /// One label per input row, in input order.
    pub fn predict(&self, features: &PointTable) -> Vec<ClassLabel> {
        self.forest.predict_many(&feature_rows(features))
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }
}

fn feature_rows(table: &PointTable) -> Vec<FeatureRow> {
    table.rows().iter().map(|p| p.features()).collect()
}
