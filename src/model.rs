use chrono::{DateTime, NaiveDateTime};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, PredVec};
use gbdt::gradient_boost::GBDT;

use crate::config::ClassifierConfig;
use crate::error::ModelError;
use crate::features::{FeatureMatrix, FeatureSchema, N_FEATURES};
use crate::types::{FlightRecord, Label};

pub const TARGET_COLUMN: &str = "delay";
/// Delays strictly above this many minutes are labelled 1.
pub const DELAY_THRESHOLD_MIN: f64 = 15.0;

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub enum ClassifierState {
    Untrained,
    Trained(Box<GBDT>),
}

pub struct DelayModel {
    schema: FeatureSchema,
    config: ClassifierConfig,
    state: ClassifierState,
}

impl DelayModel {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            schema: FeatureSchema::new(),
            config,
            state: ClassifierState::Untrained,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ClassifierState::Trained(_))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn encode(&self, records: &[FlightRecord]) -> FeatureMatrix {
        self.schema.encode(records)
    }

    /// Encodes features and the label column. Records carrying a `delay`
    /// value keep it; the rest get one derived from their timestamps.
    pub fn encode_with_target(
        &self,
        records: &[FlightRecord],
        target_column: &str,
    ) -> Result<(FeatureMatrix, Vec<Label>), ModelError> {
        if target_column != TARGET_COLUMN {
            return Err(ModelError::UnknownTarget(target_column.to_string()));
        }
        let labels = records
            .iter()
            .enumerate()
            .map(|(i, r)| match r.delay {
                Some(label) => Ok(label),
                None => derive_label(i, r),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.encode(records), labels))
    }

    pub fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<(), ModelError> {
        if features.is_empty() {
            return Err(ModelError::Shape("cannot fit on an empty batch".to_string()));
        }
        if features.len() != labels.len() {
            return Err(ModelError::Shape(format!(
                "{} feature rows vs {} labels",
                features.len(),
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|l| **l > 1) {
            return Err(ModelError::Shape(format!("label {} is not 0 or 1", bad)));
        }

        let mut cfg = Config::new();
        cfg.set_feature_size(N_FEATURES);
        cfg.set_max_depth(self.config.max_depth);
        cfg.set_iterations(self.config.iterations);
        cfg.set_shrinkage(self.config.shrinkage);
        cfg.set_loss("LogLikelyhood");
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_debug(false);

        // log-likelihood loss wants labels in {-1, 1}
        let mut train: DataVec = features
            .rows()
            .iter()
            .zip(labels)
            .map(|(row, &label)| {
                let (weight, target) = if label == 1 {
                    (self.config.scale_pos_weight, 1.0)
                } else {
                    (1.0, -1.0)
                };
                Data::new_training_data(row.to_vec(), weight, target, None)
            })
            .collect();

        let mut gbdt = GBDT::new(&cfg);
        gbdt.fit(&mut train);
        self.state = ClassifierState::Trained(Box::new(gbdt));
        tracing::info!(
            "classifier fitted on {} rows ({} delayed)",
            labels.len(),
            labels.iter().filter(|l| **l == 1).count()
        );
        Ok(())
    }

    /// One label per row, in row order. An unfitted model answers all zeros.
    pub fn predict(&self, features: &FeatureMatrix) -> Vec<Label> {
        match &self.state {
            ClassifierState::Untrained => vec![0; features.len()],
            ClassifierState::Trained(_) if features.is_empty() => Vec::new(),
            ClassifierState::Trained(gbdt) => {
                let test: DataVec = features
                    .rows()
                    .iter()
                    .map(|row| Data::new_test_data(row.to_vec(), None))
                    .collect();
                let scores: PredVec = gbdt.predict(&test);
                scores
                    .into_iter()
                    .map(|p| Label::from(p >= self.config.threshold))
                    .collect()
            }
        }
    }
}

fn parse_timestamp(index: usize, value: &str) -> Result<NaiveDateTime, ModelError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FMT)
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.naive_utc()))
        .map_err(|_| ModelError::BadTimestamp {
            index,
            value: value.to_string(),
        })
}

/// Minutes between scheduled (`Fecha-I`) and actual (`Fecha-O`) departure.
pub fn delay_minutes(index: usize, record: &FlightRecord) -> Result<f64, ModelError> {
    let scheduled = record.fecha_i.as_deref().ok_or(ModelError::MissingTimestamp {
        index,
        field: "Fecha-I",
    })?;
    let actual = record.fecha_o.as_deref().ok_or(ModelError::MissingTimestamp {
        index,
        field: "Fecha-O",
    })?;
    let diff = parse_timestamp(index, actual)? - parse_timestamp(index, scheduled)?;
    Ok(diff.num_milliseconds() as f64 / 60_000.0)
}

fn derive_label(index: usize, record: &FlightRecord) -> Result<Label, ModelError> {
    let minutes = delay_minutes(index, record)?;
    Ok(Label::from(minutes > DELAY_THRESHOLD_MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(actual: &str) -> FlightRecord {
        FlightRecord::new("Grupo LATAM", "N", 1).with_times("2017-01-01 23:30:00", actual)
    }

    fn fast_config() -> ClassifierConfig {
        ClassifierConfig {
            iterations: 30,
            max_depth: 3,
            shrinkage: 0.3,
            scale_pos_weight: 1.0,
            threshold: 0.5,
        }
    }

    #[test]
    fn untrained_predicts_zeros() {
        let model = DelayModel::new(ClassifierConfig::default());
        assert!(!model.is_trained());
        let features = model.encode(&[
            FlightRecord::new("Grupo LATAM", "I", 7),
            FlightRecord::new("Sky Airline", "N", 2),
            FlightRecord::new("Unknown Air", "N", 5),
        ]);
        assert_eq!(model.predict(&features), vec![0, 0, 0]);
    }

    #[test]
    fn label_threshold_is_strict() {
        let model = DelayModel::new(ClassifierConfig::default());
        let records = vec![
            timed("2017-01-01 23:46:00"),
            timed("2017-01-01 23:40:00"),
            timed("2017-01-01 23:45:00"),
            // crosses midnight
            timed("2017-01-02 00:01:00"),
        ];
        let (features, labels) = model.encode_with_target(&records, TARGET_COLUMN).unwrap();
        assert_eq!(features.len(), 4);
        assert_eq!(labels, vec![1, 0, 0, 1]);
    }

    #[test]
    fn sub_second_overrun_counts_as_delay() {
        let r = FlightRecord::new("Copa Air", "I", 1)
            .with_times("2017-01-01T10:00:00Z", "2017-01-01T10:15:00.5Z");
        assert!(delay_minutes(0, &r).unwrap() > DELAY_THRESHOLD_MIN);
        assert_eq!(derive_label(0, &r).unwrap(), 1);
    }

    #[test]
    fn fractional_seconds_in_plain_format() {
        let r = FlightRecord::new("Copa Air", "I", 1)
            .with_times("2017-01-01 10:00:00", "2017-01-01 10:15:00.500");
        assert_eq!(derive_label(0, &r).unwrap(), 1);
        let r = FlightRecord::new("Copa Air", "I", 1)
            .with_times("2017-01-01 10:00:00.250", "2017-01-01 10:15:00.250");
        assert_eq!(delay_minutes(0, &r).unwrap(), 15.0);
        assert_eq!(derive_label(0, &r).unwrap(), 0);
    }

    #[test]
    fn early_departure_is_not_a_delay() {
        assert_eq!(derive_label(0, &timed("2017-01-01 23:00:00")).unwrap(), 0);
        assert_eq!(delay_minutes(0, &timed("2017-01-01 23:00:00")).unwrap(), -30.0);
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let r = FlightRecord::new("Copa Air", "I", 1)
            .with_times("2017-01-01T10:00:00Z", "2017-01-01T10:20:00Z");
        assert_eq!(derive_label(0, &r).unwrap(), 1);
    }

    #[test]
    fn supplied_delay_is_used_as_is() {
        let model = DelayModel::new(ClassifierConfig::default());
        let mut r = FlightRecord::new("Copa Air", "I", 1);
        r.delay = Some(1);
        let (_, labels) = model.encode_with_target(&[r], TARGET_COLUMN).unwrap();
        assert_eq!(labels, vec![1]);
    }

    #[test]
    fn target_errors() {
        let model = DelayModel::new(ClassifierConfig::default());
        let bare = FlightRecord::new("Copa Air", "I", 1);
        assert!(matches!(
            model.encode_with_target(&[bare.clone()], TARGET_COLUMN),
            Err(ModelError::MissingTimestamp { field: "Fecha-I", .. })
        ));
        assert!(matches!(
            model.encode_with_target(&[bare], "late"),
            Err(ModelError::UnknownTarget(_))
        ));
        let garbled = FlightRecord::new("Copa Air", "I", 1).with_times("yesterday", "today");
        assert!(matches!(
            model.encode_with_target(&[garbled], TARGET_COLUMN),
            Err(ModelError::BadTimestamp { index: 0, .. })
        ));
    }

    #[test]
    fn fit_rejects_bad_shapes() {
        let mut model = DelayModel::new(fast_config());
        let features = model.encode(&[FlightRecord::new("Copa Air", "I", 1)]);
        assert!(model.fit(&features, &[]).is_err());
        assert!(model.fit(&features, &[2]).is_err());
        assert!(model.fit(&FeatureMatrix::default(), &[]).is_err());
        assert!(!model.is_trained());
    }

    #[test]
    fn fitted_model_separates_classes() {
        let mut model = DelayModel::new(fast_config());
        let mut records = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let international = i % 2 == 0;
            records.push(FlightRecord::new(
                "Grupo LATAM",
                if international { "I" } else { "N" },
                (i % 12) + 1,
            ));
            labels.push(Label::from(international));
        }
        let features = model.encode(&records);
        model.fit(&features, &labels).unwrap();
        assert!(model.is_trained());

        let probe = model.encode(&[
            FlightRecord::new("Grupo LATAM", "I", 3),
            FlightRecord::new("Grupo LATAM", "N", 3),
            FlightRecord::new("Grupo LATAM", "I", 9),
        ]);
        assert_eq!(model.predict(&probe), vec![1, 0, 1]);
        assert!(model.predict(&FeatureMatrix::default()).is_empty());
    }
}
