use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::guard::{exists, DuplicateGuard};
use crate::ingest::{self, BatchReport, RowRejection};
use crate::models::{
    Prediction, Record, RecordFields, RecordUpdate, RiskAssessment, RiskTier, ScoringResult,
};
use crate::recommend;
use crate::risk::{self, RiskPolicy};
use crate::scoring::{JitterSource, RandomJitter, ScoringEngine};
use crate::store::RecordStore;

const NO_IMPROVEMENT_AREAS: &str = "Continue current performance";

/// The operations callers use. Assumes the caller is already authorized.
pub struct StudentService<S: RecordStore> {
    store: Arc<S>,
    engine: ScoringEngine,
    jitter: Mutex<Box<dyn JitterSource>>,
    delimiter: u8,
}

impl<S: RecordStore> StudentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            engine: ScoringEngine::default(),
            jitter: Mutex::new(Box::new(RandomJitter::from_entropy())),
            delimiter: ingest::DEFAULT_DELIMITER,
        }
    }

    pub fn with_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Mutex::new(Box::new(jitter));
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parses and stores a bulk upload. A structural problem rejects the
    /// whole batch; anything row-level is reported and the rest is kept.
    pub fn ingest_batch(&self, raw_text: &str) -> Result<BatchReport, CoreError> {
        let batch = ingest::parse_batch(raw_text, self.delimiter)?;
        let mut report = BatchReport::default();
        let mut guard = DuplicateGuard::new();
        let mut pending: Vec<(usize, Record)> = Vec::new();

        for parsed in batch.rows {
            let admitted = parsed.outcome.and_then(|fields| {
                guard
                    .admit(self.store.as_ref(), &fields.identifier, parsed.row)
                    .map(|()| fields)
            });
            match admitted {
                Ok(fields) => pending.push((parsed.row, Record::new(fields, Utc::now()))),
                Err(reason) => {
                    debug!(row = parsed.row, %reason, "rejected upload row");
                    report.reject(parsed.row, reason);
                }
            }
        }

        for (row, record) in pending {
            let identifier = record.identifier().to_string();
            match self.store.insert_if_absent(record) {
                Ok(()) => report.accepted += 1,
                Err(_) => {
                    warn!(
                        row,
                        identifier = %identifier,
                        "student added concurrently, skipping row"
                    );
                    report.reject(row, RowRejection::DuplicateInStore { identifier });
                }
            }
        }
        report.errors.sort_by_key(|error| error.row);

        info!(
            accepted = report.accepted,
            rejected = report.errors.len(),
            "processed student upload"
        );
        Ok(report)
    }

    pub fn add_record(&self, fields: RecordFields) -> Result<Record, CoreError> {
        fields.validate().map_err(CoreError::Validation)?;
        if exists(self.store.as_ref(), &fields.identifier) {
            return Err(CoreError::conflict(fields.identifier));
        }
        let record = Record::new(fields, Utc::now());
        self.store.insert_if_absent(record.clone())?;
        info!(student_id = record.identifier(), "added student");
        Ok(record)
    }

    pub fn get_record(&self, identifier: &str) -> Result<Record, CoreError> {
        self.store
            .get(identifier)
            .ok_or_else(|| CoreError::not_found(identifier))
    }

    pub fn list_records(&self) -> Vec<Record> {
        self.store.list()
    }

    pub fn update_record(
        &self,
        identifier: &str,
        update: &RecordUpdate,
    ) -> Result<Record, CoreError> {
        let record = self.store.update(identifier, update, Utc::now())?;
        info!(student_id = identifier, "updated student");
        Ok(record)
    }

    pub fn delete_record(&self, identifier: &str) -> Result<Record, CoreError> {
        let record = self
            .store
            .delete(identifier)
            .ok_or_else(|| CoreError::not_found(identifier))?;
        info!(student_id = identifier, "deleted student");
        Ok(record)
    }

    pub fn predict(&self, identifier: &str) -> Result<ScoringResult, CoreError> {
        let record = self.get_record(identifier)?;
        Ok(self.score(&record.fields))
    }

    pub fn classify_risk(
        &self,
        identifier: &str,
        policy: RiskPolicy,
    ) -> Result<RiskTier, CoreError> {
        let record = self.get_record(identifier)?;
        let tier = match policy {
            RiskPolicy::FactorCount => risk::classify_by_factor_count(&self.score(&record.fields)),
            RiskPolicy::PointAccumulation => risk::classify_by_points(&record.fields).tier,
        };
        Ok(tier)
    }

    pub fn recommend(&self, identifier: &str) -> Result<Vec<String>, CoreError> {
        let record = self.get_record(identifier)?;
        Ok(recommend::recommend(&record.fields))
    }

    /// Score, factor-count risk and recommendations in one pass.
    pub fn assess(&self, identifier: &str) -> Result<Prediction, CoreError> {
        let record = self.get_record(identifier)?;
        let scoring = self.score(&record.fields);
        let risk_level = risk::classify_by_factor_count(&scoring);
        let improvement_areas = if scoring.weak_factors.is_empty() {
            vec![NO_IMPROVEMENT_AREAS.to_string()]
        } else {
            scoring
                .weak_factors
                .iter()
                .map(|factor| factor.to_string())
                .collect()
        };

        Ok(Prediction {
            student_id: record.fields.identifier.clone(),
            student_name: record.fields.display_name.clone(),
            risk_level,
            recommendations: recommend::recommend(&record.fields),
            improvement_areas,
            scoring,
        })
    }

    /// Browsing view: every record with its point-accumulation risk.
    pub fn list_with_risk(&self) -> Vec<(Record, RiskAssessment)> {
        self.store
            .list()
            .into_iter()
            .map(|record| {
                let assessment = risk::classify_by_points(&record.fields);
                (record, assessment)
            })
            .collect()
    }

    fn score(&self, fields: &RecordFields) -> ScoringResult {
        let mut jitter = self
            .jitter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.engine.score(fields, jitter.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::ingest::RowError;
    use crate::models::Grade;
    use crate::scoring::{FixedJitter, GpaBand, GpaBands};
    use crate::store::MemoryStore;
    use chrono::DateTime;

    /// Reports every identifier as unknown, so only the insert itself can
    /// detect a clash, as when another writer lands between check and commit.
    struct LateConflictStore {
        inner: MemoryStore,
    }

    impl RecordStore for LateConflictStore {
        fn insert_if_absent(&self, record: Record) -> Result<(), CoreError> {
            self.inner.insert_if_absent(record)
        }

        fn contains(&self, _identifier: &str) -> bool {
            false
        }

        fn get(&self, identifier: &str) -> Option<Record> {
            self.inner.get(identifier)
        }

        fn list(&self) -> Vec<Record> {
            self.inner.list()
        }

        fn update(
            &self,
            identifier: &str,
            update: &RecordUpdate,
            now: DateTime<Utc>,
        ) -> Result<Record, CoreError> {
            self.inner.update(identifier, update, now)
        }

        fn delete(&self, identifier: &str) -> Option<Record> {
            self.inner.delete(identifier)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    const HEADER: &str = "student_name,student_id,class_grade,attendance_rate,study_hours_per_week,sleep_duration,health_status,family_support,internet_access,parental_education,previous_percentage,class_participation,extracurricular_activities,current_percentage";

    fn service() -> StudentService<MemoryStore> {
        StudentService::new(Arc::new(MemoryStore::new())).with_jitter(FixedJitter(0.0))
    }

    fn fields(identifier: &str, name: &str) -> RecordFields {
        RecordFields {
            identifier: identifier.to_string(),
            display_name: name.to_string(),
            grade_level: "10th".to_string(),
            attendance_rate: 92.0,
            study_hours_per_week: 18.0,
            sleep_duration_hours: 7.5,
            health_status: "excellent".to_string(),
            family_support: "high".to_string(),
            internet_access: "yes".to_string(),
            parental_education: "higher".to_string(),
            previous_percentage: 88.0,
            class_participation: "high".to_string(),
            extracurricular_activities: "high".to_string(),
            current_percentage: 90.0,
        }
    }

    #[test]
    fn ingest_counts_every_row() {
        let service = service();
        let text = format!(
            "{HEADER}\n\
             Avery Lee,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n\
             ,STU2,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n\
             Kiara Patel,STU3,9th,abc,8,6,fair,low,no,primary,58,low,none,62\n"
        );
        let report = service.ingest_batch(&text).unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(report.total_rows(), 3);
        assert_eq!(
            report.errors,
            vec![RowError {
                row: 3,
                reason: RowRejection::MissingNameOrId
            }]
        );
        assert_eq!(service.get_record("STU3").unwrap().fields.attendance_rate, 0.0);
    }

    #[test]
    fn reingest_rejects_only_colliding_rows() {
        let service = service();
        service.add_record(fields("STU1", "Avery Lee")).unwrap();

        let text = format!(
            "{HEADER}\n\
             Avery Again,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n\
             Jules Moreno,STU2,10th,80,12,8,good,medium,yes,secondary,72,medium,medium,75\n"
        );
        let report = service.ingest_batch(&text).unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].to_string(), "Row 2: Student ID STU1 already exists");
        assert_eq!(service.get_record("STU1").unwrap().display_name(), "Avery Lee");
        assert!(service.get_record("STU2").is_ok());
    }

    #[test]
    fn repeated_identifier_within_one_upload_is_rejected() {
        let service = service();
        let text = format!(
            "{HEADER}\n\
             Avery Lee,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n\
             Avery Twin,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n"
        );
        let report = service.ingest_batch(&text).unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(
            report.errors[0].reason,
            RowRejection::DuplicateInBatch {
                identifier: "STU1".to_string(),
                first_row: 2
            }
        );
        assert_eq!(service.list_records().len(), 1);
    }

    #[test]
    fn commit_time_clash_is_reported_per_row() {
        let store = Arc::new(LateConflictStore {
            inner: MemoryStore::new(),
        });
        let service = StudentService::new(store.clone()).with_jitter(FixedJitter(0.0));
        service.add_record(fields("STU1", "Avery Lee")).unwrap();

        let text = format!(
            "{HEADER}\n\
             Avery Again,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n\
             Jules Moreno,STU2,10th,80,12,8,good,medium,yes,secondary,72,medium,medium,75\n"
        );
        let report = service.ingest_batch(&text).unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.total_rows(), 2);
        assert_eq!(
            report.errors,
            vec![RowError {
                row: 2,
                reason: RowRejection::DuplicateInStore {
                    identifier: "STU1".to_string()
                }
            }]
        );
        assert_eq!(store.len(), 2);
        assert_eq!(service.get_record("STU1").unwrap().display_name(), "Avery Lee");
    }

    #[test]
    fn concurrent_uploads_of_one_student_store_it_once() {
        let service = Arc::new(service());
        let text = format!(
            "{HEADER}\nAvery Lee,STU1,10th,92,18,7.5,excellent,high,yes,higher,88,high,high,90\n"
        );
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let text = text.clone();
                std::thread::spawn(move || service.ingest_batch(&text).unwrap())
            })
            .collect();

        let reports: Vec<BatchReport> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert!(reports.iter().all(|report| report.total_rows() == 1));
        assert_eq!(reports.iter().map(|report| report.accepted).sum::<usize>(), 1);
        assert_eq!(service.list_records().len(), 1);
    }

    #[test]
    fn custom_grade_bands_drive_predictions() {
        let bands = GpaBands {
            bands: vec![
                GpaBand {
                    grade: Grade::B,
                    min_score: 50.0,
                    gpa_base: 3.0,
                    gpa_spread: 0.5,
                },
                GpaBand {
                    grade: Grade::F,
                    min_score: f64::NEG_INFINITY,
                    gpa_base: 0.0,
                    gpa_spread: 1.0,
                },
            ],
        };
        let service = service().with_engine(ScoringEngine::new(bands));
        service.add_record(fields("STU1", "Avery Lee")).unwrap();

        let result = service.predict("STU1").unwrap();
        assert_eq!(result.predicted_grade, Grade::B);
        assert!((result.predicted_gpa - 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_header_commits_nothing() {
        let service = service();
        let header = HEADER.replace(",internet_access", "");
        let text = format!(
            "{header}\nAvery Lee,STU1,10th,92,18,7.5,excellent,high,higher,88,high,high,90"
        );

        let err = service.ingest_batch(&text).unwrap_err();
        assert_eq!(
            err,
            CoreError::Format(FormatError::MissingHeaders(vec!["internet_access".to_string()]))
        );
        assert!(service.list_records().is_empty());
    }

    #[test]
    fn add_record_validates_and_guards() {
        let service = service();
        service.add_record(fields("STU1", "Avery Lee")).unwrap();

        assert_eq!(
            service.add_record(fields("STU1", "Someone Else")).unwrap_err(),
            CoreError::conflict("STU1")
        );
        assert!(matches!(
            service.add_record(fields("", "No Id")),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(service.list_records().len(), 1);
    }

    #[test]
    fn predictions_for_stored_student() {
        let service = service();
        service.add_record(fields("STU1", "Avery Lee")).unwrap();

        let result = service.predict("STU1").unwrap();
        assert_eq!(result.predicted_grade, Grade::A);
        assert!((result.predicted_gpa - 3.7).abs() < 1e-9);
        assert_eq!(
            service.classify_risk("STU1", RiskPolicy::FactorCount).unwrap(),
            RiskTier::Low
        );
        assert_eq!(
            service.classify_risk("STU1", RiskPolicy::PointAccumulation).unwrap(),
            RiskTier::Low
        );

        let prediction = service.assess("STU1").unwrap();
        assert_eq!(prediction.improvement_areas, vec![NO_IMPROVEMENT_AREAS.to_string()]);
        assert_eq!(prediction.recommendations, vec![recommend::MAINTAIN_MESSAGE.to_string()]);
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let service = service();
        assert_eq!(service.predict("nope").unwrap_err(), CoreError::not_found("nope"));
        assert_eq!(
            service.classify_risk("nope", RiskPolicy::PointAccumulation).unwrap_err(),
            CoreError::not_found("nope")
        );
        assert_eq!(service.recommend("nope").unwrap_err(), CoreError::not_found("nope"));
        assert_eq!(service.delete_record("nope").unwrap_err(), CoreError::not_found("nope"));
    }

    #[test]
    fn update_then_delete() {
        let service = service();
        let created = service.add_record(fields("STU1", "Avery Lee")).unwrap();

        let update = RecordUpdate {
            attendance_rate: Some(60.0),
            ..RecordUpdate::default()
        };
        let updated = service.update_record("STU1", &update).unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(
            service.recommend("STU1").unwrap(),
            vec![recommend::ATTENDANCE_TIP.to_string()]
        );

        service.delete_record("STU1").unwrap();
        assert!(service.list_records().is_empty());
    }
}
