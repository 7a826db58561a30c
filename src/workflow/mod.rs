//! The train -> metrics -> predictions -> future-forecast workflow.
//!
//! `ForecastWorkflow` owns the single `WorkflowState` of a session. Commands:
//!
//! - `train` and `forecast_future` issue a request and move the state machine
//! - `fetch_metrics`, `fetch_historical_predictions` and `fetch_stored_forecast`
//!   are read-only refreshes and never touch state
//!
//! Input problems (missing files, reserved parameter names, bad horizon, wrong
//! model, a train already in flight) are rejected before any request is sent
//! and leave state unchanged.
//!
//! The lock is never held across a service call. Each request carries the
//! sequence number of its slot (train or forecast) at the time it was issued;
//! a response whose number is no longer current is handed back to its caller
//! but not applied. A new train also invalidates any in-flight forecast.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::data::classify;
use crate::data::service::ForecastBackend;
use crate::domain::{
    ForecastRequest, FutureSeries, Horizon, Metrics, StoredPredictions, TrainParams, TrainRequest,
    TrainResult, UploadedFile, check_params,
};
use crate::error::{BackendError, ForecastError};
use crate::models::ModelVariant;

pub mod state;

pub use state::*;

pub struct ForecastWorkflow<B> {
    backend: B,
    inner: Mutex<Inner>,
}

struct Inner {
    snapshot: WorkflowSnapshot,
    train_seq: u64,
    forecast_seq: u64,
    subscribers: Vec<Sender<WorkflowSnapshot>>,
}

impl Inner {
    fn transition(&mut self, state: WorkflowState) {
        let next = self.snapshot.next(state);
        tracing::info!(
            "workflow {} -> {} (v{} at {})",
            self.snapshot.state.name(),
            next.state.name(),
            next.version,
            next.changed_at.format("%H:%M:%S%.3f")
        );
        self.snapshot = next;
        let snapshot = &self.snapshot;
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[derive(Debug, Clone, Copy)]
struct ForecastTicket {
    seq: u64,
    train_seq: u64,
}

impl<B: ForecastBackend> ForecastWorkflow<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                snapshot: WorkflowSnapshot::initial(),
                train_seq: 0,
                forecast_seq: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.lock().snapshot.clone()
    }

    /// Receive every subsequent state change, in order.
    pub fn subscribe(&self) -> Receiver<WorkflowSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Classify `files`, train `model` on them, and on success enter `Trained`.
    ///
    /// A successful train drops any future forecast attached to earlier data.
    pub fn train(
        &self,
        files: &[UploadedFile],
        model: ModelVariant,
        params: TrainParams,
    ) -> Result<TrainResult, ForecastError> {
        check_params(&params)?;
        let request = TrainRequest {
            files: classify(files)?,
            model,
            params,
        };

        let ticket = {
            let mut inner = self.lock();
            if inner.snapshot.state.is_training() {
                return Err(ForecastError::WorkflowBusy);
            }
            let previous = inner.snapshot.state.last_good().cloned();
            inner.train_seq += 1;
            inner.transition(WorkflowState::Training { model, previous });
            inner.train_seq
        };

        let outcome = self.backend.train(&request);

        let mut inner = self.lock();
        if inner.train_seq != ticket {
            tracing::debug!("discarding stale training response for {model}");
            return outcome.map_err(ForecastError::from);
        }
        match outcome {
            Ok(result) => {
                inner.transition(WorkflowState::Trained(TrainedModel {
                    model,
                    result: result.clone(),
                    future: None,
                }));
                Ok(result)
            }
            Err(err) => {
                tracing::warn!("training {model} failed: {err}");
                let last_good = inner.snapshot.state.last_good().cloned();
                inner.transition(WorkflowState::Error {
                    last_good,
                    cause: err.clone(),
                });
                Err(err.into())
            }
        }
    }

    /// Forecast `years` beyond the data for the model trained in this session.
    pub fn forecast_future(
        &self,
        files: &[UploadedFile],
        model: ModelVariant,
        years: u32,
    ) -> Result<FutureSeries, ForecastError> {
        let horizon = Horizon::new(years)?;
        let files = classify(files)?;

        let ticket = {
            let mut inner = self.lock();
            if inner.snapshot.state.is_training() {
                return Err(ForecastError::WorkflowBusy);
            }
            let trained = inner
                .snapshot
                .state
                .last_good()
                .filter(|t| t.model == model)
                .cloned()
                .ok_or(ForecastError::NotTrained { model })?;
            inner.forecast_seq += 1;
            inner.transition(WorkflowState::ForecastingFuture { trained, horizon });
            ForecastTicket {
                seq: inner.forecast_seq,
                train_seq: inner.train_seq,
            }
        };

        let outcome = self.backend.forecast(&ForecastRequest {
            files,
            model,
            horizon,
        });

        let mut inner = self.lock();
        if inner.forecast_seq != ticket.seq || inner.train_seq != ticket.train_seq {
            tracing::debug!("discarding stale forecast response for {model}");
            return outcome.map_err(ForecastError::from);
        }
        let Some(mut trained) = inner.snapshot.state.last_good().cloned() else {
            return outcome.map_err(ForecastError::from);
        };
        match outcome {
            Ok(future) => {
                trained.future = Some(future.clone());
                inner.transition(WorkflowState::Trained(trained));
                Ok(future)
            }
            Err(err) => {
                tracing::warn!("forecasting {model} failed: {err}");
                inner.transition(WorkflowState::Error {
                    last_good: Some(trained),
                    cause: err.clone(),
                });
                Err(err.into())
            }
        }
    }

    /// Re-read persisted metrics for `model`.
    pub fn fetch_metrics(&self, model: ModelVariant) -> Result<Metrics, ForecastError> {
        self.backend
            .metrics(model)
            .map_err(|e| refresh_failed("metrics", model, e))
    }

    /// Re-read persisted historical/test predictions for `model`.
    pub fn fetch_historical_predictions(&self, model: ModelVariant) -> Result<StoredPredictions, ForecastError> {
        self.backend
            .predictions(model)
            .map_err(|e| refresh_failed("predictions", model, e))
    }

    /// Re-read a persisted future forecast for `model`.
    pub fn fetch_stored_forecast(&self, model: ModelVariant, years: u32) -> Result<FutureSeries, ForecastError> {
        let horizon = Horizon::new(years)?;
        self.backend
            .stored_forecast(model, horizon)
            .map_err(|e| refresh_failed("forecast", model, e))
    }
}

fn refresh_failed(what: &str, model: ModelVariant, err: BackendError) -> ForecastError {
    tracing::warn!("refreshing {what} for {model} failed: {err}");
    err.into()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::domain::{FileRole, Series};
    use crate::error::{InvalidHorizonError, ReservedParamError};

    /// Blocks the first matching backend call until released.
    struct Gate {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    struct GateHandle {
        entered: Receiver<()>,
        release: Sender<()>,
    }

    fn gate() -> (Gate, GateHandle) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        (
            Gate {
                entered: entered_tx,
                release: release_rx,
            },
            GateHandle {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    impl Gate {
        fn wait(self) {
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        train_requests: Mutex<Vec<TrainRequest>>,
        forecast_requests: Mutex<Vec<ForecastRequest>>,
        train_results: Mutex<VecDeque<Result<TrainResult, BackendError>>>,
        forecast_results: Mutex<VecDeque<Result<FutureSeries, BackendError>>>,
        metrics_result: Mutex<Option<Result<Metrics, BackendError>>>,
        train_gate: Mutex<Option<Gate>>,
        forecast_gate: Mutex<Option<Gate>>,
    }

    impl FakeBackend {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push_train(&self, result: Result<TrainResult, BackendError>) {
            self.train_results.lock().unwrap().push_back(result);
        }

        fn push_forecast(&self, result: Result<FutureSeries, BackendError>) {
            self.forecast_results.lock().unwrap().push_back(result);
        }

        fn gate_train(&self) -> GateHandle {
            let (g, h) = gate();
            *self.train_gate.lock().unwrap() = Some(g);
            h
        }

        fn gate_forecast(&self) -> GateHandle {
            let (g, h) = gate();
            *self.forecast_gate.lock().unwrap() = Some(g);
            h
        }
    }

    impl ForecastBackend for FakeBackend {
        fn train(&self, request: &TrainRequest) -> Result<TrainResult, BackendError> {
            self.record(format!("train:{}", request.model));
            self.train_requests.lock().unwrap().push(request.clone());
            let result = self
                .train_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected train call");
            let gate = self.train_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.wait();
            }
            result
        }

        fn forecast(&self, request: &ForecastRequest) -> Result<FutureSeries, BackendError> {
            self.record(format!("forecast:{}:{}", request.model, request.horizon.years()));
            self.forecast_requests.lock().unwrap().push(request.clone());
            let result = self
                .forecast_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected forecast call");
            let gate = self.forecast_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.wait();
            }
            result
        }

        fn metrics(&self, model: ModelVariant) -> Result<Metrics, BackendError> {
            self.record(format!("metrics:{model}"));
            self.metrics_result
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(BackendError::new("no metrics configured")))
        }

        fn predictions(&self, model: ModelVariant) -> Result<StoredPredictions, BackendError> {
            self.record(format!("preds:{model}"));
            Ok(StoredPredictions {
                historical: Series::empty(),
                prediction: Series::empty(),
            })
        }

        fn stored_forecast(&self, model: ModelVariant, horizon: Horizon) -> Result<FutureSeries, BackendError> {
            self.record(format!("stored:{model}:{}", horizon.years()));
            FutureSeries::new(vec![2024], vec![1.0]).map_err(|e| BackendError::new(e.to_string()))
        }
    }

    fn files() -> Vec<UploadedFile> {
        ["births.csv", "deaths.csv", "population.csv", "migration.csv"]
            .iter()
            .map(|n| UploadedFile::new(*n, b"Year,Value\n2020,1\n".to_vec()))
            .collect()
    }

    fn train_result(mae: f64) -> TrainResult {
        let mut metrics = std::collections::BTreeMap::new();
        metrics.insert("MAE".to_string(), mae);
        TrainResult {
            metrics: Metrics::new(metrics),
            historical: Series::new(vec![2020, 2021, 2022], vec![Some(10.0), Some(11.0), Some(12.0)]).unwrap(),
            test_prediction: Series::new(vec![2022], vec![Some(11.5)]).unwrap(),
        }
    }

    fn future(start: i32, values: &[f64]) -> FutureSeries {
        let years = (start..start + values.len() as i32).collect();
        FutureSeries::new(years, values.to_vec()).unwrap()
    }

    fn trained_workflow() -> ForecastWorkflow<FakeBackend> {
        let backend = FakeBackend::default();
        backend.push_train(Ok(train_result(1.0)));
        let wf = ForecastWorkflow::new(backend);
        wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).unwrap();
        wf
    }

    #[test]
    fn train_success_enters_trained() {
        let wf = trained_workflow();
        let snap = wf.snapshot();
        assert_eq!(snap.version, 2);
        match snap.state.as_ref() {
            WorkflowState::Trained(t) => {
                assert_eq!(t.model, ModelVariant::Sarimax);
                assert_eq!(t.result, train_result(1.0));
                assert!(t.future.is_none());
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(wf.backend().calls(), vec!["train:sarimax"]);
    }

    #[test]
    fn incomplete_uploads_never_reach_the_service() {
        let wf = ForecastWorkflow::new(FakeBackend::default());
        let all = files();
        let err = wf.train(&all[..3], ModelVariant::Sarimax, TrainParams::new()).unwrap_err();
        match err {
            ForecastError::Classification(e) => assert_eq!(e.missing_roles, vec![FileRole::Migration]),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(wf.backend().calls().is_empty());
        assert_eq!(wf.snapshot().version, 0);
        assert_eq!(*wf.snapshot().state, WorkflowState::Idle);
    }

    #[test]
    fn train_request_carries_classified_files_and_params() {
        let backend = FakeBackend::default();
        backend.push_train(Ok(train_result(1.0)));
        let wf = ForecastWorkflow::new(backend);

        let uploads: Vec<UploadedFile> = ["mig_in.csv", "x_population_2020.csv", "Births_2020.csv", "deaths.csv"]
            .iter()
            .map(|n| UploadedFile::new(*n, Vec::new()))
            .collect();
        let params = TrainParams::from([
            ("order".to_string(), "[1,1,1]".to_string()),
            ("seasonal".to_string(), "false".to_string()),
        ]);
        wf.train(&uploads, ModelVariant::Prophet, params.clone()).unwrap();

        let requests = wf.backend().train_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, ModelVariant::Prophet);
        assert_eq!(request.params, params);
        let names: Vec<(FileRole, &str)> = request.files.iter().map(|(r, f)| (r, f.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (FileRole::Births, "Births_2020.csv"),
                (FileRole::Deaths, "deaths.csv"),
                (FileRole::Population, "x_population_2020.csv"),
                (FileRole::Migration, "mig_in.csv"),
            ]
        );
    }

    #[test]
    fn reserved_params_are_rejected_before_any_request() {
        let wf = ForecastWorkflow::new(FakeBackend::default());
        let params = TrainParams::from([("model".to_string(), "xgb".to_string())]);
        let err = wf.train(&files(), ModelVariant::Sarimax, params).unwrap_err();
        assert_eq!(
            err,
            ForecastError::ReservedParam(ReservedParamError {
                key: "model".to_string()
            })
        );
        assert!(wf.backend().calls().is_empty());
        assert_eq!(*wf.snapshot().state, WorkflowState::Idle);
    }

    #[test]
    fn forecast_request_carries_classified_files_and_horizon() {
        let wf = trained_workflow();
        wf.backend().push_forecast(Ok(future(2024, &[1.0, 2.0, 3.0])));
        wf.forecast_future(&files(), ModelVariant::Sarimax, 3).unwrap();

        let requests = wf.backend().forecast_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, ModelVariant::Sarimax);
        assert_eq!(requests[0].horizon.years(), 3);
        for role in FileRole::ALL {
            assert!(requests[0].files.get(role).name.starts_with(role.field_name()));
        }
    }

    #[test]
    fn forecast_with_incomplete_uploads_never_reaches_the_service() {
        let wf = trained_workflow();
        let before = wf.snapshot();
        let all = files();
        let err = wf.forecast_future(&all[1..], ModelVariant::Sarimax, 5).unwrap_err();
        match err {
            ForecastError::Classification(e) => assert_eq!(e.missing_roles, vec![FileRole::Births]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(wf.backend().calls(), vec!["train:sarimax"]);
        assert_eq!(wf.snapshot().version, before.version);
    }

    #[test]
    fn train_failure_keeps_previous_results() {
        let wf = trained_workflow();
        wf.backend().push_train(Err(BackendError::new("fit diverged")));
        let err = wf.train(&files(), ModelVariant::Prophet, TrainParams::new()).unwrap_err();
        assert_eq!(err, ForecastError::Backend(BackendError::new("fit diverged")));

        match wf.snapshot().state.as_ref() {
            WorkflowState::Error { last_good, cause } => {
                let last_good = last_good.as_ref().expect("previous data retained");
                assert_eq!(last_good.model, ModelVariant::Sarimax);
                assert_eq!(cause.detail, "fit diverged");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn first_train_failure_has_no_last_good() {
        let backend = FakeBackend::default();
        backend.push_train(Err(BackendError::new("boom")));
        let wf = ForecastWorkflow::new(backend);
        assert!(wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).is_err());
        assert!(wf.snapshot().state.last_good().is_none());
        assert_eq!(wf.snapshot().state.name(), "error");
    }

    #[test]
    fn second_train_while_training_is_rejected() {
        let backend = FakeBackend::default();
        backend.push_train(Ok(train_result(1.0)));
        let handle = backend.gate_train();
        let wf = Arc::new(ForecastWorkflow::new(backend));

        let first = {
            let wf = Arc::clone(&wf);
            thread::spawn(move || wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()))
        };
        handle.entered.recv().unwrap();
        assert!(wf.snapshot().state.is_training());

        let err = wf.train(&files(), ModelVariant::Xgb, TrainParams::new()).unwrap_err();
        assert_eq!(err, ForecastError::WorkflowBusy);
        let err = wf.forecast_future(&files(), ModelVariant::Sarimax, 5).unwrap_err();
        assert_eq!(err, ForecastError::WorkflowBusy);

        handle.release.send(()).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), train_result(1.0));

        match wf.snapshot().state.as_ref() {
            WorkflowState::Trained(t) => assert_eq!(t.model, ModelVariant::Sarimax),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(wf.backend().calls(), vec!["train:sarimax"]);
    }

    #[test]
    fn forecast_attaches_future_and_retrain_clears_it() {
        let wf = trained_workflow();
        wf.backend().push_forecast(Ok(future(2024, &[1.0, 2.0])));
        let series = wf.forecast_future(&files(), ModelVariant::Sarimax, 2).unwrap();
        assert_eq!(series.years(), &[2024, 2025]);
        assert_eq!(
            wf.snapshot().state.last_good().and_then(|t| t.future.clone()),
            Some(series)
        );

        wf.backend().push_train(Ok(train_result(2.0)));
        wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).unwrap();
        let snap = wf.snapshot();
        let trained = snap.state.last_good().unwrap();
        assert!(trained.future.is_none());
        assert_eq!(trained.result.metrics.get("MAE"), Some(2.0));
    }

    #[test]
    fn invalid_horizon_is_rejected_before_any_request() {
        let wf = trained_workflow();
        let before = wf.snapshot().version;
        for years in [0, 23] {
            let err = wf.forecast_future(&files(), ModelVariant::Sarimax, years).unwrap_err();
            assert_eq!(err, ForecastError::InvalidHorizon(InvalidHorizonError { years }));
        }
        assert!(wf.fetch_stored_forecast(ModelVariant::SarimaxPop, 40).is_err());
        assert_eq!(wf.backend().calls(), vec!["train:sarimax"]);
        assert_eq!(wf.snapshot().version, before);
    }

    #[test]
    fn forecast_requires_the_same_trained_model() {
        let wf = ForecastWorkflow::new(FakeBackend::default());
        assert_eq!(
            wf.forecast_future(&files(), ModelVariant::Sarimax, 3).unwrap_err(),
            ForecastError::NotTrained {
                model: ModelVariant::Sarimax
            }
        );

        let wf = trained_workflow();
        assert_eq!(
            wf.forecast_future(&files(), ModelVariant::Cat, 3).unwrap_err(),
            ForecastError::NotTrained {
                model: ModelVariant::Cat
            }
        );
        assert_eq!(wf.backend().calls(), vec!["train:sarimax"]);
    }

    #[test]
    fn forecast_failure_keeps_trained_metrics() {
        let wf = trained_workflow();
        wf.backend().push_forecast(Err(BackendError::new("horizon too long")));
        assert!(wf.forecast_future(&files(), ModelVariant::Sarimax, 22).is_err());

        let snap = wf.snapshot();
        assert_eq!(snap.state.name(), "error");
        let trained = snap.state.last_good().expect("trained data retained");
        assert_eq!(trained.result.metrics.get("MAE"), Some(1.0));

        // Still usable: the next forecast succeeds from the error state.
        wf.backend().push_forecast(Ok(future(2024, &[3.0])));
        wf.forecast_future(&files(), ModelVariant::Sarimax, 1).unwrap();
        assert_eq!(wf.snapshot().state.name(), "trained");
    }

    #[test]
    fn failed_metrics_refresh_leaves_state_alone() {
        let wf = trained_workflow();
        *wf.backend().metrics_result.lock().unwrap() = Some(Err(BackendError::new("model not found")));
        let before = wf.snapshot();

        let err = wf.fetch_metrics(ModelVariant::Sarimax).unwrap_err();
        assert_eq!(err, ForecastError::Backend(BackendError::new("model not found")));

        let after = wf.snapshot();
        assert_eq!(after.version, before.version);
        assert!(Arc::ptr_eq(&after.state, &before.state));
        assert_eq!(after.state.name(), "trained");
    }

    #[test]
    fn refreshes_are_idempotent() {
        let wf = trained_workflow();
        let mut m = std::collections::BTreeMap::new();
        m.insert("R2".to_string(), 0.8);
        *wf.backend().metrics_result.lock().unwrap() = Some(Ok(Metrics::new(m)));

        let a = wf.fetch_metrics(ModelVariant::Sarimax).unwrap();
        let b = wf.fetch_metrics(ModelVariant::Sarimax).unwrap();
        assert_eq!(a, b);
        let p1 = wf.fetch_historical_predictions(ModelVariant::SarimaxPop).unwrap();
        let p2 = wf.fetch_historical_predictions(ModelVariant::SarimaxPop).unwrap();
        assert_eq!(p1, p2);
        assert_eq!(wf.snapshot().version, 2);
    }

    #[test]
    fn retrain_discards_in_flight_forecast() {
        let wf = Arc::new(trained_workflow());
        wf.backend().push_forecast(Ok(future(2024, &[9.0])));
        let handle = wf.backend().gate_forecast();

        let pending = {
            let wf = Arc::clone(&wf);
            thread::spawn(move || wf.forecast_future(&files(), ModelVariant::Sarimax, 1))
        };
        handle.entered.recv().unwrap();

        wf.backend().push_train(Ok(train_result(5.0)));
        wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).unwrap();
        let version = wf.snapshot().version;

        handle.release.send(()).unwrap();
        // The caller still gets its data; the workflow ignores it.
        assert!(pending.join().unwrap().is_ok());

        let snap = wf.snapshot();
        assert_eq!(snap.version, version);
        let trained = snap.state.last_good().unwrap();
        assert_eq!(trained.result.metrics.get("MAE"), Some(5.0));
        assert!(trained.future.is_none());
    }

    #[test]
    fn newer_forecast_supersedes_older_one() {
        let wf = Arc::new(trained_workflow());
        wf.backend().push_forecast(Ok(future(2024, &[1.0])));
        wf.backend().push_forecast(Ok(future(2024, &[2.0, 2.5])));
        let handle = wf.backend().gate_forecast();

        let slow = {
            let wf = Arc::clone(&wf);
            thread::spawn(move || wf.forecast_future(&files(), ModelVariant::Sarimax, 1))
        };
        handle.entered.recv().unwrap();

        let fresh = wf.forecast_future(&files(), ModelVariant::Sarimax, 2).unwrap();
        handle.release.send(()).unwrap();
        let stale = slow.join().unwrap().unwrap();
        assert_eq!(stale.values(), &[1.0]);

        let snap = wf.snapshot();
        assert_eq!(snap.state.name(), "trained");
        assert_eq!(snap.state.last_good().and_then(|t| t.future.clone()), Some(fresh));
    }

    #[test]
    fn subscribers_see_each_transition_in_order() {
        let backend = FakeBackend::default();
        backend.push_train(Ok(train_result(1.0)));
        let wf = ForecastWorkflow::new(backend);
        let rx = wf.subscribe();

        wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).unwrap();

        let snapshots: Vec<WorkflowSnapshot> = rx.try_iter().collect();
        let seen: Vec<(u64, &'static str)> = snapshots.iter().map(|s| (s.version, s.state.name())).collect();
        assert_eq!(seen, vec![(1, "training"), (2, "trained")]);
        assert!(snapshots[0].changed_at <= snapshots[1].changed_at);
        assert_eq!(wf.snapshot().changed_at, snapshots[1].changed_at);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let backend = FakeBackend::default();
        backend.push_train(Ok(train_result(1.0)));
        let wf = ForecastWorkflow::new(backend);
        drop(wf.subscribe());

        wf.train(&files(), ModelVariant::Sarimax, TrainParams::new()).unwrap();
        assert!(wf.lock().subscribers.is_empty());
    }
}
