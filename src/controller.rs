use tracing::{error, info, instrument, trace};

use crate::config::TableConfig;
use crate::domain::{Message, Status, TableError};
use crate::source::DataSource;
use crate::table::Table;
use crate::view::ViewModel;

/// Receives the view on every state change and forwards user intents back as
/// `Message`s. The controller never draws anything itself.
pub trait Renderer {
    fn render(&mut self, view: &ViewModel);

    /// Load failures and non fatal setup problems such as a missing tab key.
    fn render_error(&mut self, error: &TableError);
}

pub type OnLoad = Box<dyn FnOnce(Result<usize, &TableError>) + Send>;

/// Drives a table from `Loading` to `Ready` and applies messages afterwards.
pub struct TableController {
    config: TableConfig,
    status: Status,
    load_attempted: bool,
    table: Option<Table>,
    on_load: Option<OnLoad>,
}

impl TableController {
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            status: Status::Loading,
            load_attempted: false,
            table: None,
            on_load: None,
        }
    }

    /// Called once when data arrived, before the first render. Gets the
    /// number of records or the error that kept the table from loading.
    pub fn on_load(
        mut self,
        callback: impl FnOnce(Result<usize, &TableError>) + Send + 'static,
    ) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn view(&self) -> Option<ViewModel> {
        self.table.as_ref().map(Table::view_model)
    }

    /// Awaits the source once. On failure the controller stays in `Loading`
    /// for good.
    #[instrument(skip_all)]
    pub async fn load<S, R>(&mut self, source: &S, renderer: &mut R) -> Result<(), TableError>
    where
        S: DataSource + ?Sized,
        R: Renderer + ?Sized,
    {
        if self.load_attempted {
            return Err(TableError::AlreadyLoaded);
        }
        self.load_attempted = true;

        let built = match source.load().await {
            Ok(records) => Table::build(records, &self.config),
            Err(e) => Err(e),
        };

        match built {
            Ok((table, notice)) => {
                info!("Table ready with {} records", table.records().len());
                if let Some(callback) = self.on_load.take() {
                    callback(Ok(table.records().len()));
                }
                if let Some(notice) = &notice {
                    renderer.render_error(notice);
                }
                renderer.render(&table.view_model());
                self.table = Some(table);
                self.status = Status::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Loading table failed: {e}");
                if let Some(callback) = self.on_load.take() {
                    callback(Err(&e));
                }
                renderer.render_error(&e);
                Err(e)
            }
        }
    }

    /// Applies one message and hands the new view to the renderer.
    #[instrument(skip(self, renderer))]
    pub fn handle<R>(&mut self, message: Message, renderer: &mut R) -> Result<(), TableError>
    where
        R: Renderer + ?Sized,
    {
        let table = self.table.as_mut().ok_or(TableError::NotReady)?;
        table.apply(&message)?;
        let view = table.view_model();
        trace!("Rendering {} rows", view.rows.len());
        renderer.render(&view);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Partition, SortDirection};
    use crate::source::{FailingSource, MemorySource};
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        views: Vec<ViewModel>,
        errors: Vec<String>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, view: &ViewModel) {
            self.views.push(view.clone());
        }

        fn render_error(&mut self, error: &TableError) {
            self.errors.push(error.to_string());
        }
    }

    fn source() -> MemorySource {
        MemorySource::from_json(json!([
            {"type": "A", "name": "x"},
            {"type": "B", "name": "y"},
            {"type": "A", "name": "z"},
        ]))
        .unwrap()
    }

    fn names(view: &ViewModel) -> Vec<String> {
        view.rows
            .iter()
            .map(|r| r.record["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn ready() -> (TableController, Recorder) {
        let mut controller =
            TableController::new(TableConfig::default().with_partition_key("type".to_string()));
        let mut recorder = Recorder::default();
        block_on(controller.load(&source(), &mut recorder)).unwrap();
        (controller, recorder)
    }

    #[test]
    fn load_renders_initial_view() {
        let (controller, recorder) = ready();
        assert_eq!(controller.status(), Status::Ready);
        assert_eq!(recorder.views.len(), 1);
        let view = &recorder.views[0];
        assert_eq!(view.columns, ["name"]);
        assert_eq!(
            view.partitions,
            Some(vec![
                Partition::All,
                Partition::Value(json!("A")),
                Partition::Value(json!("B"))
            ])
        );
        assert_eq!(view.search_column.as_deref(), Some("name"));
        assert_eq!(names(view), ["x", "y", "z"]);
    }

    #[test]
    fn tab_then_sort_scenario() {
        let (mut controller, mut recorder) = ready();
        controller
            .handle(
                Message::TabSelected(Partition::Value(json!("A"))),
                &mut recorder,
            )
            .unwrap();
        assert_eq!(names(recorder.views.last().unwrap()), ["x", "z"]);
        assert!(recorder.views.last().unwrap().rows[0]
            .record
            .get("type")
            .is_none());

        controller
            .handle(Message::SortRequested("name".to_string()), &mut recorder)
            .unwrap();
        let view = recorder.views.last().unwrap();
        assert_eq!(names(view), ["z", "x"]);
        assert_eq!(view.sort_direction, SortDirection::Descending);
        assert_eq!(view.active_partition, Partition::Value(json!("A")));
    }

    #[test]
    fn empty_data_keeps_loading() {
        let mut controller = TableController::new(TableConfig::default());
        let mut recorder = Recorder::default();
        let result = block_on(controller.load(&MemorySource::default(), &mut recorder));
        assert!(matches!(result, Err(TableError::EmptyData)));
        assert_eq!(controller.status(), Status::Loading);
        assert!(controller.view().is_none());
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.views.is_empty());
    }

    #[test]
    fn failed_source_blocks_for_good() {
        let mut controller = TableController::new(TableConfig::default());
        let mut recorder = Recorder::default();
        let result = block_on(controller.load(&FailingSource::new("offline"), &mut recorder));
        assert!(matches!(result, Err(TableError::DataLoad(_))));
        assert_eq!(controller.status(), Status::Loading);

        let retry = block_on(controller.load(&source(), &mut recorder));
        assert!(matches!(retry, Err(TableError::AlreadyLoaded)));
        assert_eq!(controller.status(), Status::Loading);
    }

    #[test]
    fn messages_are_rejected_while_loading() {
        let mut controller = TableController::new(TableConfig::default());
        let mut recorder = Recorder::default();
        let result = controller.handle(Message::SearchTermChanged("x".into()), &mut recorder);
        assert!(matches!(result, Err(TableError::NotReady)));
        assert!(recorder.views.is_empty());
    }

    #[test]
    fn on_load_runs_once_before_first_render() {
        struct Logged(Arc<Mutex<Vec<String>>>);

        impl Renderer for Logged {
            fn render(&mut self, view: &ViewModel) {
                self.0.lock().unwrap().push(format!("render {}", view.rows.len()));
            }

            fn render_error(&mut self, error: &TableError) {
                self.0.lock().unwrap().push(format!("error {error}"));
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let mut controller = TableController::new(TableConfig::default())
            .on_load(move |result| seen.lock().unwrap().push(format!("loaded {result:?}")));
        let mut renderer = Logged(Arc::clone(&log));
        block_on(controller.load(&source(), &mut renderer)).unwrap();
        controller
            .handle(Message::SearchTermChanged("a".to_string()), &mut renderer)
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["loaded Ok(3)", "render 3", "render 2"]
        );
    }

    #[test]
    fn on_load_sees_errors() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut controller = TableController::new(TableConfig::default())
            .on_load(move |result| seen.lock().unwrap().push(result.is_err()));
        let mut recorder = Recorder::default();
        let _ = block_on(controller.load(&MemorySource::default(), &mut recorder));
        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn missing_partition_key_is_surfaced_but_not_fatal() {
        let mut controller =
            TableController::new(TableConfig::default().with_partition_key("kind".to_string()));
        let mut recorder = Recorder::default();
        block_on(controller.load(&source(), &mut recorder)).unwrap();
        assert_eq!(controller.status(), Status::Ready);
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.errors[0].contains("kind"));
        assert_eq!(recorder.views[0].partitions, None);
    }

    #[test]
    fn rejected_message_does_not_render() {
        let (mut controller, mut recorder) = ready();
        let result = controller.handle(
            Message::TabSelected(Partition::Value(json!("C"))),
            &mut recorder,
        );
        assert!(matches!(result, Err(TableError::UnknownPartition(_))));
        assert_eq!(recorder.views.len(), 1);
    }

    #[test]
    fn partition_and_search_commute() {
        let (mut first, mut first_rec) = ready();
        first
            .handle(Message::TabSelected(Partition::Value(json!("A"))), &mut first_rec)
            .unwrap();
        first
            .handle(Message::SearchTermChanged("Z".into()), &mut first_rec)
            .unwrap();

        let (mut second, mut second_rec) = ready();
        second
            .handle(Message::SearchTermChanged("Z".into()), &mut second_rec)
            .unwrap();
        second
            .handle(Message::TabSelected(Partition::Value(json!("A"))), &mut second_rec)
            .unwrap();

        let a = first_rec.views.last().unwrap();
        let b = second_rec.views.last().unwrap();
        assert_eq!(names(a), ["z"]);
        assert_eq!(a.rows, b.rows);
    }
}
