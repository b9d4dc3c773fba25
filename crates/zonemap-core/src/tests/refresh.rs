use crate::*;
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Hands out one pending response per fetch; the test decides when each one completes.
#[derive(Default)]
struct ScriptedSource {
    pending: Mutex<VecDeque<oneshot::Receiver<Result<String>>>>,
}

impl ScriptedSource {
    fn push(&self) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }
}

impl FeedSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn fetch(&self) -> BoxFuture<'static, Result<String>> {
        let rx = self.pending.lock().unwrap().pop_front();
        async move {
            match rx {
                Some(rx) => rx.await.unwrap_or_else(|_| {
                    Err(Error::Source {
                        message: "response dropped".to_string(),
                    })
                }),
                None => Err(Error::Source {
                    message: "no scripted response".to_string(),
                }),
            }
        }
        .boxed()
    }
}

fn state_of(registry: &Registry, key: &str) -> String {
    registry.get(key).unwrap().state.clone()
}

#[test]
fn late_response_from_older_cycle_is_discarded() {
    let source = ScriptedSource::default();
    let tx1 = source.push();
    let tx2 = source.push();
    let refresher = Refresher::new(Engine::new(), source);

    let first = refresher.refresh();
    let second = refresher.refresh();
    assert_eq!(refresher.started_generation(), 2);

    tx2.send(Ok("id,estado\n1,nuevo".to_string())).unwrap();
    let outcome = block_on(second);
    assert!(outcome.is_published(), "{outcome:?}");

    tx1.send(Ok("id,estado\n1,viejo".to_string())).unwrap();
    match block_on(first) {
        CycleOutcome::Superseded { generation, newest } => {
            assert_eq!(generation, 1);
            assert_eq!(newest, 2);
        }
        other => panic!("expected superseded, got {other:?}"),
    }

    let latest = refresher.latest().unwrap();
    assert_eq!(latest.generation(), 2);
    assert_eq!(state_of(&latest, "1"), "nuevo");
}

#[test]
fn older_response_arriving_first_is_still_discarded() {
    let source = ScriptedSource::default();
    let tx1 = source.push();
    let tx2 = source.push();
    let refresher = Refresher::new(Engine::new(), source);

    let first = refresher.refresh();
    let second = refresher.refresh();

    tx1.send(Ok("id,estado\n1,viejo".to_string())).unwrap();
    tx2.send(Ok("id,estado\n1,nuevo".to_string())).unwrap();
    let (a, b) = block_on(futures::future::join(first, second));

    assert!(matches!(a, CycleOutcome::Superseded { generation: 1, .. }), "{a:?}");
    assert!(b.is_published(), "{b:?}");
    assert_eq!(state_of(&refresher.latest().unwrap(), "1"), "nuevo");
}

#[test]
fn failed_cycle_keeps_previous_registry() {
    let source = MemorySource::new("id,estado\n5,activo");
    let refresher = Refresher::new(Engine::new(), source.clone());
    assert!(refresher.latest().is_none());

    assert!(block_on(refresher.refresh()).is_published());

    source.clear();
    match block_on(refresher.refresh()) {
        CycleOutcome::Failed { generation, error } => {
            assert_eq!(generation, 2);
            assert!(matches!(error, Error::Source { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    source.set("color\nrojo");
    match block_on(refresher.refresh()) {
        CycleOutcome::Failed { error, .. } => {
            assert!(matches!(error, Error::MissingIdColumn { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let latest = refresher.latest().unwrap();
    assert_eq!(latest.generation(), 1);
    assert_eq!(state_of(&latest, "5"), "activo");

    source.set("id,estado\n5,completado");
    assert!(block_on(refresher.refresh()).is_published());
    let latest = refresher.latest().unwrap();
    assert_eq!(latest.generation(), 4);
    assert_eq!(state_of(&latest, "5"), "completado");
}

#[test]
fn file_source_rereads_on_every_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estado.csv");
    std::fs::write(&path, "id,estado\n1,pendiente").unwrap();

    let refresher = Refresher::new(Engine::new(), FileSource::new(&path));
    assert!(block_on(refresher.refresh()).is_published());
    assert_eq!(state_of(&refresher.latest().unwrap(), "1"), "pendiente");

    std::fs::write(&path, "id,estado\n1,activo").unwrap();
    assert!(block_on(refresher.refresh()).is_published());
    assert_eq!(state_of(&refresher.latest().unwrap(), "1"), "activo");

    std::fs::remove_file(&path).unwrap();
    let outcome = block_on(refresher.refresh());
    assert!(matches!(
        outcome,
        CycleOutcome::Failed {
            error: Error::Io(_),
            ..
        }
    ));
    assert_eq!(refresher.latest().unwrap().generation(), 2);
}
