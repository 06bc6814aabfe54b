use stackscope::dependency::{resolve, OwnerResolution};
use stackscope::thread_data::ThreadElement;
use stackscope_common::{LockGraph, StackFrame, ThreadDump, ThreadState};

fn threads(names: &[&str]) -> Vec<ThreadElement> {
    names
        .iter()
        .enumerate()
        .map(|(id, name)| {
            ThreadElement::from_dump(&ThreadDump {
                thread_id: id as u64,
                thread_name: (*name).to_string(),
                state: ThreadState::Blocked,
                frames: vec![StackFrame::new("org.jobs.Worker", "run")],
            })
        })
        .collect()
}

fn graph(resources: &[&str], owners: &[&str], rows: Vec<Vec<i32>>) -> LockGraph {
    LockGraph {
        resource_names: resources.iter().map(ToString::to_string).collect(),
        owning_thread_names: owners.iter().map(ToString::to_string).collect(),
        graph: rows,
    }
}

#[test]
fn test_waiting_with_no_holder_is_unknown() {
    let mut records = threads(&["t1", "t2"]);
    let g = graph(&["A", "B"], &["t1", "t2"], vec![vec![-1, 2], vec![0, -1]]);

    assert!(resolve(&mut records, &g));
    assert_eq!(records[0].waited_resource.as_deref(), Some("A"));
    assert_eq!(records[0].held_resources, vec!["B"]);
    assert_eq!(records[0].resource_owner, Some(OwnerResolution::Unknown));
    // t2 waits on B, which t1 holds
    assert_eq!(records[1].resource_owner, Some(OwnerResolution::Resolved("t1".into())));
}

#[test]
fn test_exact_holder_is_owner() {
    let mut records = threads(&["t1", "t2", "t3"]);
    let g = graph(
        &["A", "B"],
        &["t1", "t2", "t3"],
        vec![vec![-1, 2], vec![0, -1], vec![1, 0]],
    );

    resolve(&mut records, &g);
    assert_eq!(records[0].resource_owner, Some(OwnerResolution::Resolved("t3".into())));
    assert_eq!(records[2].held_resources, vec!["A"]);
    assert_eq!(records[2].waited_resource, None);
}

#[test]
fn test_same_class_holders_are_ambiguous() {
    let mut records = threads(&["waiter", "h1", "h2"]);
    let g = graph(
        &["org.Rule@aa", "org.Rule@bb", "org.Rule@cc"],
        &["waiter", "h2", "h1"],
        vec![vec![-1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]],
    );

    resolve(&mut records, &g);
    assert_eq!(
        records[0].resource_owner,
        Some(OwnerResolution::Ambiguous(vec!["h1".into(), "h2".into()]))
    );
}

#[test]
fn test_mismatched_dimensions_leave_records_untouched() {
    let mut records = threads(&["t1", "t2"]);
    let before = records.clone();

    let too_few_rows = graph(&["A"], &["t1", "t2"], vec![vec![-1]]);
    assert!(!resolve(&mut records, &too_few_rows));

    let short_row = graph(&["A", "B"], &["t1", "t2"], vec![vec![-1, 1], vec![1]]);
    assert!(!resolve(&mut records, &short_row));

    assert!(!resolve(&mut records, &LockGraph::default()));
    assert_eq!(records, before);
}

#[test]
fn test_composite_resource_decomposed() {
    let mut records = threads(&["builder", "indexer"]);
    let g = graph(
        &["MultiRule[org.Project@1,org.Folder@2]", "org.Folder@2"],
        &["builder", "indexer"],
        vec![vec![1, 0], vec![0, -1]],
    );

    resolve(&mut records, &g);
    assert_eq!(records[0].held_resources, vec!["org.Project@1", "org.Folder@2"]);
    assert_eq!(records[1].resource_owner, Some(OwnerResolution::Resolved("builder".into())));
}

#[test]
fn test_rows_without_records_own_nothing() {
    let mut records = threads(&["waiter"]);
    let g = graph(&["A"], &["waiter", "RMI TCP Connection(1)"], vec![vec![-1], vec![1]]);

    assert!(resolve(&mut records, &g));
    assert_eq!(records[0].waited_resource.as_deref(), Some("A"));
    assert_eq!(records[0].resource_owner, Some(OwnerResolution::Unknown));
}
