use rucurl::history::{IterationResult, RunMode, RunRecord, RunStore, generate_id};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn create_record(id: String) -> RunRecord {
    let mut record = RunRecord::new(id, RunMode::Single, "curl http://h/", vec![]);
    record
        .results
        .push(IterationResult::failed(1, json!({}), "not executed"));
    record.finalize();
    record
}

#[test]
fn test_concurrent_saves_produce_unique_files() {
    let temp_dir = TempDir::new().unwrap();
    let results_dir = Arc::new(temp_dir.path().to_path_buf());

    let mut handles = vec![];
    let thread_count = 10;
    let records_per_thread = 20;

    for _ in 0..thread_count {
        let dir = results_dir.clone();
        handles.push(thread::spawn(move || {
            // 每个线程各自创建 store，模拟多个调用方
            let store = RunStore::new((*dir).clone());
            for _ in 0..records_per_thread {
                store.save(&create_record(generate_id(false))).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let store = RunStore::new(temp_dir.path());
    let summaries = store.list().unwrap();
    assert_eq!(summaries.len(), thread_count * records_per_thread);

    let ids: HashSet<String> = summaries.into_iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), thread_count * records_per_thread);

    // 没有残留的临时文件
    let leftovers: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {:?}", leftovers);
}

#[test]
fn test_clear_while_idle_after_concurrent_saves() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(RunStore::new(temp_dir.path()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    store.save(&create_record(generate_id(true))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let report = store.clear().unwrap();
    assert_eq!(report.removed, 20);
    assert!(store.list().unwrap().is_empty());
}
