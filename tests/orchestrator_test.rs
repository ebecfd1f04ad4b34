use rucurl::history::{RunMode, RunStore};
use rucurl::http::{CommandRunner, ProcessOutput};
use rucurl::runner::{Orchestrator, RunOutcome, RunRequest};
use rucurl::table::CsvSource;
use rucurl::variable::VariableBatch;
use rucurl::{Result, RucurlError};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

/// 按 URL 路径返回不同状态码：`/fail` 为 500，`/slow` 模拟超时，其余为 200
struct RoutingRunner;

impl CommandRunner for RoutingRunner {
    async fn run(&self, command: &str) -> Result<ProcessOutput> {
        if command.contains("/slow") {
            return Ok(ProcessOutput::timed_out(Duration::from_secs(1)));
        }

        let status = if command.contains("/fail") {
            "500 Internal Server Error"
        } else {
            "200 OK"
        };
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: r#"{"items":[1,2,3]}"#.to_string(),
            stderr: format!("< HTTP/1.1 {}\n< Content-Type: application/json\n<\n", status),
            timed_out: false,
            elapsed: Duration::from_millis(1),
        })
    }
}

fn orchestrator(temp_dir: &TempDir) -> Orchestrator<RoutingRunner> {
    Orchestrator::new(RoutingRunner, RunStore::new(temp_dir.path()))
}

#[tokio::test]
async fn test_array_batch_with_bad_middle_row() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir);

    let request = RunRequest::new("curl http://h/users/{{id}}")
        .with_variables(VariableBatch::Rows(vec![
            json!({"id": 1}),
            json!(42),
            json!({"id": 3}),
        ]))
        .with_assertions(vec!["response.code == 200".to_string()]);

    let RunOutcome::Batch(record) = orchestrator.execute(request).await.unwrap() else {
        panic!("Expected batch");
    };

    assert_eq!(record.results.len(), 3);
    assert_eq!(record.results[0].success, Some(true));
    assert_eq!(record.results[1].success, Some(false));
    assert!(record.results[1].error.is_some());
    assert_eq!(record.results[2].success, Some(true));
    assert_eq!(record.results[2].row_index, 3);
}

#[tokio::test]
async fn test_failing_assertions_are_counted() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir);

    let request = RunRequest::new("curl http://h/{{path}}")
        .with_variables(VariableBatch::Rows(vec![
            json!({"path": "ok"}),
            json!({"path": "fail"}),
            json!({"path": "slow"}),
        ]))
        .with_assertions(vec![
            "response.code == 200".to_string(),
            "len(json(response.body)['items']) == 3".to_string(),
        ]);

    let RunOutcome::Batch(record) = orchestrator.execute(request).await.unwrap() else {
        panic!("Expected batch");
    };

    assert_eq!(record.success_count, 1);
    assert_eq!(record.failure_count, 2);
    assert_eq!(record.success, Some(false));

    let failed = &record.results[1];
    assert!(!failed.assertions[0].success);
    assert!(failed.assertions[1].success);

    // 超时不是错误，只是没有状态码和 body
    let slow = &record.results[2];
    assert!(slow.error.is_none());
    let response = slow.response.as_ref().unwrap();
    assert!(response.timed_out);
    assert_eq!(response.code, None);
    assert!(slow.assertions[1].error.is_some());
}

#[tokio::test]
async fn test_structured_values_are_quoted() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir);

    let request = RunRequest::new("curl 'http://h/api' \\\n  --data-raw {{body}}")
        .with_variables(VariableBatch::Single(
            serde_json::from_value(json!({"body": {"name": "Tom"}})).unwrap(),
        ));
    orchestrator.execute(request).await.unwrap();

    let seen = orchestrator_seen(&orchestrator);
    assert_eq!(seen, vec!["curl 'http://h/api' \\\n  --data-raw '{\"name\":\"Tom\"}'"]);
}

fn orchestrator_seen(orchestrator: &Orchestrator<RoutingRunner>) -> Vec<String> {
    let record_id = orchestrator.store().list().unwrap()[0].id.clone();
    let record = orchestrator.store().get(&record_id).unwrap();
    record
        .results
        .iter()
        .filter_map(|r| r.curl_command.clone())
        .collect()
}

#[tokio::test]
async fn test_unknown_placeholders_pass_through() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir);

    let request = RunRequest::new("curl http://h/{{id}}/{{unknown}}").with_variables(
        VariableBatch::Single(serde_json::from_value(json!({"id": 7})).unwrap()),
    );
    let RunOutcome::Single(view) = orchestrator.execute(request).await.unwrap() else {
        panic!("Expected single");
    };

    let record = orchestrator.store().get(&view.result_id).unwrap();
    assert_eq!(
        record.results[0].curl_command.as_deref(),
        Some("curl http://h/7/{{unknown}}")
    );
}

#[tokio::test]
async fn test_table_run_from_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("users.csv");
    std::fs::write(&csv_path, "path,name\nok,alice\nfail,bob\nok,carol\n").unwrap();

    let results_dir = temp_dir.path().join("results");
    let orchestrator = Orchestrator::new(RoutingRunner, RunStore::new(&results_dir));
    let source = CsvSource::open(&csv_path).unwrap();

    let record = orchestrator
        .execute_table(
            &source,
            Some(source.name()),
            "curl http://h/{{path}}?name={{name}}",
            &["response.code == 200".to_string()],
            Some(0),
        )
        .await
        .unwrap();

    assert_eq!(record.mode, RunMode::Tabular);
    assert_eq!(record.total_rows, 3);
    assert_eq!(record.success_count, 2);
    assert_eq!(record.failure_count, 1);
    assert_eq!(
        record.results[1].request.as_ref().unwrap().params.get("name"),
        Some(&"bob".to_string())
    );
    assert!(results_dir.join(record.filename()).exists());
}

#[tokio::test]
async fn test_table_run_rejects_empty_template() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir);
    let source = CsvSource::from_text("ids.csv", "id\n1\n").unwrap();

    let err = orchestrator
        .execute_table(&source, None, "", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, RucurlError::InvalidInput(_)));
    assert!(orchestrator.store().list().unwrap().is_empty());
}
