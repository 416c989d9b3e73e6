use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde_json::{json, Value};

use crate::client::{TaskApi, TaskClient, TodoApp};
use crate::config::{Config, Listen, StorageConfig};
use crate::controller::TaskController;
use crate::datastore::MemoryTaskStorage;
use crate::model::TaskId;

fn local_listen() -> Listen {
    Listen {
        host: Some("127.0.0.1".to_string()),
        port: 0,
        timeout: None,
    }
}

fn start_memory_server() -> TaskController {
    TaskController::start_with_storage(&local_listen(), Arc::new(MemoryTaskStorage::new()))
        .expect("controller started")
}

// the controller owns a runtime of its own, the test drives the client on another
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn base_url(controller: &TaskController) -> String {
    format!("http://{}", controller.local_addr())
}

async fn call(method: reqwest::Method, url: String, body: Option<Value>) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[test]
fn test_e2e_buy_milk_scenario() {
    let controller = start_memory_server();
    let base = base_url(&controller);

    block_on(async {
        let tasks = format!("{}/tasks", base);

        let (status, body) = call(
            reqwest::Method::POST,
            tasks.clone(),
            Some(json!({"content": "Buy milk"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"id": 1, "content": "Buy milk"}));

        let (_, body) = call(reqwest::Method::GET, tasks.clone(), None).await;
        assert_eq!(body, json!([{"id": 1, "content": "Buy milk"}]));

        let (_, body) = call(
            reqwest::Method::POST,
            tasks.clone(),
            Some(json!({"content": "Wash dishes"})),
        )
        .await;
        assert_eq!(body, json!({"id": 2, "content": "Wash dishes"}));

        let (_, body) = call(reqwest::Method::GET, tasks.clone(), None).await;
        assert_eq!(
            body,
            json!([{"id": 2, "content": "Wash dishes"}, {"id": 1, "content": "Buy milk"}])
        );

        let (status, body) =
            call(reqwest::Method::DELETE, format!("{}/tasks/1", base), None).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = call(reqwest::Method::GET, tasks.clone(), None).await;
        assert_eq!(body, json!([{"id": 2, "content": "Wash dishes"}]));
    });

    controller.stop().unwrap();
}

#[test]
fn test_e2e_delete_on_empty_store() {
    let controller = start_memory_server();
    let base = base_url(&controller);

    block_on(async {
        let (status, body) =
            call(reqwest::Method::DELETE, format!("{}/tasks/999", base), None).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = call(reqwest::Method::GET, format!("{}/tasks", base), None).await;
        assert_eq!(body, json!([]));
    });

    controller.stop().unwrap();
}

#[test]
fn test_e2e_concurrent_creates() {
    let controller = start_memory_server();
    let client = TaskClient::new(&base_url(&controller)).unwrap();

    let names: Vec<String> = (0..16)
        .map(|_| {
            thread_rng()
                .sample_iter(&Alphanumeric)
                .take(30)
                .map(char::from)
                .collect()
        })
        .collect();

    block_on(async {
        let created = futures::future::join_all(names.iter().map(|name| client.create_task(name)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let ids: HashSet<TaskId> = created.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), names.len(), "every create got its own id");

        let listed = client.list_tasks().await.unwrap();
        assert_eq!(listed.len(), names.len());
        assert!(
            listed.windows(2).all(|w| w[0].id > w[1].id),
            "list must be strictly descending by id"
        );
        let contents: HashSet<&str> = listed.iter().map(|t| t.content.as_str()).collect();
        assert!(names.iter().all(|n| contents.contains(n.as_str())));
    });

    controller.stop().unwrap();
}

#[test]
fn test_e2e_todo_app_against_server() {
    let config = Config {
        listen: local_listen(),
        storage: StorageConfig::new("sqlite::memory:".to_string()),
        log: None,
    };
    let controller = TaskController::start(&config).expect("controller started");
    let client = TaskClient::new(&base_url(&controller)).unwrap();

    block_on(async {
        let mut app = TodoApp::new(client);
        app.mount().await;
        assert!(app.tasks().is_empty());

        app.set_input("Buy milk");
        let milk = app.add().await.unwrap();
        app.set_input("Wash dishes");
        app.add().await.unwrap();
        assert!(app.remove(milk.id).await);

        let contents: Vec<&str> = app.tasks().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["Wash dishes"]);
        assert!(app.last_error().is_none());

        // blank content is rejected by the server as well
        let err = app.api().create_task("  ").await.unwrap_err();
        assert!(err.to_string().contains("validation"));
    });

    controller.stop().unwrap();
}
