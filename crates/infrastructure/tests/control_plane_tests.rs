use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use taskpanel_core::ClusterHandle;
use taskpanel_domain::{ClusterInspector, QueuesFacade, WorkersFacade};
use taskpanel_infrastructure::{HttpControlPlane, UnsupportedTransport};

const GATEWAY_BODY: &str = r#"{
  "celery@a": {
    "stats": {
      "hostname": "a.local",
      "pid": 42,
      "pool": {"implementation": "prefork", "max-concurrency": 4, "processes": [11, 12]},
      "total": {"app.tasks.add": 3}
    },
    "active_queues": [{"name": "celery", "exchange": {"name": "celery", "type": "direct"}, "routing_key": "celery"}],
    "registered": ["app.tasks.add"],
    "active": [{"id": "t-1", "name": "app.tasks.add"}],
    "reserved": [],
    "scheduled": []
  }
}"#;

/// 本地网关：每个请求返回同一份快照，并记录请求行
async fn spawn_gateway() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]).to_string();
                let request_line = head.lines().next().unwrap_or_default().to_string();
                seen.lock().unwrap().push(request_line);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    GATEWAY_BODY.len(),
                    GATEWAY_BODY
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), requests)
}

fn gateway_handle(base_url: &str) -> ClusterHandle {
    let control = HttpControlPlane::new(base_url, Duration::from_secs(5)).unwrap();
    ClusterHandle::builder(Arc::new(control), Arc::new(UnsupportedTransport::new("memory"))).build()
}

#[tokio::test]
async fn test_worker_detail_is_one_gateway_request() {
    let (base_url, requests) = spawn_gateway().await;
    let handle = gateway_handle(&base_url);

    let detail = WorkersFacade::new(&handle, None)
        .unwrap()
        .get_worker_detail("celery@a")
        .await
        .item
        .unwrap();

    assert_eq!(detail.summary.hostname, "a.local");
    assert_eq!(detail.processes, vec![11, 12]);
    assert_eq!(detail.active_tasks_count(), 1);
    assert_eq!(detail.registered_tasks, vec!["app.tasks.add"]);
    assert_eq!(detail.active_queues.len(), 1);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1, "{requests:?}");
    assert!(requests[0].contains("/api/workers?refresh=1&workername=celery%40a"));
}

#[tokio::test]
async fn test_cluster_status_is_one_gateway_request() {
    let (base_url, requests) = spawn_gateway().await;
    let handle = gateway_handle(&base_url);

    let status = ClusterInspector::new(&handle).get_status().await;

    assert!(status.cluster_available);
    assert_eq!(status.workers, vec!["celery@a"]);
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1, "{requests:?}");
    assert!(!requests[0].contains("workername"));
}

#[tokio::test]
async fn test_queue_list_is_one_gateway_request() {
    let (base_url, requests) = spawn_gateway().await;
    let handle = gateway_handle(&base_url);

    let page = QueuesFacade::new(&handle, None).unwrap().get_queues().await;

    assert_eq!(page.queues.len(), 1);
    assert_eq!(page.queues[0].workers, vec!["celery@a"]);
    assert_eq!(requests.lock().unwrap().len(), 1);
}
