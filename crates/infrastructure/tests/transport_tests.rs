use serde_json::json;

use taskpanel_core::ClusterSettings;
use taskpanel_domain::BrokerProber;
use taskpanel_infrastructure::broker_transport_for;

#[tokio::test]
async fn test_unsupported_transport_reports_capability_gap() {
    let settings = ClusterSettings::new().with("broker_url", "sqs://key:secret@");
    let transport = broker_transport_for(&settings);

    let depth = BrokerProber::new(transport.as_ref()).probe("celery").await;

    assert_eq!(depth.length, None);
    assert_eq!(
        depth.error.as_deref(),
        Some("Unsupported broker type for queue length inspection: sqs")
    );
}

#[tokio::test]
async fn test_unreachable_redis_is_reported_inline() {
    let settings = ClusterSettings::new()
        .with("broker_url", "redis://127.0.0.1:9/0")
        .with("broker_transport_options", json!({"queue_order_strategy": "priority"}));
    let transport = broker_transport_for(&settings);

    let depth = BrokerProber::new(transport.as_ref()).probe("celery").await;

    assert_eq!(depth.length, None);
    let error = depth.error.unwrap();
    assert!(error.starts_with("Error querying broker: "), "{error}");
}

#[tokio::test]
#[ignore] // 需要本地Redis
async fn test_live_redis_depth_reports_a_length() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into());
    let settings = ClusterSettings::new().with("broker_url", url);
    let transport = broker_transport_for(&settings);

    let depth = BrokerProber::new(transport.as_ref()).probe("taskpanel_empty_queue").await;

    assert_eq!(depth.length, Some(0));
    assert!(depth.error.is_none());
}
