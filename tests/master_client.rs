mod common;

use common::{window, MockMaster};
use drydock::client::MasterClient;
use drydock::config::Config;
use drydock::domain::fetch::{fetch_inventory, fetch_schedule, fetch_status};
use drydock::domain::identity::Inventory;
use drydock::domain::types::{MachineIdentity, MaintenanceState};
use drydock::domain::wire::{SchedulePayload, WireMachineId};
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

#[tokio::test]
async fn sends_auth_token_header() {
    let master = MockMaster::start().await;
    Mock::given(method("GET"))
        .and(path("/state-summary"))
        .and(header("Authorization", "token=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "slaves": [] })))
        .expect(1)
        .mount(&master.server)
        .await;

    let config = Config {
        master_url: format!("{}/", master.base_url),
        auth_token: Some("abc".into()),
        request_timeout_secs: Some(5),
        ..Config::default()
    };
    let client = MasterClient::from_config(&config).unwrap();
    assert_eq!(client.base_url(), master.base_url);

    let inventory = fetch_inventory(&client).await.unwrap();
    assert!(inventory.is_empty());
}

#[tokio::test]
async fn inventory_keeps_agent_ids() {
    let master = MockMaster::start().await;
    master
        .agents(&[("a", "10.0.0.1", "S1"), ("b", "10.0.0.2", "S2")])
        .await;

    let inventory = fetch_inventory(&master.client()).await.unwrap();
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0], MachineIdentity::new("a", "10.0.0.1"));
    assert_eq!(inventory[1].agent_id(), Some("S2"));
}

#[tokio::test]
async fn inventory_with_unparseable_pid_is_malformed() {
    let master = MockMaster::start().await;
    master
        .get_json(
            "/state-summary",
            json!({ "slaves": [{ "id": "S1", "hostname": "a", "pid": "nonsense" }] }),
        )
        .await;

    let err = fetch_inventory(&master.client()).await.unwrap_err();
    assert!(err.to_string().contains("nonsense"));
}

#[tokio::test]
async fn status_tags_draining_and_down() {
    let master = MockMaster::start().await;
    master
        .status(json!({
            "draining_machines": [{ "id": { "hostname": "a", "ip": "10.0.0.1" } }],
            "down_machines": [{ "hostname": "b", "ip": "10.0.0.2" }]
        }))
        .await;

    let inventory = Inventory::new(vec![
        MachineIdentity::new("a", "10.0.0.1").with_agent_id("S1")
    ]);
    let records = fetch_status(&master.client(), &inventory).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].state, MaintenanceState::Draining);
    assert_eq!(records[0].identity.agent_id(), Some("S1"));
    assert_eq!(records[1].state, MaintenanceState::Down);
    assert_eq!(records[1].identity, MachineIdentity::new("b", "10.0.0.2"));
}

#[tokio::test]
async fn absent_schedule_is_none() {
    let master = MockMaster::start().await;
    master.no_schedule().await;

    assert_eq!(fetch_schedule(&master.client()).await.unwrap(), None);
}

#[tokio::test]
async fn schedule_windows_are_read_in_order() {
    let master = MockMaster::start().await;
    master
        .schedule(json!({
            "windows": [
                window(json!([{ "hostname": "a", "ip": "10.0.0.1" }]), 10, 60),
                window(json!([{ "hostname": "b", "ip": "10.0.0.2" }]), 20, 120)
            ]
        }))
        .await;

    let schedule = fetch_schedule(&master.client()).await.unwrap().unwrap();
    assert_eq!(schedule.windows.len(), 2);
    assert_eq!(schedule.windows[1].start_ns, 20_000_000_000);
    assert_eq!(schedule.windows[1].duration_ns, 120_000_000_000);
    assert!(schedule.windows[0].contains(&MachineIdentity::new("a", "10.0.0.1")));
}

#[tokio::test]
async fn failed_write_carries_status_and_body() {
    let master = MockMaster::start().await;
    master
        .reject_write("/machine/up", 409, "machine is not down")
        .await;

    let err = master
        .client()
        .machines_up(&[WireMachineId {
            hostname: Some("a".into()),
            ip: Some("10.0.0.1".into()),
        }])
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("409"));
    assert!(message.contains("machine is not down"));
}

#[tokio::test]
async fn clear_posts_empty_object() {
    let master = MockMaster::start().await;
    master.accept_writes().await;

    master
        .client()
        .update_schedule(&SchedulePayload::clear())
        .await
        .unwrap();

    assert_eq!(
        master.writes().await,
        vec![("/maintenance/schedule".to_string(), json!({}))]
    );
}
