//! Integration tests for the per-model client.
//!
//! Each test scripts the console output of one model and checks the
//! structured result the client builds from it.

mod common;

use common::{open_session, test_config, FakeOlt, Step};
use olt_cli_protocol::DeviceModel;
use olt_session::{to_json, Capture, ChannelTransport, OltClient, SessionError};
use std::thread::JoinHandle;
use std::time::Duration;

fn connect(model: DeviceModel, fake: FakeOlt) -> (OltClient<ChannelTransport>, JoinHandle<common::Transcript>) {
    let (session, device) = open_session(fake, test_config(model), Capture::disabled());
    (OltClient::new(model, session), device)
}

// ============================================================================
// OLT2406
// ============================================================================

const LISTING_2406: &str = "\
 AID         |               SN | Template-ID | Status | FW Version | Model     | Distance | ONT Rx | Description
-------------+------------------+-------------+--------+------------+-----------+----------+--------+------------
 ont-1-2     | 5A5948530A1B2C3D | Template-1  | IS     | V5.40      | PMG3000   | 1.2 km   | -21.3  |
 ont-1-3     | 48575443ABCDEF01 | Template-1  | OOS-NP |            |           |          |        | spare
 unexpected  | row              |
-------------+------------------+-------------+--------+------------+-----------+----------+--------+------------
Total: 2";

const CONFIG_2406: &str = "\
 AID               | Details
-------------------+---------------------------------------------
 ont-6-4-4         | sn 5A5948530A1B2C3D | password DEFAULT
                   | no inactive
                   | bwgroup 1 usbwprofname 1G dsbwprofname 1G allocid 256
 uniport-6-4-4-2-1 | no inactive
                   | vlan 10 priority 0 mvlan 10
                   | queue tc 0 priority 0 weight 0 usbwprofname 1G dsbwprofname 1G dsoption olt
                   | unknown directive xyz";

const HISTORY_2406: &str = "\
 AID         | Status Time
-------------+---------------------------
 ont-6-4-4   | 1 IS 2026/ 1/14 16:16:27
             | 2 OOS-NP 2026/ 1/14 16:02:11";

const DETAILS_2406: &str = "\
  Status              : IS
  Estimated distance  : 1.2 km
  Last up time        : 2026/01/14 16:16:27";

#[test]
fn test_2406_ont_listing() {
    let fake = FakeOlt::new(DeviceModel::Olt2406).respond("show remote ont", LISTING_2406);
    let (mut client, device) = connect(DeviceModel::Olt2406, fake);

    let onts = client.get_all_onts().unwrap();
    assert_eq!(onts.len(), 2);
    assert_eq!(onts[0].get("AID"), Some("ont-1-2"));
    assert_eq!(onts[0].get("SN"), Some("5A5948530A1B2C3D"));
    assert_eq!(onts[0].get("ONT Rx"), Some("-21.3"));
    assert_eq!(onts[1].get("Status"), Some("OOS-NP"));
    assert_eq!(onts[1].get("Description"), Some("spare"));

    client.close().unwrap();
    let transcript = device.join().unwrap();
    // no DDMI query on the 2406
    assert_eq!(transcript.commands, vec!["show remote ont", "exit"]);
}

#[test]
fn test_missing_listing_header_is_parse_error() {
    let fake = FakeOlt::new(DeviceModel::Olt2406).respond("show remote ont", "% No ONT found");
    let (mut client, device) = connect(DeviceModel::Olt2406, fake);
    let err = client.get_all_onts().unwrap_err();
    match err {
        SessionError::Parse { command, source } => {
            assert_eq!(command, "show remote ont");
            assert!(source.is_missing_table());
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    drop(client);
    device.join().unwrap();
}

#[test]
fn test_2406_report() {
    let fake = FakeOlt::new(DeviceModel::Olt2406)
        .respond("show remote ont ont-6-4-4", DETAILS_2406)
        .respond("show remote ont ont-6-4-4 config", CONFIG_2406)
        .respond("show remote ont ont-6-4-4 status-history", HISTORY_2406);
    let (mut client, device) = connect(DeviceModel::Olt2406, fake);

    let report = client.get_ont_report("ont-6-4-4").unwrap();
    assert_eq!(report.aid, "ont-6-4-4");
    assert_eq!(report.details.get("Estimated distance"), Some("1.2 km"));
    assert_eq!(report.details.get("Last up time"), Some("2026/01/14 16:16:27"));

    let config = &report.config;
    assert_eq!(config.ont.text("sn"), Some("5A5948530A1B2C3D"));
    assert_eq!(config.ont.flag("inactive"), Some(false));
    assert_eq!(config.ont.text("allocid"), Some("256"));
    let port = config.port("uniport-6-4-4-2-1").unwrap();
    assert_eq!(port.vlans.len(), 1);
    assert_eq!(port.queues.len(), 1);
    assert_eq!(port.lines, vec!["unknown directive xyz".to_string()]);

    assert_eq!(report.history.len(), 2);
    assert_eq!(report.history[0].status, "IS");
    assert_eq!(report.history[1].timestamp, "2026/ 1/14 16:02:11");

    let json = client.to_json(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["config"]["uniports"]["uniport-6-4-4-2-1"]["vlans"][0]["vlan"], "10");
    assert_eq!(value["history"][1]["status"], "OOS-NP");
    assert_eq!(value["details"]["Status"], "IS");

    drop(client);
    device.join().unwrap();
}

#[test]
fn test_unregistered_listing_and_empty_answer() {
    let fake = FakeOlt::new(DeviceModel::Olt2406).respond(
        "show remote ont unreg",
        "\
Pon_AID  | Type  SN               Password  Status
---------+------------------------------------------
pon-1-3  | UnReg 5A5948530A1B2C3D DEFAULT   Active",
    );
    let (mut client, device) = connect(DeviceModel::Olt2406, fake);
    let onts = client.get_unregistered_onts().unwrap();
    assert_eq!(onts.len(), 1);
    assert_eq!(onts[0].pon_aid, "pon-1-3");
    let json = to_json(&onts).unwrap();
    assert!(json.contains("\"Pon_AID\": \"pon-1-3\""));
    drop(client);
    device.join().unwrap();

    let fake = FakeOlt::new(DeviceModel::Olt1408A).respond("show remote ont unreg", "");
    let (mut client, device) = connect(DeviceModel::Olt1408A, fake);
    assert!(client.get_unregistered_onts().unwrap().is_empty());
    assert!(client.get_ont_status_history("ont-1-1").unwrap().is_empty());
    drop(client);
    device.join().unwrap();
}

// ============================================================================
// OLT1408A
// ============================================================================

const DETAILS_1408A: &str = "\
 AID       | Type | SN               | Password | Status | Image Active | SW Version\n\
-----------+------+------------------+----------+--------+--------------+-----------\n\
 ont-1-1-1 | ONT  | 5A5948530A1B2C3D | DEFAULT  | IS     | 1            | V5.40(ABC)\n\
           | Status                               : IS (3d 21h 16m 33s)\n\
           | Estimated distance                   : 0.8 km";

#[test]
fn test_1408a_details_keep_summary_row() {
    let fake = FakeOlt::new(DeviceModel::Olt1408A).respond("show remote ont ont-1-1-1", DETAILS_1408A);
    let (mut client, device) = connect(DeviceModel::Olt1408A, fake);

    let details = client.get_ont_details("ont-1-1-1").unwrap();
    assert_eq!(details.get("AID"), Some("ont-1-1-1"));
    assert_eq!(details.get("SN"), Some("5A5948530A1B2C3D"));
    assert_eq!(details.get("SW Version"), Some("V5.40(ABC)"));
    assert_eq!(details.get("Status"), Some("IS"));
    assert_eq!(details.get("detail_Status"), Some("IS (3d 21h 16m 33s)"));
    assert_eq!(details.get("Estimated distance"), Some("0.8 km"));

    drop(client);
    device.join().unwrap();
}

// ============================================================================
// MSC1240XA
// ============================================================================

const FILTER_1240XA: &str = "\
 AID      | Type   SN               Password  Status  Image Active Version    Vendor/Model
----------+---------------------------------------------------------------------------
 1-1-10   | Config 5A5948530A1B2C3D DEFAULT   IS
          | Actual 5A5948530A1B2C3D DEFAULT   IS      1     V      V5.40(ABC) ZYXEL
 1-1-2    | Config 48575443ABCDEF01 1234      OOS-NP";

const DDMI_1240XA: &str = "\
 ont-1-1-10              -25.27
 ont-1-10-28     ++       -7.06";

#[test]
fn test_1240xa_listing_enriched_with_ddmi() {
    let fake = FakeOlt::new(DeviceModel::Msc1240XA)
        .respond("show interface remote ont filter 1", FILTER_1240XA)
        .script(
            "show interface gpon 1-* ddmi status",
            vec![
                Step::send("show interface gpon 1-* ddmi status\r\n"),
                Step::Pause(Duration::from_millis(50)),
                Step::send(format!("{}\r\nMSC1240XA# ", DDMI_1240XA.replace('\n', "\r\n"))),
            ],
        );
    let (mut client, device) = connect(DeviceModel::Msc1240XA, fake);

    let onts = client.get_all_onts().unwrap();
    assert_eq!(onts.len(), 2);
    assert_eq!(onts[0].get("AID"), Some("1-1-2"));
    assert_eq!(onts[0].get("ONT Rx"), None);
    assert_eq!(onts[1].get("AID"), Some("1-1-10"));
    assert_eq!(onts[1].get("Type"), Some("Actual"));
    assert_eq!(onts[1].get("Vendor"), Some("ZYXEL"));
    assert_eq!(onts[1].get("ONT Rx"), Some("-25.27"));

    drop(client);
    assert_eq!(
        device.join().unwrap().commands,
        vec![
            "show interface remote ont filter 1",
            "show interface gpon 1-* ddmi status",
            "exit"
        ]
    );
}

#[test]
fn test_1240xa_enrichment_can_be_disabled() {
    let fake = FakeOlt::new(DeviceModel::Msc1240XA)
        .respond("show interface remote ont filter 1", FILTER_1240XA);
    let (client, device) = connect(DeviceModel::Msc1240XA, fake);
    let mut client = client.with_rx_enrichment(false);

    let onts = client.get_all_onts().unwrap();
    assert!(onts.iter().all(|ont| ont.get("ONT Rx").is_none()));
    drop(client);
    assert_eq!(device.join().unwrap().commands.len(), 2);
}

#[test]
fn test_1240xa_strips_ont_prefix_and_uses_relative_sections() {
    let fake = FakeOlt::new(DeviceModel::Msc1240XA).respond(
        "show interface remote ont 1-1-10 config",
        "\
AID          | Details
-------------+--------------------------
1-1-10       | sn 5A5948530A1B2C3D | no inactive
1-1-10-2-1   | vlan 100 priority 0",
    );
    let (mut client, device) = connect(DeviceModel::Msc1240XA, fake);

    let config = client.get_ont_config("ont-1-1-10").unwrap();
    assert_eq!(config.aid, "1-1-10");
    assert_eq!(config.ont.text("sn"), Some("5A5948530A1B2C3D"));
    assert_eq!(config.port("1-1-10-2-1").unwrap().vlans[0].vlan, "100");
    drop(client);
    device.join().unwrap();
}

#[test]
fn test_ddmi_unsupported_model_returns_empty() {
    let fake = FakeOlt::new(DeviceModel::Olt2406);
    let (mut client, device) = connect(DeviceModel::Olt2406, fake);
    assert!(client.get_ddmi_rx().unwrap().is_empty());
    drop(client);
    assert_eq!(device.join().unwrap().commands, vec!["exit"]);
}
